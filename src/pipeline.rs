// THEORY:
// The `pipeline` module is the top-level API of the crate. It chains the stages a
// caller would otherwise wire up by hand for every frame: label the binary raster,
// drop blobs outside the accepted area range, and feed the survivors to the
// tracker. The latest `BlobSet` is kept so it can be queried or rendered after
// the frame was processed.

use crate::core_modules::blob_set::BlobSet;
use crate::core_modules::error::{BlobError, Result};
use crate::core_modules::tracker::Tracker;
use image::GrayImage;

// Re-export key data structures for the public API.
pub use crate::core_modules::blob::{Blob, BoundingBox, Label, Point};
pub use crate::core_modules::render::{
    RenderOptions, label_color, render_blobs, render_contour, render_polygon, render_tracks,
    track_color,
};
pub use crate::core_modules::tracker::{
    InactiveRemoval, Track, TrackEvents, TrackId, TrackState, TrackerConfig,
};

/// Configuration for the `BlobPipeline`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Smallest blob, in pixels, handed to the tracker.
    pub min_area: u64,
    /// Largest blob, in pixels, handed to the tracker.
    pub max_area: u64,
    pub tracker: TrackerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_area: 1,
            max_area: u64::MAX,
            tracker: TrackerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_area > self.max_area {
            return Err(BlobError::ArgumentOutOfRange(format!(
                "minimum area {} is greater than maximum area {}",
                self.min_area, self.max_area
            )));
        }
        self.tracker.validate()
    }
}

/// What happened in one processed frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameReport {
    /// Zero-based index of the frame.
    pub frame: u64,
    /// Blobs left after area filtering.
    pub blob_count: usize,
    /// Foreground pixels labeled before filtering.
    pub labeled_pixels: usize,
    pub events: TrackEvents,
}

/// The main, top-level struct of the crate.
#[derive(Debug)]
pub struct BlobPipeline {
    config: PipelineConfig,
    tracker: Tracker,
    blobs: Option<BlobSet>,
    frames_processed: u64,
}

impl BlobPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracker: Tracker::new(),
            blobs: None,
            frames_processed: 0,
        })
    }

    pub fn process_frame(&mut self, raster: &GrayImage) -> Result<FrameReport> {
        // Stage 1: Labeling
        let mut blobs = BlobSet::label(raster)?;
        let labeled_pixels = blobs.labeled_pixels();

        // Stage 2: Area Filtering
        blobs.filter_by_area(self.config.min_area, self.config.max_area)?;

        // Stage 3: Tracking
        let events = self.tracker.update(&blobs, &self.config.tracker)?;

        let report = FrameReport {
            frame: self.frames_processed,
            blob_count: blobs.len(),
            labeled_pixels,
            events,
        };
        tracing::debug!(
            frame = report.frame,
            blobs = report.blob_count,
            created = report.events.created.len(),
            matched = report.events.matched.len(),
            removed = report.events.removed.len(),
            "processed frame"
        );

        self.frames_processed += 1;
        self.blobs = Some(blobs);
        Ok(report)
    }

    /// Blobs of the last processed frame.
    pub fn blobs(&self) -> Option<&BlobSet> {
        self.blobs.as_ref()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracker.tracks()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
