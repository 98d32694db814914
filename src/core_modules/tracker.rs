// THEORY:
// The `tracker` module gives blobs a memory. Each frame's `BlobSet` is a stateless
// snapshot; the tracker associates its blobs with the tracks it carried over from
// previous frames, so that one physical object keeps one identity over time.
//
// This module solves the "data association problem" with a greedy nearest-centroid
// rule.
//
// Key architectural principles:
// 1.  **Plain Values Only**: A `Track` copies the label, centroid and bounding box of
//     the blob it last matched. It never holds a `Blob`, so the next frame's
//     `BlobSet` can replace the old one freely.
// 2.  **Global Greedy Matching**: Every (track, blob) pair within the distance
//     threshold is a candidate. Candidates are taken closest first; ties go to the
//     lowest track id, then the lowest blob label. This is not an optimal
//     assignment, and it is fully deterministic.
// 3.  **Lifecycle Management**:
//     - **Birth**: A blob nobody matched starts a `New` track.
//     - **Tracking**: A matched track becomes `Active`, ages by one and forgets
//       its missed frames.
//     - **Occlusion**: A missed track counts consecutive misses. Once they reach the
//       inactive threshold, a short-lived track is dropped as noise and an
//       established one turns `Inactive` but can still be re-matched.
//     - **Death**: Inactive tracks are removed according to `InactiveRemoval`.
// 4.  **Validate, Then Mutate**: A bad configuration is rejected before any track
//     is touched.

use crate::core_modules::blob::{Blob, BoundingBox, Label};
use crate::core_modules::blob_set::BlobSet;
use crate::core_modules::error::{BlobError, Result};
use std::collections::{BTreeMap, HashSet};

/// Persistent track identifier. Starts at 1; never reused within a tracker.
pub type TrackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackState {
    /// Created this frame from an unmatched blob.
    New,
    /// Matched in its most recent update.
    Active,
    /// Missed for at least `inactive_threshold` frames, still eligible for re-match.
    Inactive,
}

/// An object's identity over time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    /// A unique and persistent ID for this track.
    pub id: TrackId,
    pub state: TrackState,
    /// Label of the blob last matched, in that blob's frame.
    pub label: Label,
    /// Centroid of the blob last matched.
    pub last_centroid: (f64, f64),
    /// Bounding box of the blob last matched.
    pub last_bounding_box: BoundingBox,
    /// Number of frames in which the track was matched, including its first.
    pub age: u32,
    /// Consecutive frames without a match.
    pub frames_since_match: u32,
    /// Frames since creation, matched or not.
    pub lifetime: u32,
}

impl Track {
    fn new(id: TrackId, blob: &Blob) -> Self {
        Self {
            id,
            state: TrackState::New,
            label: blob.label,
            last_centroid: blob.centroid(),
            last_bounding_box: blob.bounding_box,
            age: 1,
            frames_since_match: 0,
            lifetime: 1,
        }
    }

    fn record_match(&mut self, blob: &Blob) {
        self.state = TrackState::Active;
        self.label = blob.label;
        self.last_centroid = blob.centroid();
        self.last_bounding_box = blob.bounding_box;
        self.age += 1;
        self.frames_since_match = 0;
        self.lifetime += 1;
    }

    fn distance_to(&self, blob: &Blob) -> f64 {
        let (x, y) = blob.centroid();
        (self.last_centroid.0 - x).hypot(self.last_centroid.1 - y)
    }
}

/// When an inactive track leaves the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InactiveRemoval {
    /// Removed in the same update that made it inactive.
    Immediate,
    /// Kept for re-matching until `frames_since_match` reaches the bound.
    /// The bound may not be below `inactive_threshold`.
    AfterFrames(u32),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerConfig {
    /// Max centroid distance, in pixels, for a track and a blob to match.
    pub distance_threshold: f64,
    /// Consecutive misses after which a track is no longer considered live.
    pub inactive_threshold: u32,
    /// Minimum `age` a track needs to survive going inactive. 0 protects nothing.
    pub active_threshold: u32,
    pub removal: InactiveRemoval,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 5.0,
            inactive_threshold: 5,
            active_threshold: 0,
            removal: InactiveRemoval::Immediate,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.distance_threshold.is_nan() || self.distance_threshold < 0.0 {
            return Err(BlobError::ArgumentOutOfRange(format!(
                "distance threshold must be non-negative, got {}",
                self.distance_threshold
            )));
        }
        if let InactiveRemoval::AfterFrames(bound) = self.removal {
            if bound < self.inactive_threshold {
                return Err(BlobError::ArgumentOutOfRange(format!(
                    "removal bound {bound} is below the inactive threshold {}",
                    self.inactive_threshold
                )));
            }
        }
        Ok(())
    }
}

/// Track ids touched by one update, each list in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackEvents {
    pub created: Vec<TrackId>,
    pub matched: Vec<TrackId>,
    pub deactivated: Vec<TrackId>,
    pub removed: Vec<TrackId>,
}

/// Owns every track for the length of a tracking session.
#[derive(Debug, Clone)]
pub struct Tracker {
    tracks: BTreeMap<TrackId, Track>,
    /// The id the next new track will get.
    next_id: TrackId,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Live tracks in ascending id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Associates this frame's blobs with the live tracks and advances every
    /// track's lifecycle by one frame.
    pub fn update(&mut self, blobs: &BlobSet, config: &TrackerConfig) -> Result<TrackEvents> {
        config.validate()?;
        let mut events = TrackEvents::default();

        // --- 1. Candidates ---
        let mut candidates: Vec<(f64, TrackId, Label)> = Vec::new();
        for track in self.tracks.values() {
            for blob in blobs.iter() {
                let dist = track.distance_to(blob);
                if dist <= config.distance_threshold {
                    candidates.push((dist, track.id, blob.label));
                }
            }
        }
        candidates.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        // --- 2. Greedy Matching ---
        let mut matched_tracks: HashSet<TrackId> = HashSet::new();
        let mut matched_blobs: HashSet<Label> = HashSet::new();
        for (_, id, label) in candidates {
            if matched_tracks.contains(&id) || matched_blobs.contains(&label) {
                continue;
            }
            matched_tracks.insert(id);
            matched_blobs.insert(label);
            if let (Some(track), Some(blob)) = (self.tracks.get_mut(&id), blobs.get(label)) {
                track.record_match(blob);
                events.matched.push(id);
            }
        }
        events.matched.sort_unstable();

        // --- 3. Missed Tracks ---
        let mut expired = Vec::new();
        for track in self.tracks.values_mut() {
            if matched_tracks.contains(&track.id) {
                continue;
            }
            track.frames_since_match += 1;
            track.lifetime += 1;
            if track.frames_since_match < config.inactive_threshold {
                continue;
            }
            if track.age < config.active_threshold {
                expired.push(track.id);
                continue;
            }
            if track.state != TrackState::Inactive {
                track.state = TrackState::Inactive;
                events.deactivated.push(track.id);
            }
            let remove = match config.removal {
                InactiveRemoval::Immediate => true,
                InactiveRemoval::AfterFrames(bound) => track.frames_since_match >= bound,
            };
            if remove {
                expired.push(track.id);
            }
        }
        for id in expired {
            if let Some(track) = self.tracks.remove(&id) {
                tracing::debug!(
                    track = id,
                    age = track.age,
                    missed = track.frames_since_match,
                    "track removed"
                );
                events.removed.push(id);
            }
        }

        // --- 4. New Tracks ---
        for blob in blobs.iter() {
            if matched_blobs.contains(&blob.label) {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            tracing::debug!(track = id, label = blob.label, "track created");
            self.tracks.insert(id, Track::new(id, blob));
            events.created.push(id);
        }

        Ok(events)
    }
}
