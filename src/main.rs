// This file is an example of how to use the `blob_vision` library.
// The main library entry point is `src/lib.rs`.

use anyhow::Context;
use blob_vision::core_modules::polygon::Polygon;
use blob_vision::pipeline::{
    BlobPipeline, PipelineConfig, RenderOptions, render_blobs, render_contour, render_polygon,
    render_tracks,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const FRAMES: u32 = 12;

/// A 6x6 square drifting right, a fixed disc, and salt noise that changes each frame.
fn synthetic_frame(index: u32) -> GrayImage {
    GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let sx = 4 + 3 * index;
        let square = (sx..sx + 6).contains(&x) && (10..16).contains(&y);
        let (dx, dy) = (x as i64 - 40, y as i64 - 32);
        let disc = dx * dx + dy * dy <= 36;
        let noise = (x * 7 + y * 13 + index * 5) % 97 == 0;
        Luma([if square || disc || noise { 255 } else { 0 }])
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Blob Vision - Example Runner");

    let config = PipelineConfig {
        min_area: 4,
        ..PipelineConfig::default()
    };
    let mut pipeline = BlobPipeline::new(config).context("invalid pipeline configuration")?;

    for index in 0..FRAMES {
        let report = pipeline
            .process_frame(&synthetic_frame(index))
            .with_context(|| format!("frame {index} failed"))?;
        println!(
            "frame {:>2}: {} blobs, created {:?}, matched {:?}, removed {:?}",
            report.frame,
            report.blob_count,
            report.events.created,
            report.events.matched,
            report.events.removed
        );
    }

    for track in pipeline.tracks() {
        println!(
            "track {}: {:?}, age {}, at ({:.1}, {:.1})",
            track.id, track.state, track.age, track.last_centroid.0, track.last_centroid.1
        );
    }

    let blobs = pipeline.blobs().context("no frame was processed")?;
    let mut overlay = RgbImage::new(WIDTH, HEIGHT);
    render_blobs(blobs, &mut overlay, &RenderOptions::default())?;
    render_tracks(pipeline.tracks(), &mut overlay);

    if let Some(largest) = blobs.largest_blob() {
        let polygon: &Polygon = blobs.polygon(largest.label)?;
        let hull = polygon.convex_hull()?;
        println!(
            "largest blob {}: area {}, {} polygon vertices, {} after simplification, hull of {}",
            largest.label,
            largest.area,
            polygon.len(),
            polygon.simplify_default().len(),
            hull.len()
        );
        render_contour(blobs.contour(largest.label)?, &mut overlay, Rgb([0, 255, 255]));
        render_polygon(&hull, &mut overlay, Rgb([255, 0, 255]));
    }

    let painted = overlay.pixels().filter(|p| p.0 != [0, 0, 0]).count();
    println!("overlay painted {painted} pixels");

    Ok(())
}
