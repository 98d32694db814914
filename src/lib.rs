// THEORY:
// This file is the main entry point for the `blob_vision` library crate. It
// exposes the `BlobPipeline` and its configuration and report types as the
// high-level interface (label, filter, track one frame at a time), and the
// `core_modules` for callers that need the individual stages: labeling, the
// blob store, boundary tracing, polygon geometry, tracking and rendering.

pub mod core_modules;
pub mod pipeline;

pub use core_modules::error::{BlobError, Result};
