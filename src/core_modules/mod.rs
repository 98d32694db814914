pub mod blob;
pub mod blob_set;
pub mod contour;
pub mod error;
pub mod labeler;
pub mod polygon;
pub mod render;
pub mod tracker;
