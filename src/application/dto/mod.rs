//! Data transfer objects for the application layer.

mod image_request;

pub use image_request::{ImageRequest, PreviewSource};
