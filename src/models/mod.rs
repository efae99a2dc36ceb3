pub mod image;
pub mod status;

pub use image::*;
pub use status::*;
