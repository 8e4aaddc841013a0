//! Built-in effects.

mod brightness_contrast;
mod chroma_key;
mod corner_pin;
mod invert;
mod solid_color;
mod transform;

pub use brightness_contrast::BrightnessContrast;
pub use chroma_key::{rgb_to_ycbcr, ChromaKey};
pub use corner_pin::CornerPin;
pub use invert::Invert;
pub use solid_color::SolidColor;
pub use transform::Transform;
