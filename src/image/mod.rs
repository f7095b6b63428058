//! Grayscale micrograph buffers and the pixel-source collaborator contract.

pub mod f32;
pub mod io;
pub mod source;
pub mod traits;
pub mod u8;

pub use self::f32::ImageF32;
pub use self::source::{FilePixelSource, InMemoryPixelSource, PixelError, PixelSource};
pub use self::traits::{ImageView, ImageViewMut, Rows};
pub use self::u8::{GrayImageU8, ImageU8};
