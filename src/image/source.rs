//! Pixel-source collaborator contract.
//!
//! Hierarchy building and composition fetch decoded pixel buffers on
//! demand through [`PixelSource`]. A fetch failure surfaces as
//! [`PixelError::ImageUnreadable`]; during building it downgrades the
//! affected pair to metadata-only evidence instead of aborting.

use super::io::load_grayscale_image;
use super::GrayImageU8;
use crate::types::ImageId;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub trait PixelSource {
    /// Decoded grayscale buffer for `image`.
    fn fetch(&self, image: &ImageId) -> Result<GrayImageU8, PixelError>;
}

#[derive(Clone, Debug)]
pub enum PixelError {
    ImageUnreadable { image: ImageId, reason: String },
}

impl fmt::Display for PixelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelError::ImageUnreadable { image, reason } => {
                write!(f, "image {image} unreadable: {reason}")
            }
        }
    }
}

impl std::error::Error for PixelError {}

/// Resolves image ids as paths relative to a session directory and decodes
/// them with the `image` crate.
#[derive(Clone, Debug)]
pub struct FilePixelSource {
    root: PathBuf,
}

impl FilePixelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PixelSource for FilePixelSource {
    fn fetch(&self, image: &ImageId) -> Result<GrayImageU8, PixelError> {
        load_grayscale_image(&self.root.join(image.as_str())).map_err(|reason| {
            PixelError::ImageUnreadable {
                image: image.clone(),
                reason,
            }
        })
    }
}

/// Pre-decoded buffers held in memory; used by tests and by callers that
/// decode elsewhere.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPixelSource {
    buffers: HashMap<ImageId, GrayImageU8>,
}

impl InMemoryPixelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: ImageId, buffer: GrayImageU8) {
        self.buffers.insert(image, buffer);
    }
}

impl PixelSource for InMemoryPixelSource {
    fn fetch(&self, image: &ImageId) -> Result<GrayImageU8, PixelError> {
        self.buffers
            .get(image)
            .cloned()
            .ok_or_else(|| PixelError::ImageUnreadable {
                image: image.clone(),
                reason: "no buffer registered".to_string(),
            })
    }
}
