//! Small shared types used across the builder, matcher and composer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a micrograph within a session, typically its file name.
///
/// The core never touches files itself; ids are opaque keys into the
/// metadata and pixel collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ImageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Axis-aligned rectangle in pixel coordinates, origin at the top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    /// Translate by a non-negative pixel offset.
    pub fn offset(&self, dx: u32, dy: u32) -> PixelRect {
        PixelRect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Rectangle normalized to `[0, 1]` within a reference image, origin at the
/// top-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl NormRect {
    /// Convert to pixel coordinates of a `width × height` image.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let x0 = (self.x0 * f64::from(width)).round() as u32;
        let y0 = (self.y0 * f64::from(height)).round() as u32;
        let x1 = (self.x1 * f64::from(width)).round() as u32;
        let y1 = (self.y1 * f64::from(height)).round() as u32;
        PixelRect {
            x: x0,
            y: y0,
            w: x1.saturating_sub(x0),
            h: y1.saturating_sub(y0),
        }
    }
}
