//! Deterministic synthetic micrograph textures for the test suite.

use maggrid::image::{GrayImageU8, ImageF32, ImageView, ImageViewMut};

/// Generates a speckle texture resembling a micrograph: linear-congruential
/// noise smoothed by two box-blur passes so neighboring pixels correlate.
/// Identical arguments always give identical pixels.
pub fn speckle_f32(width: usize, height: usize, seed: u64) -> ImageF32 {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    let mut img = ImageF32::new(width, height);
    for y in 0..height {
        let row = img.row_mut(y);
        for px in row.iter_mut() {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            *px = ((state >> 40) & 0xFF) as f32 / 255.0;
        }
    }
    let once = box_blur(&img);
    box_blur(&once)
}

fn box_blur(src: &ImageF32) -> ImageF32 {
    let mut out = ImageF32::new(src.w, src.h);
    for y in 0..src.h {
        for x in 0..src.w {
            let mut acc = 0.0f32;
            let mut count = 0.0f32;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let sx = x as i64 + dx;
                    let sy = y as i64 + dy;
                    if sx < 0 || sy < 0 || sx >= src.w as i64 || sy >= src.h as i64 {
                        continue;
                    }
                    acc += src.get(sx as usize, sy as usize);
                    count += 1.0;
                }
            }
            out.set(x, y, acc / count);
        }
    }
    out
}

/// Copy a `w × h` region of `src` starting at `(x, y)`.
pub fn crop(src: &ImageF32, x: usize, y: usize, w: usize, h: usize) -> ImageF32 {
    assert!(x + w <= src.w && y + h <= src.h, "crop out of bounds");
    let mut out = ImageF32::new(w, h);
    for row in 0..h {
        out.row_mut(row).copy_from_slice(&src.row(y + row)[x..x + w]);
    }
    out
}

/// Quantize a float image to an owned 8-bit buffer.
pub fn to_u8(src: &ImageF32) -> GrayImageU8 {
    let data = src
        .data
        .iter()
        .map(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();
    GrayImageU8::new(src.w, src.h, data)
}
