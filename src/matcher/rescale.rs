//! Area-average resampling of float images.
//!
//! The matcher shrinks a high-magnification template to the footprint it
//! occupies inside the parent image; arbitrary ratios are handled by
//! integrating source pixels over each destination pixel's footprint
//! (box filter), which averages rather than aliases when shrinking.

use crate::image::{ImageF32, ImageView, ImageViewMut};

/// Resample `src` to `new_w × new_h` with box-filter area averaging.
pub fn resample_area(src: &ImageF32, new_w: usize, new_h: usize) -> ImageF32 {
    assert!(new_w > 0 && new_h > 0, "target dimensions must be positive");
    if new_w == src.w && new_h == src.h {
        return src.clone();
    }
    let xs = src.w as f64 / new_w as f64;
    let ys = src.h as f64 / new_h as f64;
    let mut out = ImageF32::new(new_w, new_h);
    for dy in 0..new_h {
        let sy0 = dy as f64 * ys;
        let sy1 = sy0 + ys;
        let y_start = sy0.floor() as usize;
        let y_end = (sy1.ceil() as usize).min(src.h);
        let dst = out.row_mut(dy);
        for (dx, px) in dst.iter_mut().enumerate() {
            let sx0 = dx as f64 * xs;
            let sx1 = sx0 + xs;
            let x_start = sx0.floor() as usize;
            let x_end = (sx1.ceil() as usize).min(src.w);
            let mut acc = 0.0f64;
            let mut weight = 0.0f64;
            for sy in y_start..y_end {
                let wy = overlap(sy, sy0, sy1);
                if wy <= 0.0 {
                    continue;
                }
                let row = src.row(sy);
                for (sx, &v) in row[x_start..x_end].iter().enumerate().map(|(i, v)| (x_start + i, v)) {
                    let wx = overlap(sx, sx0, sx1);
                    if wx <= 0.0 {
                        continue;
                    }
                    acc += f64::from(v) * wx * wy;
                    weight += wx * wy;
                }
            }
            *px = if weight > 0.0 { (acc / weight) as f32 } else { 0.0 };
        }
    }
    out
}

/// Length of `[idx, idx + 1] ∩ [lo, hi]`.
fn overlap(idx: usize, lo: f64, hi: f64) -> f64 {
    let a = (idx as f64).max(lo);
    let b = ((idx + 1) as f64).min(hi);
    (b - a).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_resample_is_a_copy() {
        let mut img = ImageF32::new(4, 3);
        for y in 0..3 {
            for x in 0..4 {
                img.set(x, y, (y * 4 + x) as f32);
            }
        }
        let out = resample_area(&img, 4, 3);
        assert_eq!(out.data, img.data);
    }

    #[test]
    fn two_to_one_downscale_averages_blocks() {
        let mut img = ImageF32::new(4, 2);
        img.set(0, 0, 1.0);
        img.set(1, 0, 3.0);
        img.set(0, 1, 5.0);
        img.set(1, 1, 7.0);
        // second block all 2.0
        for (x, y) in [(2, 0), (3, 0), (2, 1), (3, 1)] {
            img.set(x, y, 2.0);
        }
        let out = resample_area(&img, 2, 1);
        assert!((out.get(0, 0) - 4.0).abs() < 1e-6);
        assert!((out.get(1, 0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn upscale_preserves_constant_images() {
        let mut img = ImageF32::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                img.set(x, y, 0.25);
            }
        }
        let out = resample_area(&img, 7, 5);
        assert!(out.data.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }
}
