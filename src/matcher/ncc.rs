//! Zero-mean normalized cross-correlation over every template placement.
//!
//! Window mean and energy come from summed-area tables; the cross term is
//! a direct dot product against the zero-mean template, so the cost of one
//! search is O(image area × template area).

use crate::image::{ImageF32, ImageView};
use std::time::Instant;

/// Signals that the per-pair deadline fired mid-search.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DeadlineExceeded;

#[derive(Clone, Copy, Debug)]
pub(crate) struct BestPlacement {
    pub score: f32,
    pub x: usize,
    pub y: usize,
}

const DENOM_EPS: f64 = 1e-12;

/// Best placement of `template` inside `image`, or `None` when correlation
/// is undefined everywhere (featureless template or windows).
///
/// Ties keep the earliest row-major position. The deadline is checked once
/// per placement row.
pub(crate) fn search(
    image: &ImageF32,
    template: &ImageF32,
    deadline: Option<Instant>,
) -> Result<Option<BestPlacement>, DeadlineExceeded> {
    let (iw, ih) = (image.w, image.h);
    let (tw, th) = (template.w, template.h);
    debug_assert!(tw <= iw && th <= ih && tw > 0 && th > 0);
    let n = (tw * th) as f64;

    let mut sum = 0.0f64;
    for row in template.rows() {
        for &v in row {
            sum += f64::from(v);
        }
    }
    let mean = sum / n;
    let mut tpl = Vec::with_capacity(tw * th);
    let mut tpl_energy = 0.0f64;
    for row in template.rows() {
        for &v in row {
            let z = f64::from(v) - mean;
            tpl_energy += z * z;
            tpl.push(z);
        }
    }
    if tpl_energy <= DENOM_EPS {
        return Ok(None);
    }

    // Summed-area tables of pixel values and squares, (iw+1)×(ih+1).
    let sw = iw + 1;
    let mut sat = vec![0.0f64; sw * (ih + 1)];
    let mut sat_sq = vec![0.0f64; sw * (ih + 1)];
    for y in 0..ih {
        let row = image.row(y);
        let mut run = 0.0f64;
        let mut run_sq = 0.0f64;
        for (x, &v) in row.iter().enumerate() {
            let v = f64::from(v);
            run += v;
            run_sq += v * v;
            let i = (y + 1) * sw + (x + 1);
            sat[i] = sat[y * sw + (x + 1)] + run;
            sat_sq[i] = sat_sq[y * sw + (x + 1)] + run_sq;
        }
    }
    let window = |table: &[f64], x: usize, y: usize| -> f64 {
        table[(y + th) * sw + (x + tw)] - table[y * sw + (x + tw)] - table[(y + th) * sw + x]
            + table[y * sw + x]
    };

    let mut best: Option<BestPlacement> = None;
    for y in 0..=(ih - th) {
        if let Some(d) = deadline {
            if Instant::now() >= d {
                return Err(DeadlineExceeded);
            }
        }
        for x in 0..=(iw - tw) {
            let win_sum = window(&sat, x, y);
            let win_energy = window(&sat_sq, x, y) - win_sum * win_sum / n;
            if win_energy <= DENOM_EPS {
                continue;
            }
            let mut num = 0.0f64;
            for ty in 0..th {
                let img_row = &image.row(y + ty)[x..x + tw];
                let tpl_row = &tpl[ty * tw..(ty + 1) * tw];
                for (t, &i) in tpl_row.iter().zip(img_row) {
                    num += t * f64::from(i);
                }
            }
            let score = (num / (win_energy * tpl_energy).sqrt()) as f32;
            if best.is_none_or(|b| score > b.score) {
                best = Some(BestPlacement { score, x, y });
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Pixel values are multiples of 1/16 so every summed-area entry is
    // exact in f64 and equal windows produce bit-identical scores.
    fn ramp_block() -> ImageF32 {
        let mut tpl = ImageF32::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                tpl.set(x, y, (y * 3 + x) as f32 / 16.0);
            }
        }
        tpl
    }

    fn paste(dst: &mut ImageF32, src: &ImageF32, ox: usize, oy: usize) {
        for y in 0..src.h {
            for x in 0..src.w {
                dst.set(ox + x, oy + y, src.get(x, y));
            }
        }
    }

    #[test]
    fn exact_copy_scores_one_at_its_position() {
        let tpl = ramp_block();
        let mut img = ImageF32::new(12, 9);
        paste(&mut img, &tpl, 5, 4);
        let best = search(&img, &tpl, None).unwrap().unwrap();
        assert_eq!((best.x, best.y), (5, 4));
        assert!(best.score > 0.999, "score = {}", best.score);
    }

    #[test]
    fn equal_scores_keep_earliest_row_major_position() {
        let tpl = ramp_block();
        let mut img = ImageF32::new(16, 8);
        paste(&mut img, &tpl, 2, 2);
        paste(&mut img, &tpl, 10, 2);
        let best = search(&img, &tpl, None).unwrap().unwrap();
        assert_eq!((best.x, best.y), (2, 2));
    }

    #[test]
    fn featureless_template_has_no_defined_score() {
        let tpl = ImageF32::new(3, 3);
        let img = ImageF32::new(8, 8);
        assert!(search(&img, &tpl, None).unwrap().is_none());
    }

    #[test]
    fn expired_deadline_aborts_the_search() {
        let tpl = ramp_block();
        let mut img = ImageF32::new(64, 64);
        paste(&mut img, &tpl, 30, 30);
        let past = Instant::now() - std::time::Duration::from_millis(1);
        assert!(search(&img, &tpl, Some(past)).is_err());
    }
}
