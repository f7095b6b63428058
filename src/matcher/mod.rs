//! Template matching between micrographs at different magnifications.
//!
//! Given a low-magnification parent buffer and a high-magnification child
//! buffer, the matcher shrinks the child to the footprint it should occupy
//! inside the parent and searches every axis-aligned placement with
//! zero-mean normalized cross-correlation. In multi-scale mode a small set
//! of candidate scales around the declared estimate is evaluated, since
//! declared magnification ratios drift from true optical ratios with
//! stage/lens calibration error.
//!
//! Determinism: identical buffers and parameters reproduce the identical
//! result. Ties prefer the smallest scale factor, then the earliest
//! row-major position.

mod ncc;
mod rescale;

pub use rescale::resample_area;

use crate::image::ImageF32;
use crate::types::PixelRect;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Scaled templates with a side below this are too degenerate to correlate.
const MIN_SCALED_SIDE: usize = 4;

/// Parameters for one matcher instance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchParams {
    /// Minimum correlation score for a placement to count as a match.
    pub accept_threshold: f32,
    /// Evaluate a window of scales around the estimate instead of only the
    /// estimate itself.
    pub multi_scale: bool,
    /// Half-width of the scale window, as a fraction of the estimate.
    pub scale_span: f64,
    /// Number of scales evaluated across the window.
    pub scale_steps: usize,
    /// Compute budget for one pair; expiry aborts the search.
    pub timeout: Option<Duration>,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            multi_scale: true,
            scale_span: 0.15,
            scale_steps: 7,
            timeout: None,
        }
    }
}

impl MatchParams {
    pub fn with_accept_threshold(mut self, threshold: f32) -> Self {
        self.accept_threshold = threshold;
        self
    }

    pub fn with_multi_scale(mut self, enabled: bool) -> Self {
        self.multi_scale = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Accepted placement of a rescaled child inside a parent image.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMatch {
    /// Correlation score of the winning placement, in [0, 1] for real matches.
    pub score: f32,
    /// Scale factor actually applied to the child template.
    pub scale: f64,
    /// Matched rectangle in parent-image pixel coordinates.
    pub rect: PixelRect,
}

/// Reasons a pair could not be verified visually.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchError {
    /// No evaluated placement cleared the acceptance threshold.
    NoMatchFound { best_score: f32, threshold: f32 },
    /// The rescaled template does not fit inside the parent at any
    /// evaluated scale.
    TemplateTooLarge {
        template: (usize, usize),
        image: (usize, usize),
    },
    /// The per-pair compute budget expired mid-search.
    DeadlineExpired { timeout: Duration },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NoMatchFound {
                best_score,
                threshold,
            } => write!(
                f,
                "no match found: best score {best_score:.4} below threshold {threshold:.4}"
            ),
            MatchError::TemplateTooLarge { template, image } => write!(
                f,
                "scaled template {}×{} larger than image {}×{}",
                template.0, template.1, image.0, image.1
            ),
            MatchError::DeadlineExpired { timeout } => {
                write!(f, "match deadline expired after {timeout:?}")
            }
        }
    }
}

impl std::error::Error for MatchError {}

/// Correlation-search service locating child content inside parent buffers.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateMatcher {
    params: MatchParams,
}

impl TemplateMatcher {
    pub fn new(params: MatchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Locate the best placement of `template` inside `parent`.
    ///
    /// `scale` is the expected ratio between the template's pixels and the
    /// size of the same content in the parent image (below 1 when the
    /// template shows a smaller physical field at similar resolution). In
    /// multi-scale mode the window `scale · [1 − span, 1 + span]` is
    /// evaluated in ascending order.
    pub fn locate(
        &self,
        parent: &ImageF32,
        template: &ImageF32,
        scale: f64,
    ) -> Result<TemplateMatch, MatchError> {
        let deadline = self.params.timeout.map(|t| Instant::now() + t);
        let mut best: Option<TemplateMatch> = None;
        let mut any_fit = false;

        for s in self.candidate_scales(scale) {
            let tw = (template.w as f64 * s).round() as usize;
            let th = (template.h as f64 * s).round() as usize;
            if tw < MIN_SCALED_SIDE || th < MIN_SCALED_SIDE {
                debug!("TemplateMatcher: scale {s:.4} gives degenerate template {tw}×{th}, skipped");
                continue;
            }
            if tw > parent.w || th > parent.h {
                debug!("TemplateMatcher: scale {s:.4} gives template {tw}×{th} larger than parent, skipped");
                continue;
            }
            any_fit = true;

            let resized = resample_area(template, tw, th);
            let found = ncc::search(parent, &resized, deadline).map_err(|_| {
                MatchError::DeadlineExpired {
                    timeout: self.params.timeout.unwrap_or_default(),
                }
            })?;
            if let Some(placement) = found {
                debug!(
                    "TemplateMatcher: scale {s:.4} best score {:.4} at ({}, {})",
                    placement.score, placement.x, placement.y
                );
                if best.is_none_or(|b| placement.score > b.score) {
                    best = Some(TemplateMatch {
                        score: placement.score,
                        scale: s,
                        rect: PixelRect {
                            x: placement.x as u32,
                            y: placement.y as u32,
                            w: tw as u32,
                            h: th as u32,
                        },
                    });
                }
            }
        }

        if !any_fit {
            let tw = (template.w as f64 * scale).round() as usize;
            let th = (template.h as f64 * scale).round() as usize;
            if tw > parent.w || th > parent.h {
                return Err(MatchError::TemplateTooLarge {
                    template: (tw, th),
                    image: (parent.w, parent.h),
                });
            }
            // every scale degenerated below the minimum template side
            return Err(MatchError::NoMatchFound {
                best_score: 0.0,
                threshold: self.params.accept_threshold,
            });
        }
        match best {
            Some(m) if m.score >= self.params.accept_threshold => Ok(m),
            other => Err(MatchError::NoMatchFound {
                best_score: other.map_or(0.0, |m| m.score),
                threshold: self.params.accept_threshold,
            }),
        }
    }

    /// Scales to evaluate, ascending, centered on `estimate`.
    fn candidate_scales(&self, estimate: f64) -> Vec<f64> {
        if !self.params.multi_scale || self.params.scale_steps <= 1 {
            return vec![estimate];
        }
        let n = self.params.scale_steps;
        let span = self.params.scale_span;
        (0..n)
            .map(|i| estimate * (1.0 - span + 2.0 * span * i as f64 / (n - 1) as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_scale_evaluates_only_the_estimate() {
        let matcher = TemplateMatcher::new(MatchParams::default().with_multi_scale(false));
        assert_eq!(matcher.candidate_scales(0.25), vec![0.25]);
    }

    #[test]
    fn multi_scale_window_is_ascending_and_centered() {
        let matcher = TemplateMatcher::new(MatchParams::default());
        let scales = matcher.candidate_scales(1.0);
        assert_eq!(scales.len(), 7);
        assert!((scales[0] - 0.85).abs() < 1e-12);
        assert!((scales[3] - 1.0).abs() < 1e-12);
        assert!((scales[6] - 1.15).abs() < 1e-12);
        assert!(scales.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn oversized_template_is_rejected() {
        let parent = ImageF32::new(16, 16);
        let template = ImageF32::new(64, 64);
        let matcher = TemplateMatcher::new(MatchParams::default().with_multi_scale(false));
        let err = matcher.locate(&parent, &template, 2.0).unwrap_err();
        assert!(matches!(err, MatchError::TemplateTooLarge { .. }));
    }
}
