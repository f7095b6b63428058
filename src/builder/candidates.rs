//! Candidate pair generation, classification and template-match rescue.
//!
//! Within one acquisition group every ordered (parent, child) pair with
//! parent magnification strictly below the child's is scored. Scores at or
//! above the containment threshold become metadata edges without touching
//! pixels; scores inside the marginal band are handed to the template
//! matcher; everything below the lower bound is dropped before any pixel
//! work, so unrelated images never cost a correlation search.
//!
//! Rescue of the marginal pairs of one group is a single fan-out/fan-in:
//! results are collected before conflict resolution looks at any of them.

use crate::builder::filter::ValidRecord;
use crate::builder::BuilderParams;
use crate::forest::{ContainmentEdge, Evidence};
use crate::geometry;
use crate::image::{ImageF32, PixelSource};
use crate::matcher::TemplateMatcher;
use log::debug;
use std::collections::HashMap;

/// A pair whose metadata score fell inside the marginal band.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MarginalPair {
    pub parent: usize,
    pub child: usize,
    pub score: f64,
}

/// Score all ordered pairs of one group, returning accepted metadata edges
/// and the marginal pairs eligible for rescue.
pub(crate) fn generate(
    valid: &[ValidRecord],
    group: &[usize],
    params: &BuilderParams,
) -> (Vec<ContainmentEdge>, Vec<MarginalPair>) {
    let mut accepted = Vec::new();
    let mut marginal = Vec::new();
    for &p in group {
        for &c in group {
            if p == c {
                continue;
            }
            let parent = &valid[p];
            let child = &valid[c];
            if parent.record.magnification >= child.record.magnification {
                continue;
            }
            let ratio = geometry::scale_estimate(&parent.record, &child.record);
            if ratio < params.min_magnification_ratio {
                continue;
            }
            let score = geometry::containment_score(&parent.rect, &child.rect);
            if score >= params.containment_threshold {
                accepted.push(ContainmentEdge {
                    parent: p,
                    child: c,
                    score,
                    evidence: Evidence::Metadata,
                    confidence: None,
                    matched_rect: None,
                });
            } else if score >= params.marginal_lower_bound {
                marginal.push(MarginalPair {
                    parent: p,
                    child: c,
                    score,
                });
            }
            // below the lower bound: dropped, matcher never invoked
        }
    }
    (accepted, marginal)
}

/// Attempt template-match rescue for the marginal pairs of one group.
///
/// Buffers are fetched once per image; fetch failures and match failures
/// drop the affected pairs only. The returned vector is the barrier: all
/// dispatched matches have completed when it is built.
pub(crate) fn rescue(
    valid: &[ValidRecord],
    marginal: Vec<MarginalPair>,
    pixels: Option<&dyn PixelSource>,
    params: &BuilderParams,
) -> Vec<ContainmentEdge> {
    if marginal.is_empty() {
        return Vec::new();
    }
    let Some(source) = pixels else {
        debug!(
            "HierarchyBuilder: no pixel source, dropping {} marginal pair(s)",
            marginal.len()
        );
        return Vec::new();
    };

    let mut buffers: HashMap<usize, Option<ImageF32>> = HashMap::new();
    for pair in &marginal {
        for index in [pair.parent, pair.child] {
            buffers.entry(index).or_insert_with(|| {
                match source.fetch(&valid[index].image) {
                    Ok(buffer) => Some(ImageF32::from_u8(buffer.as_view())),
                    Err(err) => {
                        debug!("HierarchyBuilder: {err}, falling back to metadata only");
                        None
                    }
                }
            });
        }
    }

    let matcher = TemplateMatcher::new(params.match_params);
    let run = |pair: &MarginalPair| -> Option<ContainmentEdge> {
        let parent_img = buffers.get(&pair.parent)?.as_ref()?;
        let child_img = buffers.get(&pair.child)?.as_ref()?;
        let estimate = geometry::scale_estimate(
            &valid[pair.parent].record,
            &valid[pair.child].record,
        );
        // Expected template-to-parent pixel scale: the child's field of
        // view spans 1/estimate of the parent's, corrected for differing
        // buffer resolutions.
        let scale = parent_img.w as f64 / (child_img.w as f64 * estimate);
        match matcher.locate(parent_img, child_img, scale) {
            Ok(found) => {
                debug!(
                    "HierarchyBuilder: {} located in {} (score {:.4}, scale {:.4})",
                    valid[pair.child].image, valid[pair.parent].image, found.score, found.scale
                );
                Some(ContainmentEdge {
                    parent: pair.parent,
                    child: pair.child,
                    score: pair.score,
                    evidence: Evidence::Both,
                    confidence: Some(found.score),
                    matched_rect: Some(found.rect),
                })
            }
            Err(err) => {
                debug!(
                    "HierarchyBuilder: {} in {} dropped ({err})",
                    valid[pair.child].image, valid[pair.parent].image
                );
                None
            }
        }
    };

    let results: Vec<Option<ContainmentEdge>> =
        if params.parallel.should_parallelize(marginal.len()) {
            run_parallel(&marginal, &run, params.parallel.max_threads)
        } else {
            marginal.iter().map(run).collect()
        };
    results.into_iter().flatten().collect()
}

#[cfg(feature = "parallel")]
fn run_parallel<F>(
    pairs: &[MarginalPair],
    run: &F,
    max_threads: Option<usize>,
) -> Vec<Option<ContainmentEdge>>
where
    F: Fn(&MarginalPair) -> Option<ContainmentEdge> + Sync,
{
    use rayon::prelude::*;

    match max_threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| pairs.par_iter().map(run).collect()),
            Err(err) => {
                log::warn!("HierarchyBuilder: thread pool setup failed ({err}), using global pool");
                pairs.par_iter().map(run).collect()
            }
        },
        None => pairs.par_iter().map(run).collect(),
    }
}

#[cfg(not(feature = "parallel"))]
fn run_parallel<F>(
    pairs: &[MarginalPair],
    run: &F,
    _max_threads: Option<usize>,
) -> Vec<Option<ContainmentEdge>>
where
    F: Fn(&MarginalPair) -> Option<ContainmentEdge>,
{
    pairs.iter().map(run).collect()
}
