//! Hierarchy builder turning flat per-image records into a magnification
//! forest.
//!
//! Stages
//! - Filter: drop records with missing fields or degenerate geometry.
//! - Group: partition by (mode, high voltage, intensity); edges are only
//!   ever proposed within a group.
//! - Candidates: score ordered pairs by geometric containment.
//! - Classification: accept from metadata, rescue the marginal band with
//!   template matching, reject the rest without pixel work.
//! - Conflict resolution: one parent per child, best combined score wins.
//! - Assembly: arena forest, invariants re-validated.
//!
//! Per-pair failures (no match, unreadable pixels, expired deadline) only
//! drop the affected pair. The forest is materialized after every pair in
//! scope is resolved, so abandoning a build mid-flight discards completed
//! pair results without leaving partial state behind.
//!
//! ```no_run
//! use maggrid::{BuilderParams, HierarchyBuilder, SourceRecord};
//!
//! # fn example(records: Vec<SourceRecord>) {
//! let builder = HierarchyBuilder::new(BuilderParams::default());
//! match builder.build(&records, None) {
//!     Ok(forest) => println!("{} tree(s)", forest.roots().len()),
//!     Err(err) => eprintln!("build failed: {err}"),
//! }
//! # }
//! ```

mod candidates;
mod conflict;
mod filter;
mod grouping;
mod params;

pub use params::{BuilderParams, GroupTolerance, ParallelMatchOptions};

use crate::forest::{ForestViolation, MagnificationForest};
use crate::image::PixelSource;
use crate::metadata::RawMetadata;
use crate::types::ImageId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One image as handed over by the metadata extractor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub image: ImageId,
    pub metadata: RawMetadata,
}

/// Fatal build failures. Per-pair match failures are absorbed and never
/// surface here.
#[derive(Clone, Debug)]
pub enum BuildError {
    /// Fewer than `required` records survived validation.
    EmptyInput { valid: usize, required: usize },
    /// A hierarchy invariant broke after conflict resolution; indicates a
    /// defect in the grouping stage, not recoverable.
    InvariantViolation(ForestViolation),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyInput { valid, required } => write!(
                f,
                "not enough valid records: {valid} found, {required} required"
            ),
            BuildError::InvariantViolation(violation) => {
                write!(f, "hierarchy invariant violated: {violation}")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Builds a [`MagnificationForest`] from scratch on every call; nothing is
/// carried over between runs.
#[derive(Clone, Debug, Default)]
pub struct HierarchyBuilder {
    params: BuilderParams,
}

impl HierarchyBuilder {
    pub fn new(params: BuilderParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BuilderParams {
        &self.params
    }

    /// Infer the containment forest over `records`.
    ///
    /// `pixels` feeds the template-match rescue of marginal pairs; without
    /// it the builder runs on metadata evidence alone and marginal pairs
    /// are dropped. Isolated valid records are kept as single-node roots.
    pub fn build(
        &self,
        records: &[SourceRecord],
        pixels: Option<&dyn PixelSource>,
    ) -> Result<MagnificationForest, BuildError> {
        let valid = filter::validate(records);
        if valid.len() < 2 {
            return Err(BuildError::EmptyInput {
                valid: valid.len(),
                required: 2,
            });
        }

        let groups = grouping::partition(&valid, &self.params.group_tolerance);

        let mut edges = Vec::new();
        for group in &groups {
            let (accepted, marginal) = candidates::generate(&valid, group, &self.params);
            debug!(
                "HierarchyBuilder: group of {} -> {} metadata edge(s), {} marginal pair(s)",
                group.len(),
                accepted.len(),
                marginal.len()
            );
            edges.extend(accepted);
            edges.extend(candidates::rescue(&valid, marginal, pixels, &self.params));
        }

        let retained = conflict::resolve(edges, &valid);

        let records = valid
            .into_iter()
            .map(|v| (v.image, v.record))
            .collect::<Vec<_>>();
        let forest = MagnificationForest::assemble(records, retained);
        forest
            .validate(&self.params.group_tolerance)
            .map_err(BuildError::InvariantViolation)?;
        debug!(
            "HierarchyBuilder: built forest with {} node(s), {} edge(s), {} root(s)",
            forest.len(),
            forest.edges().len(),
            forest.roots().len()
        );
        Ok(forest)
    }
}
