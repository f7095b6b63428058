#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod builder;
pub mod composer;
pub mod forest;
pub mod geometry;
pub mod metadata;
pub mod types;

// Building blocks: public for tools and advanced users.
pub mod image;
pub mod matcher;

// --- High-level re-exports -------------------------------------------------

// Main entry points: builder + composer and their results.
pub use crate::builder::{BuildError, BuilderParams, HierarchyBuilder, SourceRecord};
pub use crate::composer::{ComposeError, CompositionPlan, GridComposer, RenderConfig};
pub use crate::forest::{ContainmentEdge, Evidence, MagnificationForest};

// The matcher is also useful standalone for ad-hoc verification tools.
pub use crate::matcher::{MatchError, MatchParams, TemplateMatch, TemplateMatcher};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use maggrid::prelude::*;
///
/// # fn main() {
/// let builder = HierarchyBuilder::new(BuilderParams::default());
/// let records: Vec<SourceRecord> = Vec::new();
/// match builder.build(&records, None) {
///     Ok(forest) => println!("{} tree(s)", forest.roots().len()),
///     Err(err) => println!("build failed: {err}"),
/// }
/// # }
/// ```
pub mod prelude {
    pub use crate::builder::{BuilderParams, HierarchyBuilder, SourceRecord};
    pub use crate::composer::{GridComposer, RenderConfig};
    pub use crate::forest::MagnificationForest;
    pub use crate::metadata::{DetectorMode, MetadataRecord, RawMetadata};
    pub use crate::types::ImageId;
}
