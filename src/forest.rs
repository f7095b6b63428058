//! Forest of containment trees over validated records.
//!
//! Nodes live in an arena and reference each other by index, so the whole
//! structure is plain data: safe to share read-only across match workers
//! and cheap to serialize when a caller persists a built collection.
//!
//! Invariants:
//! - a parent's magnification is strictly below every child's;
//! - a child shares mode, high voltage and intensity with its parent
//!   (within the builder's grouping tolerance);
//! - every node has at most one parent; roots have none.

use crate::builder::GroupTolerance;
use crate::metadata::MetadataRecord;
use crate::types::{ImageId, PixelRect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a containment edge was established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Evidence {
    /// Declared stage geometry alone.
    Metadata,
    /// Visual correlation alone (collections assembled from a visual-only
    /// matching pass; the automatic builder does not emit this).
    TemplateMatch,
    /// Declared geometry corroborated by visual correlation.
    Both,
}

/// Directed containment relation from a lower- to a higher-magnification
/// node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentEdge {
    /// Arena index of the lower-magnification node.
    pub parent: usize,
    /// Arena index of the higher-magnification node.
    pub child: usize,
    /// Geometric containment score (intersection over child area).
    pub score: f64,
    pub evidence: Evidence,
    /// Correlation score, present when template matching ran.
    pub confidence: Option<f32>,
    /// Matched rectangle in parent-image pixels, present when template
    /// matching ran; overrides the metadata-predicted rectangle for
    /// annotation purposes.
    pub matched_rect: Option<PixelRect>,
}

impl ContainmentEdge {
    /// Ranking score for conflict resolution: geometric score alone for
    /// metadata edges, mean of geometric score and correlation confidence
    /// when visual evidence is present.
    pub fn combined_score(&self) -> f64 {
        match self.confidence {
            Some(c) => (self.score + f64::from(c)) / 2.0,
            None => self.score,
        }
    }
}

/// One record inside the arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestNode {
    pub image: ImageId,
    pub record: MetadataRecord,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Index into the edge list, for nodes with a parent.
    pub edge_to_parent: Option<usize>,
}

/// A broken hierarchy invariant, identifying the offending pair.
#[derive(Clone, Debug, PartialEq)]
pub struct ForestViolation {
    pub parent: ImageId,
    pub child: ImageId,
    pub kind: ViolationKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViolationKind {
    /// Parent magnification is not strictly below the child's.
    MagnificationOrder { parent: f64, child: f64 },
    /// Mode, high voltage or intensity differ between parent and child.
    AcquisitionMismatch,
    /// The child already has a parent.
    SecondParent,
}

impl fmt::Display for ForestViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::MagnificationOrder { parent, child } => write!(
                f,
                "edge {} -> {}: parent magnification {parent}× not below child {child}×",
                self.parent, self.child
            ),
            ViolationKind::AcquisitionMismatch => write!(
                f,
                "edge {} -> {}: acquisition settings differ between parent and child",
                self.parent, self.child
            ),
            ViolationKind::SecondParent => write!(
                f,
                "edge {} -> {}: child already has a parent",
                self.parent, self.child
            ),
        }
    }
}

impl std::error::Error for ForestViolation {}

/// Disjoint containment trees over an arena of validated records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnificationForest {
    nodes: Vec<ForestNode>,
    edges: Vec<ContainmentEdge>,
    roots: Vec<usize>,
}

impl MagnificationForest {
    /// Forest of isolated roots, one per record; edges are added with
    /// [`link`](Self::link).
    pub fn from_records(records: impl IntoIterator<Item = (ImageId, MetadataRecord)>) -> Self {
        let nodes: Vec<ForestNode> = records
            .into_iter()
            .map(|(image, record)| ForestNode {
                image,
                record,
                parent: None,
                children: Vec::new(),
                edge_to_parent: None,
            })
            .collect();
        let roots = (0..nodes.len()).collect();
        Self {
            nodes,
            edges: Vec::new(),
            roots,
        }
    }

    /// Attach `edge.child` under `edge.parent`, enforcing the forest
    /// invariants for this single edge (exact acquisition equality).
    pub fn link(&mut self, edge: ContainmentEdge) -> Result<(), ForestViolation> {
        check_edge(
            &self.nodes[edge.parent],
            &self.nodes[edge.child],
            &GroupTolerance::exact(),
        )?;
        if self.nodes[edge.child].parent.is_some() {
            return Err(ForestViolation {
                parent: self.nodes[edge.parent].image.clone(),
                child: self.nodes[edge.child].image.clone(),
                kind: ViolationKind::SecondParent,
            });
        }
        let edge_index = self.edges.len();
        self.nodes[edge.child].parent = Some(edge.parent);
        self.nodes[edge.child].edge_to_parent = Some(edge_index);
        let child = edge.child;
        self.nodes[edge.parent].children.push(child);
        self.edges.push(edge);
        self.roots.retain(|&r| r != child);
        Ok(())
    }

    /// Assemble from conflict-resolved parts; children are ordered by
    /// ascending magnification for deterministic traversal.
    pub(crate) fn assemble(
        records: Vec<(ImageId, MetadataRecord)>,
        edges: Vec<ContainmentEdge>,
    ) -> Self {
        let mut forest = Self::from_records(records);
        for (i, edge) in edges.iter().enumerate() {
            forest.nodes[edge.child].parent = Some(edge.parent);
            forest.nodes[edge.child].edge_to_parent = Some(i);
            let child = edge.child;
            forest.nodes[edge.parent].children.push(child);
        }
        let mags: Vec<f64> = forest
            .nodes
            .iter()
            .map(|n| n.record.magnification)
            .collect();
        for node in &mut forest.nodes {
            node.children.sort_by(|&a, &b| {
                mags[a]
                    .partial_cmp(&mags[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
        }
        forest.edges = edges;
        forest.roots = forest
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.parent.is_none().then_some(i))
            .collect();
        forest
    }

    /// Re-check all edges against the forest invariants.
    pub fn validate(&self, tolerance: &GroupTolerance) -> Result<(), ForestViolation> {
        for edge in &self.edges {
            check_edge(&self.nodes[edge.parent], &self.nodes[edge.child], tolerance)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &ForestNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[ForestNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ContainmentEdge] {
        &self.edges
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Arena index of the node holding `image`.
    pub fn find(&self, image: &ImageId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.image == image)
    }

    /// Edge connecting `child` to its parent, if any.
    pub fn edge_for_child(&self, child: usize) -> Option<&ContainmentEdge> {
        self.nodes[child].edge_to_parent.map(|i| &self.edges[i])
    }

    /// Root of the tree containing `index`.
    pub fn root_of(&self, index: usize) -> usize {
        let mut current = index;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
        }
        current
    }

    /// Nodes of the tree rooted at `root`, in preorder.
    pub fn tree_of(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            out.push(index);
            // reversed so the smallest-magnification child is visited first
            stack.extend(self.nodes[index].children.iter().rev());
        }
        out
    }
}

fn check_edge(
    parent: &ForestNode,
    child: &ForestNode,
    tolerance: &GroupTolerance,
) -> Result<(), ForestViolation> {
    if parent.record.magnification >= child.record.magnification {
        return Err(ForestViolation {
            parent: parent.image.clone(),
            child: child.image.clone(),
            kind: ViolationKind::MagnificationOrder {
                parent: parent.record.magnification,
                child: child.record.magnification,
            },
        });
    }
    if !tolerance.matches(&parent.record, &child.record) {
        return Err(ForestViolation {
            parent: parent.image.clone(),
            child: child.image.clone(),
            kind: ViolationKind::AcquisitionMismatch,
        });
    }
    Ok(())
}
