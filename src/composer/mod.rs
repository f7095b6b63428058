//! Grid composition over a verified magnification tree.
//!
//! The composer turns one tree (or a caller-selected subset of its nodes)
//! into a [`CompositionPlan`]: a grid layout, per-cell image placements at
//! native resolution, and cross-reference annotation instructions.
//! Rendering pixels from the plan and encoding a file is the raster
//! sink's job; the plan itself is plain serializable data.
//!
//! Composition is a pure function of (forest, selection, config): swapping
//! one selected image for a sibling regenerates only the affected
//! annotation and leaves every other cell's instructions identical.

mod annotate;
mod layout;

pub use annotate::{
    AnnotationInstruction, AnnotationStyle, GridCell, Rgb, DASH_LENGTH_PX, DASH_PERIOD_PX,
    PALETTE, STROKE_PX,
};

use crate::forest::MagnificationForest;
use crate::image::{PixelError, PixelSource};
use crate::types::{ImageId, PixelRect};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendering configuration consumed by the composer.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Padding between cells, in pixels.
    pub spacing_px: u32,
    pub annotation_style: AnnotationStyle,
    /// Fixed cell size; raised to the largest selected image when smaller,
    /// derived from the selection when absent.
    pub cell_size: Option<(u32, u32)>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            spacing_px: 4,
            annotation_style: AnnotationStyle::Solid,
            cell_size: None,
        }
    }
}

impl RenderConfig {
    pub fn with_annotation_style(mut self, style: AnnotationStyle) -> Self {
        self.annotation_style = style;
        self
    }

    pub fn with_cell_size(mut self, cell_size: Option<(u32, u32)>) -> Self {
        self.cell_size = cell_size;
        self
    }
}

/// Grid dimensions and pixel metrics of a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDescriptor {
    pub rows: u32,
    pub cols: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub spacing_px: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// One image placed on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPlacement {
    pub image: ImageId,
    pub row: u32,
    pub col: u32,
    /// Where the image pixels land on the canvas (centered in its cell).
    pub image_rect: PixelRect,
}

/// Resolved grid layout plus annotation draw instructions, ready for
/// rasterization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPlan {
    pub layout: LayoutDescriptor,
    pub cells: Vec<CellPlacement>,
    pub annotations: Vec<AnnotationInstruction>,
}

/// Composition failures; all are caller errors, no partial plan is
/// produced.
#[derive(Clone, Debug)]
pub enum ComposeError {
    TooFewImages { count: usize, required: usize },
    /// No workflow layout exists beyond `max` images.
    TooManyImages { count: usize, max: usize },
    /// The selection spans more than one tree.
    MixedSelection { a: ImageId, b: ImageId },
    DuplicateImage { image: ImageId },
    UnknownNode { index: usize },
    /// A selected image's pixel buffer could not be produced.
    ImageUnreadable(PixelError),
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::TooFewImages { count, required } => {
                write!(f, "selection of {count} image(s), at least {required} required")
            }
            ComposeError::TooManyImages { count, max } => {
                write!(f, "no layout for {count} images (maximum {max})")
            }
            ComposeError::MixedSelection { a, b } => {
                write!(f, "selection spans separate trees ({a} and {b})")
            }
            ComposeError::DuplicateImage { image } => {
                write!(f, "image {image} selected twice")
            }
            ComposeError::UnknownNode { index } => {
                write!(f, "selection references unknown node {index}")
            }
            ComposeError::ImageUnreadable(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ComposeError {}

/// Per-cell geometry shared with annotation generation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CellLayout {
    pub node: usize,
    pub cell: GridCell,
    /// Image offset inside the cell (centering).
    pub image_offset: (u32, u32),
    /// Image dimensions in pixels.
    pub dims: (u32, u32),
}

/// Plans composite figures from verified trees.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridComposer {
    config: RenderConfig,
}

impl GridComposer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Compose the whole tree rooted at `root`.
    pub fn compose_tree(
        &self,
        forest: &MagnificationForest,
        root: usize,
        pixels: &dyn PixelSource,
    ) -> Result<CompositionPlan, ComposeError> {
        self.compose(forest, &forest.tree_of(root), pixels)
    }

    /// Compose an explicit selection of nodes from one tree.
    ///
    /// Cells are ordered left-to-right, top-to-bottom by ascending
    /// magnification; ties fall back to acquisition time, then arena
    /// order.
    pub fn compose(
        &self,
        forest: &MagnificationForest,
        selection: &[usize],
        pixels: &dyn PixelSource,
    ) -> Result<CompositionPlan, ComposeError> {
        for &index in selection {
            if index >= forest.len() {
                return Err(ComposeError::UnknownNode { index });
            }
        }
        for (i, &a) in selection.iter().enumerate() {
            if selection[..i].contains(&a) {
                return Err(ComposeError::DuplicateImage {
                    image: forest.node(a).image.clone(),
                });
            }
        }
        let (rows, cols) = layout::grid_shape(selection.len())?;
        if let Some((&first, rest)) = selection.split_first() {
            let root = forest.root_of(first);
            for &other in rest {
                if forest.root_of(other) != root {
                    return Err(ComposeError::MixedSelection {
                        a: forest.node(first).image.clone(),
                        b: forest.node(other).image.clone(),
                    });
                }
            }
        }

        let mut entries = Vec::with_capacity(selection.len());
        for &index in selection {
            let node = forest.node(index);
            let buffer = pixels
                .fetch(&node.image)
                .map_err(ComposeError::ImageUnreadable)?;
            entries.push((index, (buffer.width() as u32, buffer.height() as u32)));
        }
        entries.sort_by(|&(a, _), &(b, _)| {
            let na = forest.node(a);
            let nb = forest.node(b);
            na.record
                .magnification
                .partial_cmp(&nb.record.magnification)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| match (&na.record.acquired_at, &nb.record.acquired_at) {
                    (Some(ta), Some(tb)) => ta.cmp(tb),
                    _ => std::cmp::Ordering::Equal,
                })
                .then(a.cmp(&b))
        });

        let derived_w = entries.iter().map(|&(_, (w, _))| w).max().unwrap_or(0);
        let derived_h = entries.iter().map(|&(_, (_, h))| h).max().unwrap_or(0);
        let (cell_width, cell_height) = match self.config.cell_size {
            Some((w, h)) => (w.max(derived_w), h.max(derived_h)),
            None => (derived_w, derived_h),
        };
        let spacing = self.config.spacing_px;

        let mut cells = Vec::with_capacity(entries.len());
        let mut placements = Vec::with_capacity(entries.len());
        for (i, &(node, (w, h))) in entries.iter().enumerate() {
            let row = i as u32 / cols;
            let col = i as u32 % cols;
            let origin_x = col * (cell_width + spacing);
            let origin_y = row * (cell_height + spacing);
            let offset = ((cell_width - w) / 2, (cell_height - h) / 2);
            cells.push(CellLayout {
                node,
                cell: GridCell { row, col },
                image_offset: offset,
                dims: (w, h),
            });
            placements.push(CellPlacement {
                image: forest.node(node).image.clone(),
                row,
                col,
                image_rect: PixelRect {
                    x: origin_x + offset.0,
                    y: origin_y + offset.1,
                    w,
                    h,
                },
            });
        }

        let annotations = annotate::generate(forest, &cells, self.config.annotation_style);
        debug!(
            "GridComposer: {} cell(s) on a {rows}×{cols} grid, {} annotation(s)",
            placements.len(),
            annotations.len()
        );

        Ok(CompositionPlan {
            layout: LayoutDescriptor {
                rows,
                cols,
                cell_width,
                cell_height,
                spacing_px: spacing,
                canvas_width: cols * cell_width + (cols - 1) * spacing,
                canvas_height: rows * cell_height + (rows - 1) * spacing,
            },
            cells: placements,
            annotations,
        })
    }
}
