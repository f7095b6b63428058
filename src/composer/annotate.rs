//! Cross-reference annotations between parent and child cells.
//!
//! For every retained containment edge whose endpoints are both in the
//! selection, one instruction pairs a bounding box on the parent cell
//! (matched rectangle when template matching ran, predicted from stage
//! geometry otherwise) with a border around the child's entire cell. All
//! boxes referring to the same parent share one palette color.

use crate::composer::CellLayout;
use crate::forest::MagnificationForest;
use crate::geometry;
use crate::types::PixelRect;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Annotation colors, cycled per distinct parent cell.
pub const PALETTE: [Rgb; 5] = [
    Rgb(255, 0, 0),
    Rgb(0, 255, 0),
    Rgb(0, 255, 255),
    Rgb(255, 0, 255),
    Rgb(255, 255, 0),
];

/// Stroke width for annotation rectangles, in pixels.
pub const STROKE_PX: u32 = 2;

/// Dash period and dash length for the dotted style, in pixels.
pub const DASH_PERIOD_PX: u32 = 6;
pub const DASH_LENGTH_PX: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStyle {
    None,
    #[default]
    Solid,
    Dotted,
}

impl AnnotationStyle {
    /// `(period, dash length)` for dashed strokes, `None` for solid.
    pub fn dash_pattern(&self) -> Option<(u32, u32)> {
        match self {
            AnnotationStyle::Dotted => Some((DASH_PERIOD_PX, DASH_LENGTH_PX)),
            _ => None,
        }
    }
}

/// Grid coordinates of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
}

/// One parent/child rectangle pair for the raster sink.
///
/// Both rectangles are relative to their own cell's origin; the sink
/// offsets them by the cell position derived from the layout descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationInstruction {
    pub parent_cell: GridCell,
    pub child_cell: GridCell,
    /// Child footprint inside the parent cell.
    pub region_in_parent: PixelRect,
    /// Border around the child's entire image in its cell.
    pub child_border: PixelRect,
    pub color: Rgb,
    pub style: AnnotationStyle,
}

/// Emit instructions for all edges internal to the selection, in child-cell
/// order. Colors are assigned per distinct parent, in order of first
/// appearance, cycling [`PALETTE`].
pub(crate) fn generate(
    forest: &MagnificationForest,
    cells: &[CellLayout],
    style: AnnotationStyle,
) -> Vec<AnnotationInstruction> {
    if style == AnnotationStyle::None {
        return Vec::new();
    }
    let cell_of: HashMap<usize, usize> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| (c.node, i))
        .collect();

    let mut parent_colors: HashMap<usize, Rgb> = HashMap::new();
    let mut out = Vec::new();
    for child_cell in cells {
        let node = forest.node(child_cell.node);
        let Some(parent_node) = node.parent else {
            continue;
        };
        let Some(&parent_index) = cell_of.get(&parent_node) else {
            continue; // parent not part of this selection
        };
        let Some(edge) = forest.edge_for_child(child_cell.node) else {
            continue;
        };
        let parent_cell = &cells[parent_index];

        let region = match edge.matched_rect {
            Some(rect) => rect.offset(parent_cell.image_offset.0, parent_cell.image_offset.1),
            None => match predicted_region(forest, parent_node, child_cell.node, parent_cell) {
                Some(rect) => rect,
                None => {
                    debug!(
                        "GridComposer: no geometry for edge {} -> {}, annotation skipped",
                        forest.node(parent_node).image, node.image
                    );
                    continue;
                }
            },
        };

        let next_color = PALETTE[parent_colors.len() % PALETTE.len()];
        let color = *parent_colors.entry(parent_index).or_insert(next_color);
        out.push(AnnotationInstruction {
            parent_cell: parent_cell.cell,
            child_cell: child_cell.cell,
            region_in_parent: region,
            child_border: PixelRect {
                x: child_cell.image_offset.0,
                y: child_cell.image_offset.1,
                w: child_cell.dims.0,
                h: child_cell.dims.1,
            },
            color,
            style,
        });
    }
    out
}

/// Metadata-predicted child footprint, converted to parent-cell pixels.
fn predicted_region(
    forest: &MagnificationForest,
    parent: usize,
    child: usize,
    parent_cell: &CellLayout,
) -> Option<PixelRect> {
    let parent_rect = geometry::rectangle_of(&forest.node(parent).record).ok()?;
    let child_rect = geometry::rectangle_of(&forest.node(child).record).ok()?;
    let bbox = geometry::bounding_box_in(&parent_rect, &child_rect);
    Some(
        bbox.to_pixels(parent_cell.dims.0, parent_cell.dims.1)
            .offset(parent_cell.image_offset.0, parent_cell.image_offset.1),
    )
}
