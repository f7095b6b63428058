//! Pure rectangle geometry over declared stage coordinates.
//!
//! Every record maps to an axis-aligned [`StageRect`] spanning
//! center ± half field-of-view, in the stage's physical units (µm). The
//! y axis grows downward so stage rectangles, normalized rectangles and
//! pixel rectangles all share one orientation.
//!
//! The engine is stateless; acceptance thresholds over the scores computed
//! here live in [`BuilderParams`](crate::builder::BuilderParams).

use crate::metadata::MetadataRecord;
use crate::types::NormRect;
use nalgebra::{Point2, Vector2};
use std::fmt;

/// Axis-aligned rectangle in stage coordinates (µm, y-down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageRect {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl StageRect {
    /// Rectangle spanning `center ± size / 2`.
    pub fn centered(center: Point2<f64>, size: Vector2<f64>) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Intersection with `other`, or `None` when disjoint.
    pub fn intersection(&self, other: &StageRect) -> Option<StageRect> {
        let min = Point2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Point2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        (min.x < max.x && min.y < max.y).then_some(StageRect { min, max })
    }
}

/// A record whose declared geometry cannot form a rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidGeometry {
    pub field_of_view_width: f64,
    pub field_of_view_height: f64,
    pub magnification: f64,
}

impl fmt::Display for InvalidGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid geometry: field of view {}×{} µm at {}×",
            self.field_of_view_width, self.field_of_view_height, self.magnification
        )
    }
}

impl std::error::Error for InvalidGeometry {}

/// Stage rectangle covered by a record's field of view.
///
/// Fails when the field of view or magnification is non-positive, or any
/// geometric field is not finite.
pub fn rectangle_of(record: &MetadataRecord) -> Result<StageRect, InvalidGeometry> {
    let finite = record.field_of_view_width.is_finite()
        && record.field_of_view_height.is_finite()
        && record.position_x.is_finite()
        && record.position_y.is_finite()
        && record.magnification.is_finite();
    if !finite
        || record.field_of_view_width <= 0.0
        || record.field_of_view_height <= 0.0
        || record.magnification <= 0.0
    {
        return Err(InvalidGeometry {
            field_of_view_width: record.field_of_view_width,
            field_of_view_height: record.field_of_view_height,
            magnification: record.magnification,
        });
    }
    Ok(StageRect::centered(
        Point2::new(record.position_x, record.position_y),
        Vector2::new(record.field_of_view_width, record.field_of_view_height),
    ))
}

/// Fraction of the child rectangle's area covered by the parent, in [0, 1].
pub fn containment_score(parent: &StageRect, child: &StageRect) -> f64 {
    let child_area = child.area();
    if child_area <= 0.0 {
        return 0.0;
    }
    match parent.intersection(child) {
        Some(overlap) => (overlap.area() / child_area).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Declared magnification ratio `child / parent`; seeds the template
/// matcher's scale search.
pub fn scale_estimate(parent: &MetadataRecord, child: &MetadataRecord) -> f64 {
    child.magnification / parent.magnification
}

/// Child rectangle expressed in parent-normalized [0, 1] coordinates,
/// clamped to the parent extents.
pub fn bounding_box_in(parent: &StageRect, child: &StageRect) -> NormRect {
    let w = parent.width();
    let h = parent.height();
    NormRect {
        x0: ((child.min.x - parent.min.x) / w).clamp(0.0, 1.0),
        y0: ((child.min.y - parent.min.y) / h).clamp(0.0, 1.0),
        x1: ((child.max.x - parent.min.x) / w).clamp(0.0, 1.0),
        y1: ((child.max.y - parent.min.y) / h).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DetectorMode;

    fn record(mag: f64, fov_w: f64, fov_h: f64, x: f64, y: f64) -> MetadataRecord {
        MetadataRecord {
            mode: DetectorMode::Sed,
            high_voltage_kv: 15.0,
            intensity: 5.0,
            magnification: mag,
            field_of_view_width: fov_w,
            field_of_view_height: fov_h,
            position_x: x,
            position_y: y,
            acquired_at: None,
        }
    }

    #[test]
    fn fully_nested_child_scores_one() {
        let parent = rectangle_of(&record(100.0, 1000.0, 1000.0, 0.0, 0.0)).unwrap();
        let child = rectangle_of(&record(500.0, 200.0, 200.0, 100.0, -50.0)).unwrap();
        assert_eq!(containment_score(&parent, &child), 1.0);
    }

    #[test]
    fn partially_overlapping_child_scores_overlap_fraction() {
        let parent = rectangle_of(&record(100.0, 1000.0, 1000.0, 0.0, 0.0)).unwrap();
        // Child sticks 4 µm past the parent's right edge: 196/200 of its
        // width overlaps, full height inside.
        let child = rectangle_of(&record(500.0, 200.0, 200.0, 404.0, 0.0)).unwrap();
        let score = containment_score(&parent, &child);
        assert!((score - 0.98).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn disjoint_rectangles_score_zero() {
        let parent = rectangle_of(&record(100.0, 100.0, 100.0, 0.0, 0.0)).unwrap();
        let child = rectangle_of(&record(500.0, 20.0, 20.0, 500.0, 500.0)).unwrap();
        assert_eq!(containment_score(&parent, &child), 0.0);
    }

    #[test]
    fn non_positive_dimensions_are_rejected() {
        assert!(rectangle_of(&record(100.0, 0.0, 10.0, 0.0, 0.0)).is_err());
        assert!(rectangle_of(&record(100.0, 10.0, -1.0, 0.0, 0.0)).is_err());
        assert!(rectangle_of(&record(0.0, 10.0, 10.0, 0.0, 0.0)).is_err());
        assert!(rectangle_of(&record(100.0, f64::NAN, 10.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn bounding_box_is_clamped_to_parent() {
        let parent = rectangle_of(&record(100.0, 1000.0, 1000.0, 0.0, 0.0)).unwrap();
        let child = rectangle_of(&record(500.0, 200.0, 200.0, 404.0, 0.0)).unwrap();
        let bbox = bounding_box_in(&parent, &child);
        assert!((bbox.x0 - 0.804).abs() < 1e-9);
        assert_eq!(bbox.x1, 1.0);
        assert!((bbox.y0 - 0.4).abs() < 1e-9);
        assert!((bbox.y1 - 0.6).abs() < 1e-9);
    }

    #[test]
    fn scale_estimate_is_magnification_ratio() {
        let parent = record(100.0, 1000.0, 1000.0, 0.0, 0.0);
        let child = record(500.0, 200.0, 200.0, 0.0, 0.0);
        assert_eq!(scale_estimate(&parent, &child), 5.0);
    }
}
