//! Per-image acquisition records as delivered by the external TIFF-tag
//! extractor.
//!
//! The extractor runs outside this crate and cannot guarantee that every
//! tag was present in a given file, so its output is modeled as
//! [`RawMetadata`] with optional fields. [`RawMetadata::complete`] promotes
//! a raw record to an immutable [`MetadataRecord`] once all required fields
//! are present; records that fail promotion are excluded from hierarchy
//! building.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector used to acquire a micrograph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetectorMode {
    /// Secondary electron detector.
    Sed,
    /// Backscatter detector.
    Bsd,
    /// Topographic mode.
    Topo,
}

impl fmt::Display for DetectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectorMode::Sed => "SED",
            DetectorMode::Bsd => "BSD",
            DetectorMode::Topo => "TOPO",
        };
        f.write_str(name)
    }
}

/// Record as read from image tags; fields the extractor could not recover
/// are `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetadata {
    pub mode: Option<DetectorMode>,
    /// Accelerating voltage in kV.
    pub high_voltage_kv: Option<f64>,
    /// Beam intensity (spot size) setting.
    pub intensity: Option<f64>,
    pub magnification: Option<f64>,
    /// Field-of-view extent in µm.
    pub field_of_view_width: Option<f64>,
    pub field_of_view_height: Option<f64>,
    /// Stage center position in µm.
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    /// ISO-8601 acquisition time, when the tags carry one.
    pub acquired_at: Option<String>,
}

impl RawMetadata {
    /// Promote to a [`MetadataRecord`], reporting which required fields are
    /// missing otherwise. `acquired_at` is optional and carried through.
    pub fn complete(&self) -> Result<MetadataRecord, IncompleteMetadata> {
        let mut missing = Vec::new();
        if self.mode.is_none() {
            missing.push("mode");
        }
        if self.high_voltage_kv.is_none() {
            missing.push("highVoltageKv");
        }
        if self.intensity.is_none() {
            missing.push("intensity");
        }
        if self.magnification.is_none() {
            missing.push("magnification");
        }
        if self.field_of_view_width.is_none() {
            missing.push("fieldOfViewWidth");
        }
        if self.field_of_view_height.is_none() {
            missing.push("fieldOfViewHeight");
        }
        if self.position_x.is_none() {
            missing.push("positionX");
        }
        if self.position_y.is_none() {
            missing.push("positionY");
        }
        if !missing.is_empty() {
            return Err(IncompleteMetadata { missing });
        }
        Ok(MetadataRecord {
            mode: self.mode.unwrap(),
            high_voltage_kv: self.high_voltage_kv.unwrap(),
            intensity: self.intensity.unwrap(),
            magnification: self.magnification.unwrap(),
            field_of_view_width: self.field_of_view_width.unwrap(),
            field_of_view_height: self.field_of_view_height.unwrap(),
            position_x: self.position_x.unwrap(),
            position_y: self.position_y.unwrap(),
            acquired_at: self.acquired_at.clone(),
        })
    }
}

/// Required fields absent from a raw record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncompleteMetadata {
    pub missing: Vec<&'static str>,
}

impl fmt::Display for IncompleteMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metadata missing required fields: {}", self.missing.join(", "))
    }
}

impl std::error::Error for IncompleteMetadata {}

/// Immutable, fully-populated acquisition record for one micrograph.
///
/// Geometry is validated separately by
/// [`geometry::rectangle_of`](crate::geometry::rectangle_of); a complete
/// record may still carry non-positive dimensions if the tags were corrupt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub mode: DetectorMode,
    pub high_voltage_kv: f64,
    pub intensity: f64,
    pub magnification: f64,
    pub field_of_view_width: f64,
    pub field_of_view_height: f64,
    pub position_x: f64,
    pub position_y: f64,
    pub acquired_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawMetadata {
        RawMetadata {
            mode: Some(DetectorMode::Sed),
            high_voltage_kv: Some(15.0),
            intensity: Some(5.2),
            magnification: Some(500.0),
            field_of_view_width: Some(200.0),
            field_of_view_height: Some(150.0),
            position_x: Some(10.0),
            position_y: Some(-4.5),
            acquired_at: None,
        }
    }

    #[test]
    fn complete_record_promotes() {
        let record = raw().complete().expect("record is complete");
        assert_eq!(record.mode, DetectorMode::Sed);
        assert_eq!(record.magnification, 500.0);
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let mut r = raw();
        r.magnification = None;
        r.position_y = None;
        let err = r.complete().unwrap_err();
        assert_eq!(err.missing, vec!["magnification", "positionY"]);
    }
}
