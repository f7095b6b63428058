//! Record validation ahead of grouping.

use crate::builder::SourceRecord;
use crate::geometry::{self, StageRect};
use crate::metadata::MetadataRecord;
use crate::types::ImageId;
use log::debug;

/// A record that survived validation; its position in the valid list is
/// its arena index in the eventual forest.
#[derive(Clone, Debug)]
pub(crate) struct ValidRecord {
    pub image: ImageId,
    pub record: MetadataRecord,
    pub rect: StageRect,
}

/// Drop records with missing required fields or degenerate geometry,
/// preserving input order.
pub(crate) fn validate(records: &[SourceRecord]) -> Vec<ValidRecord> {
    let mut valid = Vec::with_capacity(records.len());
    for source in records {
        let record = match source.metadata.complete() {
            Ok(record) => record,
            Err(err) => {
                debug!("HierarchyBuilder: {} excluded ({err})", source.image);
                continue;
            }
        };
        match geometry::rectangle_of(&record) {
            Ok(rect) => valid.push(ValidRecord {
                image: source.image.clone(),
                record,
                rect,
            }),
            Err(err) => {
                debug!("HierarchyBuilder: {} excluded ({err})", source.image);
            }
        }
    }
    valid
}
