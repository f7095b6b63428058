//! Partition of valid records by acquisition settings.

use crate::builder::filter::ValidRecord;
use crate::builder::GroupTolerance;
use log::debug;

/// Partition `valid` into groups of records sharing detector mode, high
/// voltage and intensity within `tolerance`.
///
/// Bucketing compares each record against the first member of every
/// existing group, in input order; with the default zero tolerance this is
/// a plain exact partition.
pub(crate) fn partition(valid: &[ValidRecord], tolerance: &GroupTolerance) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, candidate) in valid.iter().enumerate() {
        let slot = groups.iter_mut().find(|group| {
            let representative = &valid[group[0]];
            tolerance.matches(&representative.record, &candidate.record)
        });
        match slot {
            Some(group) => group.push(index),
            None => groups.push(vec![index]),
        }
    }
    debug!(
        "HierarchyBuilder: {} valid records in {} acquisition group(s)",
        valid.len(),
        groups.len()
    );
    groups
}
