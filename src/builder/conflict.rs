//! Resolution of children claimed by more than one parent.

use crate::builder::filter::ValidRecord;
use crate::forest::ContainmentEdge;
use log::debug;
use std::collections::BTreeMap;

/// Keep the single best edge per child.
///
/// Ranking: highest combined score, then smallest parent area (the
/// tightest enclosing context), then lowest parent index for a total
/// order. Children are visited in ascending arena order so the retained
/// edge list is deterministic.
pub(crate) fn resolve(
    edges: Vec<ContainmentEdge>,
    valid: &[ValidRecord],
) -> Vec<ContainmentEdge> {
    let mut by_child: BTreeMap<usize, Vec<ContainmentEdge>> = BTreeMap::new();
    for edge in edges {
        by_child.entry(edge.child).or_default().push(edge);
    }

    let mut retained = Vec::with_capacity(by_child.len());
    for (child, candidates) in by_child {
        let total = candidates.len();
        let best = candidates
            .into_iter()
            .reduce(|best, other| if prefer(&other, &best, valid) { other } else { best })
            .expect("group is non-empty");
        if total > 1 {
            debug!(
                "HierarchyBuilder: child {} had {} parent candidates, kept {} (score {:.4})",
                valid[child].image,
                total,
                valid[best.parent].image,
                best.combined_score()
            );
        }
        retained.push(best);
    }
    retained
}

/// True when `a` should win over `b`.
fn prefer(a: &ContainmentEdge, b: &ContainmentEdge, valid: &[ValidRecord]) -> bool {
    let score_a = a.combined_score();
    let score_b = b.combined_score();
    if score_a != score_b {
        return score_a > score_b;
    }
    let area_a = valid[a.parent].rect.area();
    let area_b = valid[b.parent].rect.area();
    if area_a != area_b {
        return area_a < area_b;
    }
    a.parent < b.parent
}
