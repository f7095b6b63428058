//! Parameter types configuring the hierarchy builder stages.
//!
//! Defaults follow the session-manager conventions: containment accepted
//! at 95% overlap, visual rescue attempted down to 60%, and parents
//! required to be at least 1.5× below their children in magnification.

use crate::matcher::MatchParams;
use crate::metadata::MetadataRecord;
use serde::{Deserialize, Serialize};

/// Builder-wide parameters controlling the multi-stage pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderParams {
    /// Containment score at or above which a pair is accepted from
    /// metadata alone.
    pub containment_threshold: f64,
    /// Lower edge of the marginal band; below it a pair is rejected
    /// without invoking the matcher.
    pub marginal_lower_bound: f64,
    /// Minimum child/parent magnification ratio for a pair to be
    /// considered at all. Set to 1.0 to disable.
    pub min_magnification_ratio: f64,
    /// Template-matching configuration for the rescue path.
    pub match_params: MatchParams,
    /// Numeric drift tolerated when grouping by acquisition settings.
    pub group_tolerance: GroupTolerance,
    /// Parallel execution of the rescue stage.
    pub parallel: ParallelMatchOptions,
}

impl Default for BuilderParams {
    fn default() -> Self {
        Self {
            containment_threshold: 0.95,
            marginal_lower_bound: 0.6,
            min_magnification_ratio: 1.5,
            match_params: MatchParams::default(),
            group_tolerance: GroupTolerance::exact(),
            parallel: ParallelMatchOptions::default(),
        }
    }
}

/// Tolerated per-field drift when deciding whether two records belong to
/// the same acquisition group. Zero means exact equality; these are
/// operator-set values, so exact is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTolerance {
    pub high_voltage_kv: f64,
    pub intensity: f64,
}

impl GroupTolerance {
    pub fn exact() -> Self {
        Self::default()
    }

    /// True when `a` and `b` share detector mode and their voltage and
    /// intensity differ by no more than the configured tolerance.
    pub fn matches(&self, a: &MetadataRecord, b: &MetadataRecord) -> bool {
        a.mode == b.mode
            && (a.high_voltage_kv - b.high_voltage_kv).abs() <= self.high_voltage_kv
            && (a.intensity - b.intensity).abs() <= self.intensity
    }
}

/// Controls whether marginal-pair rescue runs sequentially or on a Rayon
/// pool.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelMatchOptions {
    pub enabled: bool,
    /// Pairs below this count are matched sequentially; pool setup is not
    /// worth it for a couple of correlations.
    pub min_pairs_for_parallel: usize,
    /// Cap on worker threads for one build. `None` uses the global pool.
    pub max_threads: Option<usize>,
}

impl ParallelMatchOptions {
    /// Disable parallel rescue regardless of pair count.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_pairs_for_parallel: usize::MAX,
            max_threads: None,
        }
    }

    /// Returns true when the rescue stage should use the thread pool.
    pub fn should_parallelize(&self, pair_count: usize) -> bool {
        self.enabled && pair_count >= self.min_pairs_for_parallel
    }

    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }
}

impl Default for ParallelMatchOptions {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "parallel"),
            min_pairs_for_parallel: 4,
            max_threads: None,
        }
    }
}
