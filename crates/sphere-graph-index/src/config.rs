//! Tree configuration.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

/// Tie-breaking rule applied when two split assignments have equal cost.
///
/// The observed behavior of the access method does not pin this rule down,
/// so it is a configuration choice rather than a constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitTieBreak {
    /// Assign to the group that was seeded first. Stable and deterministic
    /// with respect to input order.
    #[default]
    PreferFirst,
    /// Assign to the group whose region currently has the smaller volume.
    SmallerVolume,
}

/// Configuration for [`SpatialTree`](crate::SpatialTree).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum number of entries per node before a split (fanout).
    pub max_entries: usize,
    /// Minimum number of entries per node after a split.
    pub min_entries: usize,
    /// Tie-break rule for equal-cost split assignments.
    pub split_tie_break: SplitTieBreak,
}

impl Default for TreeConfig {
    /// Fanout 16 with a 40% minimum fill, the classic quadratic-split
    /// operating point.
    fn default() -> Self {
        Self {
            max_entries: 16,
            min_entries: 6,
            split_tie_break: SplitTieBreak::default(),
        }
    }
}

impl TreeConfig {
    /// Validate occupancy invariants.
    ///
    /// # Errors
    ///
    /// `IndexError::InvalidConfig` unless `2 <= min_entries <= max_entries / 2`.
    pub fn validate(&self) -> IndexResult<()> {
        if self.min_entries < 2 {
            return Err(IndexError::InvalidConfig(
                "min_entries must be at least 2".into(),
            ));
        }
        if self.min_entries > self.max_entries / 2 {
            return Err(IndexError::InvalidConfig(format!(
                "min_entries {} must not exceed max_entries {} / 2",
                self.min_entries, self.max_entries
            )));
        }
        Ok(())
    }
}
