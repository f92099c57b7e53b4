//! Loading progress reported to observers.

use std::fmt;

/// Progress of the current batch of sector loads.
///
/// A batch starts with every coordinator update: `items_requested` is the
/// number of loads in flight right after the update and `items_loaded` counts
/// how many of those have since settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub items_loaded: usize,
    pub items_requested: usize,
}

impl LoadingState {
    /// Derive the state from the batch size and the loads still in flight.
    pub fn from_batch(requested: usize, pending: usize) -> Self {
        Self {
            is_loading: pending > 0,
            items_loaded: requested.saturating_sub(pending),
            items_requested: requested,
        }
    }

    /// Combine the states of several coordinators.
    pub fn merge(self, other: LoadingState) -> Self {
        Self {
            is_loading: self.is_loading || other.is_loading,
            items_loaded: self.items_loaded + other.items_loaded,
            items_requested: self.items_requested + other.items_requested,
        }
    }

    /// Fraction of the batch that has settled, 1.0 for an empty batch.
    pub fn progress(&self) -> f64 {
        if self.items_requested == 0 {
            1.0
        } else {
            self.items_loaded as f64 / self.items_requested as f64
        }
    }
}

impl fmt::Display for LoadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} sectors{}",
            self.items_loaded,
            self.items_requested,
            if self.is_loading { " (loading)" } else { "" }
        )
    }
}
