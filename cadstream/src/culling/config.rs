//! Classifier configuration.

/// Default number of sectors that are always loaded at full detail.
pub const DEFAULT_DETAILED_SECTOR_BUDGET: usize = 30;

/// Configuration for [`QualityClassifier`](super::QualityClassifier).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// How many of the nearest visible sectors are loaded in detail.
    pub detailed_budget: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            detailed_budget: DEFAULT_DETAILED_SECTOR_BUDGET,
        }
    }
}

impl ClassifierConfig {
    /// Set the detailed sector budget.
    pub fn with_detailed_budget(mut self, budget: usize) -> Self {
        self.detailed_budget = budget;
        self
    }
}
