//! Quality levels and the classifier's output.

use std::fmt;

use crate::sector::{intersection, SectorIdSet};

/// Level of detail a sector is loaded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    /// Full triangle geometry.
    Detailed,
    /// Instanced low-cost quads.
    Simple,
}

impl Quality {
    /// Lowercase label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Detailed => "detailed",
            Quality::Simple => "simple",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sectors the current camera wants, split by quality.
///
/// The two sets are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WantedSectors {
    pub detailed: SectorIdSet,
    pub simple: SectorIdSet,
}

impl WantedSectors {
    /// Nothing wanted.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The set for one quality level.
    pub fn get(&self, quality: Quality) -> &SectorIdSet {
        match quality {
            Quality::Detailed => &self.detailed,
            Quality::Simple => &self.simple,
        }
    }

    /// Total number of wanted sectors.
    pub fn len(&self) -> usize {
        self.detailed.len() + self.simple.len()
    }

    /// Returns true if no sector is wanted.
    pub fn is_empty(&self) -> bool {
        self.detailed.is_empty() && self.simple.is_empty()
    }

    /// Returns true if no id is wanted at both qualities.
    pub fn is_disjoint(&self) -> bool {
        intersection(&self.detailed, &self.simple).is_empty()
    }
}
