//! Set algebra over sector identifiers.
//!
//! The coordinator's diff step is written entirely in terms of these three
//! operations. Sets are ordered so that iteration (and therefore the order in
//! which loads are started) is deterministic.

use std::collections::BTreeSet;

use super::SectorId;

/// Ordered set of sector identifiers.
pub type SectorIdSet = BTreeSet<SectorId>;

/// Elements in either set.
pub fn union<T: Ord + Copy>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.union(b).copied().collect()
}

/// Elements in both sets.
pub fn intersection<T: Ord + Copy>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.intersection(b).copied().collect()
}

/// Elements in `a` that are not in `b`.
pub fn difference<T: Ord + Copy>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.difference(b).copied().collect()
}
