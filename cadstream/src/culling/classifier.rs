//! Camera-driven quality classification of sectors.
//!
//! # Algorithm
//!
//! ```text
//!   camera ──► model-space frustum + camera position
//!                      │
//!   pass 1   DFS, prune subtrees outside the frustum, record visited sectors
//!                      │
//!            stable sort by distance camera → sector bounds
//!                      │
//!            nearest `detailed_budget` sectors are candidates
//!                      │
//!   pass 2   DFS with the same pruning and a pending list:
//!              candidate        → flush all pending ids into `detailed`
//!              leaf, no flush   → first pending id into `simple`, clear
//! ```
//!
//! The second pass promotes every pending ancestor of a detailed sector to
//! detailed. Branches without any candidate contribute a single sector (the
//! first one still pending) at simple quality.

use std::collections::HashSet;

use glam::Mat4;
use tracing::trace;

use crate::geometry::{CameraState, Frustum};
use crate::sector::{Sector, SectorId, SectorTree};

use super::{ClassifierConfig, WantedSectors};

/// Decides which sectors to load at which quality.
#[derive(Clone, Debug, Default)]
pub struct QualityClassifier {
    config: ClassifierConfig,
}

impl QualityClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify the sectors of `tree` for the given camera.
    ///
    /// `model_matrix` maps model space to world space. Returns two empty sets
    /// when the tree is empty or the root lies outside the frustum.
    pub fn determine_sectors(
        &self,
        tree: &SectorTree,
        camera: &CameraState,
        model_matrix: &Mat4,
    ) -> WantedSectors {
        let Some(root) = tree.root() else {
            return WantedSectors::empty();
        };

        let frustum = camera.model_frustum(model_matrix);
        let camera_position = camera.model_position(model_matrix);

        let mut visible = Vec::new();
        collect_visible(root, &frustum, &mut visible);
        if visible.is_empty() {
            return WantedSectors::empty();
        }

        let mut ranked: Vec<(SectorId, f32)> = visible
            .iter()
            .map(|sector| (sector.id, sector.bounds.distance_to_point(camera_position)))
            .collect();
        // Stable sort keeps pre-order among equal distances
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let candidates: HashSet<SectorId> = ranked
            .iter()
            .take(self.config.detailed_budget)
            .map(|(id, _)| *id)
            .collect();

        let mut wanted = WantedSectors::empty();
        let mut pending = Vec::new();
        classify(root, &frustum, &candidates, &mut pending, &mut wanted);

        trace!(
            visible = visible.len(),
            detailed = wanted.detailed.len(),
            simple = wanted.simple.len(),
            "Classified sectors"
        );
        wanted
    }
}

fn collect_visible<'a>(sector: &'a Sector, frustum: &Frustum, out: &mut Vec<&'a Sector>) {
    if !frustum.intersects_aabb(&sector.bounds) {
        return;
    }
    out.push(sector);
    for child in &sector.children {
        collect_visible(child, frustum, out);
    }
}

fn classify(
    sector: &Sector,
    frustum: &Frustum,
    candidates: &HashSet<SectorId>,
    pending: &mut Vec<SectorId>,
    wanted: &mut WantedSectors,
) {
    if !frustum.intersects_aabb(&sector.bounds) {
        return;
    }

    pending.push(sector.id);
    if candidates.contains(&sector.id) {
        wanted.detailed.extend(pending.drain(..));
    } else if sector.is_leaf() {
        if let Some(first) = pending.first() {
            wanted.simple.insert(*first);
        }
        pending.clear();
    }

    for child in &sector.children {
        classify(child, frustum, candidates, pending, wanted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Aabb;
    use crate::sector::SectorIdSet;
    use glam::Vec3;
    use proptest::prelude::*;

    fn ids(values: &[u32]) -> SectorIdSet {
        values.iter().copied().map(SectorId).collect()
    }

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::new(center - Vec3::splat(half), center + Vec3::splat(half))
    }

    /// Camera at +Z looking at the origin.
    fn camera_facing_origin() -> CameraState {
        CameraState::look_at(
            Vec3::new(0.0, 0.0, 50.0),
            Vec3::ZERO,
            60f32.to_radians(),
            1.0,
            0.1,
            1000.0,
        )
    }

    fn two_children_tree() -> SectorTree {
        SectorTree::new(Sector::leaf(0, "0/", cube(Vec3::ZERO, 10.0)).with_children(vec![
            Sector::leaf(1, "0/0/", cube(Vec3::new(-5.0, 0.0, 0.0), 5.0)),
            Sector::leaf(2, "0/1/", cube(Vec3::new(5.0, 0.0, 0.0), 5.0)),
        ]))
    }

    #[test]
    fn test_root_and_children_within_budget_are_detailed() {
        let wanted = QualityClassifier::default().determine_sectors(
            &two_children_tree(),
            &camera_facing_origin(),
            &Mat4::IDENTITY,
        );
        assert_eq!(wanted.detailed, ids(&[0, 1, 2]));
        assert!(wanted.simple.is_empty());
    }

    #[test]
    fn test_root_outside_frustum_yields_nothing() {
        let camera = CameraState::look_at(
            Vec3::new(0.0, 0.0, 50.0),
            Vec3::new(0.0, 0.0, 100.0),
            60f32.to_radians(),
            1.0,
            0.1,
            1000.0,
        );
        let wanted = QualityClassifier::default().determine_sectors(&two_children_tree(), &camera, &Mat4::IDENTITY);
        assert!(wanted.is_empty());
    }

    #[test]
    fn test_empty_tree_yields_nothing() {
        let wanted = QualityClassifier::default().determine_sectors(
            &SectorTree::empty(),
            &camera_facing_origin(),
            &Mat4::IDENTITY,
        );
        assert!(wanted.is_empty());
    }

    #[test]
    fn test_unflushed_path_contributes_exactly_one_simple_id() {
        // root -> child -> grandchild, nothing within budget
        let tree = SectorTree::new(Sector::leaf(0, "0/", cube(Vec3::ZERO, 10.0)).with_children(vec![
            Sector::leaf(1, "0/0/", cube(Vec3::ZERO, 5.0))
                .with_children(vec![Sector::leaf(2, "0/0/0/", cube(Vec3::ZERO, 2.0))]),
        ]));
        let classifier = QualityClassifier::new(ClassifierConfig::default().with_detailed_budget(0));
        let wanted = classifier.determine_sectors(&tree, &camera_facing_origin(), &Mat4::IDENTITY);

        assert!(wanted.detailed.is_empty());
        assert_eq!(wanted.simple.len(), 1);
        assert_eq!(wanted.simple, ids(&[0]));
    }

    #[test]
    fn test_candidate_flushes_pending_ancestors() {
        // Grandchild 3 is a candidate but its parent 1 is not; 1 is promoted on flush
        let tree = SectorTree::new(Sector::leaf(0, "0/", cube(Vec3::ZERO, 20.0)).with_children(vec![
            Sector::leaf(1, "0/0/", cube(Vec3::new(0.0, 0.0, -15.0), 2.0))
                .with_children(vec![Sector::leaf(3, "0/0/0/", cube(Vec3::new(0.0, 0.0, 15.0), 2.0))]),
            Sector::leaf(2, "0/1/", cube(Vec3::new(0.0, 0.0, -5.0), 2.0)),
        ]));
        let camera = CameraState::look_at(
            Vec3::new(0.0, 0.0, 40.0),
            Vec3::ZERO,
            60f32.to_radians(),
            1.0,
            0.1,
            1000.0,
        );
        let classifier = QualityClassifier::new(ClassifierConfig::default().with_detailed_budget(2));
        let wanted = classifier.determine_sectors(&tree, &camera, &Mat4::IDENTITY);

        assert_eq!(wanted.detailed, ids(&[0, 1, 3]));
        assert_eq!(wanted.simple, ids(&[2]));
    }

    #[test]
    fn test_model_matrix_moves_camera_into_model_space() {
        // Model placed far away in world space; the camera looks at it there
        let model = Mat4::from_translation(Vec3::new(1000.0, 0.0, 0.0));
        let camera = CameraState::look_at(
            Vec3::new(1000.0, 0.0, 50.0),
            Vec3::new(1000.0, 0.0, 0.0),
            60f32.to_radians(),
            1.0,
            0.1,
            1000.0,
        );
        let wanted = QualityClassifier::default().determine_sectors(&two_children_tree(), &camera, &model);
        assert_eq!(wanted.detailed, ids(&[0, 1, 2]));

        let untransformed = QualityClassifier::default().determine_sectors(
            &two_children_tree(),
            &camera,
            &Mat4::IDENTITY,
        );
        assert!(untransformed.is_empty());
    }

    #[test]
    fn test_budget_limits_detailed_sectors() {
        // Eight leaves in a row along -Z, all visible
        let leaves = (1..=8)
            .map(|i| Sector::leaf(i, format!("0/{}/", i), cube(Vec3::new(0.0, 0.0, -(i as f32) * 4.0), 1.0)))
            .collect();
        let tree = SectorTree::new(Sector::leaf(0, "0/", cube(Vec3::new(0.0, 0.0, -18.0), 20.0)).with_children(leaves));
        let classifier = QualityClassifier::new(ClassifierConfig::default().with_detailed_budget(3));
        let wanted = classifier.determine_sectors(&tree, &camera_facing_origin(), &Mat4::IDENTITY);

        // Root (nearest, its box reaches z=2) plus leaves 1 and 2
        assert_eq!(wanted.detailed, ids(&[0, 1, 2]));
        assert_eq!(wanted.simple, ids(&[3, 4, 5, 6, 7, 8]));
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    fn build_tree(nodes: &[(usize, [f32; 3], f32)]) -> SectorTree {
        fn build(index: usize, nodes: &[(usize, [f32; 3], f32)], children: &[Vec<usize>]) -> Sector {
            let (_, center, half) = nodes[index];
            Sector::leaf(index as u32, format!("{}/", index), cube(Vec3::from(center), half)).with_children(
                children[index]
                    .iter()
                    .map(|&child| build(child, nodes, children))
                    .collect(),
            )
        }

        let mut children = vec![Vec::new(); nodes.len()];
        for (index, (parent, _, _)) in nodes.iter().enumerate().skip(1) {
            children[parent % index].push(index);
        }
        SectorTree::new(build(0, nodes, &children))
    }

    proptest! {
        #[test]
        fn prop_detailed_and_simple_are_disjoint(
            nodes in prop::collection::vec(
                (0usize..64, prop::array::uniform3(-50.0f32..50.0), 0.5f32..20.0),
                1..40,
            ),
            eye in prop::array::uniform3(-100.0f32..100.0),
            budget in 0usize..12,
        ) {
            let tree = build_tree(&nodes);
            let camera = CameraState::look_at(
                Vec3::from(eye),
                Vec3::new(0.1, 0.2, 0.3),
                60f32.to_radians(),
                1.5,
                0.1,
                500.0,
            );
            let classifier = QualityClassifier::new(ClassifierConfig::default().with_detailed_budget(budget));
            let wanted = classifier.determine_sectors(&tree, &camera, &Mat4::IDENTITY);

            prop_assert!(wanted.is_disjoint());
            prop_assert!(wanted.detailed.len() <= tree.len());
        }
    }
}
