//! Creature part tree
//!
//! A creature owns an arena of parts plus a registry of local-space bounding
//! boxes, one per part, used for overlap queries during growth. All
//! randomized operations take an explicit RNG; all structural operations
//! take the creature's physics scene, which owns the simulation handles.

use std::collections::VecDeque;

use ahash::HashMap;
use glam::{Mat4, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;
use shinka_physics::{JointDrive, LinkHandle, PhysicsScene};

use crate::bounding_box::BoundingBox;
use crate::error::GrowthError;
use crate::part::{face_normal, CreaturePart, JointAxis, PartId, PartJoint};
use crate::rng::{coin, mutation_factor, random_axis_index, random_sign};

/// Retry cap for collision-free placement; exhausting it aborts just the
/// growth operation and leaves the creature unchanged.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 32;

/// Per-axis bounds for freshly grown child half-extents. The lower bound
/// keeps collider shapes non-degenerate.
pub const MIN_PART_EXTENT: f32 = 0.1;
pub const MAX_PART_EXTENT: f32 = 3.0;

const MAX_VELOCITY_RANGE: (f32, f32) = (1.0, 10.0);
const OSCILLATION_SPEED_RANGE: (f32, f32) = (0.5, 5.0);

/// Parameters for one new child part, as consumed by [`Creature::add_child`].
#[derive(Debug, Clone)]
pub struct ChildSpec {
    pub scale: Vec3,
    pub relative_position: Vec3,
    pub joint_position: Vec3,
    pub axis: JointAxis,
    pub max_velocity: f32,
    pub oscillation_speed: f32,
    pub drive: JointDrive,
}

/// Candidate attachment produced by the growth algorithm: a child box placed
/// flush against a random face of the chosen parent.
#[derive(Debug, Clone)]
pub struct AttachmentProposal {
    pub parent: PartId,
    pub scale: Vec3,
    pub relative_position: Vec3,
    pub joint_position: Vec3,
    pub bounds: BoundingBox,
}

/// Render instance for one part: the final transform handed to the drawable
/// node, plus the box half-extents.
#[derive(Debug, Clone, Copy)]
pub struct PartInstance {
    pub transform: Mat4,
    pub half_extents: Vec3,
}

/// An articulated creature: an owned part tree plus its shape registry.
pub struct Creature {
    parts: Vec<Option<CreaturePart>>,
    root: PartId,
    shapes: HashMap<PartId, BoundingBox>,
}

impl Creature {
    /// Create a single-part creature: one root link with a box shape and a
    /// bounding box centered at the local origin.
    pub fn new(scene: &mut PhysicsScene, root_scale: Vec3) -> Self {
        let link = scene.create_link(Vec3::ZERO);
        scene.attach_box(link, root_scale);

        let root = PartId(0);
        let mut shapes = HashMap::default();
        shapes.insert(root, BoundingBox::new(Vec3::ZERO, root_scale));

        Self {
            parts: vec![Some(CreaturePart {
                scale: root_scale,
                joint: None,
                parent: None,
                children: Vec::new(),
                link,
                transform: Mat4::IDENTITY,
            })],
            root,
            shapes,
        }
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    pub fn root_link(&self) -> LinkHandle {
        self.part(self.root).link
    }

    pub fn part(&self, id: PartId) -> &CreaturePart {
        self.parts[id.0].as_ref().expect("stale part id")
    }

    fn part_mut(&mut self, id: PartId) -> &mut CreaturePart {
        self.parts[id.0].as_mut().expect("stale part id")
    }

    /// Ids of all live parts, in arena order.
    pub fn part_ids(&self) -> Vec<PartId> {
        self.parts
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| PartId(index)))
            .collect()
    }

    /// Number of parts in the tree.
    pub fn part_count(&self) -> usize {
        self.parts.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of registered bounding boxes. Always equals
    /// [`part_count`](Self::part_count).
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn shape(&self, id: PartId) -> Option<&BoundingBox> {
        self.shapes.get(&id)
    }

    /// Uniform pick from the flattened tree; leaves and internal parts are
    /// weighted equally.
    pub fn random_part<R: Rng>(&self, rng: &mut R) -> PartId {
        let ids = self.part_ids();
        *ids.choose(rng).expect("creature always has a root part")
    }

    /// Descend by uniformly random child choice until reaching a leaf. On a
    /// single-part creature this returns the root.
    pub fn childless_part<R: Rng>(&self, rng: &mut R) -> PartId {
        let mut current = self.root;
        loop {
            let part = self.part(current);
            match part.children.choose(rng) {
                Some(&child) => current = child,
                None => return current,
            }
        }
    }

    /// True iff `bounds` overlaps any registered shape other than `ignore`.
    pub fn is_colliding(&self, bounds: &BoundingBox, ignore: Option<PartId>) -> bool {
        self.shapes
            .iter()
            .any(|(&id, shape)| Some(id) != ignore && shape.overlaps(bounds))
    }

    /// The growth algorithm: pick a random point on one face of the parent's
    /// box, draw random child half-extents, and place the child flush
    /// against that face with lateral jitter bounded by the child's size.
    pub fn propose_attachment<R: Rng>(&self, rng: &mut R, parent: PartId) -> AttachmentProposal {
        let parent_scale = self.part(parent).scale;
        let parent_center = self.shapes[&parent].center();

        let outward = random_axis_index(rng);
        let sign = random_sign(rng);

        let mut point_on_parent = Vec3::ZERO;
        for axis in 0..3 {
            point_on_parent[axis] = if axis == outward {
                parent_scale[axis] * sign
            } else {
                rng.gen_range(-parent_scale[axis]..=parent_scale[axis])
            };
        }

        let scale = Vec3::new(
            rng.gen_range(MIN_PART_EXTENT..=MAX_PART_EXTENT),
            rng.gen_range(MIN_PART_EXTENT..=MAX_PART_EXTENT),
            rng.gen_range(MIN_PART_EXTENT..=MAX_PART_EXTENT),
        );

        let mut relative_position = Vec3::ZERO;
        for axis in 0..3 {
            relative_position[axis] = if axis == outward {
                (parent_scale[axis] + scale[axis]) * sign
            } else {
                point_on_parent[axis] + rng.gen_range(-scale[axis]..=scale[axis])
            };
        }

        let bounds = BoundingBox::new(parent_center + relative_position, scale);

        AttachmentProposal {
            parent,
            scale,
            relative_position,
            joint_position: point_on_parent,
            bounds,
        }
    }

    /// Grow one random part: re-pick a parent and propose an attachment
    /// until the candidate box is clear of every shape except the parent's,
    /// then attach it with freshly randomized joint parameters.
    pub fn add_random_part<R: Rng>(
        &mut self,
        scene: &mut PhysicsScene,
        rng: &mut R,
    ) -> Result<PartId, GrowthError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let parent = self.random_part(rng);
            let proposal = self.propose_attachment(rng, parent);
            if self.is_colliding(&proposal.bounds, Some(parent)) {
                continue;
            }

            let spec = ChildSpec {
                scale: proposal.scale,
                relative_position: proposal.relative_position,
                joint_position: proposal.joint_position,
                axis: JointAxis::sample(rng),
                max_velocity: rng.gen_range(MAX_VELOCITY_RANGE.0..=MAX_VELOCITY_RANGE.1),
                oscillation_speed: rng
                    .gen_range(OSCILLATION_SPEED_RANGE.0..=OSCILLATION_SPEED_RANGE.1),
                drive: JointDrive::default(),
            };
            return Ok(self.add_child(scene, proposal.parent, spec));
        }

        Err(GrowthError::PlacementExhausted {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// Attach a new child part under `parent`: create its link and box,
    /// configure the inbound revolute joint, and register its bounding box.
    ///
    /// The parent-side anchor is `joint_position`, the child-side anchor is
    /// `joint_position - relative_position`, which keeps the two local
    /// frames geometrically continuous.
    pub fn add_child(&mut self, scene: &mut PhysicsScene, parent: PartId, spec: ChildSpec) -> PartId {
        let parent_part = self.part(parent);
        let parent_link = parent_part.link;
        let parent_scale = parent_part.scale;
        let parent_center = self.shapes[&parent].center();

        let parent_position = scene.link_translation(parent_link).unwrap_or(Vec3::ZERO);
        let link = scene.create_link(parent_position + spec.relative_position);
        scene.attach_box(link, spec.scale);

        let handle = scene.configure_revolute(
            parent_link,
            link,
            spec.axis.unit(),
            spec.joint_position,
            spec.joint_position - spec.relative_position,
            &spec.drive,
        );

        let id = PartId(self.parts.len());
        self.parts.push(Some(CreaturePart {
            scale: spec.scale,
            joint: Some(PartJoint {
                relative_position: spec.relative_position,
                joint_position: spec.joint_position,
                parent_normal: face_normal(spec.joint_position, parent_scale),
                axis: spec.axis,
                max_velocity: spec.max_velocity,
                oscillation_speed: spec.oscillation_speed,
                drive: spec.drive,
                handle,
            }),
            parent: Some(parent),
            children: Vec::new(),
            link,
            transform: Mat4::IDENTITY,
        }));
        self.part_mut(parent).children.push(id);
        self.shapes.insert(
            id,
            BoundingBox::new(parent_center + spec.relative_position, spec.scale),
        );
        id
    }

    /// Remove one randomly chosen leaf part, releasing its simulation
    /// handles and its bounding box. Removing the root is an error.
    pub fn remove_childless_part<R: Rng>(
        &mut self,
        scene: &mut PhysicsScene,
        rng: &mut R,
    ) -> Result<PartId, GrowthError> {
        if self.part_count() == 1 {
            return Err(GrowthError::RootOnly);
        }

        let leaf = self.childless_part(rng);
        let part = self.parts[leaf.0].take().expect("stale part id");
        let parent = part.parent.expect("non-root leaf has a parent");
        self.part_mut(parent).children.retain(|&child| child != leaf);
        scene.remove_link(part.link);
        self.shapes.remove(&leaf);
        Ok(leaf)
    }

    /// Produce an independently simulated offspring. Each scalar field
    /// mutates with probability `chance`, perturbed multiplicatively by a
    /// factor in `[1 - severity, 1 + severity]`; finally, one random part
    /// may be grown and one childless part removed (independent flips).
    pub fn mutated<R: Rng>(
        &self,
        scene: &mut PhysicsScene,
        rng: &mut R,
        chance: f32,
        severity: f32,
    ) -> Creature {
        let mut offspring = self.rebuild(scene, rng, chance, severity);

        if coin(rng, chance) {
            if let Err(err) = offspring.add_random_part(scene, rng) {
                log::warn!("mutation growth skipped: {err}");
            }
        }
        if coin(rng, chance) && offspring.part_count() > 1 {
            let _ = offspring.remove_childless_part(scene, rng);
        }

        offspring
    }

    /// Exact structural and parametric clone with fresh simulation handles.
    /// Built through the same record contract as deserialization.
    pub fn copy(&self, scene: &mut PhysicsScene) -> Creature {
        Creature::from_record(scene, &self.to_record())
            .expect("clone of a well-formed creature is well-formed")
    }

    /// Breadth-first co-traversal of the source tree and a freshly grown
    /// target tree, applying per-field mutation coin flips.
    fn rebuild<R: Rng>(
        &self,
        scene: &mut PhysicsScene,
        rng: &mut R,
        chance: f32,
        severity: f32,
    ) -> Creature {
        let mut root_scale = self.part(self.root).scale;
        if coin(rng, chance) {
            root_scale = mutate_scale(rng, root_scale, severity);
        }
        let mut offspring = Creature::new(scene, root_scale);

        let mut queue = VecDeque::new();
        queue.push_back((self.root, offspring.root));
        while let Some((source_id, target_id)) = queue.pop_front() {
            for &child_id in &self.part(source_id).children {
                let child = self.part(child_id);
                let joint = child.joint.as_ref().expect("non-root part has a joint");

                let mut scale = child.scale;
                if coin(rng, chance) {
                    scale = mutate_scale(rng, scale, severity);
                }
                let mut axis = joint.axis;
                if coin(rng, chance) {
                    axis = JointAxis::sample(rng);
                }
                let mut max_velocity = joint.max_velocity;
                if coin(rng, chance) {
                    max_velocity *= mutation_factor(rng, severity);
                }
                let mut oscillation_speed = joint.oscillation_speed;
                if coin(rng, chance) {
                    oscillation_speed *= mutation_factor(rng, severity);
                }

                // Re-derive the flush axis from the rebuilt scales so mutated
                // parents and children stay face to face.
                let parent_scale = offspring.part(target_id).scale;
                let mut relative_position = joint.relative_position;
                let mut joint_position = joint.joint_position;
                for axis_index in 0..3 {
                    let normal = joint.parent_normal[axis_index];
                    if normal != 0.0 {
                        relative_position[axis_index] =
                            normal * (scale[axis_index] + parent_scale[axis_index]);
                        joint_position[axis_index] = normal * parent_scale[axis_index];
                    }
                }

                let new_id = offspring.add_child(
                    scene,
                    target_id,
                    ChildSpec {
                        scale,
                        relative_position,
                        joint_position,
                        axis,
                        max_velocity,
                        oscillation_speed,
                        drive: joint.drive,
                    },
                );
                queue.push_back((child_id, new_id));
            }
        }

        offspring
    }

    /// Set every joint's velocity target to
    /// `max_velocity * sin(oscillation_speed * time_elapsed)`. All joints
    /// share the same global clock.
    pub fn activate(&self, scene: &mut PhysicsScene, time_elapsed: f32) {
        for id in self.part_ids() {
            if let Some(joint) = &self.part(id).joint {
                let target = joint.max_velocity * (joint.oscillation_speed * time_elapsed).sin();
                scene.set_drive_velocity(joint.handle, target, &joint.drive);
            }
        }
    }

    /// Read back world poses and refresh every part's render transform.
    /// Pure read, no physics mutation.
    pub fn update(&mut self, scene: &PhysicsScene) {
        for slot in self.parts.iter_mut() {
            if let Some(part) = slot {
                if let Some((position, rotation)) = scene.link_pose(part.link) {
                    part.transform = Mat4::from_translation(position)
                        * Mat4::from_quat(rotation)
                        * Mat4::from_scale(part.scale);
                }
            }
        }
    }

    /// Teleport the whole creature so its root sits at `position`, zeroing
    /// link velocities.
    pub fn set_position(&self, scene: &mut PhysicsScene, position: Vec3) {
        let Some(root_position) = scene.link_translation(self.root_link()) else {
            return;
        };
        let delta = position - root_position;
        for id in self.part_ids() {
            scene.translate_link(self.part(id).link, delta);
        }
    }

    /// Toggle gravity on every link of this creature.
    pub fn set_gravity_enabled(&self, scene: &mut PhysicsScene, enabled: bool) {
        for id in self.part_ids() {
            scene.set_link_gravity_enabled(self.part(id).link, enabled);
        }
    }

    /// Instance transforms for drawing: one per part, premultiplied by the
    /// view-projection matrix.
    pub fn render_instances(&self, view_projection: Mat4) -> Vec<PartInstance> {
        self.part_ids()
            .into_iter()
            .map(|id| {
                let part = self.part(id);
                PartInstance {
                    transform: view_projection * part.transform,
                    half_extents: part.scale,
                }
            })
            .collect()
    }
}

fn mutate_scale<R: Rng>(rng: &mut R, scale: Vec3, severity: f32) -> Vec3 {
    Vec3::new(
        scale.x * mutation_factor(rng, severity),
        scale.y * mutation_factor(rng, severity),
        scale.z * mutation_factor(rng, severity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng(seed: u64) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(seed)
    }

    fn grown_creature(scene: &mut PhysicsScene, rng: &mut Xoshiro256PlusPlus, parts: usize) -> Creature {
        let mut creature = Creature::new(scene, Vec3::new(2.0, 1.0, 1.0));
        for _ in 0..parts {
            creature
                .add_random_part(scene, rng)
                .expect("placement should succeed on a sparse creature");
        }
        creature
    }

    #[test]
    fn test_new_creature_registers_root_shape() {
        let mut scene = PhysicsScene::new();
        let creature = Creature::new(&mut scene, Vec3::new(2.0, 1.0, 1.0));

        assert_eq!(creature.part_count(), 1);
        assert_eq!(creature.shape_count(), 1);
        let shape = creature.shape(creature.root()).unwrap();
        assert_eq!(shape.center(), Vec3::ZERO);
        assert_eq!(shape.half_extents(), Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_shape_registry_tracks_every_part() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(11);
        let mut creature = grown_creature(&mut scene, &mut rng, 5);

        assert_eq!(creature.part_count(), 6);
        assert_eq!(creature.shape_count(), creature.part_count());

        creature.remove_childless_part(&mut scene, &mut rng).unwrap();
        assert_eq!(creature.shape_count(), creature.part_count());
    }

    #[test]
    fn test_added_part_does_not_overlap_siblings() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(12);
        let mut creature = Creature::new(&mut scene, Vec3::new(2.0, 1.0, 1.0));

        for _ in 0..8 {
            // Placement may legitimately run out of room; only successful
            // growth is subject to the no-overlap property.
            let Ok(id) = creature.add_random_part(&mut scene, &mut rng) else {
                continue;
            };
            let parent = creature.part(id).parent;
            let bounds = *creature.shape(id).unwrap();
            for other in creature.part_ids() {
                if other == id || Some(other) == parent {
                    continue;
                }
                let shape = creature.shape(other).unwrap();
                assert!(
                    !shape.overlaps(&bounds),
                    "new part overlaps an existing sibling"
                );
            }
        }
    }

    #[test]
    fn test_proposal_places_child_flush_on_a_face() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(13);
        let creature = Creature::new(&mut scene, Vec3::new(2.0, 1.0, 1.0));
        let parent_scale = Vec3::new(2.0, 1.0, 1.0);

        for _ in 0..50 {
            let proposal = creature.propose_attachment(&mut rng, creature.root());

            // The joint anchor sits on exactly one face of the parent.
            let on_face: Vec<usize> = (0..3)
                .filter(|&axis| {
                    (proposal.joint_position[axis].abs() - parent_scale[axis]).abs() < 1e-5
                })
                .collect();
            assert!(!on_face.is_empty());
            let outward = on_face[0];

            // Flush placement on the outward axis, sign preserved.
            let expected =
                (parent_scale[outward] + proposal.scale[outward]) * proposal.joint_position[outward].signum();
            assert!((proposal.relative_position[outward] - expected).abs() < 1e-5);

            // The candidate box is centered at parent center + offset.
            assert_eq!(
                proposal.bounds.center(),
                creature.shape(creature.root()).unwrap().center() + proposal.relative_position
            );
            assert_eq!(proposal.bounds.half_extents(), proposal.scale);
        }
    }

    #[test]
    fn test_joint_continuity_after_growth() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(14);
        let creature = grown_creature(&mut scene, &mut rng, 6);

        for id in creature.part_ids() {
            if let Some(joint) = &creature.part(id).joint {
                let (parent_anchor, child_anchor) = scene.joint_anchors(joint.handle).unwrap();
                let difference = parent_anchor - child_anchor;
                assert!(
                    (difference - joint.relative_position).length() < 1e-5,
                    "anchor difference {:?} != relative position {:?}",
                    difference,
                    joint.relative_position
                );
            }
        }
    }

    #[test]
    fn test_childless_part_of_single_part_creature_is_root() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(15);
        let creature = Creature::new(&mut scene, Vec3::ONE);
        assert_eq!(creature.childless_part(&mut rng), creature.root());
    }

    #[test]
    fn test_remove_childless_part_fails_on_root_only() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(16);
        let mut creature = Creature::new(&mut scene, Vec3::ONE);

        let result = creature.remove_childless_part(&mut scene, &mut rng);
        assert!(matches!(result, Err(GrowthError::RootOnly)));
        assert_eq!(creature.part_count(), 1);
    }

    #[test]
    fn test_remove_childless_part_removes_one_leaf() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(17);
        let mut creature = grown_creature(&mut scene, &mut rng, 4);

        let removed = creature.remove_childless_part(&mut scene, &mut rng).unwrap();
        assert_eq!(creature.part_count(), 4);
        assert!(creature.shape(removed).is_none());
        assert!(scene.link_translation(creature.part(creature.root()).link).is_some());

        // The removed id no longer appears in any child list.
        for id in creature.part_ids() {
            assert!(!creature.part(id).children.contains(&removed));
        }
    }

    #[test]
    fn test_copy_is_identical_and_independent() {
        let mut source_scene = PhysicsScene::new();
        let mut rng = rng(18);
        let source = grown_creature(&mut source_scene, &mut rng, 5);

        let mut copy_scene = PhysicsScene::new();
        let mut copy = source.copy(&mut copy_scene);

        assert_eq!(copy.part_count(), source.part_count());
        assert_eq!(source.to_record(), copy.to_record());

        // Growing the copy leaves the source untouched.
        let grew = copy.add_random_part(&mut copy_scene, &mut rng).is_ok();
        assert_eq!(source.part_count(), 6);
        if grew {
            assert_eq!(copy.part_count(), 7);
        }
    }

    #[test]
    fn test_rebuild_with_zero_chance_is_exact() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(19);
        let source = grown_creature(&mut scene, &mut rng, 4);

        let mut target_scene = PhysicsScene::new();
        let clone = source.rebuild(&mut target_scene, &mut rng, 0.0, 0.9);
        assert_eq!(source.to_record(), clone.to_record());
    }

    #[test]
    fn test_mutation_stays_within_severity_bounds() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(20);
        let source = grown_creature(&mut scene, &mut rng, 5);

        let severity = 0.4;
        let mut target_scene = PhysicsScene::new();
        // Chance 1.0 fires every coin, so every scalar must land in bounds.
        let mutant = source.rebuild(&mut target_scene, &mut rng, 1.0, severity);

        let mut pairs = vec![(source.root(), mutant.root())];
        while let Some((source_id, mutant_id)) = pairs.pop() {
            let a = source.part(source_id);
            let b = mutant.part(mutant_id);

            for axis in 0..3 {
                let low = a.scale[axis] * (1.0 - severity);
                let high = a.scale[axis] * (1.0 + severity);
                assert!(
                    b.scale[axis] >= low - 1e-5 && b.scale[axis] <= high + 1e-5,
                    "scale out of bounds: {} not in [{low}, {high}]",
                    b.scale[axis]
                );
            }

            if let (Some(ja), Some(jb)) = (&a.joint, &b.joint) {
                assert!(jb.max_velocity >= ja.max_velocity * (1.0 - severity) - 1e-5);
                assert!(jb.max_velocity <= ja.max_velocity * (1.0 + severity) + 1e-5);
                assert!(jb.oscillation_speed >= ja.oscillation_speed * (1.0 - severity) - 1e-5);
                assert!(jb.oscillation_speed <= ja.oscillation_speed * (1.0 + severity) + 1e-5);
            }

            assert_eq!(a.children.len(), b.children.len());
            for (&ca, &cb) in a.children.iter().zip(&b.children) {
                pairs.push((ca, cb));
            }
        }
    }

    #[test]
    fn test_mutation_preserves_flush_attachment() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(21);
        let source = grown_creature(&mut scene, &mut rng, 4);

        let mut target_scene = PhysicsScene::new();
        let mutant = source.rebuild(&mut target_scene, &mut rng, 1.0, 0.5);

        for id in mutant.part_ids() {
            let part = mutant.part(id);
            let Some(joint) = &part.joint else { continue };
            let parent_scale = mutant.part(part.parent.unwrap()).scale;
            for axis in 0..3 {
                let normal = joint.parent_normal[axis];
                if normal != 0.0 {
                    let expected = normal * (part.scale[axis] + parent_scale[axis]);
                    assert!(
                        (joint.relative_position[axis] - expected).abs() < 1e-4,
                        "flush axis drifted after mutation"
                    );
                }
            }
        }
    }

    #[test]
    fn test_mutated_single_part_creature_never_loses_root() {
        let mut scene = PhysicsScene::new();
        let source = Creature::new(&mut scene, Vec3::ONE);

        for seed in 0..8 {
            let mut target_scene = PhysicsScene::new();
            let mut local = rng(seed);
            let mutant = source.mutated(&mut target_scene, &mut local, 1.0, 0.5);
            assert!(mutant.part_count() >= 1);
        }
    }

    #[test]
    fn test_activation_drives_motion() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(23);
        let mut creature = grown_creature(&mut scene, &mut rng, 3);
        creature.set_position(&mut scene, Vec3::new(0.0, 10.0, 0.0));

        let mut clock = 0.0;
        for _ in 0..120 {
            clock += 1.0 / 60.0;
            creature.activate(&mut scene, clock);
            scene.step(1.0 / 60.0);
        }
        creature.update(&scene);

        // After two seconds of driven oscillation under gravity the root has
        // moved away from where it was teleported to.
        let position = scene.link_translation(creature.root_link()).unwrap();
        assert!((position - Vec3::new(0.0, 10.0, 0.0)).length() > 0.1);
    }

    #[test]
    fn test_set_position_moves_every_link() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(24);
        let creature = grown_creature(&mut scene, &mut rng, 3);

        let before: Vec<Vec3> = creature
            .part_ids()
            .into_iter()
            .map(|id| scene.link_translation(creature.part(id).link).unwrap())
            .collect();

        creature.set_position(&mut scene, Vec3::new(0.0, 10.0, 0.0));

        let root_after = scene.link_translation(creature.root_link()).unwrap();
        assert!((root_after - Vec3::new(0.0, 10.0, 0.0)).length() < 1e-4);

        // Relative layout is preserved: every link moved by the same delta.
        let delta = root_after - before[0];
        for (id, old) in creature.part_ids().into_iter().zip(before) {
            let new = scene.link_translation(creature.part(id).link).unwrap();
            assert!((new - old - delta).length() < 1e-4);
        }
    }

    #[test]
    fn test_render_instances_cover_every_part() {
        let mut scene = PhysicsScene::new();
        let mut rng = rng(25);
        let mut creature = grown_creature(&mut scene, &mut rng, 4);
        creature.update(&scene);

        let instances = creature.render_instances(Mat4::IDENTITY);
        assert_eq!(instances.len(), creature.part_count());
    }
}
