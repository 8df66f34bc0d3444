//! Per-creature simulation context
//!
//! Wraps a rapier3d world behind the narrow capability set the creature
//! model needs: create links, attach box shapes, configure driven revolute
//! joints, step, and read back poses.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

/// One rigid segment of a simulated creature.
pub type LinkHandle = RigidBodyHandle;

/// The inbound joint connecting a link to its parent.
pub type JointHandle = ImpulseJointHandle;

/// Swing limit on the driven axis; the other axes are locked by the joint.
pub const SWING_LIMIT: f32 = std::f32::consts::FRAC_PI_4;

const GRAVITY: f32 = -9.8;
const GROUND_HALF_EXTENT: f32 = 500.0;
const FRICTION: f32 = 0.5;
const RESTITUTION: f32 = 0.1;

/// Joint actuator parameters, applied as a force-based velocity drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointDrive {
    pub stiffness: f32,
    pub damping: f32,
    pub max_force: f32,
}

impl Default for JointDrive {
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            max_force: 1000.0,
        }
    }
}

/// Independent physics world hosting a single articulated creature and a
/// static ground plane.
pub struct PhysicsScene {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsScene {
    /// Create a scene with a static ground collider whose top surface sits
    /// at `y = 0`.
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ground_body = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_body);
        let ground = ColliderBuilder::cuboid(GROUND_HALF_EXTENT, 1.0, GROUND_HALF_EXTENT)
            .friction(FRICTION)
            .restitution(RESTITUTION)
            .build();
        colliders.insert_with_parent(ground, ground_handle, &mut bodies);

        log::debug!(
            "Physics: created scene with ground plane ({}x{} half-extent)",
            GROUND_HALF_EXTENT,
            GROUND_HALF_EXTENT
        );

        Self {
            gravity: vector![0.0, GRAVITY, 0.0],
            integration_parameters: IntegrationParameters {
                dt: 1.0 / 60.0,
                ..Default::default()
            },
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Create a dynamic link at the given world position. The link carries
    /// no shape until [`attach_box`](Self::attach_box) is called.
    pub fn create_link(&mut self, position: Vec3) -> LinkHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .build();
        self.bodies.insert(body)
    }

    /// Attach a box shape with the given half-extents to a link.
    pub fn attach_box(&mut self, link: LinkHandle, half_extents: Vec3) {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(1.0)
            .friction(FRICTION)
            .restitution(RESTITUTION)
            .build();
        self.colliders
            .insert_with_parent(collider, link, &mut self.bodies);
    }

    /// Connect `child` to `parent` with a revolute joint.
    ///
    /// Motion on `axis` is limited to [`SWING_LIMIT`] either way; the other
    /// axes are locked. The drive starts with a zero velocity target.
    /// Anchors are in the local frame of the respective body.
    pub fn configure_revolute(
        &mut self,
        parent: LinkHandle,
        child: LinkHandle,
        axis: Vec3,
        parent_anchor: Vec3,
        child_anchor: Vec3,
        drive: &JointDrive,
    ) -> JointHandle {
        let axis = UnitVector::new_normalize(vector![axis.x, axis.y, axis.z]);
        let joint = RevoluteJointBuilder::new(axis)
            .local_anchor1(point![parent_anchor.x, parent_anchor.y, parent_anchor.z])
            .local_anchor2(point![child_anchor.x, child_anchor.y, child_anchor.z])
            .limits([-SWING_LIMIT, SWING_LIMIT])
            .contacts_enabled(false);
        let handle = self.impulse_joints.insert(parent, child, joint, true);

        if let Some(joint) = self.impulse_joints.get_mut(handle) {
            joint
                .data
                .set_motor_model(JointAxis::AngX, MotorModel::ForceBased);
            joint
                .data
                .set_motor(JointAxis::AngX, 0.0, 0.0, drive.stiffness, drive.damping);
            joint.data.set_motor_max_force(JointAxis::AngX, drive.max_force);
        }
        handle
    }

    /// Set the joint's velocity target, keeping its stiffness/damping gains.
    pub fn set_drive_velocity(&mut self, joint: JointHandle, target: f32, drive: &JointDrive) {
        if let Some(joint) = self.impulse_joints.get_mut(joint) {
            joint
                .data
                .set_motor(JointAxis::AngX, 0.0, target, drive.stiffness, drive.damping);
        }
    }

    /// Local-frame anchors (parent side, child side) of a joint.
    pub fn joint_anchors(&self, joint: JointHandle) -> Option<(Vec3, Vec3)> {
        let joint = self.impulse_joints.get(joint)?;
        let a = joint.data.local_anchor1();
        let b = joint.data.local_anchor2();
        Some((Vec3::new(a.x, a.y, a.z), Vec3::new(b.x, b.y, b.z)))
    }

    /// World position and orientation of a link.
    pub fn link_pose(&self, link: LinkHandle) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(link)?;
        Some((to_vec3(body.translation()), to_quat(body.rotation())))
    }

    /// World position of a link.
    pub fn link_translation(&self, link: LinkHandle) -> Option<Vec3> {
        self.bodies.get(link).map(|body| to_vec3(body.translation()))
    }

    /// Linear velocity of a link.
    pub fn link_linear_velocity(&self, link: LinkHandle) -> Option<Vec3> {
        self.bodies.get(link).map(|body| to_vec3(body.linvel()))
    }

    /// Translate a link by `delta` and zero its velocities. Used when a
    /// whole creature is repositioned between evaluation windows.
    pub fn translate_link(&mut self, link: LinkHandle, delta: Vec3) {
        if let Some(body) = self.bodies.get_mut(link) {
            let translation = *body.translation() + vector![delta.x, delta.y, delta.z];
            body.set_translation(translation, true);
            body.set_linvel(vector![0.0, 0.0, 0.0], true);
            body.set_angvel(vector![0.0, 0.0, 0.0], true);
        }
    }

    /// Enable or disable gravity for a link.
    pub fn set_link_gravity_enabled(&mut self, link: LinkHandle, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(link) {
            body.set_gravity_scale(if enabled { 1.0 } else { 0.0 }, true);
        }
    }

    /// Remove a link, its shape, and any joints attached to it.
    pub fn remove_link(&mut self, link: LinkHandle) {
        self.bodies.remove(
            link,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Advance the simulation by `dt` seconds. Blocks until results are
    /// available.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
    }

    /// Number of rigid bodies in the scene, ground included.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

impl Default for PhysicsScene {
    fn default() -> Self {
        Self::new()
    }
}

fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_quat(q: &Rotation<Real>) -> Quat {
    let coords = q.quaternion().coords;
    Quat::from_xyzw(coords.x, coords.y, coords.z, coords.w)
}
