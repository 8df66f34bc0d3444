//! One rigid segment of a creature

use glam::{Mat4, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shinka_physics::{JointDrive, JointHandle, LinkHandle};

/// The single degree of freedom a joint drives, named after the local axis
/// it rotates around: twist is the x axis, the swings are y and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointAxis {
    Twist,
    Swing1,
    Swing2,
}

impl JointAxis {
    pub const ALL: [JointAxis; 3] = [JointAxis::Twist, JointAxis::Swing1, JointAxis::Swing2];

    /// Unit vector of the rotation axis in the joint's local frame.
    pub fn unit(&self) -> Vec3 {
        match self {
            JointAxis::Twist => Vec3::X,
            JointAxis::Swing1 => Vec3::Y,
            JointAxis::Swing2 => Vec3::Z,
        }
    }

    /// Pick one of the three axes uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Identifier of a part within its creature's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub(crate) usize);

/// Inbound joint of a part. Every part except the root has exactly one.
#[derive(Debug, Clone)]
pub struct PartJoint {
    /// Center of this part relative to its parent's center, parent-local.
    pub relative_position: Vec3,
    /// Connecting joint position relative to the parent's center.
    pub joint_position: Vec3,
    /// Which face of the parent this part is anchored to: per axis -1, 0 or
    /// +1, re-derived when the parent's scale mutates.
    pub parent_normal: Vec3,
    pub axis: JointAxis,
    /// Amplitude of the oscillating velocity target.
    pub max_velocity: f32,
    pub oscillation_speed: f32,
    pub drive: JointDrive,
    pub handle: JointHandle,
}

/// One rigid box segment of a creature.
#[derive(Debug, Clone)]
pub struct CreaturePart {
    /// Half-extents of the box shape.
    pub scale: Vec3,
    /// `None` exactly for the root part.
    pub joint: Option<PartJoint>,
    pub parent: Option<PartId>,
    /// Ordered list of child parts.
    pub children: Vec<PartId>,
    /// Simulation handle owned by the physics scene.
    pub link: LinkHandle,
    /// Resolved render transform (translate x rotate x scale), refreshed by
    /// `Creature::update`.
    pub transform: Mat4,
}

/// Face normal encoded by a joint anchor: per axis, the sign of the anchor
/// coordinate if it sits on the parent's face, else zero. A coordinate
/// exactly at the parent's center has no face sign.
pub(crate) fn face_normal(joint_position: Vec3, parent_scale: Vec3) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for axis in 0..3 {
        let value = joint_position[axis];
        if value != 0.0 && (value.abs() - parent_scale[axis]).abs() < 1e-5 {
            normal[axis] = value.signum();
        }
    }
    normal
}
