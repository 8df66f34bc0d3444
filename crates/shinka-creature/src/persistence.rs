//! Creature files
//!
//! A creature serializes as one recursive record per part. Deserialization
//! rebuilds the tree top-down through the same `add_child` contract used by
//! growth, so joint semantics stay consistent between generated and loaded
//! creatures. Files are RON text with the `.creature` extension.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use shinka_physics::{JointDrive, PhysicsScene};

use crate::creature::{ChildSpec, Creature};
use crate::error::PersistenceError;
use crate::part::{JointAxis, PartId};

/// File extension convention for serialized creatures.
pub const CREATURE_EXTENSION: &str = "creature";

/// Serialized joint block of a non-root part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRecord {
    pub relative_position: Vec3,
    pub joint_position: Vec3,
    pub axis: JointAxis,
    pub max_velocity: f32,
    pub oscillation_speed: f32,
    pub drive: JointDrive,
}

/// Serialized part subtree. The root record carries no joint block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    pub scale: Vec3,
    pub joint: Option<JointRecord>,
    pub children: Vec<PartRecord>,
}

impl Creature {
    /// Serialize the part tree into a recursive record.
    pub fn to_record(&self) -> PartRecord {
        self.record_from(self.root())
    }

    fn record_from(&self, id: PartId) -> PartRecord {
        let part = self.part(id);
        PartRecord {
            scale: part.scale,
            joint: part.joint.as_ref().map(|joint| JointRecord {
                relative_position: joint.relative_position,
                joint_position: joint.joint_position,
                axis: joint.axis,
                max_velocity: joint.max_velocity,
                oscillation_speed: joint.oscillation_speed,
                drive: joint.drive,
            }),
            children: part
                .children
                .iter()
                .map(|&child| self.record_from(child))
                .collect(),
        }
    }

    /// Rebuild a creature from a record, creating fresh simulation handles
    /// in `scene`.
    pub fn from_record(
        scene: &mut PhysicsScene,
        record: &PartRecord,
    ) -> Result<Creature, PersistenceError> {
        let mut creature = Creature::new(scene, record.scale);
        let root = creature.root();
        for child in &record.children {
            build_subtree(&mut creature, scene, root, child)?;
        }
        Ok(creature)
    }
}

fn build_subtree(
    creature: &mut Creature,
    scene: &mut PhysicsScene,
    parent: PartId,
    record: &PartRecord,
) -> Result<(), PersistenceError> {
    let joint = record.joint.as_ref().ok_or(PersistenceError::MissingJoint)?;
    let id = creature.add_child(
        scene,
        parent,
        ChildSpec {
            scale: record.scale,
            relative_position: joint.relative_position,
            joint_position: joint.joint_position,
            axis: joint.axis,
            max_velocity: joint.max_velocity,
            oscillation_speed: joint.oscillation_speed,
            drive: joint.drive,
        },
    );
    for child in &record.children {
        build_subtree(creature, scene, id, child)?;
    }
    Ok(())
}

/// Write a creature to a `*.creature` file.
pub fn save_creature(creature: &Creature, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
    let record = creature.to_record();
    let text = ron::ser::to_string_pretty(&record, ron::ser::PrettyConfig::default())?;
    fs::write(path.as_ref(), text)?;
    log::info!("Saved creature to {}", path.as_ref().display());
    Ok(())
}

/// Read a creature from a `*.creature` file, rebuilding it in `scene`.
pub fn load_creature(
    path: impl AsRef<Path>,
    scene: &mut PhysicsScene,
) -> Result<Creature, PersistenceError> {
    let text = fs::read_to_string(path.as_ref())?;
    let record: PartRecord = ron::from_str(&text)?;
    let creature = Creature::from_record(scene, &record)?;
    log::info!(
        "Loaded creature with {} parts from {}",
        creature.part_count(),
        path.as_ref().display()
    );
    Ok(creature)
}
