//! Procedurally grown articulated creatures for Shinka
//!
//! This crate implements:
//! - The creature part tree: box segments joined by driven revolute joints
//! - Collision-aware random growth against a per-creature shape registry
//! - Structure-preserving mutation and cloning
//! - `*.creature` file persistence

pub mod bounding_box;
pub mod creature;
pub mod error;
pub mod part;
pub mod persistence;
pub mod rng;

// Re-export main types for convenience
pub use bounding_box::BoundingBox;
pub use creature::{AttachmentProposal, ChildSpec, Creature, PartInstance};
pub use error::{GrowthError, PersistenceError};
pub use part::{CreaturePart, JointAxis, PartId, PartJoint};
pub use persistence::{load_creature, save_creature, PartRecord, CREATURE_EXTENSION};
