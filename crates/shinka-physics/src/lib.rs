//! Rigid body simulation contexts for Shinka creatures
//!
//! Each evolving creature owns a private [`PhysicsScene`]: an independent
//! rapier world with its own ground plane. The creature model issues
//! structural commands (links, box shapes, revolute joints) and reads back
//! poses; the solver itself is rapier's.

pub mod scene;

pub use scene::{JointDrive, JointHandle, LinkHandle, PhysicsScene};
