//! Shinka evolves populations of procedurally grown, physically simulated
//! box creatures toward a locomotion objective.
//!
//! The crate exposes the operational surface a host application embeds in
//! its loop: start a run, feed it wall time, read back draw instances, and
//! inspect the frozen results or the loaded creature pool.

pub mod generation;

pub use generation::{
    CreatureRecord, GenerationConfig, GenerationError, GenerationManager, GenerationState,
    FIXED_TIME_STEP, SPAWN_POINT,
};
