//! Error types for growth, mutation, and persistence

use thiserror::Error;

/// Recoverable failures of the growth and mutation operators. The creature
/// is left unchanged when one of these is returned.
#[derive(Debug, Error)]
pub enum GrowthError {
    #[error("no collision-free placement found after {attempts} attempts")]
    PlacementExhausted { attempts: u32 },

    #[error("cannot remove a part from a creature with only its root")]
    RootOnly,
}

/// Failures while reading or writing `*.creature` files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read or write creature file")]
    Io(#[from] std::io::Error),

    #[error("malformed creature file")]
    Format(#[from] ron::error::SpannedError),

    #[error("failed to encode creature")]
    Encode(#[from] ron::Error),

    #[error("non-root part is missing its joint block")]
    MissingJoint,
}
