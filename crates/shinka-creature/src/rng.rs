//! Sampling helpers shared by growth and mutation
//!
//! Every randomized operation takes an explicit `&mut impl Rng` so runs are
//! reproducible under a seeded generator.

use rand::Rng;

/// Uniformly -1.0 or +1.0.
pub fn random_sign<R: Rng>(rng: &mut R) -> f32 {
    if rng.gen::<bool>() {
        1.0
    } else {
        -1.0
    }
}

/// Uniform axis index in `0..3`.
pub fn random_axis_index<R: Rng>(rng: &mut R) -> usize {
    rng.gen_range(0..3)
}

/// True with the given probability. A zero chance never draws.
pub fn coin<R: Rng>(rng: &mut R, chance: f32) -> bool {
    chance > 0.0 && rng.gen::<f32>() < chance
}

/// Multiplicative perturbation factor, uniform in `[1 - severity, 1 + severity]`.
pub fn mutation_factor<R: Rng>(rng: &mut R, severity: f32) -> f32 {
    rng.gen_range(1.0 - severity..=1.0 + severity)
}
