//! Generation state machine
//!
//! Owns the population and drives the evolutionary cycle: spawn -> evaluate
//! -> cull -> mutate -> repeat. Also manages a separate loaded/inspection
//! pool that lives outside the cycle.

use std::path::Path;

use glam::{Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use shinka_creature::{persistence, Creature, PartInstance, PersistenceError};
use shinka_physics::PhysicsScene;

/// Fixed step driving all per-tick work.
pub const FIXED_TIME_STEP: f32 = 1.0 / 60.0;

/// Common spawn point shared by every evaluated creature.
pub const SPAWN_POINT: Vec3 = Vec3::new(0.0, 10.0, 0.0);

const ROOT_SCALE: Vec3 = Vec3::new(2.0, 1.0, 1.0);
const INITIAL_PART_RANGE: (u32, u32) = (1, 4);

/// Phase of the evolutionary cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// No active evaluation; the loaded pool can be inspected freely.
    Idle,
    /// A generation is being evaluated.
    Running,
    /// All generations done; the sorted results are frozen for inspection.
    Finished,
}

/// One population member: a creature, its private simulation context, and
/// its per-window evaluation statistics.
pub struct CreatureRecord {
    pub creature: Creature,
    pub scene: PhysicsScene,
    /// Horizontal displacement from the spawn point; only meaningful after
    /// an evaluation window closes.
    pub fitness: f32,
    /// Time-averaged horizontal speed over the window. Tracked for
    /// reporting, never used for selection.
    pub average_speed: f32,
    pub sum_horizontal_speed: f32,
    pub lifetime: f32,
    pub active: bool,
}

impl CreatureRecord {
    fn new(creature: Creature, scene: PhysicsScene) -> Self {
        Self {
            creature,
            scene,
            fitness: 0.0,
            average_speed: 0.0,
            sum_horizontal_speed: 0.0,
            lifetime: 0.0,
            active: true,
        }
    }

    fn reset_window(&mut self) {
        self.fitness = 0.0;
        self.average_speed = 0.0;
        self.sum_horizontal_speed = 0.0;
        self.lifetime = 0.0;
    }

    fn horizontal_displacement(&self) -> f32 {
        match self.scene.link_translation(self.creature.root_link()) {
            Some(position) => {
                let dx = position.x - SPAWN_POINT.x;
                let dz = position.z - SPAWN_POINT.z;
                (dx * dx + dz * dz).sqrt()
            }
            None => 0.0,
        }
    }
}

/// Parameters of one evolution run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub generation_count: u32,
    /// Evaluation window per generation, in seconds.
    pub generation_duration: f32,
    pub survivor_count: usize,
    pub mutation_chance: f32,
    pub mutation_severity: f32,
    pub population_size: usize,
    /// Seed the initial population by cloning the loaded pool.
    pub seed_from_loaded: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generation_count: 10,
            generation_duration: 15.0,
            survivor_count: 10,
            mutation_chance: 0.3,
            mutation_severity: 0.5,
            population_size: 50,
            seed_from_loaded: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("loaded creature index {index} out of range ({len} loaded)")]
    LoadedIndexOutOfRange { index: usize, len: usize },

    #[error("result index {index} out of range ({len} results)")]
    ResultIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Owns the population and runs the generation state machine.
pub struct GenerationManager {
    population: Vec<CreatureRecord>,
    loaded: Vec<CreatureRecord>,
    sorted_results: Vec<CreatureRecord>,
    config: GenerationConfig,
    state: GenerationState,
    generation_index: u32,
    elapsed_in_generation: f32,
    accumulator: f32,
    clock: f32,
    rng: Xoshiro256PlusPlus,
}

impl GenerationManager {
    pub fn new(seed: u64) -> Self {
        Self {
            population: Vec::new(),
            loaded: Vec::new(),
            sorted_results: Vec::new(),
            config: GenerationConfig::default(),
            state: GenerationState::Idle,
            generation_index: 0,
            elapsed_in_generation: 0.0,
            accumulator: 0.0,
            clock: 0.0,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn generation_index(&self) -> u32 {
        self.generation_index
    }

    pub fn population_len(&self) -> usize {
        self.population.len()
    }

    /// Begin a run: discard prior results, build a fresh population, and
    /// open the first evaluation window. Calling this mid-run discards the
    /// run in progress.
    pub fn start(&mut self, config: GenerationConfig) {
        self.sorted_results.clear();
        self.config = config;
        self.generate_creatures(self.config.population_size, self.config.seed_from_loaded);

        self.generation_index = 0;
        self.elapsed_in_generation = 0.0;
        self.accumulator = 0.0;
        self.clock = 0.0;
        self.state = GenerationState::Running;

        log::info!(
            "Run started: {} generations of {:.1}s, population {}",
            self.config.generation_count,
            self.config.generation_duration,
            self.config.population_size
        );
    }

    /// Build a fresh population at the spawn point: clones of the loaded
    /// pool first if requested, random creatures with 1-4 grown parts for
    /// the remainder.
    pub fn generate_creatures(&mut self, population_size: usize, seed_from_loaded: bool) {
        self.population.clear();

        if seed_from_loaded {
            for record in self.loaded.iter().take(population_size) {
                let mut scene = PhysicsScene::new();
                let creature = record.creature.copy(&mut scene);
                self.population.push(CreatureRecord::new(creature, scene));
            }
        }

        while self.population.len() < population_size {
            let mut scene = PhysicsScene::new();
            let mut creature = Creature::new(&mut scene, ROOT_SCALE);
            let extra_parts = self
                .rng
                .gen_range(INITIAL_PART_RANGE.0..=INITIAL_PART_RANGE.1);
            for _ in 0..extra_parts {
                if let Err(err) = creature.add_random_part(&mut scene, &mut self.rng) {
                    log::warn!("initial growth skipped: {err}");
                }
            }
            self.population.push(CreatureRecord::new(creature, scene));
        }

        for record in &mut self.population {
            record.creature.set_position(&mut record.scene, SPAWN_POINT);
        }

        log::info!("Generated population of {}", self.population.len());
    }

    /// Advance the run by `dt` seconds of wall time, stepping all member
    /// simulations at the fixed step.
    pub fn simulate(&mut self, dt: f32) {
        self.accumulator += dt;
        while self.accumulator >= FIXED_TIME_STEP {
            self.accumulator -= FIXED_TIME_STEP;
            self.step_fixed();
        }
    }

    fn step_fixed(&mut self) {
        self.clock += FIXED_TIME_STEP;

        // Loaded creatures simulate independently of the evolutionary cycle.
        for record in &mut self.loaded {
            if record.active {
                record.creature.activate(&mut record.scene, self.clock);
                record.scene.step(FIXED_TIME_STEP);
                record.lifetime += FIXED_TIME_STEP;
            }
        }

        if self.state != GenerationState::Running {
            return;
        }

        for record in &mut self.population {
            if !record.active {
                continue;
            }
            // Joint targets are written before the member's step.
            record.creature.activate(&mut record.scene, self.clock);
            record.scene.step(FIXED_TIME_STEP);
            if let Some(velocity) = record
                .scene
                .link_linear_velocity(record.creature.root_link())
            {
                let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
                record.sum_horizontal_speed += horizontal.length() * FIXED_TIME_STEP;
            }
            record.lifetime += FIXED_TIME_STEP;
        }
        self.elapsed_in_generation += FIXED_TIME_STEP;

        if self.elapsed_in_generation > self.config.generation_duration {
            self.end_generation();
        }
    }

    /// Set joint targets for the whole population from the current clock.
    pub fn activate(&mut self) {
        for record in &mut self.population {
            record.creature.activate(&mut record.scene, self.clock);
        }
    }

    /// Refresh render transforms from the simulated poses.
    pub fn update(&mut self) {
        for record in self.population.iter_mut().chain(self.loaded.iter_mut()) {
            record.creature.update(&record.scene);
        }
    }

    fn end_generation(&mut self) {
        let window = self.elapsed_in_generation;
        for record in &mut self.population {
            record.fitness = record.horizontal_displacement();
            record.average_speed = if window > 0.0 {
                record.sum_horizontal_speed / window
            } else {
                0.0
            };
        }
        self.rank_population();
        self.generation_index += 1;

        let best = self.population.first().map(|r| r.fitness).unwrap_or(0.0);
        log::info!(
            "Generation {}/{} finished: best fitness {:.3}",
            self.generation_index,
            self.config.generation_count,
            best
        );

        if self.generation_index >= self.config.generation_count {
            self.sorted_results = std::mem::take(&mut self.population);
            self.state = GenerationState::Finished;
            log::info!(
                "Run finished: {} creatures frozen for inspection",
                self.sorted_results.len()
            );
            return;
        }

        self.cull_and_refill();
        for record in &mut self.population {
            record.creature.set_position(&mut record.scene, SPAWN_POINT);
            record.reset_window();
        }
        self.elapsed_in_generation = 0.0;
        self.clock = 0.0;
    }

    /// Stable descending sort by fitness; ties keep population order.
    fn rank_population(&mut self) {
        self.population
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    /// Keep the top survivors (cloned into fresh scenes, since their old
    /// contexts are being torn down) and refill to the population size by
    /// round-robin mutating them.
    fn cull_and_refill(&mut self) {
        let keep = self.config.survivor_count.min(self.population.len());
        if keep == 0 {
            log::warn!("no survivors to refill from");
            self.population.clear();
            return;
        }
        self.population.truncate(keep);
        let survivors = std::mem::take(&mut self.population);

        let mut next = Vec::with_capacity(self.config.population_size);
        for record in &survivors {
            let mut scene = PhysicsScene::new();
            let creature = record.creature.copy(&mut scene);
            next.push(CreatureRecord::new(creature, scene));
        }

        let mut index = 0;
        while next.len() < self.config.population_size {
            let mut scene = PhysicsScene::new();
            let mutant = survivors[index].creature.mutated(
                &mut scene,
                &mut self.rng,
                self.config.mutation_chance,
                self.config.mutation_severity,
            );
            next.push(CreatureRecord::new(mutant, scene));
            index = (index + 1) % survivors.len();
        }

        self.population = next;
        // survivors drop here, releasing the old simulation contexts
    }

    /// Leave `Finished` (or abandon a run in progress) and return to `Idle`.
    /// Frozen results and the loaded pool are kept.
    pub fn finish(&mut self) {
        self.population.clear();
        self.state = GenerationState::Idle;
        log::info!("Returned to idle");
    }

    // ===== Frozen results =====

    pub fn results_len(&self) -> usize {
        self.sorted_results.len()
    }

    /// Fitness values of the frozen results, best first.
    pub fn result_fitness_ranking(&self) -> Vec<f32> {
        self.sorted_results.iter().map(|r| r.fitness).collect()
    }

    pub fn result_creature(&self, index: usize) -> Result<&Creature, GenerationError> {
        self.sorted_results
            .get(index)
            .map(|record| &record.creature)
            .ok_or(GenerationError::ResultIndexOutOfRange {
                index,
                len: self.sorted_results.len(),
            })
    }

    /// Step one frozen creature for playback, using its own lifetime as the
    /// activation clock.
    pub fn simulate_finished(&mut self, index: usize, dt: f32) -> Result<(), GenerationError> {
        let len = self.sorted_results.len();
        let record = self
            .sorted_results
            .get_mut(index)
            .ok_or(GenerationError::ResultIndexOutOfRange { index, len })?;

        let mut remaining = dt;
        while remaining > 0.0 {
            let step = FIXED_TIME_STEP.min(remaining);
            record.lifetime += step;
            record.creature.activate(&mut record.scene, record.lifetime);
            record.scene.step(step);
            remaining -= step;
        }
        record.creature.update(&record.scene);
        Ok(())
    }

    // ===== Loaded/inspection pool =====

    /// Load a `*.creature` file into the inspection pool. The creature
    /// starts inactive at the spawn point; returns its pool index.
    pub fn load_creature(&mut self, path: impl AsRef<Path>) -> Result<usize, GenerationError> {
        let mut scene = PhysicsScene::new();
        let creature = persistence::load_creature(path, &mut scene)?;
        creature.set_position(&mut scene, SPAWN_POINT);
        let mut record = CreatureRecord::new(creature, scene);
        record.active = false;
        self.loaded.push(record);
        Ok(self.loaded.len() - 1)
    }

    pub fn remove_loaded_creature(&mut self, index: usize) -> Result<(), GenerationError> {
        if index >= self.loaded.len() {
            return Err(GenerationError::LoadedIndexOutOfRange {
                index,
                len: self.loaded.len(),
            });
        }
        self.loaded.remove(index);
        Ok(())
    }

    pub fn loaded_len(&self) -> usize {
        self.loaded.len()
    }

    pub fn set_loaded_active(&mut self, index: usize, active: bool) -> Result<(), GenerationError> {
        self.loaded_mut(index)?.active = active;
        Ok(())
    }

    pub fn set_loaded_position(
        &mut self,
        index: usize,
        position: Vec3,
    ) -> Result<(), GenerationError> {
        let record = self.loaded_mut(index)?;
        record.creature.set_position(&mut record.scene, position);
        Ok(())
    }

    /// Toggle gravity on a loaded creature, as an inspection aid.
    pub fn set_loaded_gravity_enabled(
        &mut self,
        index: usize,
        enabled: bool,
    ) -> Result<(), GenerationError> {
        let record = self.loaded_mut(index)?;
        record.creature.set_gravity_enabled(&mut record.scene, enabled);
        Ok(())
    }

    fn loaded_mut(&mut self, index: usize) -> Result<&mut CreatureRecord, GenerationError> {
        let len = self.loaded.len();
        self.loaded
            .get_mut(index)
            .ok_or(GenerationError::LoadedIndexOutOfRange { index, len })
    }

    // ===== Drawing =====

    /// Instance transforms for the population and the loaded pool.
    pub fn draw_creatures(&self, view_projection: Mat4) -> Vec<PartInstance> {
        self.population
            .iter()
            .chain(self.loaded.iter())
            .flat_map(|record| record.creature.render_instances(view_projection))
            .collect()
    }

    /// Instance transforms for one frozen result.
    pub fn draw_finished_creatures(
        &self,
        index: usize,
        view_projection: Mat4,
    ) -> Result<Vec<PartInstance>, GenerationError> {
        self.sorted_results
            .get(index)
            .map(|record| record.creature.render_instances(view_projection))
            .ok_or(GenerationError::ResultIndexOutOfRange {
                index,
                len: self.sorted_results.len(),
            })
    }
}
