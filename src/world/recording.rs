//! Recording double for the world boundary.
//!
//! Hosts integrate against `CastEnv`; this in-memory implementation
//! records every call so integrations and the crate's own tests can
//! assert on what a cast actually emitted.

use std::sync::{Mutex, MutexGuard, PoisonError};

use glam::Vec2;

use super::{CastEnv, EntityId, ImpactEvent, ProjectileSpec};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `CastEnv` that records spawns, damage and impulses instead of
/// simulating them. Hostiles are seeded up front for homing and chain
/// queries.
#[derive(Default)]
pub struct RecordingEnv {
    spawns: Mutex<Vec<ProjectileSpec>>,
    damage: Mutex<Vec<(EntityId, f32)>>,
    impulses: Mutex<Vec<(EntityId, Vec2)>>,
    hostiles: Mutex<Vec<(EntityId, Vec2)>>,
}

impl RecordingEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hostile(&self, id: EntityId, position: Vec2) {
        lock(&self.hostiles).push((id, position));
    }

    pub fn spawn_count(&self) -> usize {
        lock(&self.spawns).len()
    }

    pub fn spawns(&self) -> Vec<ProjectileSpec> {
        lock(&self.spawns).clone()
    }

    pub fn damage_events(&self) -> Vec<(EntityId, f32)> {
        lock(&self.damage).clone()
    }

    pub fn impulse_events(&self) -> Vec<(EntityId, Vec2)> {
        lock(&self.impulses).clone()
    }

    /// Runs a recorded projectile's impact hook as if it struck `target`
    /// at `position`, heading the way it was fired.
    pub fn impact(&self, spec: &ProjectileSpec, target: EntityId, position: Vec2) {
        let event = ImpactEvent {
            target,
            position,
            heading: spec.dir,
        };
        (spec.on_impact)(self, &event);
    }
}

impl CastEnv for RecordingEnv {
    fn spawn_projectile(&self, spec: ProjectileSpec) {
        lock(&self.spawns).push(spec);
    }

    fn deal_damage(&self, target: EntityId, amount: f32) {
        lock(&self.damage).push((target, amount));
    }

    fn apply_impulse(&self, target: EntityId, impulse: Vec2) {
        lock(&self.impulses).push((target, impulse));
    }

    fn nearest_hostile(
        &self,
        from: Vec2,
        exclude: Option<EntityId>,
    ) -> Option<(EntityId, Vec2)> {
        lock(&self.hostiles)
            .iter()
            .filter(|(id, _)| Some(*id) != exclude)
            .min_by(|a, b| {
                a.1.distance_squared(from)
                    .total_cmp(&b.1.distance_squared(from))
            })
            .copied()
    }
}
