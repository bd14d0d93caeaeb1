//! World boundary.
//!
//! The cast runtime never touches the simulation directly. It hands fully
//! resolved projectile specs and impact effects to the host through
//! `CastEnv`, and the host owns movement, collision and entity lifetime.
//! Tests drive casts against a recording double of this trait.

use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod recording;

pub use recording::RecordingEnv;

/// Opaque handle to a host-side entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Flight path the host simulates for a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trajectory {
    /// Constant velocity along the aim direction.
    Straight,
    /// Ballistic arc toward the aim direction.
    Arcing,
    /// Steers toward the nearest hostile in flight.
    Homing,
}

/// Where and who a projectile hit.
#[derive(Debug, Clone, Copy)]
pub struct ImpactEvent {
    pub target: EntityId,
    pub position: Vec2,
    /// Travel direction at the moment of impact.
    pub heading: Vec2,
}

/// Effect the host runs when a projectile lands. Impacts are resolved
/// synchronously inside the host's own tick, so the hook is plain `Fn`.
pub type ImpactHook = Arc<dyn Fn(&dyn CastEnv, &ImpactEvent) + Send + Sync>;

/// Everything the host needs to simulate one projectile. `damage` is the
/// resolved on-hit number; the impact hook applies it along with any
/// layered effects.
#[derive(Clone)]
pub struct ProjectileSpec {
    pub icon: u32,
    pub trajectory: Trajectory,
    pub origin: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub lifetime: f32,
    pub on_impact: ImpactHook,
}

impl fmt::Debug for ProjectileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectileSpec")
            .field("icon", &self.icon)
            .field("trajectory", &self.trajectory)
            .field("origin", &self.origin)
            .field("dir", &self.dir)
            .field("speed", &self.speed)
            .field("damage", &self.damage)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Host services available to a cast and to impact effects.
pub trait CastEnv: Send + Sync {
    fn spawn_projectile(&self, spec: ProjectileSpec);

    fn deal_damage(&self, target: EntityId, amount: f32);

    fn apply_impulse(&self, target: EntityId, impulse: Vec2);

    /// Closest hostile to `from`, excluding `exclude` (the entity a chain
    /// bounce just struck). `None` when no hostile is alive.
    fn nearest_hostile(&self, from: Vec2, exclude: Option<EntityId>)
        -> Option<(EntityId, Vec2)>;
}
