//! Spell trait, cast context and the equipped-spell state machine.
//!
//! A composed spell is a chain of decorators around one projectile leaf.
//! Stat queries walk the chain outward-in; casting walks it inward, each
//! layer extending an immutable per-activation `CastContext`:
//! - stat contributions are threaded as data, never injected into shared
//!   stacks, so repeated and overlapping casts cannot leak into each other
//! - `EquippedSpell` is the host-facing handle: it owns the cooldown and
//!   resource gate (Idle -> Activating -> CoolingDown -> Idle) and is the
//!   only place attempts are accepted or rejected

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::stats::StatModifierSet;
use crate::world::{CastEnv, Trajectory};

pub mod base;
pub mod modifiers;

/// One spell behavior in the decorator chain. Leaves emit projectiles;
/// wrappers adjust stats and delegation before handing down the chain.
#[async_trait]
pub trait Spell: Send + Sync {
    /// Display name. Wrappers derive theirs from the wrapped spell.
    fn name(&self) -> String;

    /// Icon index, inherited unchanged through every wrapper.
    fn icon(&self) -> u32;

    fn damage(&self) -> f32;

    fn cost(&self) -> f32;

    fn cooldown(&self) -> f32;

    fn speed(&self) -> f32;

    /// Runs one activation. Wrappers extend `ctx` and delegate inward,
    /// possibly more than once; the leaf resolves final numbers and emits
    /// through `env`.
    async fn cast(&self, env: &dyn CastEnv, args: CastArgs, ctx: CastContext);
}

/// Caster inputs for one activation.
#[derive(Debug, Clone, Copy)]
pub struct CastArgs {
    pub origin: Vec2,
    /// Unit aim direction.
    pub aim: Vec2,
}

/// Impact-time effect layered onto a cast by a wrapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactLayer {
    /// Shove the struck target along the projectile heading.
    Knockback { impulse: f32 },
    /// Re-cast a homing projectile at the nearest other hostile, up to
    /// `bounces` consecutive leaps.
    Chain { bounces: u32 },
}

/// Per-activation state threaded down the delegation chain. Each wrapper
/// receives it by value, extends it and passes it on; nothing here
/// survives the activation.
#[derive(Debug, Clone, Default)]
pub struct CastContext {
    /// Stat contributions of the layers above the current one.
    pub mods: StatModifierSet,
    /// Replacement flight path, when some layer overrides it.
    pub trajectory: Option<Trajectory>,
    /// Impact effects in wrap order, outermost first.
    pub impact_layers: Vec<ImpactLayer>,
}

impl CastContext {
    /// Adds a wrapper's stat contributions. The calling wrapper sits
    /// closer to the leaf than everything already carried, so its
    /// modifiers apply first.
    pub fn with_layer(mut self, own: &StatModifierSet) -> Self {
        self.mods = own.layered_under(&self.mods);
        self
    }

    /// Overrides the flight path. Layers closer to the leaf run later in
    /// the delegation walk, so the innermost override wins.
    pub fn with_trajectory(mut self, trajectory: Trajectory) -> Self {
        self.trajectory = Some(trajectory);
        self
    }

    pub fn with_impact_layer(mut self, layer: ImpactLayer) -> Self {
        self.impact_layers.push(layer);
        self
    }
}

/// Observable phase of an equipped spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastState {
    Idle,
    Activating,
    CoolingDown,
}

/// Outcome of a cast attempt. Rejections are silent no-ops by contract;
/// the variants exist so the host can surface feedback if it wants to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CastAttempt {
    /// The cast ran to completion; the caller deducts `cost`.
    Cast { cost: f32 },
    OnCooldown { remaining: f32 },
    OutOfResource { cost: f32, available: f32 },
}

/// Serializable stat snapshot of a composed spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellSummary {
    pub name: String,
    pub icon: u32,
    pub damage: f32,
    pub cost: f32,
    pub cooldown: f32,
    pub speed: f32,
}

#[derive(Debug)]
struct CastGate {
    in_flight: bool,
    last_cast: Option<Instant>,
}

/// Host-facing handle around one composed spell: stat queries plus the
/// cooldown/resource gate. Every composed spell gets its own handle and
/// its own clock.
pub struct EquippedSpell {
    spell: Box<dyn Spell>,
    gate: Mutex<CastGate>,
}

impl EquippedSpell {
    pub fn new(spell: Box<dyn Spell>) -> Self {
        Self {
            spell,
            gate: Mutex::new(CastGate {
                in_flight: false,
                last_cast: None,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.spell.name()
    }

    pub fn icon(&self) -> u32 {
        self.spell.icon()
    }

    pub fn damage(&self) -> f32 {
        self.spell.damage()
    }

    pub fn cost(&self) -> f32 {
        self.spell.cost()
    }

    pub fn cooldown(&self) -> f32 {
        self.spell.cooldown()
    }

    pub fn speed(&self) -> f32 {
        self.spell.speed()
    }

    pub fn summary(&self) -> SpellSummary {
        SpellSummary {
            name: self.name(),
            icon: self.icon(),
            damage: self.damage(),
            cost: self.cost(),
            cooldown: self.cooldown(),
            speed: self.speed(),
        }
    }

    pub fn state(&self) -> CastState {
        let gate = self.lock_gate();
        if gate.in_flight {
            return CastState::Activating;
        }
        match gate.last_cast {
            Some(last) if last.elapsed().as_secs_f32() < self.spell.cooldown() => {
                CastState::CoolingDown
            }
            _ => CastState::Idle,
        }
    }

    /// Whether a cast attempt would pass the cooldown gate. Resource is
    /// checked per attempt in `try_cast`.
    pub fn is_ready(&self) -> bool {
        self.state() == CastState::Idle
    }

    /// Seconds until the cooldown gate opens. Zero when ready.
    pub fn remaining_cooldown(&self) -> f32 {
        let gate = self.lock_gate();
        match gate.last_cast {
            Some(last) => (self.spell.cooldown() - last.elapsed().as_secs_f32()).max(0.0),
            None => 0.0,
        }
    }

    /// Attempts one activation against `available` resource.
    ///
    /// Rejected attempts change nothing. An accepted attempt stamps the
    /// cooldown at cast start and runs the chain to completion; if the
    /// returned future is dropped mid-flight the stamp stands and the
    /// handle stays usable, with no stat state left behind anywhere.
    pub async fn try_cast(
        &self,
        env: &dyn CastEnv,
        args: CastArgs,
        available: f32,
    ) -> CastAttempt {
        let cost = {
            let mut gate = self.lock_gate();
            let cooldown = self.spell.cooldown();
            if gate.in_flight {
                let remaining = gate
                    .last_cast
                    .map(|last| (cooldown - last.elapsed().as_secs_f32()).max(0.0))
                    .unwrap_or(0.0);
                return CastAttempt::OnCooldown { remaining };
            }
            if let Some(last) = gate.last_cast {
                let elapsed = last.elapsed().as_secs_f32();
                if elapsed < cooldown {
                    return CastAttempt::OnCooldown {
                        remaining: cooldown - elapsed,
                    };
                }
            }
            let cost = self.spell.cost();
            if cost > available {
                return CastAttempt::OutOfResource { cost, available };
            }
            gate.in_flight = true;
            gate.last_cast = Some(Instant::now());
            cost
        };

        debug!("casting `{}` (cost {cost:.1})", self.spell.name());
        let flight = FlightGuard { gate: &self.gate };
        self.spell.cast(env, args, CastContext::default()).await;
        drop(flight);

        CastAttempt::Cast { cost }
    }

    fn lock_gate(&self) -> MutexGuard<'_, CastGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EquippedSpell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquippedSpell")
            .field("name", &self.spell.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when the cast future finishes or is dropped.
struct FlightGuard<'a> {
    gate: &'a Mutex<CastGate>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ValueModifier;
    use crate::world::RecordingEnv;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct StubSpell {
        cost: f32,
        cooldown: f32,
        cast_delay: Duration,
        activations: AtomicU32,
    }

    impl StubSpell {
        fn new(cost: f32, cooldown: f32) -> Self {
            Self {
                cost,
                cooldown,
                cast_delay: Duration::ZERO,
                activations: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Spell for StubSpell {
        fn name(&self) -> String {
            "Stub".to_string()
        }

        fn icon(&self) -> u32 {
            0
        }

        fn damage(&self) -> f32 {
            1.0
        }

        fn cost(&self) -> f32 {
            self.cost
        }

        fn cooldown(&self) -> f32 {
            self.cooldown
        }

        fn speed(&self) -> f32 {
            1.0
        }

        async fn cast(&self, _env: &dyn CastEnv, _args: CastArgs, _ctx: CastContext) {
            if !self.cast_delay.is_zero() {
                tokio::time::sleep(self.cast_delay).await;
            }
            self.activations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn args() -> CastArgs {
        CastArgs {
            origin: Vec2::ZERO,
            aim: Vec2::X,
        }
    }

    #[test]
    fn test_context_with_layer_applies_own_mods_first() {
        let outer = StatModifierSet::new().with_damage(ValueModifier::multiply(2.0));
        let inner = StatModifierSet::new().with_damage(ValueModifier::add(5.0));
        let ctx = CastContext::default().with_layer(&outer).with_layer(&inner);
        // Inner +5 applies before outer x2: (10 + 5) * 2.
        assert!((ctx.mods.damage.apply(10.0) - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_context_innermost_trajectory_wins() {
        let ctx = CastContext::default()
            .with_trajectory(Trajectory::Arcing)
            .with_trajectory(Trajectory::Homing);
        assert_eq!(ctx.trajectory, Some(Trajectory::Homing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cast_then_cooldown_then_ready() {
        let equipped = EquippedSpell::new(Box::new(StubSpell::new(10.0, 1.0)));
        assert_eq!(equipped.state(), CastState::Idle);

        let outcome = equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await;
        assert_eq!(outcome, CastAttempt::Cast { cost: 10.0 });
        assert_eq!(equipped.state(), CastState::CoolingDown);

        let outcome = equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await;
        assert!(matches!(outcome, CastAttempt::OnCooldown { .. }));

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(equipped.state(), CastState::Idle);
        let outcome = equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await;
        assert!(matches!(outcome, CastAttempt::Cast { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_resource_is_a_clean_rejection() {
        let equipped = EquippedSpell::new(Box::new(StubSpell::new(50.0, 1.0)));
        let outcome = equipped.try_cast(&RecordingEnv::new(), args(), 20.0).await;
        assert_eq!(
            outcome,
            CastAttempt::OutOfResource {
                cost: 50.0,
                available: 20.0
            }
        );
        // The rejection consumed nothing: the very next attempt works.
        assert_eq!(equipped.state(), CastState::Idle);
        let outcome = equipped.try_cast(&RecordingEnv::new(), args(), 60.0).await;
        assert!(matches!(outcome, CastAttempt::Cast { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_attempt_keeps_original_stamp() {
        let equipped = EquippedSpell::new(Box::new(StubSpell::new(10.0, 1.0)));
        equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await;

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(matches!(
            equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await,
            CastAttempt::OnCooldown { .. }
        ));

        // 0.6 + 0.5 > 1.0; a re-stamping rejection would still be cooling.
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(equipped.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_cooldown_counts_down() {
        let equipped = EquippedSpell::new(Box::new(StubSpell::new(10.0, 2.0)));
        assert_eq!(equipped.remaining_cooldown(), 0.0);
        equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await;

        tokio::time::advance(Duration::from_millis(500)).await;
        let remaining = equipped.remaining_cooldown();
        assert!(
            (remaining - 1.5).abs() < 0.05,
            "expected about 1.5s left, got {remaining}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_cast_future_leaves_handle_usable() {
        let mut stub = StubSpell::new(10.0, 1.0);
        stub.cast_delay = Duration::from_secs(5);
        let equipped = EquippedSpell::new(Box::new(stub));

        // Cancel the cast while it is suspended inside the chain.
        let cancelled =
            tokio::time::timeout(Duration::from_millis(100), equipped.try_cast(&RecordingEnv::new(), args(), 100.0))
                .await;
        assert!(cancelled.is_err(), "cast should have been cut short");

        // The stamp from the cancelled cast stands, and the handle is not
        // stuck in Activating.
        assert_eq!(equipped.state(), CastState::CoolingDown);
        tokio::time::advance(Duration::from_millis(1000)).await;
        let outcome = equipped.try_cast(&RecordingEnv::new(), args(), 100.0).await;
        assert!(matches!(outcome, CastAttempt::Cast { .. }));
    }
}
