//! Spell modifier wrappers.
//!
//! Eight decorator kinds, each wrapping any spell with one twist:
//! - Amplify: more damage, more cost
//! - Swift: faster projectiles
//! - Echo: casts a second time after a delay
//! - Fork: two projectiles at offset angles
//! - Lob: arcing flight, a little more damage
//! - Seeker: homing flight, less damage, flat cost surcharge
//! - Concussive: impacts shove the target
//! - Chain: impacts leap to the nearest other hostile
//!
//! Stat contributions are fully data-driven: every kind reads the same
//! formula fields off its catalog record, so the table above is just what
//! the built-in records happen to tune. Behavior parameters (delay,
//! angle, impulse, bounce count) are per-kind.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::catalog::{builtin_modifier, ModifierRecord};
use crate::constants::{
    DEFAULT_CHAIN_BOUNCES, DEFAULT_ECHO_DELAY, DEFAULT_FORK_ANGLE, DEFAULT_KNOCKBACK_IMPULSE,
    FALLBACK_MULT, MAX_CHAIN_BOUNCES, MAX_ECHO_DELAY,
};
use crate::formula;
use crate::spell::{CastArgs, CastContext, ImpactLayer, Spell};
use crate::stats::{StatModifierSet, ValueModifier};
use crate::world::{CastEnv, Trajectory};

// =====================================================
// Modifier kinds
// =====================================================

/// Every modifier the composer can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    Amplify,
    Swift,
    Echo,
    Fork,
    Lob,
    Seeker,
    Concussive,
    Chain,
}

pub const ALL_KINDS: [ModifierKind; 8] = [
    ModifierKind::Amplify,
    ModifierKind::Swift,
    ModifierKind::Echo,
    ModifierKind::Fork,
    ModifierKind::Lob,
    ModifierKind::Seeker,
    ModifierKind::Concussive,
    ModifierKind::Chain,
];

impl ModifierKind {
    /// Catalog key for this kind's record.
    pub fn key(self) -> &'static str {
        match self {
            ModifierKind::Amplify => "amplify",
            ModifierKind::Swift => "swift",
            ModifierKind::Echo => "echo",
            ModifierKind::Fork => "fork",
            ModifierKind::Lob => "lob",
            ModifierKind::Seeker => "seeker",
            ModifierKind::Concussive => "concussive",
            ModifierKind::Chain => "chain",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL_KINDS.iter().find(|kind| kind.key() == key).copied()
    }

    /// Wraps `inner` with this kind's behavior. Record formulas are
    /// resolved once, in field order, against `{power, wave}`; each
    /// resolved stat field joins the bindings under its own name so later
    /// fields can build on it. The wrapper carries plain numbers from
    /// then on.
    pub fn wrap(
        self,
        inner: Box<dyn Spell>,
        record: &ModifierRecord,
        power: f32,
        wave: f32,
    ) -> Box<dyn Spell> {
        let mut vars = HashMap::from([("power", power), ("wave", wave)]);
        let mods = stat_set_from_record(record, &mut vars);
        let behavior = match self {
            ModifierKind::Amplify | ModifierKind::Swift => Behavior::Passive,
            ModifierKind::Echo => Behavior::Echo {
                // Keeps the cast-path sleep inside Duration range.
                delay: behavior_value(record.delay.as_deref(), &vars, DEFAULT_ECHO_DELAY)
                    .min(MAX_ECHO_DELAY),
            },
            ModifierKind::Fork => Behavior::Fork {
                angle: behavior_value(record.angle.as_deref(), &vars, DEFAULT_FORK_ANGLE),
            },
            ModifierKind::Lob => Behavior::Redirect {
                trajectory: Trajectory::Arcing,
            },
            ModifierKind::Seeker => Behavior::Redirect {
                trajectory: Trajectory::Homing,
            },
            ModifierKind::Concussive => Behavior::Concussive {
                impulse: behavior_value(
                    record.impulse.as_deref(),
                    &vars,
                    DEFAULT_KNOCKBACK_IMPULSE,
                ),
            },
            ModifierKind::Chain => Behavior::Chain {
                bounces: bounce_count(record.count.as_deref(), power, wave),
            },
        };
        Box::new(ModifierSpell {
            suffix: record.name.clone(),
            mods,
            behavior,
            inner,
        })
    }

    /// Wraps `inner` using the built-in record for this kind.
    pub fn wrap_builtin(self, inner: Box<dyn Spell>, power: f32, wave: f32) -> Box<dyn Spell> {
        let record = builtin_modifier(self.key()).unwrap_or_default();
        self.wrap(inner, &record, power, wave)
    }
}

// =====================================================
// Record resolution
// =====================================================

/// Resolves an optional behavior formula, keeping the result finite and
/// non-negative. Used for the continuous fields: delays, angles, impulses.
fn behavior_value(field: Option<&str>, vars: &HashMap<&str, f32>, default: f32) -> f32 {
    let value = match field {
        Some(expr) => formula::evaluate_or(expr, vars, default),
        None => default,
    };
    if value.is_finite() {
        value.max(0.0)
    } else {
        default
    }
}

/// Resolves a chain bounce count in the integer domain, clamped to the
/// engine cap. Counts bind `{power, wave}` only; the float-resolved
/// fields would truncate and are kept out.
fn bounce_count(field: Option<&str>, power: f32, wave: f32) -> u32 {
    let vars = HashMap::from([("power", power as i64), ("wave", wave as i64)]);
    let count = match field {
        Some(expr) => formula::evaluate_or(expr, &vars, DEFAULT_CHAIN_BOUNCES as i64),
        None => DEFAULT_CHAIN_BOUNCES as i64,
    };
    count.clamp(0, MAX_CHAIN_BOUNCES as i64) as u32
}

/// Builds a wrapper's stat contributions from its record. Absent fields
/// contribute nothing; multiplies land before the flat cost surcharge.
/// Each resolved value is inserted into `vars` under its field name so
/// later formulas on the same record can reference it.
fn stat_set_from_record(
    record: &ModifierRecord,
    vars: &mut HashMap<&str, f32>,
) -> StatModifierSet {
    let mut set = StatModifierSet::new();
    let mut resolve = |field: Option<&str>, name: &'static str, default: f32| {
        let value = formula::evaluate_or(field?, vars, default);
        vars.insert(name, value);
        Some(value)
    };
    if let Some(value) = resolve(record.damage_mult.as_deref(), "damage_mult", FALLBACK_MULT) {
        set.damage.push(ValueModifier::multiply(value));
    }
    if let Some(value) = resolve(record.cost_mult.as_deref(), "cost_mult", FALLBACK_MULT) {
        set.cost.push(ValueModifier::multiply(value));
    }
    if let Some(value) = resolve(record.cooldown_mult.as_deref(), "cooldown_mult", FALLBACK_MULT) {
        set.cooldown.push(ValueModifier::multiply(value));
    }
    if let Some(value) = resolve(record.speed_mult.as_deref(), "speed_mult", FALLBACK_MULT) {
        set.speed.push(ValueModifier::multiply(value));
    }
    if let Some(value) = resolve(record.cost_add.as_deref(), "cost_add", 0.0) {
        set.cost.push(ValueModifier::add(value));
    }
    set
}

// =====================================================
// Decorator
// =====================================================

/// What a wrapper does beyond shifting stats.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    /// Stats only.
    Passive,
    /// Cast, wait, cast again with the same context.
    Echo { delay: f32 },
    /// Two casts, aims rotated half the spread to each side.
    Fork { angle: f32 },
    /// Override the flight path.
    Redirect { trajectory: Trajectory },
    /// Layer a knockback impulse onto impacts.
    Concussive { impulse: f32 },
    /// Layer bounce re-casts onto impacts.
    Chain { bounces: u32 },
}

/// Decorator around any spell: a display suffix, resolved stat
/// contributions and one kind-specific behavior. Composition nests these
/// around a projectile leaf.
pub struct ModifierSpell {
    inner: Box<dyn Spell>,
    suffix: String,
    mods: StatModifierSet,
    behavior: Behavior,
}

#[async_trait]
impl Spell for ModifierSpell {
    fn name(&self) -> String {
        if self.suffix.is_empty() {
            self.inner.name()
        } else {
            format!("{} ({})", self.inner.name(), self.suffix)
        }
    }

    fn icon(&self) -> u32 {
        self.inner.icon()
    }

    fn damage(&self) -> f32 {
        self.mods.damage.apply(self.inner.damage())
    }

    fn cost(&self) -> f32 {
        self.mods.cost.apply(self.inner.cost())
    }

    fn cooldown(&self) -> f32 {
        self.mods.cooldown.apply(self.inner.cooldown())
    }

    fn speed(&self) -> f32 {
        self.mods.speed.apply(self.inner.speed())
    }

    async fn cast(&self, env: &dyn CastEnv, args: CastArgs, ctx: CastContext) {
        let ctx = ctx.with_layer(&self.mods);
        match self.behavior {
            Behavior::Passive => self.inner.cast(env, args, ctx).await,
            Behavior::Echo { delay } => {
                self.inner.cast(env, args, ctx.clone()).await;
                tokio::time::sleep(Duration::from_secs_f32(delay)).await;
                self.inner.cast(env, args, ctx).await;
            }
            Behavior::Fork { angle } => {
                let half = angle * 0.5;
                let left = CastArgs {
                    origin: args.origin,
                    aim: Vec2::from_angle(half).rotate(args.aim),
                };
                let right = CastArgs {
                    origin: args.origin,
                    aim: Vec2::from_angle(-half).rotate(args.aim),
                };
                self.inner.cast(env, left, ctx.clone()).await;
                self.inner.cast(env, right, ctx).await;
            }
            Behavior::Redirect { trajectory } => {
                self.inner
                    .cast(env, args, ctx.with_trajectory(trajectory))
                    .await
            }
            Behavior::Concussive { impulse } => {
                self.inner
                    .cast(
                        env,
                        args,
                        ctx.with_impact_layer(ImpactLayer::Knockback { impulse }),
                    )
                    .await
            }
            Behavior::Chain { bounces } => {
                self.inner
                    .cast(
                        env,
                        args,
                        ctx.with_impact_layer(ImpactLayer::Chain { bounces }),
                    )
                    .await
            }
        }
    }
}
