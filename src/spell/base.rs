//! Projectile leaf spell.
//!
//! The innermost link of every composed chain. Base numbers come from a
//! catalog record resolved once at construction; per-activation modifiers
//! arrive through the cast context and are folded over those bases when
//! the projectile is emitted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::SpellRecord;
use crate::constants::{
    DEFAULT_PROJECTILE_LIFETIME, FALLBACK_COOLDOWN, FALLBACK_COST, FALLBACK_DAMAGE, FALLBACK_SPEED,
};
use crate::formula;
use crate::spell::{CastArgs, CastContext, ImpactLayer, Spell};
use crate::stats::StatModifierSet;
use crate::world::{CastEnv, ImpactHook, ProjectileSpec, Trajectory};

/// Leaf spell that fires a single projectile.
#[derive(Debug, Clone)]
pub struct ProjectileSpell {
    name: String,
    icon: u32,
    base_damage: f32,
    base_cost: f32,
    base_cooldown: f32,
    base_speed: f32,
    /// Contributions attached to this spell itself, before anything the
    /// activation carries in. Empty unless the host enchants the base.
    mods: StatModifierSet,
}

impl ProjectileSpell {
    pub fn new(
        name: impl Into<String>,
        icon: u32,
        damage: f32,
        cost: f32,
        cooldown: f32,
        speed: f32,
    ) -> Self {
        Self {
            name: name.into(),
            icon,
            base_damage: damage,
            base_cost: cost,
            base_cooldown: cooldown,
            base_speed: speed,
            mods: StatModifierSet::new(),
        }
    }

    /// Resolves a catalog record against `{power, wave}`. Malformed
    /// formulas degrade to engine fallbacks with a warning.
    pub fn from_record(record: &SpellRecord, power: f32, wave: f32) -> Self {
        let vars = HashMap::from([("power", power), ("wave", wave)]);
        Self {
            name: record.name.clone(),
            icon: record.icon,
            base_damage: formula::evaluate_or(&record.damage, &vars, FALLBACK_DAMAGE),
            base_cost: formula::evaluate_or(&record.cost, &vars, FALLBACK_COST),
            base_cooldown: formula::evaluate_or(&record.cooldown, &vars, FALLBACK_COOLDOWN),
            base_speed: formula::evaluate_or(&record.speed, &vars, FALLBACK_SPEED),
            mods: StatModifierSet::new(),
        }
    }

    pub fn with_mods(mut self, mods: StatModifierSet) -> Self {
        self.mods = mods;
        self
    }
}

#[async_trait]
impl Spell for ProjectileSpell {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn icon(&self) -> u32 {
        self.icon
    }

    fn damage(&self) -> f32 {
        self.mods.damage.apply(self.base_damage)
    }

    fn cost(&self) -> f32 {
        self.mods.cost.apply(self.base_cost)
    }

    fn cooldown(&self) -> f32 {
        self.mods.cooldown.apply(self.base_cooldown)
    }

    fn speed(&self) -> f32 {
        self.mods.speed.apply(self.base_speed)
    }

    async fn cast(&self, env: &dyn CastEnv, args: CastArgs, ctx: CastContext) {
        let mods = self.mods.layered_under(&ctx.mods);
        let damage = mods.damage.apply(self.base_damage);
        let speed = mods.speed.apply(self.base_speed);
        let trajectory = ctx.trajectory.unwrap_or(Trajectory::Straight);

        // Activation spans at least one scheduler tick.
        tokio::task::yield_now().await;

        env.spawn_projectile(ProjectileSpec {
            icon: self.icon,
            trajectory,
            origin: args.origin,
            dir: args.aim,
            speed,
            damage,
            lifetime: DEFAULT_PROJECTILE_LIFETIME,
            on_impact: build_impact_hook(self.icon, speed, damage, &ctx.impact_layers),
        });
    }
}

/// Builds the on-hit effect for one projectile: deal the resolved damage,
/// then run each layered effect in wrap order. Chain layers rebuild the
/// hook with one less bounce, so recursion is bounded by the count.
fn build_impact_hook(icon: u32, speed: f32, damage: f32, layers: &[ImpactLayer]) -> ImpactHook {
    let layers: Arc<[ImpactLayer]> = layers.into();
    Arc::new(move |env, event| {
        env.deal_damage(event.target, damage);
        for layer in layers.iter() {
            match *layer {
                ImpactLayer::Knockback { impulse } => {
                    let push = event.heading.normalize_or_zero() * impulse;
                    env.apply_impulse(event.target, push);
                }
                ImpactLayer::Chain { bounces } if bounces > 0 => {
                    let Some((_, next_pos)) =
                        env.nearest_hostile(event.position, Some(event.target))
                    else {
                        continue;
                    };
                    let next_layers: Vec<ImpactLayer> = layers
                        .iter()
                        .map(|layer| match *layer {
                            ImpactLayer::Chain { bounces } => ImpactLayer::Chain {
                                bounces: bounces.saturating_sub(1),
                            },
                            other => other,
                        })
                        .collect();
                    env.spawn_projectile(ProjectileSpec {
                        icon,
                        trajectory: Trajectory::Homing,
                        origin: event.position,
                        dir: (next_pos - event.position).normalize_or_zero(),
                        speed,
                        damage,
                        lifetime: DEFAULT_PROJECTILE_LIFETIME,
                        on_impact: build_impact_hook(icon, speed, damage, &next_layers),
                    });
                }
                ImpactLayer::Chain { .. } => {}
            }
        }
    })
}
