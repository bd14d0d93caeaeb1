use glam::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{info, warn};

use spell_core::catalog::SpellCatalog;
use spell_core::compose::{ComposeContext, SpellComposer};
use spell_core::constants::DEFAULT_RESOURCE_POOL;
use spell_core::spell::{CastArgs, CastAttempt};
use spell_core::world::{EntityId, RecordingEnv};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    println!("🔮 Spell composition demo");

    // ========================================================================
    // 1. Demo parameters from the environment
    // ========================================================================
    let wave: u32 = std::env::var("WAVE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    let power: f32 = std::env::var("POWER")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5.0);
    let seed: u64 = std::env::var("SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7);

    // ========================================================================
    // 2. Catalog: RON file from CATALOG, or the compiled-in set
    // ========================================================================
    let catalog = match std::env::var("CATALOG") {
        Ok(path) => {
            info!("loading catalog from {path}");
            SpellCatalog::load_ron(&path)?
        }
        Err(_) => SpellCatalog::builtin(),
    };
    if let Err(problems) = catalog.validate() {
        for problem in &problems {
            warn!("catalog entry rejected: {problem}");
        }
        anyhow::bail!("catalog failed validation with {} problem(s)", problems.len());
    }

    // ========================================================================
    // 3. Compose a three-slot kit for this wave
    // ========================================================================
    let composer = SpellComposer::new(catalog);
    let ctx = ComposeContext::new(power, wave);
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    info!("composing kit for wave {wave} at power {power} (seed {seed})");

    let mut kit = Vec::new();
    for _ in 0..3 {
        kit.push(composer.compose(ctx, &mut rng)?);
    }
    for spell in &kit {
        println!("{}", serde_json::to_string_pretty(&spell.summary())?);
    }

    // ========================================================================
    // 4. Cast each slot once against a scratch arena
    // ========================================================================
    let args = CastArgs {
        origin: Vec2::ZERO,
        aim: Vec2::X,
    };
    for spell in &kit {
        let env = RecordingEnv::new();
        env.add_hostile(EntityId(1), Vec2::new(8.0, 0.0));
        env.add_hostile(EntityId(2), Vec2::new(8.0, 5.0));

        match spell.try_cast(&env, args, DEFAULT_RESOURCE_POOL).await {
            CastAttempt::Cast { cost } => {
                info!("cast `{}` for {cost:.1} resource", spell.name())
            }
            CastAttempt::OnCooldown { remaining } => {
                info!("`{}` on cooldown for {remaining:.2}s", spell.name())
            }
            CastAttempt::OutOfResource { cost, available } => {
                info!(
                    "`{}` needs {cost:.1} resource, only {available:.1} left",
                    spell.name()
                )
            }
        }
        for spec in env.spawns() {
            info!(
                "  projectile icon {} {:?} dir ({:.2}, {:.2}) speed {:.1} damage {:.1}",
                spec.icon, spec.trajectory, spec.dir.x, spec.dir.y, spec.speed, spec.damage
            );
        }

        // Land the first projectile on the near hostile to show impact
        // effects (knockback shoves, chain bounces).
        let spawned = env.spawns();
        if let Some(first) = spawned.first() {
            env.impact(first, EntityId(1), Vec2::new(8.0, 0.0));
            for (target, amount) in env.damage_events() {
                info!("  impact dealt {amount:.1} to {target:?}");
            }
            for (target, impulse) in env.impulse_events() {
                info!("  impact shoved {target:?} by ({:.2}, {:.2})", impulse.x, impulse.y);
            }
            let bounces = env.spawn_count() - spawned.len();
            if bounces > 0 {
                info!("  chain added {bounces} bounce projectile(s)");
            }
        }

        // An immediate second attempt is rejected by the cooldown gate.
        if let CastAttempt::OnCooldown { remaining } =
            spell.try_cast(&env, args, DEFAULT_RESOURCE_POOL).await
        {
            info!("  gate holds: ready again in {remaining:.2}s");
        }
    }

    Ok(())
}
