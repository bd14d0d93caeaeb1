//! Centralized tuning constants for the spell composition core.
//!
//! Eliminates magic numbers duplicated across composition and cast paths.
//! Per-record numbers (base spell stats, modifier magnitudes) live in the
//! catalog as formula strings; these are the engine-side fallbacks and
//! policy knobs.

// =====================================================
// Composition policy
// =====================================================

/// Chance that a composed spell receives exactly two modifiers.
/// The remaining probability mass is split evenly between zero and one.
pub const TWO_MODIFIER_CHANCE: f64 = 0.3;

/// Highest wave that still deals the deterministic starter spell.
pub const STARTER_WAVE_MAX: u32 = 1;

/// Catalog key of the starter base spell.
pub const STARTER_SPELL_KEY: &str = "firebolt";

// =====================================================
// Stat fallbacks (used when a catalog formula fails to resolve)
// =====================================================

/// Fallback damage when a spell record's damage formula is malformed.
pub const FALLBACK_DAMAGE: f32 = 10.0;

/// Fallback resource cost when a cost formula is malformed.
pub const FALLBACK_COST: f32 = 20.0;

/// Fallback cooldown in seconds when a cooldown formula is malformed.
pub const FALLBACK_COOLDOWN: f32 = 1.5;

/// Fallback projectile speed when a speed formula is malformed.
pub const FALLBACK_SPEED: f32 = 12.0;

/// Fallback multiplier for malformed modifier scaling formulas.
/// Identity, so a broken record degrades to a no-op contribution.
pub const FALLBACK_MULT: f32 = 1.0;

// =====================================================
// Modifier behavior defaults
// =====================================================

/// Default delay between echo repeats, in seconds.
pub const DEFAULT_ECHO_DELAY: f32 = 0.25;

/// Upper bound on the echo delay in seconds, whatever the catalog says.
pub const MAX_ECHO_DELAY: f32 = 5.0;

/// Default full spread angle between forked projectiles, in radians.
pub const DEFAULT_FORK_ANGLE: f32 = 0.35;

/// Default knockback impulse magnitude.
pub const DEFAULT_KNOCKBACK_IMPULSE: f32 = 6.0;

/// Default number of chain bounces.
pub const DEFAULT_CHAIN_BOUNCES: u32 = 2;

/// Upper bound on chain bounces, whatever the catalog says.
pub const MAX_CHAIN_BOUNCES: u32 = 8;

// =====================================================
// Cast defaults
// =====================================================

/// Resource pool assumed when the caller does not supply one.
pub const DEFAULT_RESOURCE_POOL: f32 = 100.0;

/// Projectile lifetime in seconds when a spec does not set one.
pub const DEFAULT_PROJECTILE_LIFETIME: f32 = 3.0;
