//! Arena Game - Spell Composition Core
//!
//! This crate provides the deterministic spell logic for the arena game:
//! - Postfix formula evaluation (catalog-driven balance numbers)
//! - Stat modifier stacking (additive/multiplicative fold)
//! - Spell catalog (RON definitions, built-in defaults, validation)
//! - Decorator spell composition (base + random modifier chain)
//! - Async cast runtime (cooldown state machine, projectile emission)
//! - World boundary trait for the host game loop

pub mod catalog;
pub mod compose;
pub mod constants;
pub mod formula;
pub mod spell;
pub mod stats;
pub mod world;
