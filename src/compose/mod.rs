//! Random spell composition.
//!
//! A `SpellComposer` turns a catalog plus a `{power, wave}` context into
//! an equipped spell: early waves hand out a fixed starter, later waves
//! draw a base spell and up to two modifier wrappers from an injected
//! random source. The same composer serves both kit initialization and
//! reward offers; every call produces an independently owned spell.

use rand::Rng;
use tracing::{debug, warn};

use crate::catalog::{builtin_modifier, builtin_spell, ModifierRecord, SpellCatalog, SpellRecord};
use crate::constants::{STARTER_SPELL_KEY, STARTER_WAVE_MAX, TWO_MODIFIER_CHANCE};
use crate::spell::base::ProjectileSpell;
use crate::spell::modifiers::{ModifierKind, ALL_KINDS};
use crate::spell::{EquippedSpell, Spell};

// =====================================================
// Composer
// =====================================================

/// Inputs the composition policy keys off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposeContext {
    /// Caster power rating, bound as `power` in catalog formulas.
    pub power: f32,
    /// Wave index, bound as `wave` in catalog formulas.
    pub wave: u32,
}

impl ComposeContext {
    pub fn new(power: f32, wave: u32) -> Self {
        Self { power, wave }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("catalog has no base spells to draw from")]
    EmptyCatalog,
    #[error("spell `{key}` is missing from both the catalog and the built-ins")]
    MissingSpell { key: String },
}

/// Draws composed spells from one catalog.
#[derive(Debug, Clone, Default)]
pub struct SpellComposer {
    catalog: SpellCatalog,
}

impl SpellComposer {
    pub fn new(catalog: SpellCatalog) -> Self {
        Self { catalog }
    }

    /// Composer over the compiled-in catalog.
    pub fn builtin() -> Self {
        Self::new(SpellCatalog::builtin())
    }

    pub fn catalog(&self) -> &SpellCatalog {
        &self.catalog
    }

    /// Composes one spell for `ctx`.
    ///
    /// Waves up to [`STARTER_WAVE_MAX`] always yield the plain starter
    /// and leave `rng` untouched. Later waves draw one base spell
    /// uniformly, then zero to two modifier kinds with replacement,
    /// reorder echo and fork into their fixed slots and wrap innermost
    /// first.
    pub fn compose(
        &self,
        ctx: ComposeContext,
        rng: &mut impl Rng,
    ) -> Result<EquippedSpell, ComposeError> {
        let power = ctx.power;
        let wave = ctx.wave as f32;

        if ctx.wave <= STARTER_WAVE_MAX {
            let record = self.starter_record()?;
            let starter = ProjectileSpell::from_record(&record, power, wave);
            debug!("wave {} kit: starter `{}`", ctx.wave, STARTER_SPELL_KEY);
            return Ok(EquippedSpell::new(Box::new(starter)));
        }

        let keys = self.catalog.base_keys();
        if keys.is_empty() {
            return Err(ComposeError::EmptyCatalog);
        }
        let key = keys[rng.gen_range(0..keys.len())];
        let record = &self.catalog.spells[key];

        let count = if rng.gen_bool(TWO_MODIFIER_CHANCE) {
            2
        } else {
            rng.gen_range(0..=1)
        };
        let mut kinds: Vec<ModifierKind> = (0..count)
            .map(|_| ALL_KINDS[rng.gen_range(0..ALL_KINDS.len())])
            .collect();
        relocate_special_kinds(&mut kinds);

        let mut spell: Box<dyn Spell> = Box::new(ProjectileSpell::from_record(record, power, wave));
        for kind in &kinds {
            let record = self.modifier_record(*kind);
            spell = kind.wrap(spell, &record, power, wave);
        }
        debug!(
            "wave {} kit: `{}` with {} modifier(s): {}",
            ctx.wave,
            key,
            kinds.len(),
            spell.name()
        );
        Ok(EquippedSpell::new(spell))
    }

    fn starter_record(&self) -> Result<SpellRecord, ComposeError> {
        if let Some(record) = self.catalog.spell(STARTER_SPELL_KEY) {
            return Ok(record.clone());
        }
        warn!("catalog has no `{STARTER_SPELL_KEY}` entry, using the built-in record");
        builtin_spell(STARTER_SPELL_KEY).ok_or_else(|| ComposeError::MissingSpell {
            key: STARTER_SPELL_KEY.to_string(),
        })
    }

    /// Record for a drawn modifier kind, degrading to the built-in
    /// record when the catalog lacks one.
    fn modifier_record(&self, kind: ModifierKind) -> ModifierRecord {
        if let Some(record) = self.catalog.modifier(kind.key()) {
            return record.clone();
        }
        warn!("catalog has no `{}` entry, using the built-in record", kind.key());
        builtin_modifier(kind.key()).unwrap_or_default()
    }
}

// =====================================================
// Wrap-order fix-up
// =====================================================

/// Reorders drawn kinds before wrapping. Index 0 is the innermost wrap.
///
/// Two sequential steps: the first echo moves to slot 1, then the first
/// fork moves to slot 1. The passes overlap on purpose, so when both
/// kinds are present the fork pass wins the slot and the echo ends up
/// beside it; the net order is the same whichever was drawn first.
fn relocate_special_kinds(kinds: &mut Vec<ModifierKind>) {
    move_first_to_slot_one(kinds, ModifierKind::Echo);
    move_first_to_slot_one(kinds, ModifierKind::Fork);
}

fn move_first_to_slot_one(kinds: &mut Vec<ModifierKind>, kind: ModifierKind) {
    if let Some(index) = kinds.iter().position(|k| *k == kind) {
        let kind = kinds.remove(index);
        let slot = 1.min(kinds.len());
        kinds.insert(slot, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    fn rng(seed: u64) -> Xoshiro256StarStar {
        Xoshiro256StarStar::seed_from_u64(seed)
    }

    #[test]
    fn test_relocation_moves_echo_outward() {
        let mut kinds = vec![ModifierKind::Echo, ModifierKind::Amplify];
        relocate_special_kinds(&mut kinds);
        assert_eq!(kinds, vec![ModifierKind::Amplify, ModifierKind::Echo]);
    }

    #[test]
    fn test_relocation_keeps_settled_echo() {
        let mut kinds = vec![ModifierKind::Swift, ModifierKind::Echo];
        relocate_special_kinds(&mut kinds);
        assert_eq!(kinds, vec![ModifierKind::Swift, ModifierKind::Echo]);
    }

    #[test]
    fn test_relocation_converges_for_echo_and_fork() {
        for drawn in [
            vec![ModifierKind::Echo, ModifierKind::Fork],
            vec![ModifierKind::Fork, ModifierKind::Echo],
        ] {
            let mut kinds = drawn;
            relocate_special_kinds(&mut kinds);
            assert_eq!(kinds, vec![ModifierKind::Echo, ModifierKind::Fork]);
        }
    }

    #[test]
    fn test_relocation_ignores_other_kinds() {
        let mut kinds = vec![ModifierKind::Lob, ModifierKind::Chain];
        relocate_special_kinds(&mut kinds);
        assert_eq!(kinds, vec![ModifierKind::Lob, ModifierKind::Chain]);
    }

    #[test]
    fn test_relocation_handles_short_and_empty_lists() {
        let mut kinds = vec![ModifierKind::Echo];
        relocate_special_kinds(&mut kinds);
        assert_eq!(kinds, vec![ModifierKind::Echo]);

        let mut kinds: Vec<ModifierKind> = Vec::new();
        relocate_special_kinds(&mut kinds);
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_relocation_moves_only_first_duplicate() {
        let mut kinds = vec![ModifierKind::Echo, ModifierKind::Echo];
        relocate_special_kinds(&mut kinds);
        assert_eq!(kinds, vec![ModifierKind::Echo, ModifierKind::Echo]);
    }

    #[test]
    fn test_starter_wave_is_deterministic() {
        let composer = SpellComposer::builtin();
        let ctx = ComposeContext::new(5.0, 1);
        let a = composer.compose(ctx, &mut rng(1)).unwrap();
        let b = composer.compose(ctx, &mut rng(99)).unwrap();
        assert_eq!(a.name(), "Firebolt");
        assert_eq!(a.name(), b.name());
        assert!((a.damage() - 10.0).abs() < f32::EPSILON, "power 2 *");
        assert!((a.damage() - b.damage()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_starter_wave_leaves_rng_untouched() {
        let composer = SpellComposer::builtin();
        let mut used = rng(7);
        composer
            .compose(ComposeContext::new(5.0, 0), &mut used)
            .unwrap();
        composer
            .compose(ComposeContext::new(5.0, 1), &mut used)
            .unwrap();
        let mut fresh = rng(7);
        assert_eq!(used.next_u64(), fresh.next_u64());
    }

    #[test]
    fn test_starter_record_can_come_from_the_catalog() {
        let catalog = SpellCatalog::from_ron_str(
            r#"(
                spells: {
                    "firebolt": (
                        name: "Tuned Firebolt",
                        icon: 9,
                        damage: "99",
                        cost: "1",
                        cooldown: "0.5",
                        speed: "10",
                    ),
                },
            )"#,
        )
        .unwrap();
        let composer = SpellComposer::new(catalog);
        let spell = composer
            .compose(ComposeContext::new(5.0, 1), &mut rng(0))
            .unwrap();
        assert_eq!(spell.name(), "Tuned Firebolt");
        assert!((spell.damage() - 99.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_starter_falls_back_to_builtin_record() {
        let catalog = SpellCatalog::from_ron_str(
            r#"(
                spells: {
                    "zap": (
                        name: "Zap",
                        icon: 4,
                        damage: "1",
                        cost: "1",
                        cooldown: "1",
                        speed: "1",
                    ),
                },
            )"#,
        )
        .unwrap();
        let composer = SpellComposer::new(catalog);
        let spell = composer
            .compose(ComposeContext::new(5.0, 0), &mut rng(0))
            .unwrap();
        assert_eq!(spell.name(), "Firebolt");
    }

    #[test]
    fn test_empty_catalog_is_an_error_past_the_starter_tier() {
        let composer = SpellComposer::new(SpellCatalog::default());
        let err = composer
            .compose(ComposeContext::new(5.0, 4), &mut rng(0))
            .unwrap_err();
        assert!(matches!(err, ComposeError::EmptyCatalog));
    }

    #[test]
    fn test_same_seed_reproduces_the_same_kit() {
        let composer = SpellComposer::builtin();
        let ctx = ComposeContext::new(5.0, 6);
        for seed in 0..16 {
            let a = composer.compose(ctx, &mut rng(seed)).unwrap();
            let b = composer.compose(ctx, &mut rng(seed)).unwrap();
            assert_eq!(a.name(), b.name());
            assert!((a.damage() - b.damage()).abs() < f32::EPSILON);
            assert!((a.cost() - b.cost()).abs() < f32::EPSILON);
            assert!((a.cooldown() - b.cooldown()).abs() < f32::EPSILON);
            assert!((a.speed() - b.speed()).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_composed_kits_draw_from_the_base_set() {
        let composer = SpellComposer::builtin();
        for seed in 0..32 {
            let spell = composer
                .compose(ComposeContext::new(5.0, 5), &mut rng(seed))
                .unwrap();
            let name = spell.name();
            assert!(
                ["Firebolt", "Frost Shard", "Storm Lance"]
                    .iter()
                    .any(|base| name.starts_with(base)),
                "unexpected base in `{name}`"
            );
            assert!(spell.damage().is_finite());
            assert!(spell.cost().is_finite());
        }
    }

    #[test]
    fn test_modifier_count_stays_in_policy_bounds() {
        // Each wrapper appends one parenthesized suffix to the name.
        let composer = SpellComposer::builtin();
        let mut source = rng(42);
        let mut counts = [0u32; 3];
        for _ in 0..4000 {
            let spell = composer
                .compose(ComposeContext::new(5.0, 8), &mut source)
                .unwrap();
            let wrappers = spell.name().matches('(').count();
            assert!(wrappers <= 2, "more than two wrappers on `{}`", spell.name());
            counts[wrappers] += 1;
        }
        let two_share = counts[2] as f64 / 4000.0;
        assert!(
            (0.25..=0.35).contains(&two_share),
            "two-modifier share drifted to {two_share}"
        );
        // The remaining mass splits evenly between zero and one.
        let zero_share = counts[0] as f64 / 4000.0;
        let one_share = counts[1] as f64 / 4000.0;
        assert!((0.30..=0.40).contains(&zero_share), "zero share {zero_share}");
        assert!((0.30..=0.40).contains(&one_share), "one share {one_share}");
    }

    #[test]
    fn test_missing_modifier_record_uses_builtin() {
        let catalog = SpellCatalog::from_ron_str(
            r#"(
                spells: {
                    "firebolt": (
                        name: "Firebolt",
                        icon: 1,
                        damage: "power 2 *",
                        cost: "18",
                        cooldown: "1.2",
                        speed: "14",
                    ),
                },
            )"#,
        )
        .unwrap();
        let composer = SpellComposer::new(catalog);
        let record = composer.modifier_record(ModifierKind::Amplify);
        assert_eq!(record.name, "Amplified");
    }

    #[test]
    fn test_catalog_modifier_record_wins_over_builtin() {
        let catalog = SpellCatalog::from_ron_str(
            r#"(
                spells: {},
                modifiers: {
                    "amplify": (
                        name: "Overloaded",
                        damage_mult: "2.5",
                    ),
                },
            )"#,
        )
        .unwrap();
        let composer = SpellComposer::new(catalog);
        let record = composer.modifier_record(ModifierKind::Amplify);
        assert_eq!(record.name, "Overloaded");
        assert_eq!(record.damage_mult.as_deref(), Some("2.5"));
    }
}
