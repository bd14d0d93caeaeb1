//! Spell catalog: data definitions for base spells and modifiers.
//!
//! Every stat and behavior knob is stored as a postfix formula string and
//! resolved against `{power, wave}` bindings when a spell is composed:
//! - `SpellRecord` / `ModifierRecord` are the RON document shapes
//! - `SpellCatalog::builtin()` ships complete defaults so the engine runs
//!   without any content files
//! - `validate()` is the strict path: it parses and evaluates every
//!   formula and reports each offending field
//! - lookups never panic; composition degrades missing records to
//!   builtins with a warning at the call site

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::formula::{self, FormulaError};

/// Bindings used by `validate()`. Arbitrary mid-game values; validation
/// only cares that every formula resolves, not what it resolves to.
const VALIDATION_POWER: f32 = 5.0;
const VALIDATION_WAVE: f32 = 2.0;

/// Keys of the built-in base spells, in catalog order.
pub const BUILTIN_SPELL_KEYS: [&str; 3] = ["firebolt", "frost_shard", "storm_lance"];

/// Keys of the built-in modifier records, in catalog order.
pub const BUILTIN_MODIFIER_KEYS: [&str; 8] = [
    "amplify",
    "swift",
    "echo",
    "fork",
    "lob",
    "seeker",
    "concussive",
    "chain",
];

/// One base spell definition. Stat fields are postfix formulas over
/// `{power, wave}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub icon: u32,
    pub damage: String,
    pub cost: String,
    pub cooldown: String,
    pub speed: String,
}

/// One modifier definition. Each field is an optional postfix formula;
/// missing fields fall back to the per-kind engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub damage_mult: Option<String>,
    #[serde(default)]
    pub cost_mult: Option<String>,
    #[serde(default)]
    pub cooldown_mult: Option<String>,
    #[serde(default)]
    pub speed_mult: Option<String>,
    #[serde(default)]
    pub cost_add: Option<String>,
    #[serde(default)]
    pub delay: Option<String>,
    #[serde(default)]
    pub angle: Option<String>,
    #[serde(default)]
    pub impulse: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
}

/// Errors from catalog loading and strict validation. Composition and
/// cast paths never return these; they degrade with warnings instead.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog document: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("spell `{key}` field `{field}`: {source}")]
    BadSpellFormula {
        key: String,
        field: &'static str,
        #[source]
        source: FormulaError,
    },

    #[error("modifier `{key}` field `{field}`: {source}")]
    BadModifierFormula {
        key: String,
        field: &'static str,
        #[source]
        source: FormulaError,
    },
}

/// Registry of spell and modifier definitions, explicitly constructed and
/// handed to the composer. There is no global catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellCatalog {
    #[serde(default)]
    pub spells: HashMap<String, SpellRecord>,
    #[serde(default)]
    pub modifiers: HashMap<String, ModifierRecord>,
}

impl SpellCatalog {
    /// The complete built-in catalog: three base spells and a record for
    /// every modifier kind.
    pub fn builtin() -> Self {
        let spells = BUILTIN_SPELL_KEYS
            .iter()
            .filter_map(|key| Some((key.to_string(), builtin_spell(key)?)))
            .collect();
        let modifiers = BUILTIN_MODIFIER_KEYS
            .iter()
            .filter_map(|key| Some((key.to_string(), builtin_modifier(key)?)))
            .collect();
        Self { spells, modifiers }
    }

    /// Parses a catalog from a RON document. Unknown modifier keys are
    /// kept as-is; `validate()` is the place that complains about them.
    pub fn from_ron_str(document: &str) -> Result<Self, CatalogError> {
        Ok(ron::from_str(document)?)
    }

    /// Reads and parses a catalog file.
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&document)
    }

    pub fn spell(&self, key: &str) -> Option<&SpellRecord> {
        self.spells.get(key)
    }

    pub fn modifier(&self, key: &str) -> Option<&ModifierRecord> {
        self.modifiers.get(key)
    }

    /// Base spell keys in sorted order, so seeded selection is stable
    /// regardless of map iteration order.
    pub fn base_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.spells.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Strict content check: every formula in every record must parse and
    /// evaluate against representative bindings. `count` is checked in
    /// the integer domain the cast path resolves it in. Returns all
    /// offending fields, not just the first.
    pub fn validate(&self) -> Result<(), Vec<CatalogError>> {
        let vars = HashMap::from([("power", VALIDATION_POWER), ("wave", VALIDATION_WAVE)]);
        let int_vars = HashMap::from([
            ("power", VALIDATION_POWER as i64),
            ("wave", VALIDATION_WAVE as i64),
        ]);
        let mut errors = Vec::new();

        let mut spell_keys: Vec<&String> = self.spells.keys().collect();
        spell_keys.sort_unstable();
        for key in spell_keys {
            let record = &self.spells[key];
            let fields = [
                ("damage", &record.damage),
                ("cost", &record.cost),
                ("cooldown", &record.cooldown),
                ("speed", &record.speed),
            ];
            for (field, expr) in fields {
                if let Err(source) = formula::evaluate::<f32>(expr, &vars) {
                    errors.push(CatalogError::BadSpellFormula {
                        key: key.clone(),
                        field,
                        source,
                    });
                }
            }
        }

        let mut modifier_keys: Vec<&String> = self.modifiers.keys().collect();
        modifier_keys.sort_unstable();
        for key in modifier_keys {
            let record = &self.modifiers[key];
            let fields = [
                ("damage_mult", &record.damage_mult),
                ("cost_mult", &record.cost_mult),
                ("cooldown_mult", &record.cooldown_mult),
                ("speed_mult", &record.speed_mult),
                ("cost_add", &record.cost_add),
                ("delay", &record.delay),
                ("angle", &record.angle),
                ("impulse", &record.impulse),
            ];
            for (field, expr) in fields {
                if let Some(expr) = expr {
                    if let Err(source) = formula::evaluate::<f32>(expr, &vars) {
                        errors.push(CatalogError::BadModifierFormula {
                            key: key.clone(),
                            field,
                            source,
                        });
                    }
                }
            }
            if let Some(expr) = &record.count {
                if let Err(source) = formula::evaluate::<i64>(expr, &int_vars) {
                    errors.push(CatalogError::BadModifierFormula {
                        key: key.clone(),
                        field: "count",
                        source,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Built-in record for a base spell key, if it is one of the shipped kinds.
pub fn builtin_spell(key: &str) -> Option<SpellRecord> {
    let record = match key {
        "firebolt" => SpellRecord {
            name: "Firebolt".to_string(),
            description: "A quick dart of flame.".to_string(),
            icon: 1,
            damage: "power 2 *".to_string(),
            cost: "18".to_string(),
            cooldown: "1.2".to_string(),
            speed: "14".to_string(),
        },
        "frost_shard" => SpellRecord {
            name: "Frost Shard".to_string(),
            description: "A heavy sliver of ice that grows with the assault.".to_string(),
            icon: 2,
            damage: "power 1.5 * wave 2 * +".to_string(),
            cost: "22".to_string(),
            cooldown: "1.6".to_string(),
            speed: "11".to_string(),
        },
        "storm_lance" => SpellRecord {
            name: "Storm Lance".to_string(),
            description: "A crackling spear that rewards raw power.".to_string(),
            icon: 3,
            damage: "power 3 * wave +".to_string(),
            cost: "30".to_string(),
            cooldown: "2.2".to_string(),
            speed: "18".to_string(),
        },
        _ => return None,
    };
    Some(record)
}

/// Built-in record for a modifier key, if it is one of the shipped kinds.
pub fn builtin_modifier(key: &str) -> Option<ModifierRecord> {
    let record = match key {
        "amplify" => ModifierRecord {
            name: "Amplified".to_string(),
            description: "Hits harder, costs more.".to_string(),
            damage_mult: Some("1.5".to_string()),
            cost_mult: Some("1.3".to_string()),
            ..Default::default()
        },
        "swift" => ModifierRecord {
            name: "Swift".to_string(),
            description: "Projectiles fly faster.".to_string(),
            speed_mult: Some("1.6".to_string()),
            ..Default::default()
        },
        "echo" => ModifierRecord {
            name: "Echoing".to_string(),
            description: "Casts again after a short delay.".to_string(),
            cost_mult: Some("1.8".to_string()),
            cooldown_mult: Some("1.4".to_string()),
            delay: Some("0.25".to_string()),
            ..Default::default()
        },
        "fork" => ModifierRecord {
            name: "Forked".to_string(),
            description: "Splits into two angled projectiles.".to_string(),
            cost_mult: Some("1.6".to_string()),
            angle: Some("0.35".to_string()),
            ..Default::default()
        },
        "lob" => ModifierRecord {
            name: "Lobbed".to_string(),
            description: "Arcs overhead for a heavier hit.".to_string(),
            damage_mult: Some("1.25".to_string()),
            ..Default::default()
        },
        "seeker" => ModifierRecord {
            name: "Seeking".to_string(),
            description: "Homes in, trading raw damage for a surcharge.".to_string(),
            damage_mult: Some("0.8".to_string()),
            cost_add: Some("12".to_string()),
            ..Default::default()
        },
        "concussive" => ModifierRecord {
            name: "Concussive".to_string(),
            description: "Impacts shove the target back.".to_string(),
            impulse: Some("6 wave 0.5 * +".to_string()),
            ..Default::default()
        },
        "chain" => ModifierRecord {
            name: "Chaining".to_string(),
            description: "Impacts leap to the nearest hostile.".to_string(),
            count: Some("2".to_string()),
            ..Default::default()
        },
        _ => return None,
    };
    Some(record)
}
