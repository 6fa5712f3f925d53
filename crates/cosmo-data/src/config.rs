//! Content configuration: the named constants and game rules content files
//! are resolved against.

use cosmo_core::universe::{HabitableSizeTable, PlanetSize, Universe};
use cosmo_tech_tree::ResearchRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::loader::{DataLoadError, require_finite};

/// Priority used when content names `DEFAULT_PRIORITY`.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Constants and rules used when resolving content. Every field has a
/// default, so a config file only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Multiplier applied to `Scaled` research costs.
    pub tech_cost_multiplier: f64,

    /// Named effects-group priorities. Entries given in a config file are
    /// merged over the defaults.
    #[serde(deserialize_with = "merge_priorities")]
    pub priorities: BTreeMap<String, i32>,

    pub habitable_sizes: HabitableSizeTable,

    /// Every tech costs 1 and takes 1 turn.
    pub cheap_and_fast_research: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            tech_cost_multiplier: 2.0,
            priorities: default_priorities(),
            habitable_sizes: HabitableSizeTable::default(),
            cheap_and_fast_research: false,
        }
    }
}

impl ContentConfig {
    pub fn research_rules(&self) -> ResearchRules {
        ResearchRules {
            cheap_and_fast: self.cheap_and_fast_research,
        }
    }

    pub fn priority(&self, name: &str) -> Option<i32> {
        self.priorities.get(name).copied()
    }

    /// An empty universe using this config's habitable size table.
    pub fn universe(&self) -> Universe {
        Universe::new(self.habitable_sizes.clone())
    }

    /// Check values serde cannot. `file` is only used in error messages.
    pub fn validate(&self, file: &Path) -> Result<(), DataLoadError> {
        require_finite(self.tech_cost_multiplier, "tech_cost_multiplier", file)?;
        Ok(())
    }
}

/// Target population effects run in three stages: flat bonuses before
/// scaling, multipliers, then flat bonuses after scaling.
pub fn default_priorities() -> BTreeMap<String, i32> {
    [
        ("VERY_EARLY_PRIORITY", 10),
        ("TARGET_POPULATION_BEFORE_SCALING_PRIORITY", 20),
        ("TARGET_POPULATION_SCALING_PRIORITY", 30),
        ("TARGET_POPULATION_AFTER_SCALING_PRIORITY", 40),
        ("TARGET_POPULATION_OVERRIDE_PRIORITY", 50),
        ("DEFAULT_PRIORITY", DEFAULT_PRIORITY),
        ("VERY_LATE_PRIORITY", 200),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
}

fn merge_priorities<'de, D>(deserializer: D) -> Result<BTreeMap<String, i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let overrides = BTreeMap::<String, i32>::deserialize(deserializer)?;
    let mut priorities = default_priorities();
    priorities.extend(overrides);
    Ok(priorities)
}
