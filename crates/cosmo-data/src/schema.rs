//! Serde data file structs for content definitions.
//!
//! These structs define the on-disk format for techs and tech categories.
//! They are deserialized from RON, JSON, or TOML data files and then resolved
//! into engine types by [`crate::content`]. Symbolic values (environments,
//! sizes, unlock types, object properties) stay strings here so that an
//! unknown value is reported with its file rather than as a parse error.

use serde::{Deserialize, Deserializer};

// ===========================================================================
// Helpers
// ===========================================================================

/// A field that accepts either a single value or a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Reads a present optional field without requiring RON's `Some(...)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ===========================================================================
// Techs
// ===========================================================================

/// A tech definition in a data file. One tech per file.
#[derive(Debug, Clone, Deserialize)]
pub struct TechData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    pub category: String,
    pub researchcost: CostData,
    pub researchturns: i32,
    #[serde(default = "default_true")]
    pub researchable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prerequisites: OneOrMany<String>,
    #[serde(default)]
    pub unlock: Vec<UnlockData>,
    #[serde(default)]
    pub effectsgroups: Vec<EffectsGroupData>,
    #[serde(default)]
    pub graphic: String,
}

/// A research cost, either as written or multiplied by the configured
/// `tech_cost_multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum CostData {
    Flat(f64),
    Scaled(f64),
}

/// An item granted when the tech completes.
#[derive(Debug, Clone, Deserialize)]
pub struct UnlockData {
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
}

// ===========================================================================
// Effects groups
// ===========================================================================

/// An effects group in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct EffectsGroupData {
    pub scope: ConditionData,
    #[serde(default, deserialize_with = "present")]
    pub stackinggroup: Option<String>,
    #[serde(default)]
    pub accountinglabel: String,
    /// Required; optional here only so its absence can be reported by name.
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<PriorityData>,
    #[serde(default)]
    pub effects: Vec<EffectData>,
}

/// A priority, either literal or a named constant from the content config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriorityData {
    Value(i32),
    Named(String),
}

/// An empire reference in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EmpireRefData {
    SourceOwner,
    Empire(u32),
}

/// A scope condition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub enum ConditionData {
    All,
    None,
    Planet,
    Building,
    OwnedBy { empire: EmpireRefData },
    Unowned,
    PlanetEnvironment(Vec<String>),
    PlanetSize(Vec<String>),
    And(Vec<ConditionData>),
    Or(Vec<ConditionData>),
    Not(Box<ConditionData>),
}

/// A value expression in a data file.
#[derive(Debug, Clone, Deserialize)]
pub enum ValueRefData {
    Constant(f64),
    Value,
    Target(String),
    Add(Box<ValueRefData>, Box<ValueRefData>),
    Sub(Box<ValueRefData>, Box<ValueRefData>),
    Mul(Box<ValueRefData>, Box<ValueRefData>),
    Div(Box<ValueRefData>, Box<ValueRefData>),
}

/// An effect in a data file.
#[derive(Debug, Clone, Deserialize)]
pub enum EffectData {
    SetTargetPopulation { value: ValueRefData },
    SetMeter { meter: String, value: ValueRefData },
}

// ===========================================================================
// Categories
// ===========================================================================

/// A tech category definition.
#[derive(Debug, Clone, Deserialize)]
pub struct TechCategoryData {
    pub name: String,
    #[serde(default)]
    pub graphic: String,
    #[serde(default = "default_colour")]
    pub colour: [u8; 4],
}

fn default_colour() -> [u8; 4] {
    [255, 255, 255, 255]
}

// ===========================================================================
// Tests
// ===========================================================================
