//! The universe object model effects operate on.
//!
//! Only the parts of a game object that content can observe or mutate are
//! modelled: object type, owner, planet size and environment, and meters.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;
use std::fmt;

use crate::fixed::Fixed64;
use crate::id::{EmpireId, ObjectId};

// ---------------------------------------------------------------------------
// Enumerations referenced by content
// ---------------------------------------------------------------------------

/// How habitable a planet is. Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlanetEnvironment {
    Uninhabitable,
    Hostile,
    Poor,
    Adequate,
    Good,
}

impl PlanetEnvironment {
    pub const ALL: [PlanetEnvironment; 5] = [
        PlanetEnvironment::Uninhabitable,
        PlanetEnvironment::Hostile,
        PlanetEnvironment::Poor,
        PlanetEnvironment::Adequate,
        PlanetEnvironment::Good,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlanetEnvironment::Uninhabitable => "Uninhabitable",
            PlanetEnvironment::Hostile => "Hostile",
            PlanetEnvironment::Poor => "Poor",
            PlanetEnvironment::Adequate => "Adequate",
            PlanetEnvironment::Good => "Good",
        }
    }

    /// Look up an environment by its content name. Returns `None` for
    /// unknown names so callers can report them.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

/// Physical planet size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlanetSize {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
    Asteroids,
    GasGiant,
}

impl PlanetSize {
    pub const ALL: [PlanetSize; 7] = [
        PlanetSize::Tiny,
        PlanetSize::Small,
        PlanetSize::Medium,
        PlanetSize::Large,
        PlanetSize::Huge,
        PlanetSize::Asteroids,
        PlanetSize::GasGiant,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlanetSize::Tiny => "Tiny",
            PlanetSize::Small => "Small",
            PlanetSize::Medium => "Medium",
            PlanetSize::Large => "Large",
            PlanetSize::Huge => "Huge",
            PlanetSize::Asteroids => "Asteroids",
            PlanetSize::GasGiant => "GasGiant",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// A numeric per-object quantity that effects can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MeterType {
    Population,
    TargetPopulation,
}

impl MeterType {
    pub const ALL: [MeterType; 2] = [MeterType::Population, MeterType::TargetPopulation];

    pub fn name(self) -> &'static str {
        match self {
            MeterType::Population => "Population",
            MeterType::TargetPopulation => "TargetPopulation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Target meters are recomputed from scratch by every effect pass.
    pub fn is_target(self) -> bool {
        matches!(self, MeterType::TargetPopulation)
    }
}

impl fmt::Display for PlanetEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for PlanetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Habitable size rules
// ---------------------------------------------------------------------------

/// Habitable size per planet size class. A game rule, so it is configurable
/// rather than hard-coded on `PlanetSize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitableSizeTable {
    pub tiny: i32,
    pub small: i32,
    pub medium: i32,
    pub large: i32,
    pub huge: i32,
    pub asteroids: i32,
    pub gas_giant: i32,
}

impl Default for HabitableSizeTable {
    fn default() -> Self {
        Self {
            tiny: 1,
            small: 2,
            medium: 3,
            large: 5,
            huge: 8,
            asteroids: 3,
            gas_giant: 6,
        }
    }
}

impl HabitableSizeTable {
    pub fn get(&self, size: PlanetSize) -> i32 {
        match size {
            PlanetSize::Tiny => self.tiny,
            PlanetSize::Small => self.small,
            PlanetSize::Medium => self.medium,
            PlanetSize::Large => self.large,
            PlanetSize::Huge => self.huge,
            PlanetSize::Asteroids => self.asteroids,
            PlanetSize::GasGiant => self.gas_giant,
        }
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// The coarse type of a universe object, as tested by type conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Planet,
    Building,
}

/// Type-specific object data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Planet {
        size: PlanetSize,
        environment: PlanetEnvironment,
    },
    Building {
        building_type: String,
        planet: ObjectId,
    },
}

/// An object in the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseObject {
    pub name: String,
    pub owner: Option<EmpireId>,
    pub kind: ObjectKind,
    meters: BTreeMap<MeterType, Fixed64>,
}

impl UniverseObject {
    /// Create an unowned planet. Planets carry population meters, starting at zero.
    pub fn planet(name: &str, size: PlanetSize, environment: PlanetEnvironment) -> Self {
        let meters = MeterType::ALL.iter().map(|m| (*m, Fixed64::ZERO)).collect();
        Self {
            name: name.to_string(),
            owner: None,
            kind: ObjectKind::Planet { size, environment },
            meters,
        }
    }

    /// Create an unowned building on `planet`. Buildings have no meters.
    pub fn building(name: &str, building_type: &str, planet: ObjectId) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            kind: ObjectKind::Building {
                building_type: building_type.to_string(),
                planet,
            },
            meters: BTreeMap::new(),
        }
    }

    /// Builder-style owner assignment.
    pub fn owned_by(mut self, empire: EmpireId) -> Self {
        self.owner = Some(empire);
        self
    }

    pub fn object_type(&self) -> ObjectType {
        match self.kind {
            ObjectKind::Planet { .. } => ObjectType::Planet,
            ObjectKind::Building { .. } => ObjectType::Building,
        }
    }

    pub fn environment(&self) -> Option<PlanetEnvironment> {
        match self.kind {
            ObjectKind::Planet { environment, .. } => Some(environment),
            ObjectKind::Building { .. } => None,
        }
    }

    pub fn size(&self) -> Option<PlanetSize> {
        match self.kind {
            ObjectKind::Planet { size, .. } => Some(size),
            ObjectKind::Building { .. } => None,
        }
    }

    /// Current value of a meter, or `None` if this object has no such meter.
    pub fn meter(&self, meter: MeterType) -> Option<Fixed64> {
        self.meters.get(&meter).copied()
    }

    /// Overwrite a meter the object already has. Returns the previous value.
    pub fn set_meter(&mut self, meter: MeterType, value: Fixed64) -> Option<Fixed64> {
        let slot = self.meters.get_mut(&meter)?;
        Some(std::mem::replace(slot, value))
    }
}

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// Errors from universe mutation.
#[derive(Debug, thiserror::Error)]
pub enum UniverseError {
    #[error("object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    #[error("object {object:?} has no {meter} meter")]
    NoSuchMeter { object: ObjectId, meter: MeterType },
}

/// All objects in a game, plus the rules needed to derive object properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Universe {
    objects: SlotMap<ObjectId, UniverseObject>,
    habitable_sizes: HabitableSizeTable,
}

impl Universe {
    pub fn new(habitable_sizes: HabitableSizeTable) -> Self {
        Self {
            objects: SlotMap::with_key(),
            habitable_sizes,
        }
    }

    pub fn insert(&mut self, object: UniverseObject) -> ObjectId {
        self.objects.insert(object)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<UniverseObject> {
        self.objects.remove(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&UniverseObject> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &UniverseObject)> {
        self.objects.iter()
    }

    pub fn habitable_sizes(&self) -> &HabitableSizeTable {
        &self.habitable_sizes
    }

    /// Habitable size of an object. Zero for anything that is not a planet.
    pub fn habitable_size(&self, object: &UniverseObject) -> i32 {
        object
            .size()
            .map(|s| self.habitable_sizes.get(s))
            .unwrap_or(0)
    }

    /// Set a meter on an object. Returns the previous value.
    pub fn set_meter(
        &mut self,
        id: ObjectId,
        meter: MeterType,
        value: Fixed64,
    ) -> Result<Fixed64, UniverseError> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or(UniverseError::ObjectNotFound(id))?;
        object
            .set_meter(meter, value)
            .ok_or(UniverseError::NoSuchMeter { object: id, meter })
    }

    /// Zero every target meter. Run before an effect pass so that target
    /// values are rebuilt from the effects that currently apply.
    pub fn reset_target_meters(&mut self) {
        for (_, object) in self.objects.iter_mut() {
            for (meter, value) in object.meters.iter_mut() {
                if meter.is_target() {
                    *value = Fixed64::ZERO;
                }
            }
        }
    }
}
