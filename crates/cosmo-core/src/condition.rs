//! Scope conditions: pure predicates over universe objects.
//!
//! Leaves test one property of a candidate object; `And`, `Or` and `Not`
//! compose them. Evaluation never mutates anything.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{EmpireId, ObjectId};
use crate::universe::{ObjectType, PlanetEnvironment, PlanetSize, Universe, UniverseObject};

/// What a condition or value expression can see while it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct ScriptingContext<'a> {
    pub universe: &'a Universe,
    /// Owner of the effect source. For a tech this is the researching empire.
    pub source_owner: Option<EmpireId>,
}

impl<'a> ScriptingContext<'a> {
    pub fn new(universe: &'a Universe, source_owner: Option<EmpireId>) -> Self {
        Self {
            universe,
            source_owner,
        }
    }
}

/// An empire reference inside a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmpireRef {
    /// The empire owning the effect source (`Source.Owner`).
    SourceOwner,
    /// A fixed empire.
    Empire(EmpireId),
}

impl EmpireRef {
    pub fn resolve(&self, ctx: &ScriptingContext<'_>) -> Option<EmpireId> {
        match self {
            EmpireRef::SourceOwner => ctx.source_owner,
            EmpireRef::Empire(id) => Some(*id),
        }
    }
}

/// A predicate over universe objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Matches every object.
    All,
    /// Matches nothing.
    None,
    /// Matches objects of the given type.
    Type(ObjectType),
    /// Matches objects owned by the referenced empire. Never matches when the
    /// reference does not resolve (e.g. an unowned source).
    OwnedBy { empire: EmpireRef },
    /// Matches objects with no owner.
    Unowned,
    /// Matches planets whose environment is one of the listed values.
    PlanetEnvironment(Vec<PlanetEnvironment>),
    /// Matches planets whose size is one of the listed values.
    PlanetSize(Vec<PlanetSize>),
    /// Matches when every operand matches. Empty matches everything.
    And(Vec<Condition>),
    /// Matches when any operand matches. Empty matches nothing.
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn planet() -> Self {
        Condition::Type(ObjectType::Planet)
    }

    pub fn building() -> Self {
        Condition::Type(ObjectType::Building)
    }

    pub fn owned_by(empire: EmpireRef) -> Self {
        Condition::OwnedBy { empire }
    }

    /// Conjunction. Nested `And`s are flattened.
    pub fn and(self, other: Condition) -> Self {
        let mut operands = match self {
            Condition::And(ops) => ops,
            c => vec![c],
        };
        match other {
            Condition::And(ops) => operands.extend(ops),
            c => operands.push(c),
        }
        Condition::And(operands)
    }

    /// Disjunction. Nested `Or`s are flattened.
    pub fn or(self, other: Condition) -> Self {
        let mut operands = match self {
            Condition::Or(ops) => ops,
            c => vec![c],
        };
        match other {
            Condition::Or(ops) => operands.extend(ops),
            c => operands.push(c),
        }
        Condition::Or(operands)
    }

    pub fn negate(self) -> Self {
        match self {
            Condition::Not(inner) => *inner,
            c => Condition::Not(Box::new(c)),
        }
    }

    /// Test a single candidate.
    pub fn matches(&self, ctx: &ScriptingContext<'_>, candidate: &UniverseObject) -> bool {
        match self {
            Condition::All => true,
            Condition::None => false,
            Condition::Type(t) => candidate.object_type() == *t,
            Condition::OwnedBy { empire } => match (empire.resolve(ctx), candidate.owner) {
                (Some(want), Some(have)) => want == have,
                _ => false,
            },
            Condition::Unowned => candidate.owner.is_none(),
            Condition::PlanetEnvironment(envs) => candidate
                .environment()
                .is_some_and(|env| envs.contains(&env)),
            Condition::PlanetSize(sizes) => {
                candidate.size().is_some_and(|size| sizes.contains(&size))
            }
            Condition::And(ops) => ops.iter().all(|c| c.matches(ctx, candidate)),
            Condition::Or(ops) => ops.iter().any(|c| c.matches(ctx, candidate)),
            Condition::Not(inner) => !inner.matches(ctx, candidate),
        }
    }

    /// All objects in the universe matching this condition, in universe order.
    pub fn eval(&self, ctx: &ScriptingContext<'_>) -> Vec<ObjectId> {
        ctx.universe
            .iter()
            .filter(|(_, obj)| self.matches(ctx, obj))
            .map(|(id, _)| id)
            .collect()
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::All => f.write_str("All"),
            Condition::None => f.write_str("None"),
            Condition::Type(ObjectType::Planet) => f.write_str("Planet"),
            Condition::Type(ObjectType::Building) => f.write_str("Building"),
            Condition::OwnedBy {
                empire: EmpireRef::SourceOwner,
            } => f.write_str("OwnedBy(Source.Owner)"),
            Condition::OwnedBy {
                empire: EmpireRef::Empire(id),
            } => write!(f, "OwnedBy({})", id.0),
            Condition::Unowned => f.write_str("Unowned"),
            Condition::PlanetEnvironment(envs) => {
                f.write_str("Planet(environment = [")?;
                write_list(f, envs, ", ")?;
                f.write_str("])")
            }
            Condition::PlanetSize(sizes) => {
                f.write_str("Planet(size = [")?;
                write_list(f, sizes, ", ")?;
                f.write_str("])")
            }
            Condition::And(ops) => {
                f.write_str("(")?;
                write_list(f, ops, " & ")?;
                f.write_str(")")
            }
            Condition::Or(ops) => {
                f.write_str("(")?;
                write_list(f, ops, " | ")?;
                f.write_str(")")
            }
            Condition::Not(inner) => write!(f, "~{inner}"),
        }
    }
}
