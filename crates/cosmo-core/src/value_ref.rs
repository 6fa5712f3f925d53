//! Numeric value expressions used by effects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::ScriptingContext;
use crate::fixed::{Fixed64, checked_div_64};
use crate::universe::{MeterType, UniverseObject};

/// A property of the effect target that a value expression can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectProperty {
    HabitableSize,
    Population,
    TargetPopulation,
}

impl ObjectProperty {
    pub const ALL: [ObjectProperty; 3] = [
        ObjectProperty::HabitableSize,
        ObjectProperty::Population,
        ObjectProperty::TargetPopulation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectProperty::HabitableSize => "HabitableSize",
            ObjectProperty::Population => "Population",
            ObjectProperty::TargetPopulation => "TargetPopulation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Everything a value expression may read: the scripting context, the
/// current target, and the current value of the quantity being set.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub scripting: ScriptingContext<'a>,
    pub target: &'a UniverseObject,
    pub current_value: Fixed64,
}

/// A value expression. Arithmetic saturates; division by zero yields zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueRef {
    Constant(Fixed64),
    /// The current value of the quantity the enclosing effect sets.
    Value,
    /// A property of the effect target (`Target.<Property>`).
    Target(ObjectProperty),
    Add(Box<ValueRef>, Box<ValueRef>),
    Sub(Box<ValueRef>, Box<ValueRef>),
    Mul(Box<ValueRef>, Box<ValueRef>),
    Div(Box<ValueRef>, Box<ValueRef>),
}

impl ValueRef {
    pub fn constant(v: impl ::fixed::traits::ToFixed) -> Self {
        ValueRef::Constant(Fixed64::saturating_from_num(v))
    }

    pub fn plus(self, rhs: ValueRef) -> Self {
        ValueRef::Add(Box::new(self), Box::new(rhs))
    }

    pub fn minus(self, rhs: ValueRef) -> Self {
        ValueRef::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn times(self, rhs: ValueRef) -> Self {
        ValueRef::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn divided_by(self, rhs: ValueRef) -> Self {
        ValueRef::Div(Box::new(self), Box::new(rhs))
    }

    pub fn eval(&self, ctx: &EvalContext<'_>) -> Fixed64 {
        match self {
            ValueRef::Constant(v) => *v,
            ValueRef::Value => ctx.current_value,
            ValueRef::Target(prop) => read_property(ctx, *prop),
            ValueRef::Add(a, b) => a.eval(ctx).saturating_add(b.eval(ctx)),
            ValueRef::Sub(a, b) => a.eval(ctx).saturating_sub(b.eval(ctx)),
            ValueRef::Mul(a, b) => a.eval(ctx).saturating_mul(b.eval(ctx)),
            ValueRef::Div(a, b) => {
                checked_div_64(a.eval(ctx), b.eval(ctx)).unwrap_or(Fixed64::ZERO)
            }
        }
    }
}

fn read_property(ctx: &EvalContext<'_>, prop: ObjectProperty) -> Fixed64 {
    match prop {
        ObjectProperty::HabitableSize => {
            Fixed64::from_num(ctx.scripting.universe.habitable_size(ctx.target))
        }
        ObjectProperty::Population => ctx
            .target
            .meter(MeterType::Population)
            .unwrap_or(Fixed64::ZERO),
        ObjectProperty::TargetPopulation => ctx
            .target
            .meter(MeterType::TargetPopulation)
            .unwrap_or(Fixed64::ZERO),
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Constant(v) => write!(f, "{v}"),
            ValueRef::Value => f.write_str("Value"),
            ValueRef::Target(p) => write!(f, "Target.{}", p.name()),
            ValueRef::Add(a, b) => write!(f, "({a} + {b})"),
            ValueRef::Sub(a, b) => write!(f, "({a} - {b})"),
            ValueRef::Mul(a, b) => write!(f, "({a} * {b})"),
            ValueRef::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}
