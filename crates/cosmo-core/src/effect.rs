//! Effects groups and the effect-application pass.
//!
//! An [`EffectsGroup`] pairs a scope [`Condition`] with an ordered list of
//! [`Effect`]s. [`execute_effects`] applies a set of groups to a universe:
//! groups run in ascending priority (ties broken by source name, then by the
//! order they were supplied), each group's scope is evaluated against the
//! universe as it stands when the group runs, and every scoped object is
//! mutated once per group.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::condition::{Condition, ScriptingContext};
use crate::fixed::Fixed64;
use crate::id::{EmpireId, ObjectId};
use crate::universe::{MeterType, Universe};
use crate::value_ref::{EvalContext, ValueRef};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A single state mutation applied to each scoped object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Set a meter to the value of an expression. `Value` inside the
    /// expression reads the meter's current value.
    SetMeter { meter: MeterType, value: ValueRef },
}

impl Effect {
    pub fn set_target_population(value: ValueRef) -> Self {
        Effect::SetMeter {
            meter: MeterType::TargetPopulation,
            value,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetMeter { meter, value } => write!(f, "Set{meter}(value = {value})"),
        }
    }
}

/// A scoped, prioritized list of effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectsGroup {
    pub scope: Condition,
    /// Groups sharing a stacking group apply at most once per target per pass.
    pub stacking_group: Option<String>,
    pub accounting_label: String,
    pub priority: i32,
    pub effects: Vec<Effect>,
}

/// Where an effects group comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSource<'a> {
    /// Owner of the source; `Source.Owner` in scopes.
    pub empire: Option<EmpireId>,
    /// Name of the content item (e.g. a tech) declaring the group.
    pub content_name: &'a str,
}

/// An effects group together with its source, ready to be executed.
#[derive(Debug, Clone, Copy)]
pub struct SourcedEffectsGroup<'a> {
    pub source: EffectSource<'a>,
    pub group: &'a EffectsGroup,
}

/// One meter change made by one group on one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingEntry {
    pub target: ObjectId,
    pub meter: MeterType,
    pub source: String,
    pub accounting_label: String,
    pub delta: Fixed64,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Apply `groups` to `universe` and return what changed.
///
/// Objects without the meter an effect sets are skipped.
pub fn execute_effects(
    universe: &mut Universe,
    groups: &[SourcedEffectsGroup<'_>],
) -> Vec<AccountingEntry> {
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| {
        let (ga, gb) = (&groups[a], &groups[b]);
        ga.group
            .priority
            .cmp(&gb.group.priority)
            .then_with(|| ga.source.content_name.cmp(gb.source.content_name))
    });

    let mut accounting = Vec::new();
    let mut stacked: HashSet<(&str, ObjectId)> = HashSet::new();

    for idx in order {
        let SourcedEffectsGroup { source, group } = groups[idx];
        let targets = {
            let ctx = ScriptingContext::new(universe, source.empire);
            group.scope.eval(&ctx)
        };

        tracing::debug!(
            source = source.content_name,
            priority = group.priority,
            targets = targets.len(),
            "applying effects group"
        );

        for target in targets {
            if let Some(stacking) = group.stacking_group.as_deref()
                && !stacked.insert((stacking, target))
            {
                continue;
            }
            for effect in &group.effects {
                if let Some(entry) = apply_effect(universe, source, group, effect, target) {
                    accounting.push(entry);
                }
            }
        }
    }

    accounting
}

fn apply_effect(
    universe: &mut Universe,
    source: EffectSource<'_>,
    group: &EffectsGroup,
    effect: &Effect,
    target: ObjectId,
) -> Option<AccountingEntry> {
    match effect {
        Effect::SetMeter { meter, value } => {
            let (current, new_value) = {
                let object = universe.get(target)?;
                let current = object.meter(*meter)?;
                let ctx = EvalContext {
                    scripting: ScriptingContext::new(universe, source.empire),
                    target: object,
                    current_value: current,
                };
                (current, value.eval(&ctx))
            };
            universe.set_meter(target, *meter, new_value).ok()?;
            Some(AccountingEntry {
                target,
                meter: *meter,
                source: source.content_name.to_string(),
                accounting_label: group.accounting_label.clone(),
                delta: new_value.saturating_sub(current),
            })
        }
    }
}
