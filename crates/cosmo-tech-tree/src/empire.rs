//! Per-empire research state.
//!
//! Newly researched techs are queued with [`EmpireResearch::add_newly_researched`]
//! and take effect at the next [`EmpireResearch::apply_new_techs`], which
//! records the completion turn, grants every unlockable item once and emits
//! events. Researched techs contribute their effects groups to the effects
//! pass through [`EmpireResearch::active_effects_groups`].

use std::collections::{BTreeMap, BTreeSet};

use cosmo_core::effect::{EffectSource, SourcedEffectsGroup};
use cosmo_core::fixed::Turn;
use cosmo_core::id::EmpireId;
use serde::{Deserialize, Serialize};

use crate::{TechTree, TechTreeError, UnlockableItem, UnlockableItemType};

/// Where a tech stands for one empire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TechStatus {
    /// No prerequisite researched yet, or the tech can never be queued.
    Unresearchable,
    /// Some but not all prerequisites researched.
    HasResearchedPrereq,
    /// Every prerequisite researched.
    Researchable,
    Complete,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted while applying newly researched techs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchEvent {
    TechResearched { tech: String, turn: Turn },
    ItemUnlocked {
        item: UnlockableItem,
        /// The tech whose completion granted the item.
        tech: String,
        turn: Turn,
    },
}

// ---------------------------------------------------------------------------
// EmpireResearch
// ---------------------------------------------------------------------------

/// Research progress of a single empire. Fully serializable for save/load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmpireResearch {
    empire: EmpireId,

    /// Researched techs and the turn each was applied.
    researched: BTreeMap<String, Turn>,

    /// Techs researched or granted this turn, not yet applied.
    newly_researched: BTreeSet<String>,

    /// Items granted by researched techs.
    unlocked: BTreeMap<UnlockableItemType, BTreeSet<String>>,

    /// Events emitted since last drain. Not serialized (transient).
    #[serde(skip)]
    events: Vec<ResearchEvent>,
}

impl EmpireResearch {
    pub fn new(empire: EmpireId) -> Self {
        Self {
            empire,
            researched: BTreeMap::new(),
            newly_researched: BTreeSet::new(),
            unlocked: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn empire(&self) -> EmpireId {
        self.empire
    }

    // -- Queries --

    pub fn is_researched(&self, tech: &str) -> bool {
        self.researched.contains_key(tech)
    }

    /// Turn the tech was applied, if researched.
    pub fn researched_turn(&self, tech: &str) -> Option<Turn> {
        self.researched.get(tech).copied()
    }

    /// Names of every researched tech, for the tree's planning queries.
    pub fn researched_techs(&self) -> BTreeSet<String> {
        self.researched.keys().cloned().collect()
    }

    pub fn newly_researched(&self) -> impl Iterator<Item = &str> {
        self.newly_researched.iter().map(String::as_str)
    }

    pub fn tech_status(&self, tree: &TechTree, name: &str) -> Result<TechStatus, TechTreeError> {
        let tech = tree
            .get(name)
            .ok_or_else(|| TechTreeError::TechNotFound(name.to_string()))?;
        if self.is_researched(name) {
            return Ok(TechStatus::Complete);
        }
        if !tech.researchable {
            return Ok(TechStatus::Unresearchable);
        }
        let done = tech
            .prerequisites
            .iter()
            .filter(|p| self.is_researched(p))
            .count();
        Ok(if done == tech.prerequisites.len() {
            TechStatus::Researchable
        } else if done > 0 {
            TechStatus::HasResearchedPrereq
        } else {
            TechStatus::Unresearchable
        })
    }

    pub fn is_unlocked(&self, item_type: UnlockableItemType, name: &str) -> bool {
        self.unlocked
            .get(&item_type)
            .is_some_and(|names| names.contains(name))
    }

    pub fn policy_available(&self, name: &str) -> bool {
        self.is_unlocked(UnlockableItemType::Policy, name)
    }

    pub fn available_policies(&self) -> impl Iterator<Item = &str> {
        self.unlocked_of(UnlockableItemType::Policy)
    }

    pub fn unlocked_of(&self, item_type: UnlockableItemType) -> impl Iterator<Item = &str> {
        self.unlocked
            .get(&item_type)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    // -- Mutation --

    /// Queue a tech to be applied at the next [`apply_new_techs`](Self::apply_new_techs).
    /// Prerequisites are not checked, so this also serves for granted techs.
    ///
    /// Returns `false` if the tech is already researched or queued.
    pub fn add_newly_researched(&mut self, tree: &TechTree, name: &str) -> Result<bool, TechTreeError> {
        if !tree.contains(name) {
            return Err(TechTreeError::TechNotFound(name.to_string()));
        }
        if self.is_researched(name) {
            return Ok(false);
        }
        Ok(self.newly_researched.insert(name.to_string()))
    }

    /// Apply every queued tech: mark it researched at `turn` and grant its
    /// unlocks. Unlocked techs are applied in the same call. Calling again
    /// with nothing queued changes nothing.
    ///
    /// Returns the techs applied, in the order they were applied.
    pub fn apply_new_techs(&mut self, tree: &TechTree, turn: Turn) -> Vec<String> {
        let mut applied = Vec::new();
        let mut queue: Vec<String> = std::mem::take(&mut self.newly_researched)
            .into_iter()
            .rev()
            .collect();

        while let Some(name) = queue.pop() {
            if self.is_researched(&name) {
                continue;
            }
            let Some(tech) = tree.get(&name) else {
                tracing::warn!(empire = %self.empire, tech = %name, "queued tech not in tree");
                continue;
            };
            self.researched.insert(name.clone(), turn);
            self.events.push(ResearchEvent::TechResearched {
                tech: name.clone(),
                turn,
            });
            tracing::debug!(empire = %self.empire, tech = %name, turn, "tech researched");

            for item in &tech.unlocks {
                let fresh = self
                    .unlocked
                    .entry(item.item_type)
                    .or_default()
                    .insert(item.name.clone());
                if !fresh {
                    continue;
                }
                self.events.push(ResearchEvent::ItemUnlocked {
                    item: item.clone(),
                    tech: name.clone(),
                    turn,
                });
                if item.item_type == UnlockableItemType::Tech && !self.is_researched(&item.name) {
                    queue.push(item.name.clone());
                }
            }
            applied.push(name);
        }
        applied
    }

    /// Effects groups of every researched tech, sourced from this empire, in
    /// tech-name order then declaration order.
    pub fn active_effects_groups<'a>(&'a self, tree: &'a TechTree) -> Vec<SourcedEffectsGroup<'a>> {
        self.researched
            .keys()
            .filter_map(|name| tree.get(name))
            .flat_map(|tech| {
                tech.effects_groups.iter().map(move |group| SourcedEffectsGroup {
                    source: EffectSource {
                        empire: Some(self.empire),
                        content_name: tech.name.as_str(),
                    },
                    group,
                })
            })
            .collect()
    }

    // -- Event API --

    /// Drain all pending events. Returns events and clears the internal list.
    pub fn drain_events(&mut self) -> Vec<ResearchEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[ResearchEvent] {
        &self.events
    }
}
