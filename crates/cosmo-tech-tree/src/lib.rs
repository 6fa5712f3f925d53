//! Tech tree content registry for the Cosmo engine.
//!
//! Provides the [`Tech`] record (cost, prerequisites, unlockable items and
//! effects groups), tech categories, a two-phase registry
//! ([`TechTreeBuilder`] → [`TechTree`]), prerequisite-graph analysis and
//! per-empire research state.
//!
//! # Overview
//!
//! Techs are registered at content-load time via [`TechTreeBuilder::register`],
//! which rejects records that are malformed on their own (empty name, negative
//! cost, fewer than one research turn) or that reuse a name.
//! [`TechTreeBuilder::build`] then resolves the records against each other:
//! techs naming an unknown category or a missing prerequisite are excluded,
//! prerequisite cycles are excluded, and every problem is returned alongside
//! the usable [`TechTree`] rather than aborting at the first one.
//!
//! The built tree is immutable. Empires track what they have researched in an
//! [`EmpireResearch`], which grants each unlockable item exactly once, and
//! [`ResearchSave`] writes that state to a versioned binary save.

pub mod empire;
pub mod graph;
pub mod save;

pub use empire::{EmpireResearch, ResearchEvent, TechStatus};
pub use graph::{RedundantDependency, dependency_order, find_cycle};
pub use save::{ResearchSave, SaveError};

use cosmo_core::effect::EffectsGroup;
use cosmo_core::fixed::Fixed64;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Unlockable items
// ---------------------------------------------------------------------------

/// The kind of game object an unlock grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnlockableItemType {
    Building,
    ShipPart,
    ShipHull,
    ShipDesign,
    Tech,
    Policy,
}

impl UnlockableItemType {
    pub const ALL: [UnlockableItemType; 6] = [
        UnlockableItemType::Building,
        UnlockableItemType::ShipPart,
        UnlockableItemType::ShipHull,
        UnlockableItemType::ShipDesign,
        UnlockableItemType::Tech,
        UnlockableItemType::Policy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UnlockableItemType::Building => "Building",
            UnlockableItemType::ShipPart => "ShipPart",
            UnlockableItemType::ShipHull => "ShipHull",
            UnlockableItemType::ShipDesign => "ShipDesign",
            UnlockableItemType::Tech => "Tech",
            UnlockableItemType::Policy => "Policy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// A named game object granted to an empire when a tech completes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnlockableItem {
    pub item_type: UnlockableItemType,
    pub name: String,
}

impl UnlockableItem {
    pub fn new(item_type: UnlockableItemType, name: &str) -> Self {
        Self {
            item_type,
            name: name.to_string(),
        }
    }

    pub fn policy(name: &str) -> Self {
        Self::new(UnlockableItemType::Policy, name)
    }
}

impl fmt::Display for UnlockableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item(type = {}, name = \"{}\")", self.item_type.name(), self.name)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A grouping of techs, used for browsing and pedia pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechCategory {
    pub name: String,
    pub graphic: String,
    /// RGBA.
    pub colour: [u8; 4],
}

// ---------------------------------------------------------------------------
// Research rules
// ---------------------------------------------------------------------------

/// Game rules that change how tech costs are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRules {
    /// Every tech costs 1 and takes 1 turn. Used for testing content.
    pub cheap_and_fast: bool,
}

// ---------------------------------------------------------------------------
// Tech definition
// ---------------------------------------------------------------------------

/// A researchable technology. Built at content-load time; immutable after
/// the tree is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tech {
    /// Unique identifier.
    pub name: String,

    /// Localization key for the long description.
    pub description: String,

    /// Localization key for the short description.
    pub short_description: String,

    /// Name of the [`TechCategory`] this tech belongs to.
    pub category: String,

    /// Research points required. Must be non-negative.
    pub research_cost: Fixed64,

    /// Minimum number of turns research takes. Must be at least 1.
    pub research_turns: i32,

    /// Unresearchable techs can only be granted, never queued.
    pub researchable: bool,

    /// Classification labels, stored upper-case.
    pub tags: BTreeSet<String>,

    /// Techs that must be researched first.
    pub prerequisites: BTreeSet<String>,

    /// Items granted on completion, in declaration order.
    pub unlocks: Vec<UnlockableItem>,

    /// Effects applied every turn once researched, in declaration order.
    pub effects_groups: Vec<EffectsGroup>,

    /// Icon path. Not checked for existence.
    pub graphic: String,
}

impl Tech {
    /// A researchable tech with no cost, one research turn, and nothing else.
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            short_description: String::new(),
            category: category.to_string(),
            research_cost: Fixed64::ZERO,
            research_turns: 1,
            researchable: true,
            tags: BTreeSet::new(),
            prerequisites: BTreeSet::new(),
            unlocks: Vec::new(),
            effects_groups: Vec::new(),
            graphic: String::new(),
        }
    }

    pub fn with_cost(mut self, cost: Fixed64, turns: i32) -> Self {
        self.research_cost = cost;
        self.research_turns = turns;
        self
    }

    pub fn with_prerequisites<'a>(mut self, prereqs: impl IntoIterator<Item = &'a str>) -> Self {
        self.prerequisites
            .extend(prereqs.into_iter().map(str::to_string));
        self
    }

    pub fn with_tags<'a>(mut self, tags: impl IntoIterator<Item = &'a str>) -> Self {
        self.tags.extend(tags.into_iter().map(str::to_uppercase));
        self
    }

    pub fn with_unlocks(mut self, unlocks: impl IntoIterator<Item = UnlockableItem>) -> Self {
        self.unlocks.extend(unlocks);
        self
    }

    pub fn with_effects_group(mut self, group: EffectsGroup) -> Self {
        self.effects_groups.push(group);
        self
    }

    /// Case-insensitive tag lookup.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_uppercase())
    }

    /// Check the constraints a record must satisfy on its own.
    pub fn validate(&self) -> Result<(), TechTreeError> {
        if self.name.trim().is_empty() {
            return Err(TechTreeError::EmptyName);
        }
        if self.research_cost < Fixed64::ZERO {
            return Err(TechTreeError::InvalidRange {
                tech: self.name.clone(),
                field: "researchcost",
                value: self.research_cost.to_string(),
            });
        }
        if self.research_turns < 1 {
            return Err(TechTreeError::InvalidRange {
                tech: self.name.clone(),
                field: "researchturns",
                value: self.research_turns.to_string(),
            });
        }
        Ok(())
    }

    /// Effective research cost under `rules`.
    pub fn research_cost(&self, rules: &ResearchRules) -> Fixed64 {
        if rules.cheap_and_fast {
            Fixed64::ONE
        } else {
            self.research_cost
        }
    }

    /// Effective minimum research time under `rules`.
    pub fn research_turns(&self, rules: &ResearchRules) -> i32 {
        if rules.cheap_and_fast {
            1
        } else {
            self.research_turns
        }
    }

    /// Maximum research points that can be spent per turn.
    pub fn per_turn_cost(&self, rules: &ResearchRules) -> Fixed64 {
        let turns = Fixed64::from_num(self.research_turns(rules).max(1));
        self.research_cost(rules) / turns
    }
}

impl fmt::Display for Tech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tech")?;
        writeln!(f, "    name = \"{}\"", self.name)?;
        writeln!(f, "    description = \"{}\"", self.description)?;
        writeln!(f, "    short_description = \"{}\"", self.short_description)?;
        writeln!(f, "    category = \"{}\"", self.category)?;
        writeln!(f, "    researchcost = {}", self.research_cost)?;
        writeln!(f, "    researchturns = {}", self.research_turns)?;
        if !self.researchable {
            writeln!(f, "    researchable = false")?;
        }
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            writeln!(f, "    tags = [\"{}\"]", tags.join("\", \""))?;
        }
        let prereqs: Vec<&str> = self.prerequisites.iter().map(String::as_str).collect();
        if prereqs.is_empty() {
            writeln!(f, "    prerequisites = []")?;
        } else {
            writeln!(f, "    prerequisites = [\"{}\"]", prereqs.join("\", \""))?;
        }
        if self.unlocks.is_empty() {
            writeln!(f, "    unlock = []")?;
        } else {
            writeln!(f, "    unlock = [")?;
            for item in &self.unlocks {
                writeln!(f, "        {item}")?;
            }
            writeln!(f, "    ]")?;
        }
        for group in &self.effects_groups {
            writeln!(f, "    EffectsGroup")?;
            writeln!(f, "        scope = {}", group.scope)?;
            if let Some(stacking) = &group.stacking_group {
                writeln!(f, "        stackinggroup = \"{stacking}\"")?;
            }
            writeln!(f, "        accountinglabel = \"{}\"", group.accounting_label)?;
            writeln!(f, "        priority = {}", group.priority)?;
            for effect in &group.effects {
                writeln!(f, "        effects = {effect}")?;
            }
        }
        write!(f, "    graphic = \"{}\"", self.graphic)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while registering or resolving techs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TechTreeError {
    #[error("tech name must not be empty")]
    EmptyName,

    #[error("duplicate tech name: {0}")]
    DuplicateName(String),

    #[error("duplicate tech category: {0}")]
    DuplicateCategory(String),

    #[error("tech {tech}: {field} out of range ({value})")]
    InvalidRange {
        tech: String,
        field: &'static str,
        value: String,
    },

    #[error("tech {tech} requires missing or rejected tech {prereq}")]
    UnresolvedPrerequisite { tech: String, prereq: String },

    #[error("prerequisite cycle: {}", .cycle.join(" requires "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("tech {tech} names unknown category {category}")]
    UnknownCategory { tech: String, category: String },

    #[error("tech not found: {0}")]
    TechNotFound(String),
}

impl TechTreeError {
    /// Name of the tech the error is about, if there is exactly one.
    pub fn tech_name(&self) -> Option<&str> {
        match self {
            TechTreeError::DuplicateName(name) | TechTreeError::TechNotFound(name) => Some(name),
            TechTreeError::InvalidRange { tech, .. }
            | TechTreeError::UnresolvedPrerequisite { tech, .. }
            | TechTreeError::UnknownCategory { tech, .. } => Some(tech),
            TechTreeError::EmptyName
            | TechTreeError::DuplicateCategory(_)
            | TechTreeError::CyclicDependency { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects techs and categories, then resolves them into a [`TechTree`].
/// Two-phase lifecycle: registration -> build.
#[derive(Debug, Default)]
pub struct TechTreeBuilder {
    techs: BTreeMap<String, Tech>,
    categories: BTreeMap<String, TechCategory>,
    rules: ResearchRules,
}

impl TechTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: ResearchRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Phase 1: register a category. Names must be unique and non-empty.
    pub fn register_category(&mut self, category: TechCategory) -> Result<(), TechTreeError> {
        if category.name.trim().is_empty() {
            return Err(TechTreeError::EmptyName);
        }
        if self.categories.contains_key(&category.name) {
            return Err(TechTreeError::DuplicateCategory(category.name));
        }
        self.categories.insert(category.name.clone(), category);
        Ok(())
    }

    /// Phase 1: register a tech. Checks record-local constraints and name
    /// uniqueness; cross-record checks happen in [`build`](Self::build).
    pub fn register(&mut self, tech: Tech) -> Result<(), TechTreeError> {
        tech.validate()?;
        if self.techs.contains_key(&tech.name) {
            return Err(TechTreeError::DuplicateName(tech.name));
        }
        self.techs.insert(tech.name.clone(), tech);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.techs.contains_key(name)
    }

    pub fn tech_count(&self) -> usize {
        self.techs.len()
    }

    /// Phase 2: resolve techs against each other and freeze the tree.
    ///
    /// Excluded techs and the reason for each exclusion are returned
    /// alongside the tree. Exclusion is transitive: a tech whose
    /// prerequisite was excluded is itself excluded.
    pub fn build(self) -> (TechTree, Vec<TechTreeError>) {
        let TechTreeBuilder {
            mut techs,
            categories,
            rules,
        } = self;
        let mut errors = Vec::new();

        let unknown_category: Vec<String> = techs
            .values()
            .filter(|t| !categories.contains_key(&t.category))
            .map(|t| t.name.clone())
            .collect();
        for name in unknown_category {
            if let Some(tech) = techs.remove(&name) {
                errors.push(TechTreeError::UnknownCategory {
                    tech: tech.name,
                    category: tech.category,
                });
            }
        }

        loop {
            prune_unresolved(&mut techs, &mut errors);
            let Some(cycle) = graph::find_cycle(techs.values()) else {
                break;
            };
            for name in &cycle {
                techs.remove(name);
            }
            errors.push(TechTreeError::CyclicDependency { cycle });
        }

        for name in categories.keys() {
            if !techs.values().any(|t| &t.category == name) {
                tracing::warn!(category = %name, "tech category defined but contains no techs");
            }
        }

        let mut unlocked_techs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for tech in techs.values() {
            for prereq in &tech.prerequisites {
                unlocked_techs
                    .entry(prereq.clone())
                    .or_default()
                    .insert(tech.name.clone());
            }
        }

        let tree = TechTree {
            techs,
            categories,
            unlocked_techs,
            rules,
        };

        for redundant in tree.redundant_dependencies() {
            tracing::warn!(
                tech = %redundant.tech,
                prerequisite = %redundant.prerequisite,
                via = %redundant.via,
                "redundant prerequisite"
            );
        }

        (tree, errors)
    }
}

/// Remove techs with missing prerequisites until none remain.
fn prune_unresolved(techs: &mut BTreeMap<String, Tech>, errors: &mut Vec<TechTreeError>) {
    loop {
        let mut missing: Vec<(String, String)> = Vec::new();
        for tech in techs.values() {
            for prereq in &tech.prerequisites {
                if !techs.contains_key(prereq) {
                    missing.push((tech.name.clone(), prereq.clone()));
                }
            }
        }
        if missing.is_empty() {
            return;
        }
        for (tech, prereq) in missing {
            techs.remove(&tech);
            errors.push(TechTreeError::UnresolvedPrerequisite { tech, prereq });
        }
    }
}

// ---------------------------------------------------------------------------
// TechTree
// ---------------------------------------------------------------------------

/// The resolved, immutable set of techs. Prerequisites always resolve and
/// form a DAG.
#[derive(Debug, Clone, Default)]
pub struct TechTree {
    techs: BTreeMap<String, Tech>,
    categories: BTreeMap<String, TechCategory>,
    /// Reverse prerequisite edges: tech -> techs listing it as a prerequisite.
    unlocked_techs: BTreeMap<String, BTreeSet<String>>,
    rules: ResearchRules,
}

impl TechTree {
    // -- Lookup --

    pub fn get(&self, name: &str) -> Option<&Tech> {
        self.techs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.techs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.techs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techs.is_empty()
    }

    /// All techs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Tech> {
        self.techs.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.techs.keys().map(String::as_str)
    }

    pub fn rules(&self) -> &ResearchRules {
        &self.rules
    }

    pub fn category(&self, name: &str) -> Option<&TechCategory> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = &TechCategory> {
        self.categories.values()
    }

    pub fn names_in_category(&self, category: &str) -> Vec<&str> {
        self.techs
            .values()
            .filter(|t| t.category == category)
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Effective research cost of a tech under this tree's rules.
    pub fn research_cost(&self, name: &str) -> Result<Fixed64, TechTreeError> {
        self.techs
            .get(name)
            .map(|t| t.research_cost(&self.rules))
            .ok_or_else(|| TechTreeError::TechNotFound(name.to_string()))
    }

    // -- Graph queries --

    /// Techs that list `name` as a direct prerequisite.
    pub fn unlocked_techs(&self, name: &str) -> impl Iterator<Item = &str> {
        self.unlocked_techs
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every tech that directly or indirectly requires `name`.
    pub fn all_children(&self, name: &str) -> BTreeSet<&str> {
        let mut children = BTreeSet::new();
        let mut stack: Vec<&str> = self.unlocked_techs(name).collect();
        while let Some(child) = stack.pop() {
            if children.insert(child) {
                stack.extend(self.unlocked_techs(child));
            }
        }
        children
    }

    /// Topological order of every tech, prerequisites first. Ties are
    /// broken by name.
    pub fn dependency_order(&self) -> Result<Vec<&str>, TechTreeError> {
        graph::dependency_order(self.techs.values())
    }

    /// Prerequisite edges implied by another prerequisite of the same tech.
    pub fn redundant_dependencies(&self) -> Vec<RedundantDependency> {
        graph::redundant_dependencies(&self.techs)
    }

    // -- Research planning --

    /// Researchable techs not in `known` whose prerequisites are all in `known`.
    pub fn all_next_techs(&self, known: &BTreeSet<String>) -> Vec<&Tech> {
        self.techs
            .values()
            .filter(|t| self.is_next(t, known))
            .collect()
    }

    /// The cheapest of [`all_next_techs`](Self::all_next_techs). Ties go to
    /// the first name.
    pub fn cheapest_next_tech(&self, known: &BTreeSet<String>) -> Option<&Tech> {
        cheapest(self.all_next_techs(known), &self.rules)
    }

    /// The next techs to research on the way to `desired`: the researchable
    /// frontier inside `desired`'s prerequisite closure.
    pub fn next_techs_towards(&self, known: &BTreeSet<String>, desired: &str) -> Vec<&Tech> {
        let Some(target) = self.techs.get(desired) else {
            return Vec::new();
        };
        if known.contains(desired) {
            return Vec::new();
        }
        let mut closure: BTreeSet<&str> = BTreeSet::new();
        let mut stack = vec![target.name.as_str()];
        while let Some(name) = stack.pop() {
            if known.contains(name) || !closure.insert(name) {
                continue;
            }
            if let Some(tech) = self.techs.get(name) {
                stack.extend(tech.prerequisites.iter().map(String::as_str));
            }
        }
        closure
            .into_iter()
            .filter_map(|name| self.techs.get(name))
            .filter(|t| self.is_next(t, known))
            .collect()
    }

    pub fn cheapest_next_tech_towards(
        &self,
        known: &BTreeSet<String>,
        desired: &str,
    ) -> Option<&Tech> {
        cheapest(self.next_techs_towards(known, desired), &self.rules)
    }

    /// Every direct or indirect prerequisite of `name`, cheapest first (ties
    /// by name). With `known`, techs already known are left out and their
    /// own prerequisites are not followed.
    pub fn recursive_prereqs(&self, name: &str, known: Option<&BTreeSet<String>>) -> Vec<&str> {
        let Some(tech) = self.techs.get(name) else {
            return Vec::new();
        };
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = tech.prerequisites.iter().map(String::as_str).collect();
        while let Some(prereq) = stack.pop() {
            if known.is_some_and(|k| k.contains(prereq)) || !seen.insert(prereq) {
                continue;
            }
            if let Some(t) = self.techs.get(prereq) {
                stack.extend(t.prerequisites.iter().map(String::as_str));
            }
        }
        let mut prereqs: Vec<&Tech> = seen.into_iter().filter_map(|n| self.techs.get(n)).collect();
        prereqs.sort_by(|a, b| {
            a.research_cost(&self.rules)
                .cmp(&b.research_cost(&self.rules))
                .then_with(|| a.name.cmp(&b.name))
        });
        prereqs.into_iter().map(|t| t.name.as_str()).collect()
    }

    fn is_next(&self, tech: &Tech, known: &BTreeSet<String>) -> bool {
        tech.researchable
            && !known.contains(&tech.name)
            && tech.prerequisites.iter().all(|p| known.contains(p))
    }
}

fn cheapest<'a>(techs: Vec<&'a Tech>, rules: &ResearchRules) -> Option<&'a Tech> {
    let mut best: Option<&Tech> = None;
    for tech in techs {
        match best {
            Some(b) if b.research_cost(rules) <= tech.research_cost(rules) => {}
            _ => best = Some(tech),
        }
    }
    best
}

// ===========================================================================
// Tests
// ===========================================================================
