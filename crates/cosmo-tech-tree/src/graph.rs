//! Prerequisite-graph analysis: dependency ordering, cycle detection and
//! redundant-edge detection.
//!
//! Edges run from a tech to each of its prerequisites. All traversals visit
//! names in lexicographic order so results never depend on registration or
//! hash order.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Tech, TechTreeError};

/// A prerequisite edge already implied by another prerequisite of the same
/// tech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundantDependency {
    pub tech: String,
    /// The prerequisite that could be dropped.
    pub prerequisite: String,
    /// The other prerequisite that already requires it.
    pub via: String,
}

/// Order `techs` so every tech follows all of its prerequisites.
///
/// Among techs that are ready at the same time, the lexicographically
/// smallest name comes first, so the result is fully determined by the
/// input set. Fails on the first duplicate name, the first prerequisite
/// missing from the set, or a cycle (reported with its path).
pub fn dependency_order<'a, I>(techs: I) -> Result<Vec<&'a str>, TechTreeError>
where
    I: IntoIterator<Item = &'a Tech>,
{
    let mut by_name: BTreeMap<&'a str, &'a Tech> = BTreeMap::new();
    for tech in techs {
        if by_name.insert(tech.name.as_str(), tech).is_some() {
            return Err(TechTreeError::DuplicateName(tech.name.clone()));
        }
    }

    for tech in by_name.values() {
        if let Some(prereq) = tech
            .prerequisites
            .iter()
            .find(|p| !by_name.contains_key(p.as_str()))
        {
            return Err(TechTreeError::UnresolvedPrerequisite {
                tech: tech.name.clone(),
                prereq: prereq.clone(),
            });
        }
    }

    let mut remaining: BTreeMap<&'a str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
    for (&name, tech) in &by_name {
        remaining.insert(name, tech.prerequisites.len());
        for prereq in &tech.prerequisites {
            dependents.entry(prereq.as_str()).or_default().push(name);
        }
    }

    let mut ready: BTreeSet<&'a str> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(by_name.len());

    while let Some(name) = ready.pop_first() {
        order.push(name);
        for &dependent in dependents.get(name).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < by_name.len() {
        let placed: BTreeSet<&str> = order.iter().copied().collect();
        let blocked = by_name
            .values()
            .copied()
            .filter(|t| !placed.contains(t.name.as_str()));
        let cycle = find_cycle(blocked).unwrap_or_default();
        return Err(TechTreeError::CyclicDependency { cycle });
    }

    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Find one prerequisite cycle among `techs`.
///
/// The returned path starts and ends with the same name, each entry
/// requiring the next. Prerequisites outside the set are ignored.
pub fn find_cycle<'a, I>(techs: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = &'a Tech>,
{
    let by_name: BTreeMap<&str, &Tech> = techs.into_iter().map(|t| (t.name.as_str(), t)).collect();
    let mut state: BTreeMap<&str, Visit> = BTreeMap::new();
    let mut path: Vec<&str> = Vec::new();

    for &start in by_name.keys() {
        if state.contains_key(start) {
            continue;
        }
        if let Some(cycle) = visit(start, &by_name, &mut state, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    name: &'a str,
    by_name: &BTreeMap<&'a str, &'a Tech>,
    state: &mut BTreeMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    state.insert(name, Visit::InProgress);
    path.push(name);

    if let Some(tech) = by_name.get(name) {
        for prereq in &tech.prerequisites {
            let Some((&prereq, _)) = by_name.get_key_value(prereq.as_str()) else {
                continue;
            };
            match state.get(prereq) {
                Some(Visit::Done) => {}
                Some(Visit::InProgress) => {
                    let start = path.iter().position(|n| *n == prereq).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(prereq.to_string());
                    return Some(cycle);
                }
                None => {
                    if let Some(cycle) = visit(prereq, by_name, state, path) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    path.pop();
    state.insert(name, Visit::Done);
    None
}

/// Every prerequisite edge implied by another prerequisite of the same tech.
/// `techs` must form a DAG.
pub fn redundant_dependencies(techs: &BTreeMap<String, Tech>) -> Vec<RedundantDependency> {
    let mut ancestors_cache: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut found = Vec::new();

    for tech in techs.values() {
        for prereq in &tech.prerequisites {
            for other in &tech.prerequisites {
                if other == prereq {
                    continue;
                }
                let implied = ancestors_cache
                    .entry(other.as_str())
                    .or_insert_with(|| ancestors(techs, other));
                if implied.contains(prereq.as_str()) {
                    found.push(RedundantDependency {
                        tech: tech.name.clone(),
                        prerequisite: prereq.clone(),
                        via: other.clone(),
                    });
                    break;
                }
            }
        }
    }
    found
}

/// Every direct or indirect prerequisite of `name`.
fn ancestors<'a>(techs: &'a BTreeMap<String, Tech>, name: &str) -> BTreeSet<&'a str> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&'a str> = techs
        .get(name)
        .map(|t| t.prerequisites.iter().map(String::as_str).collect())
        .unwrap_or_default();
    while let Some(current) = stack.pop() {
        if seen.insert(current)
            && let Some(tech) = techs.get(current)
        {
            stack.extend(tech.prerequisites.iter().map(String::as_str));
        }
    }
    seen
}
