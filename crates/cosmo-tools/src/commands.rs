//! Subcommand implementations. Each returns the lines to print so the binary
//! stays a thin shell over them.

use cosmo_core::fixed::fixed64_to_f64;
use cosmo_data::{
    ContentConfig, DataLoadError, LoadReport, load_config, load_config_file, load_content,
};
use cosmo_tech_tree::{Tech, TechTree, TechTreeError};
use std::collections::BTreeSet;
use std::path::Path;

/// Errors that stop a tool command.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Data(#[from] DataLoadError),

    #[error(transparent)]
    TechTree(#[from] TechTreeError),
}

/// Load the content directory at `dir`. An explicit `config` file takes
/// precedence over `<dir>/config.*`.
pub fn open(dir: &Path, config: Option<&Path>) -> Result<LoadReport, ToolError> {
    let config: ContentConfig = match config {
        Some(path) => load_config_file(path)?,
        None => load_config(dir)?,
    };
    Ok(load_content(dir, &config)?)
}

/// One line per collected error, then a summary line.
pub fn validate(report: &LoadReport) -> Vec<String> {
    let mut lines: Vec<String> = report.errors.iter().map(|e| format!("error: {e}")).collect();
    lines.push(format!(
        "{} techs loaded, {} errors",
        report.tree.len(),
        report.errors.len()
    ));
    lines
}

/// Every tech, prerequisites first.
pub fn order(tree: &TechTree) -> Result<Vec<String>, ToolError> {
    Ok(tree
        .dependency_order()?
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// Techs researchable given `known`, optionally restricted to the path
/// towards `towards`. Each line shows the effective cost and turns.
pub fn next(tree: &TechTree, known: &[String], towards: Option<&str>) -> Result<Vec<String>, ToolError> {
    let known: BTreeSet<String> = known.iter().cloned().collect();
    if let Some(name) = known.iter().find(|n| !tree.contains(n)) {
        return Err(TechTreeError::TechNotFound(name.clone()).into());
    }
    let techs = match towards {
        Some(goal) if !tree.contains(goal) => {
            return Err(TechTreeError::TechNotFound(goal.to_string()).into());
        }
        Some(goal) => tree.next_techs_towards(&known, goal),
        None => tree.all_next_techs(&known),
    };
    Ok(techs.into_iter().map(|t| describe(tree, t)).collect())
}

/// The full dump of one tech.
pub fn show(tree: &TechTree, name: &str) -> Result<String, ToolError> {
    tree.get(name)
        .map(Tech::to_string)
        .ok_or_else(|| TechTreeError::TechNotFound(name.to_string()).into())
}

fn describe(tree: &TechTree, tech: &Tech) -> String {
    let rules = tree.rules();
    format!(
        "{} (cost {}, {} turns)",
        tech.name,
        fixed64_to_f64(tech.research_cost(rules)),
        tech.research_turns(rules)
    )
}
