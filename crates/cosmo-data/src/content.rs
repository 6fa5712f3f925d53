//! Content loading pipeline: discovers tech files, resolves them into engine
//! types and builds the tech tree.
//!
//! Layout of a content directory:
//!
//! ```text
//! <root>/config.{ron,toml,json}       optional ContentConfig
//! <root>/categories.{ron,toml,json}   required list of tech categories
//! <root>/techs/**/<TECH>.{ron,toml,json}
//! ```

use cosmo_core::condition::{Condition, EmpireRef};
use cosmo_core::effect::{Effect, EffectsGroup};
use cosmo_core::fixed::f64_to_fixed64;
use cosmo_core::id::EmpireId;
use cosmo_core::universe::{MeterType, PlanetEnvironment, PlanetSize};
use cosmo_core::value_ref::{ObjectProperty, ValueRef};
use cosmo_tech_tree::{
    Tech, TechCategory, TechTree, TechTreeBuilder, TechTreeError, UnlockableItem,
    UnlockableItemType,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ContentConfig;
use crate::loader::{
    DataLoadError, deserialize_file, deserialize_list, discover_data_files, find_data_file,
    require_data_file, require_finite, resolve_constant, resolve_enum,
};
use crate::schema::*;

// ===========================================================================
// Load report
// ===========================================================================

/// The outcome of loading a content directory: every usable tech, plus
/// everything that was wrong with the rest.
#[derive(Debug)]
pub struct LoadReport {
    pub tree: TechTree,
    pub errors: Vec<DataLoadError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// ===========================================================================
// Loading
// ===========================================================================

/// Load `<dir>/config.*` if present, otherwise the defaults.
pub fn load_config(dir: &Path) -> Result<ContentConfig, DataLoadError> {
    match find_data_file(dir, "config")? {
        Some(path) => load_config_file(&path),
        None => Ok(ContentConfig::default()),
    }
}

/// Read and check one config file.
pub fn load_config_file(path: &Path) -> Result<ContentConfig, DataLoadError> {
    let config: ContentConfig = deserialize_file(path)?;
    config.validate(path)?;
    Ok(config)
}

/// Load every category and tech under `dir`.
///
/// Only a missing `categories` file or `techs` directory, or an unreadable
/// directory, fails the whole load. Problems with individual records are
/// collected in the report and the record is left out of the tree.
pub fn load_content(dir: &Path, config: &ContentConfig) -> Result<LoadReport, DataLoadError> {
    let mut builder = TechTreeBuilder::with_rules(config.research_rules());
    let mut errors = Vec::new();

    let categories_path = require_data_file(dir, "categories")?;
    let categories: Vec<TechCategoryData> = deserialize_list(&categories_path, "category")?;
    for data in categories {
        let category = TechCategory {
            name: data.name,
            graphic: data.graphic,
            colour: data.colour,
        };
        if let Err(source) = builder.register_category(category) {
            errors.push(DataLoadError::Rejected {
                file: categories_path.clone(),
                source,
            });
        }
    }

    let techs_dir = dir.join("techs");
    if !techs_dir.is_dir() {
        return Err(DataLoadError::MissingRequired {
            file: "techs".to_string(),
            dir: dir.to_path_buf(),
        });
    }
    let (files, conflicts) = discover_data_files(&techs_dir)?;
    errors.extend(conflicts);

    let mut tech_files: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in files {
        let tech = match deserialize_file::<TechData>(&path)
            .and_then(|data| resolve_tech(data, config, &path))
        {
            Ok(tech) => tech,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "tech rejected");
                errors.push(e);
                continue;
            }
        };
        let name = tech.name.clone();
        match builder.register(tech) {
            Ok(()) => {
                tech_files.insert(name, path);
            }
            Err(source) => {
                tracing::warn!(file = %path.display(), error = %source, "tech rejected");
                errors.push(DataLoadError::Rejected { file: path, source });
            }
        }
    }

    let (tree, build_errors) = builder.build();
    for source in build_errors {
        let file = blamed_file(&source, &tech_files).unwrap_or_else(|| techs_dir.clone());
        tracing::warn!(file = %file.display(), error = %source, "tech rejected");
        errors.push(DataLoadError::Rejected { file, source });
    }

    tracing::info!(
        dir = %dir.display(),
        techs = tree.len(),
        categories = tree.categories().count(),
        errors = errors.len(),
        "content loaded"
    );

    Ok(LoadReport { tree, errors })
}

/// The file holding the record a tree error is about.
fn blamed_file(error: &TechTreeError, tech_files: &BTreeMap<String, PathBuf>) -> Option<PathBuf> {
    let name = match error {
        TechTreeError::CyclicDependency { cycle } => cycle.first().map(String::as_str),
        other => other.tech_name(),
    }?;
    tech_files.get(name).cloned()
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Resolve one tech record against `config`.
pub fn resolve_tech(
    data: TechData,
    config: &ContentConfig,
    file: &Path,
) -> Result<Tech, DataLoadError> {
    let research_cost = match data.researchcost {
        CostData::Flat(cost) => cost,
        CostData::Scaled(cost) => cost * config.tech_cost_multiplier,
    };
    if !research_cost.is_finite() {
        return Err(DataLoadError::Rejected {
            file: file.to_path_buf(),
            source: TechTreeError::InvalidRange {
                tech: data.name,
                field: "researchcost",
                value: research_cost.to_string(),
            },
        });
    }

    let unlocks = data
        .unlock
        .iter()
        .map(|u| {
            let item_type = resolve_enum(
                &u.item_type,
                "unlock type",
                file,
                UnlockableItemType::from_name,
            )?;
            Ok(UnlockableItem::new(item_type, &u.name))
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let effects_groups = data
        .effectsgroups
        .iter()
        .enumerate()
        .map(|(i, g)| resolve_effects_group(g, config, file, &data.name, i))
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let mut tech = Tech::new(&data.name, &data.category)
        .with_cost(f64_to_fixed64(research_cost), data.researchturns)
        .with_tags(data.tags.iter().map(String::as_str))
        .with_unlocks(unlocks);
    tech.description = data.description;
    tech.short_description = data.short_description;
    tech.researchable = data.researchable;
    tech.graphic = data.graphic;
    tech.prerequisites = data.prerequisites.into_vec().into_iter().collect();
    tech.effects_groups = effects_groups;
    Ok(tech)
}

fn resolve_effects_group(
    data: &EffectsGroupData,
    config: &ContentConfig,
    file: &Path,
    tech: &str,
    index: usize,
) -> Result<EffectsGroup, DataLoadError> {
    let priority = match &data.priority {
        Some(PriorityData::Value(v)) => *v,
        Some(PriorityData::Named(name)) => resolve_constant(&config.priorities, name, file)?,
        None => {
            return Err(DataLoadError::MissingField {
                file: file.to_path_buf(),
                field: "priority",
                context: format!("{tech} effectsgroups[{index}]"),
            });
        }
    };
    let effects = data
        .effects
        .iter()
        .map(|e| resolve_effect(e, file))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EffectsGroup {
        scope: resolve_condition(&data.scope, file)?,
        stacking_group: data.stackinggroup.clone(),
        accounting_label: data.accountinglabel.clone(),
        priority,
        effects,
    })
}

fn resolve_conditions(ops: &[ConditionData], file: &Path) -> Result<Vec<Condition>, DataLoadError> {
    ops.iter().map(|c| resolve_condition(c, file)).collect()
}

fn resolve_condition(data: &ConditionData, file: &Path) -> Result<Condition, DataLoadError> {
    Ok(match data {
        ConditionData::All => Condition::All,
        ConditionData::None => Condition::None,
        ConditionData::Planet => Condition::planet(),
        ConditionData::Building => Condition::building(),
        ConditionData::OwnedBy { empire } => Condition::owned_by(match empire {
            EmpireRefData::SourceOwner => EmpireRef::SourceOwner,
            EmpireRefData::Empire(id) => EmpireRef::Empire(EmpireId(*id)),
        }),
        ConditionData::Unowned => Condition::Unowned,
        ConditionData::PlanetEnvironment(names) => Condition::PlanetEnvironment(
            names
                .iter()
                .map(|n| resolve_enum(n, "environment", file, PlanetEnvironment::from_name))
                .collect::<Result<_, _>>()?,
        ),
        ConditionData::PlanetSize(names) => Condition::PlanetSize(
            names
                .iter()
                .map(|n| resolve_enum(n, "planet size", file, PlanetSize::from_name))
                .collect::<Result<_, _>>()?,
        ),
        ConditionData::And(ops) => Condition::And(resolve_conditions(ops, file)?),
        ConditionData::Or(ops) => Condition::Or(resolve_conditions(ops, file)?),
        ConditionData::Not(inner) => resolve_condition(inner, file)?.negate(),
    })
}

fn resolve_value_ref(data: &ValueRefData, file: &Path) -> Result<ValueRef, DataLoadError> {
    Ok(match data {
        ValueRefData::Constant(v) => {
            ValueRef::Constant(f64_to_fixed64(require_finite(*v, "constant", file)?))
        }
        ValueRefData::Value => ValueRef::Value,
        ValueRefData::Target(name) => ValueRef::Target(resolve_enum(
            name,
            "object property",
            file,
            ObjectProperty::from_name,
        )?),
        ValueRefData::Add(a, b) => resolve_value_ref(a, file)?.plus(resolve_value_ref(b, file)?),
        ValueRefData::Sub(a, b) => resolve_value_ref(a, file)?.minus(resolve_value_ref(b, file)?),
        ValueRefData::Mul(a, b) => resolve_value_ref(a, file)?.times(resolve_value_ref(b, file)?),
        ValueRefData::Div(a, b) => {
            resolve_value_ref(a, file)?.divided_by(resolve_value_ref(b, file)?)
        }
    })
}

fn resolve_effect(data: &EffectData, file: &Path) -> Result<Effect, DataLoadError> {
    Ok(match data {
        EffectData::SetTargetPopulation { value } => {
            Effect::set_target_population(resolve_value_ref(value, file)?)
        }
        EffectData::SetMeter { meter, value } => Effect::SetMeter {
            meter: resolve_enum(meter, "meter", file, MeterType::from_name)?,
            value: resolve_value_ref(value, file)?,
        },
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{cleanup, make_test_dir};
    use cosmo_core::fixed::Fixed64;
    use std::fs;

    const CATEGORIES_RON: &str = r#"[
        (name: "GROWTH_CATEGORY", graphic: "icons/tech/growth.png", colour: (116, 225, 107, 255)),
        (name: "LEARNING_CATEGORY"),
    ]"#;

    fn tech_ron(name: &str, prereqs: &str, extra: &str) -> String {
        format!(
            r#"(
                name: "{name}",
                category: "GROWTH_CATEGORY",
                researchcost: Scaled(10.0),
                researchturns: 3,
                prerequisites: {prereqs},
                {extra}
            )"#
        )
    }

    fn content_dir(suffix: &str, techs: &[(&str, String)]) -> PathBuf {
        let dir = make_test_dir(suffix);
        fs::write(dir.join("categories.ron"), CATEGORIES_RON).unwrap();
        fs::create_dir_all(dir.join("techs/growth")).unwrap();
        for (file, body) in techs {
            fs::write(dir.join("techs/growth").join(file), body).unwrap();
        }
        dir
    }

    #[test]
    fn loads_chain_and_scales_cost() {
        let dir = content_dir(
            "content_chain",
            &[
                ("GRO_A.ron", tech_ron("GRO_A", "[]", "")),
                ("GRO_B.ron", tech_ron("GRO_B", "\"GRO_A\"", "")),
            ],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(report.tree.len(), 2);
        assert_eq!(
            report.tree.get("GRO_B").unwrap().research_cost,
            Fixed64::from_num(20)
        );
        assert_eq!(report.tree.category("GROWTH_CATEGORY").unwrap().colour[0], 116);
        cleanup(&dir);
    }

    #[test]
    fn bad_records_are_collected_not_fatal() {
        let dir = content_dir(
            "content_collect",
            &[
                ("GRO_A.ron", tech_ron("GRO_A", "[]", "")),
                (
                    "GRO_BAD_ENV.ron",
                    tech_ron(
                        "GRO_BAD_ENV",
                        "[]",
                        r#"effectsgroups: [(scope: PlanetEnvironment(["Lush"]), priority: 1)],"#,
                    ),
                ),
                (
                    "GRO_NO_PRIORITY.ron",
                    tech_ron("GRO_NO_PRIORITY", "[]", r#"effectsgroups: [(scope: All)],"#),
                ),
                (
                    "GRO_BAD_CONST.ron",
                    tech_ron(
                        "GRO_BAD_CONST",
                        "[]",
                        r#"effectsgroups: [(scope: All, priority: "NOT_A_PRIORITY")],"#,
                    ),
                ),
                ("GRO_BROKEN.ron", "(name: ".to_string()),
                ("GRO_DEPENDS_ON_BAD.ron", tech_ron("GRO_DEPENDS_ON_BAD", "\"GRO_BAD_ENV\"", "")),
            ],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert_eq!(report.tree.names().collect::<Vec<_>>(), vec!["GRO_A"]);
        assert_eq!(report.errors.len(), 5);
        assert!(report.errors.iter().any(|e| matches!(
            e,
            DataLoadError::UnknownEnumValue { kind: "environment", value, .. } if value == "Lush"
        )));
        assert!(report.errors.iter().any(|e| matches!(
            e,
            DataLoadError::MissingField { field: "priority", .. }
        )));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, DataLoadError::UnknownConstant { .. })));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, DataLoadError::Parse { .. })));
        assert!(report.errors.iter().any(|e| matches!(
            e,
            DataLoadError::Rejected {
                source: TechTreeError::UnresolvedPrerequisite { .. },
                file,
            } if file.ends_with("GRO_DEPENDS_ON_BAD.ron")
        )));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_name_in_two_files() {
        let dir = content_dir(
            "content_dup",
            &[
                ("GRO_A.ron", tech_ron("GRO_A", "[]", "")),
                ("GRO_A_AGAIN.ron", tech_ron("GRO_A", "[]", "")),
            ],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert_eq!(report.tree.len(), 1);
        assert!(matches!(
            &report.errors[..],
            [DataLoadError::Rejected {
                source: TechTreeError::DuplicateName(_),
                file,
            }] if file.ends_with("GRO_A_AGAIN.ron")
        ));
        cleanup(&dir);
    }

    #[test]
    fn cycle_blames_a_member_file() {
        let dir = content_dir(
            "content_cycle",
            &[
                ("GRO_X.ron", tech_ron("GRO_X", "\"GRO_Y\"", "")),
                ("GRO_Y.ron", tech_ron("GRO_Y", "\"GRO_X\"", "")),
            ],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert!(report.tree.is_empty());
        assert!(matches!(
            &report.errors[..],
            [DataLoadError::Rejected {
                source: TechTreeError::CyclicDependency { .. },
                file,
            }] if file.ends_with("GRO_X.ron")
        ));
        cleanup(&dir);
    }

    #[test]
    fn unknown_unlock_type_rejected() {
        let dir = content_dir(
            "content_unlock",
            &[(
                "GRO_A.ron",
                tech_ron("GRO_A", "[]", r#"unlock: [(type: "Species", name: "SP_HUMAN")],"#),
            )],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert!(report.tree.is_empty());
        assert!(matches!(
            &report.errors[0],
            DataLoadError::UnknownEnumValue { kind: "unlock type", .. }
        ));
        cleanup(&dir);
    }

    #[test]
    fn missing_categories_is_fatal() {
        let dir = make_test_dir("content_no_categories");
        fs::create_dir_all(dir.join("techs")).unwrap();
        let result = load_content(&dir, &ContentConfig::default());
        assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));
        cleanup(&dir);
    }

    #[test]
    fn missing_techs_dir_is_fatal() {
        let dir = make_test_dir("content_no_techs");
        fs::write(dir.join("categories.ron"), CATEGORIES_RON).unwrap();
        let result = load_content(&dir, &ContentConfig::default());
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { file, .. }) if file == "techs"
        ));
        cleanup(&dir);
    }

    #[test]
    fn config_file_is_optional() {
        let dir = make_test_dir("content_config");
        assert_eq!(load_config(&dir).unwrap(), ContentConfig::default());

        fs::write(dir.join("config.toml"), "tech_cost_multiplier = 3.0\n").unwrap();
        assert_eq!(load_config(&dir).unwrap().tech_cost_multiplier, 3.0);
        cleanup(&dir);
    }

    #[test]
    fn non_finite_costs_are_rejected_not_fatal() {
        let dir = content_dir(
            "content_nan_cost",
            &[
                ("GRO_A.ron", tech_ron("GRO_A", "[]", "")),
                (
                    "GRO_NAN.ron",
                    tech_ron("GRO_NAN", "[]", "").replace("Scaled(10.0)", "Flat(NaN)"),
                ),
                (
                    "GRO_INF.ron",
                    tech_ron("GRO_INF", "[]", "").replace("Scaled(10.0)", "Scaled(inf)"),
                ),
            ],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert_eq!(report.tree.names().collect::<Vec<_>>(), vec!["GRO_A"]);
        assert_eq!(report.errors.len(), 2);
        for err in &report.errors {
            assert!(matches!(
                err,
                DataLoadError::Rejected {
                    source: TechTreeError::InvalidRange { field: "researchcost", .. },
                    ..
                }
            ));
        }
        cleanup(&dir);
    }

    #[test]
    fn nan_multiplier_rejects_scaled_costs() {
        let dir = content_dir("content_nan_mult", &[("GRO_A.ron", tech_ron("GRO_A", "[]", ""))]);
        let config = ContentConfig {
            tech_cost_multiplier: f64::NAN,
            ..ContentConfig::default()
        };
        let report = load_content(&dir, &config).unwrap();
        assert!(report.tree.is_empty());
        assert!(matches!(
            &report.errors[..],
            [DataLoadError::Rejected {
                source: TechTreeError::InvalidRange { field: "researchcost", .. },
                ..
            }]
        ));
        cleanup(&dir);
    }

    #[test]
    fn nan_multiplier_in_config_file_is_an_error() {
        let dir = make_test_dir("content_nan_config");
        fs::write(dir.join("config.toml"), "tech_cost_multiplier = nan\n").unwrap();
        assert!(matches!(
            load_config(&dir),
            Err(DataLoadError::NonFinite { context: "tech_cost_multiplier", .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn non_finite_constant_is_an_error() {
        let dir = content_dir(
            "content_nan_constant",
            &[(
                "GRO_A.ron",
                tech_ron(
                    "GRO_A",
                    "[]",
                    r#"effectsgroups: [(scope: All, priority: 1, effects: [SetTargetPopulation(value: Constant(NaN))])],"#,
                ),
            )],
        );
        let report = load_content(&dir, &ContentConfig::default()).unwrap();
        assert!(report.tree.is_empty());
        assert!(matches!(
            &report.errors[..],
            [DataLoadError::NonFinite { context: "constant", .. }]
        ));
        cleanup(&dir);
    }

    #[test]
    fn cheap_and_fast_rule_reaches_tree() {
        let dir = content_dir("content_cheap", &[("GRO_A.ron", tech_ron("GRO_A", "[]", ""))]);
        let config = ContentConfig {
            cheap_and_fast_research: true,
            ..ContentConfig::default()
        };
        let report = load_content(&dir, &config).unwrap();
        assert_eq!(report.tree.research_cost("GRO_A").unwrap(), Fixed64::ONE);
        cleanup(&dir);
    }

    #[test]
    fn resolve_value_ref_arithmetic() {
        let data = ValueRefData::Add(
            Box::new(ValueRefData::Value),
            Box::new(ValueRefData::Mul(
                Box::new(ValueRefData::Constant(1.0)),
                Box::new(ValueRefData::Target("HabitableSize".to_string())),
            )),
        );
        let value = resolve_value_ref(&data, Path::new("x.ron")).unwrap();
        assert_eq!(value.to_string(), "(Value + (1 * Target.HabitableSize))");

        let bad = ValueRefData::Target("Happiness".to_string());
        assert!(matches!(
            resolve_value_ref(&bad, Path::new("x.ron")),
            Err(DataLoadError::UnknownEnumValue { kind: "object property", .. })
        ));
    }

    #[test]
    fn resolve_condition_not_and_sizes() {
        let data = ConditionData::Not(Box::new(ConditionData::PlanetSize(vec![
            "GasGiant".to_string(),
        ])));
        let condition = resolve_condition(&data, Path::new("x.ron")).unwrap();
        assert_eq!(
            condition,
            Condition::Not(Box::new(Condition::PlanetSize(vec![PlanetSize::GasGiant])))
        );
    }
}
