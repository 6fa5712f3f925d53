//! End-to-end tests for the bundled growth content: load `GRO_SYMBIOTIC_BIO`
//! from disk, order it, research it and run its effects on a small universe.

use std::fs;
use std::path::{Path, PathBuf};

use cosmo_core::effect::{EffectSource, SourcedEffectsGroup, execute_effects};
use cosmo_core::fixed::Fixed64;
use cosmo_core::id::{EmpireId, ObjectId};
use cosmo_core::universe::{MeterType, PlanetEnvironment, PlanetSize, Universe, UniverseObject};
use cosmo_data::{ContentConfig, DataLoadError, LoadReport, load_config, load_content};
use cosmo_tech_tree::{
    EmpireResearch, ResearchEvent, TechStatus, TechTree, TechTreeBuilder, TechTreeError,
    UnlockableItem, UnlockableItemType,
};

const BIO: &str = "GRO_SYMBIOTIC_BIO";
const ECOL: &str = "GRO_PLANET_ECOL";

fn content_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../content")
}

fn load_bundled_with_config() -> (ContentConfig, LoadReport) {
    let dir = content_dir();
    let config = load_config(&dir).unwrap();
    let report = load_content(&dir, &config).unwrap();
    (config, report)
}

fn load_bundled() -> LoadReport {
    load_bundled_with_config().1
}

/// A scratch content directory holding the bundled categories and only the
/// listed growth techs.
fn partial_content(suffix: &str, techs: &[&str]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cosmo_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("techs/growth")).unwrap();
    fs::copy(content_dir().join("categories.ron"), dir.join("categories.ron")).unwrap();
    for tech in techs {
        let file = format!("{tech}.ron");
        fs::copy(
            content_dir().join("techs/growth").join(&file),
            dir.join("techs/growth").join(&file),
        )
        .unwrap();
    }
    dir
}

fn target_pop(universe: &Universe, id: ObjectId) -> Fixed64 {
    universe
        .get(id)
        .and_then(|o| o.meter(MeterType::TargetPopulation))
        .unwrap()
}

fn groups_of<'a>(tree: &'a TechTree, tech: &'a str, empire: EmpireId) -> Vec<SourcedEffectsGroup<'a>> {
    let tech = tree.get(tech).unwrap();
    tech.effects_groups
        .iter()
        .map(|group| SourcedEffectsGroup {
            source: EffectSource {
                empire: Some(empire),
                content_name: &tech.name,
            },
            group,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn bundled_content_loads_without_errors() {
    let report = load_bundled();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(report.tree.len(), 4);
    assert_eq!(
        report.tree.names_in_category("GROWTH_CATEGORY"),
        vec!["GRO_GENETIC_ENG", ECOL, BIO]
    );
}

#[test]
fn symbiotic_bio_record_matches_content() {
    let report = load_bundled();
    let tech = report.tree.get(BIO).unwrap();

    assert_eq!(tech.description, "GRO_SYMBIOTIC_BIO_DESC");
    assert_eq!(tech.short_description, "POPULATION_SHORT_DESC");
    assert_eq!(tech.category, "GROWTH_CATEGORY");
    // 50 * tech_cost_multiplier (2.0)
    assert_eq!(tech.research_cost, Fixed64::from_num(100));
    assert_eq!(tech.research_turns, 6);
    assert!(tech.has_tag("PEDIA_GROWTH_CATEGORY"));
    assert_eq!(tech.prerequisites.iter().collect::<Vec<_>>(), vec![ECOL]);
    assert_eq!(
        tech.unlocks,
        vec![
            UnlockableItem::policy("PLC_DIVERSITY"),
            UnlockableItem::policy("PLC_BLACK_MARKET"),
        ]
    );
    assert_eq!(tech.graphic, "icons/tech/symbiosis_biology.png");

    assert_eq!(tech.effects_groups.len(), 1);
    let group = &tech.effects_groups[0];
    assert_eq!(group.accounting_label, "GRO_TECH_ACCOUNTING_LABEL");
    assert_eq!(group.priority, 20);
    assert_eq!(
        group.scope.to_string(),
        "(Planet & OwnedBy(Source.Owner) & Planet(environment = [Good, Adequate, Poor]))"
    );
    assert_eq!(
        group.effects[0].to_string(),
        "SetTargetPopulation(value = (Value + (1 * Target.HabitableSize)))"
    );
}

#[test]
fn cost_multiplier_comes_from_config() {
    let config = ContentConfig {
        tech_cost_multiplier: 3.0,
        ..ContentConfig::default()
    };
    let report = load_content(&content_dir(), &config).unwrap();
    assert_eq!(
        report.tree.get(BIO).unwrap().research_cost,
        Fixed64::from_num(150)
    );
}

#[test]
fn symbiotic_bio_alone_has_unresolved_prerequisite() {
    let dir = partial_content("bio_alone", &[BIO]);
    let report = load_content(&dir, &ContentConfig::default()).unwrap();

    assert!(report.tree.is_empty());
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0] {
        DataLoadError::Rejected {
            source: TechTreeError::UnresolvedPrerequisite { tech, prereq },
            file,
        } => {
            assert_eq!(tech, BIO);
            assert_eq!(prereq, ECOL);
            assert!(file.ends_with("GRO_SYMBIOTIC_BIO.ron"));
        }
        other => panic!("expected unresolved prerequisite, got {other:?}"),
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn both_loaded_orders_ecology_first() {
    let dir = partial_content("bio_and_ecol", &[BIO, ECOL]);
    let report = load_content(&dir, &ContentConfig::default()).unwrap();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(report.tree.dependency_order().unwrap(), vec![ECOL, BIO]);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn bundled_order_is_lexicographic_among_ready_techs() {
    let report = load_bundled();
    assert_eq!(
        report.tree.dependency_order().unwrap(),
        vec!["GRO_GENETIC_ENG", ECOL, BIO, "LRN_ALGO_ELEGANCE"]
    );
}

#[test]
fn registering_loaded_record_twice_is_duplicate() {
    let report = load_bundled();
    let tech = report.tree.get(BIO).unwrap().clone();
    let mut builder = TechTreeBuilder::new();
    builder.register(tech.clone()).unwrap();
    assert_eq!(
        builder.register(tech),
        Err(TechTreeError::DuplicateName(BIO.to_string()))
    );
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

#[test]
fn symbiotic_bio_raises_target_population_by_habitable_size() {
    let (config, report) = load_bundled_with_config();
    let empire = EmpireId(1);
    let mut universe = config.universe();
    let adequate = universe.insert(
        UniverseObject::planet("Adequate", PlanetSize::Medium, PlanetEnvironment::Adequate)
            .owned_by(empire),
    );
    let hostile = universe.insert(
        UniverseObject::planet("Hostile", PlanetSize::Medium, PlanetEnvironment::Hostile)
            .owned_by(empire),
    );
    let foreign = universe.insert(
        UniverseObject::planet("Foreign", PlanetSize::Medium, PlanetEnvironment::Good)
            .owned_by(EmpireId(2)),
    );

    let groups = groups_of(&report.tree, BIO, empire);
    let entries = execute_effects(&mut universe, &groups);

    assert_eq!(target_pop(&universe, adequate), Fixed64::from_num(3));
    assert_eq!(target_pop(&universe, hostile), Fixed64::ZERO);
    assert_eq!(target_pop(&universe, foreign), Fixed64::ZERO);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, BIO);
    assert_eq!(entries[0].accounting_label, "GRO_TECH_ACCOUNTING_LABEL");
    assert_eq!(entries[0].delta, Fixed64::from_num(3));
}

#[test]
fn habitable_size_override_changes_symbiotic_bio_delta() {
    let (mut config, report) = load_bundled_with_config();
    config.habitable_sizes.medium = 4;
    let empire = EmpireId(1);
    let mut universe = config.universe();
    let planet = universe.insert(
        UniverseObject::planet("Adequate", PlanetSize::Medium, PlanetEnvironment::Adequate)
            .owned_by(empire),
    );

    let entries = execute_effects(&mut universe, &groups_of(&report.tree, BIO, empire));

    assert_eq!(target_pop(&universe, planet), Fixed64::from_num(4));
    assert_eq!(entries[0].delta, Fixed64::from_num(4));
}

#[test]
fn researched_techs_apply_in_priority_order() {
    let (config, report) = load_bundled_with_config();
    let tree = &report.tree;
    let empire = EmpireId(1);
    let mut research = EmpireResearch::new(empire);
    research.add_newly_researched(tree, ECOL).unwrap();
    research.add_newly_researched(tree, BIO).unwrap();
    research.apply_new_techs(tree, 1);

    let mut universe = config.universe();
    let adequate = universe.insert(
        UniverseObject::planet("Adequate", PlanetSize::Large, PlanetEnvironment::Adequate)
            .owned_by(empire),
    );
    let poor = universe.insert(
        UniverseObject::planet("Poor", PlanetSize::Large, PlanetEnvironment::Poor)
            .owned_by(empire),
    );

    let entries = execute_effects(&mut universe, &research.active_effects_groups(tree));

    // BIO (before scaling) adds 5, then ECOL (after scaling) adds 1 on Good/Adequate.
    assert_eq!(target_pop(&universe, adequate), Fixed64::from_num(6));
    assert_eq!(target_pop(&universe, poor), Fixed64::from_num(5));
    let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
    assert_eq!(sources, vec![BIO, BIO, ECOL]);
}

#[test]
fn target_meters_reset_between_passes() {
    let (config, report) = load_bundled_with_config();
    let empire = EmpireId(1);
    let mut universe = config.universe();
    let planet = universe.insert(
        UniverseObject::planet("Home", PlanetSize::Huge, PlanetEnvironment::Good).owned_by(empire),
    );
    let groups = groups_of(&report.tree, BIO, empire);

    for _ in 0..3 {
        universe.reset_target_meters();
        execute_effects(&mut universe, &groups);
    }
    assert_eq!(target_pop(&universe, planet), Fixed64::from_num(8));
}

// ---------------------------------------------------------------------------
// Research and unlocks
// ---------------------------------------------------------------------------

#[test]
fn completing_symbiotic_bio_grants_two_policies_once() {
    let report = load_bundled();
    let tree = &report.tree;
    let mut research = EmpireResearch::new(EmpireId(1));

    assert_eq!(research.tech_status(tree, BIO), Ok(TechStatus::Unresearchable));
    research.add_newly_researched(tree, ECOL).unwrap();
    research.apply_new_techs(tree, 1);
    assert_eq!(research.tech_status(tree, BIO), Ok(TechStatus::Researchable));
    research.drain_events();

    research.add_newly_researched(tree, BIO).unwrap();
    research.apply_new_techs(tree, 2);
    research.apply_new_techs(tree, 3);
    assert_eq!(research.add_newly_researched(tree, BIO), Ok(false));
    research.apply_new_techs(tree, 4);

    assert_eq!(
        research.available_policies().collect::<Vec<_>>(),
        vec!["PLC_BLACK_MARKET", "PLC_DIVERSITY"]
    );
    let unlocked: Vec<UnlockableItem> = research
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            ResearchEvent::ItemUnlocked { item, tech, turn } => {
                assert_eq!(tech, BIO);
                assert_eq!(turn, 2);
                Some(item)
            }
            ResearchEvent::TechResearched { .. } => None,
        })
        .collect();
    assert_eq!(
        unlocked,
        vec![
            UnlockableItem::policy("PLC_DIVERSITY"),
            UnlockableItem::policy("PLC_BLACK_MARKET"),
        ]
    );
    assert!(!research.is_unlocked(UnlockableItemType::Building, "BLD_GENOME_BANK"));
}

#[test]
fn research_state_survives_save_and_load() {
    let report = load_bundled();
    let tree = &report.tree;
    let mut research = EmpireResearch::new(EmpireId(3));
    research.add_newly_researched(tree, ECOL).unwrap();
    research.add_newly_researched(tree, BIO).unwrap();
    research.apply_new_techs(tree, 7);

    let saved = serde_json::to_string(&research).unwrap();
    let mut restored: EmpireResearch = serde_json::from_str(&saved).unwrap();

    assert!(restored.policy_available("PLC_DIVERSITY"));
    assert_eq!(restored.researched_turn(BIO), Some(7));
    // Nothing is granted twice after a reload.
    assert!(restored.apply_new_techs(tree, 8).is_empty());
    assert!(restored.drain_events().is_empty());
}

#[test]
fn next_techs_follow_research() {
    let report = load_bundled();
    let tree = &report.tree;
    let mut research = EmpireResearch::new(EmpireId(1));

    let names = |techs: Vec<&cosmo_tech_tree::Tech>| -> Vec<String> {
        techs.into_iter().map(|t| t.name.clone()).collect()
    };
    assert_eq!(
        names(tree.all_next_techs(&research.researched_techs())),
        vec!["GRO_GENETIC_ENG", ECOL, "LRN_ALGO_ELEGANCE"]
    );
    assert_eq!(
        names(tree.next_techs_towards(&research.researched_techs(), BIO)),
        vec![ECOL]
    );
    assert_eq!(
        tree.cheapest_next_tech(&research.researched_techs())
            .unwrap()
            .name,
        "GRO_GENETIC_ENG"
    );

    research.add_newly_researched(tree, ECOL).unwrap();
    research.apply_new_techs(tree, 1);
    assert_eq!(
        names(tree.next_techs_towards(&research.researched_techs(), BIO)),
        vec![BIO]
    );
    assert_eq!(tree.recursive_prereqs(BIO, None), vec![ECOL]);
}
