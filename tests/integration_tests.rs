//! Integration tests for the complete Dhammagraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Workbook JSON → GraphLoader → snapshot file
//! - Snapshot file → NavigationEngine → four-way views
//! - Snapshot → search, list index and validation report
//!
//! Run with: cargo test --test integration_tests

use dhammagraph_ingest::{CorrectionTable, EssayDir, GraphLoader, LoadError, LoaderConfig, Workbook};
use dhammagraph_nav::{
    list_summaries, BreadcrumbTrail, NameSearch, NavigationEngine, StoreSearch,
};
use dhammagraph_store::{
    validate, EntityKind, EntityRef, GraphSnapshot, InstrumentedStore, PublishedGraph,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const WORKBOOK: &str = r#"{
    "nested": {
        "headers": [
            "Four Noble Truths\n(Cattari Ariya-saccani)",
            "Three Trainings\n(Ti-sikkha)",
            "Noble Eightfold Path\n(Ariya Atthangika Magga)"
        ],
        "rows": [
            {"cells": ["1. There is Suffering (Dukkha)"], "expansion": "Birth", "pali_term": "Jati"},
            {"cells": ["1. There is Suffering (Dukkha)"], "expansion": "Aging", "pali_term": "Jara"},
            {"cells": ["4. There is a Path (Magga)", "Ethics (Sila)", "Right Speech (Samma Vaca)"]},
            {"cells": ["4. There is a Path (Magga)", "Ethics (Sila)", "Right Action (Samma Kammanta)"]},
            {"cells": ["4. There is a Path (Magga)", "Concentration (Samadhi)", "Right Concentration (Samma Samadhi)"]},
            {"cells": [null, "Wisdom (Panna)", "Right View (Samma Ditthi)"]}
        ]
    },
    "foundations": [
        {"list": "Three Jewels (Ti-ratana)", "item": "Buddha", "pali_term": "Buddha"},
        {"list": "Three Jewels (Ti-ratana)", "item": "Sangha", "pali_term": "Sangha"}
    ]
}"#;

const CORRECTIONS: &str = r#"{
    "narrowings": [
        {
            "source": "ethics",
            "broad_target": "noble-eightfold-path",
            "members": ["right-speech", "right-action"]
        }
    ]
}"#;

const PRECEPTS_WORKBOOK: &str = r#"{
    "nested": {
        "headers": [
            "Four Noble Truths",
            "Three Trainings",
            "Noble Eightfold Path\n(Ariya Atthangika Magga)",
            "Five Precepts\n(Panca Sila)"
        ],
        "rows": [
            {"cells": ["4. There is a Path", "Ethics", "Right Speech", "Non-lying"]},
            {"cells": ["4. There is a Path", "Ethics", "Right Action", "Non-harming"]},
            {"cells": ["4. There is a Path", "Ethics", "Right Action", "Non-stealing"]},
            {"cells": ["4. There is a Path", "Ethics", "Right Action", "Sexual Responsibility"]},
            {"cells": ["4. There is a Path", "Ethics", "Right Livelihood", "Abstinence from Intoxicants"]},
            {"cells": ["4. There is a Path", "Concentration", "Right Effort"]},
            {"cells": ["4. There is a Path", "Concentration", "Right Mindfulness"]},
            {"cells": ["4. There is a Path", "Concentration", "Right Concentration"]},
            {"cells": ["4. There is a Path", "Wisdom", "Right View"]},
            {"cells": ["4. There is a Path", "Wisdom", "Right Intention"]}
        ]
    }
}"#;

fn workbook() -> Workbook {
    serde_json::from_str(WORKBOOK).expect("workbook fixture parses")
}

fn seeded(dir: &Path) -> (GraphSnapshot, dhammagraph_ingest::LoadSummary) {
    let essays = dir.join("essays");
    std::fs::create_dir_all(&essays).unwrap();
    std::fs::write(
        essays.join("right-view.md"),
        "Seeing with \"Samma Ditthi\" means seeing \"samadhi\".\n",
    )
    .unwrap();
    let corrections_path = dir.join("corrections.json");
    std::fs::write(&corrections_path, CORRECTIONS).unwrap();

    let loader = GraphLoader::new(LoaderConfig::default())
        .with_corrections(CorrectionTable::load(&corrections_path).unwrap())
        .with_essays(EssayDir::new(&essays));
    let snapshot_path = dir.join("graph.json");
    let summary = loader.seed_file(&workbook(), &snapshot_path).unwrap();
    (GraphSnapshot::load(&snapshot_path).unwrap(), summary)
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn test_seed_writes_verified_snapshot() {
    let dir = tempdir().unwrap();
    let (snapshot, summary) = seeded(dir.path());

    assert_eq!(summary.generation, 1);
    assert_eq!(snapshot.generation(), 1);
    assert_eq!(summary.lists, snapshot.lists().len());
    assert_eq!(summary.essays, 1);
    assert!(summary.corrections.changed());
    assert!(!dir.path().join("graph.json.lock").exists());

    let report = validate(&snapshot);
    assert!(report.all_passed(), "failed checks: {:?}", report.failed().collect::<Vec<_>>());

    let path = snapshot.list_by_slug("noble-eightfold-path").unwrap();
    let positions: Vec<usize> = path
        .children
        .iter()
        .map(|&id| snapshot.dhamma(id).unwrap().position_in_list)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}

#[test]
fn test_reseed_bumps_generation() {
    let dir = tempdir().unwrap();
    seeded(dir.path());
    let (snapshot, summary) = seeded(dir.path());
    assert_eq!(summary.generation, 2);
    assert_eq!(snapshot.generation(), 2);
}

#[test]
fn test_column_cooccurrence_and_narrowing() {
    let dir = tempdir().unwrap();
    let (snapshot, _) = seeded(dir.path());

    let trainings = snapshot.list_by_slug("three-trainings").unwrap();
    let path = snapshot.list_by_slug("noble-eightfold-path").unwrap();

    let there_is_a_path = snapshot.dhamma_by_slug("there-is-a-path").unwrap();
    assert_eq!(
        there_is_a_path.downstream,
        vec![EntityRef::list(trainings.id), EntityRef::list(path.id)]
    );

    let ethics = snapshot.dhamma_by_slug("ethics").unwrap();
    let speech = snapshot.dhamma_by_slug("right-speech").unwrap();
    let action = snapshot.dhamma_by_slug("right-action").unwrap();
    assert_eq!(
        ethics.downstream,
        vec![EntityRef::dhamma(speech.id), EntityRef::dhamma(action.id)]
    );

    // Ethics no longer zooms into the whole path, so it is not upstream of it.
    assert!(!path.upstream_from.contains(&ethics.id));
    let concentration = snapshot.dhamma_by_slug("concentration").unwrap();
    assert!(path.upstream_from.contains(&concentration.id));
    assert!(path.upstream_from.contains(&there_is_a_path.id));
}

#[test]
fn test_shipped_correction_table() {
    let table_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/corrections.json");
    let table = CorrectionTable::load(&table_path).unwrap();
    let workbook: Workbook = serde_json::from_str(PRECEPTS_WORKBOOK).unwrap();

    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("graph.json");
    let summary = GraphLoader::default()
        .with_corrections(table.clone())
        .seed_file(&workbook, &snapshot_path)
        .unwrap();
    assert!(summary.corrections.changed());
    let snapshot = GraphSnapshot::load(&snapshot_path).unwrap();

    for skip in &table.skips {
        assert!(snapshot.list_by_slug(&skip.source_list).is_some());
        assert!(snapshot.list_by_slug(&skip.target_list).is_some());
    }

    let downstream = |slug: &str| -> Vec<String> {
        snapshot
            .dhamma_by_slug(slug)
            .unwrap()
            .downstream
            .iter()
            .map(|r| match r.target_kind {
                EntityKind::List => snapshot.list(r.target_id).unwrap().slug.clone(),
                EntityKind::Dhamma => snapshot.dhamma(r.target_id).unwrap().slug.clone(),
            })
            .collect()
    };

    assert_eq!(
        downstream("ethics")[..3],
        ["right-speech", "right-action", "right-livelihood"]
    );
    assert!(!downstream("ethics").contains(&"noble-eightfold-path".to_string()));
    assert_eq!(
        downstream("concentration"),
        vec!["right-effort", "right-mindfulness", "right-concentration"]
    );
    assert_eq!(downstream("wisdom"), vec!["right-view", "right-intention"]);
    assert_eq!(
        downstream("right-action"),
        vec!["non-harming", "non-stealing", "sexual-responsibility"]
    );
    assert_eq!(downstream("right-speech"), vec!["non-lying"]);
    assert!(downstream("right-livelihood").is_empty());

    // Four Noble Truths skips the grouping list and zooms straight into the path.
    let path = downstream("there-is-a-path");
    assert!(!path.contains(&"three-trainings".to_string()));
    assert!(path.contains(&"noble-eightfold-path".to_string()));
    assert!(validate(&snapshot).all_passed());
}

#[test]
fn test_shared_pali_fragment_links_across_lists() {
    let dir = tempdir().unwrap();
    let (snapshot, _) = seeded(dir.path());

    let concentration = snapshot.dhamma_by_slug("concentration").unwrap();
    let right_concentration = snapshot.dhamma_by_slug("right-concentration").unwrap();
    assert!(concentration.cross_references.contains(&right_concentration.id));
    assert!(right_concentration.cross_references.contains(&concentration.id));

    // Same parent: sharing "samma" is not a cross-reference.
    let right_view = snapshot.dhamma_by_slug("right-view").unwrap();
    assert!(!right_view.cross_references.contains(&right_concentration.id));
}

#[test]
fn test_essay_terms_normalized() {
    let dir = tempdir().unwrap();
    let (snapshot, _) = seeded(dir.path());
    let essay = snapshot
        .dhamma_by_slug("right-view")
        .and_then(|d| d.essay.clone())
        .unwrap();
    assert_eq!(essay, "Seeing with *Samma Ditthi* means seeing *samadhi*.");
}

#[test]
fn test_bad_correction_keeps_previous_snapshot() {
    let dir = tempdir().unwrap();
    let (before, _) = seeded(dir.path());
    let snapshot_path = dir.path().join("graph.json");

    let table: CorrectionTable = serde_json::from_str(
        r#"{"narrowings": [{"source": "ethics", "broad_target": "noble-eightfold-path", "members": ["birth"]}]}"#,
    )
    .unwrap();
    let err = GraphLoader::default()
        .with_corrections(table)
        .seed_file(&workbook(), &snapshot_path)
        .unwrap_err();
    assert!(matches!(err, LoadError::Correction(_)));

    let after = GraphSnapshot::load(&snapshot_path).unwrap();
    assert_eq!(after.generation(), before.generation());
    assert_eq!(after.dhammas().len(), before.dhammas().len());
    assert!(!dir.path().join("graph.json.lock").exists());
}

#[test]
fn test_in_memory_publish_swaps_readers() {
    let published = PublishedGraph::new();
    let pinned = published.current();
    assert!(pinned.is_empty());

    let (snapshot, summary) = GraphLoader::default()
        .load_workbook(&workbook(), &published)
        .unwrap();
    assert_eq!(summary.generation, 1);
    assert!(Arc::ptr_eq(&snapshot, &published.current()));
    // A reader that pinned the old graph still sees it.
    assert!(pinned.is_empty());
}

// ============================================================================
// Serving
// ============================================================================

#[tokio::test]
async fn test_request_pinned_to_published_generation() {
    let published = PublishedGraph::new();
    let loader = GraphLoader::default();
    loader.load_workbook(&workbook(), &published).unwrap();

    let engine = NavigationEngine::new(published.store());
    let first = published.current();
    let path = first.list_by_slug("noble-eightfold-path").unwrap();

    // A reseed rebuilds every id; the pinned engine still answers the old ones.
    loader.load_workbook(&workbook(), &published).unwrap();
    assert_eq!(published.generation(), 2);
    let view = engine.navigate(path.id).await.unwrap();
    assert_eq!(view.current.name, "Noble Eightfold Path");

    let err = NavigationEngine::new(published.store())
        .navigate(path.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_navigate_seeded_graph() {
    let dir = tempdir().unwrap();
    let (snapshot, _) = seeded(dir.path());
    let snapshot = Arc::new(snapshot);
    let store = InstrumentedStore::new(Arc::clone(&snapshot));
    let stats = store.stats();
    let engine = NavigationEngine::new(store);

    let path = snapshot.list_by_slug("noble-eightfold-path").unwrap();
    let view = engine.navigate(path.id).await.unwrap();
    let right: Vec<&str> = view.right.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(
        right,
        vec!["Right Speech", "Right Action", "Right Concentration", "Right View"]
    );
    assert!(view.left.iter().all(|n| n.kind == EntityKind::Dhamma));
    assert_eq!(stats.roundtrips(), 2);

    let rc = snapshot.dhamma_by_slug("right-concentration").unwrap();
    let view = engine.navigate(rc.id).await.unwrap();
    assert_eq!(view.up.unwrap().name, "Right Action");
    assert_eq!(view.down.unwrap().name, "Right View");
    assert_eq!(view.left[0].name, "Noble Eightfold Path");
    assert_eq!(view.current.pali_name, "Samma Samadhi");

    let rv = snapshot.dhamma_by_slug("right-view").unwrap();
    let view = engine.navigate(rv.id).await.unwrap();
    assert!(view.down.is_none());
    assert!(view.current.essay.unwrap().contains("*Samma Ditthi*"));
}

#[tokio::test]
async fn test_breadcrumbs_follow_session_path() {
    let dir = tempdir().unwrap();
    let (snapshot, _) = seeded(dir.path());
    let snapshot = Arc::new(snapshot);
    let engine = NavigationEngine::new(Arc::clone(&snapshot));
    let mut trail = BreadcrumbTrail::new();

    let ids: Vec<String> = ["four-noble-truths", "three-trainings"]
        .iter()
        .map(|slug| snapshot.list_by_slug(slug).unwrap().id.to_string())
        .chain(std::iter::once(
            snapshot.dhamma_by_slug("ethics").unwrap().id.to_string(),
        ))
        .collect();
    let mut last = None;
    for id in &ids {
        last = Some(engine.navigate_with_trail(id, &mut trail).await.unwrap());
    }
    let crumbs: Vec<String> = last
        .unwrap()
        .breadcrumbs
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(crumbs, vec!["Four Noble Truths", "Three Trainings", "Ethics"]);

    let err = engine
        .navigate_with_trail("00000000-0000-0000-0000-000000000000", &mut trail)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(trail.len(), 3);
}

#[tokio::test]
async fn test_search_and_list_index() {
    let dir = tempdir().unwrap();
    let (snapshot, _) = seeded(dir.path());
    let snapshot = Arc::new(snapshot);

    let search = StoreSearch::new(Arc::clone(&snapshot));
    let results = search.search("samadhi").await.unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Concentration", "Right Concentration"]);
    assert!(search.search("s").await.unwrap().is_empty());

    let lists = list_summaries(snapshot.as_ref()).await.unwrap();
    let names: Vec<&str> = lists.iter().map(|l| l.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    let jewels = lists.iter().find(|l| l.slug == "three-jewels").unwrap();
    assert_eq!(jewels.item_count, 2);
}
