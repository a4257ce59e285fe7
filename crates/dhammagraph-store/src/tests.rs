//! Store-level tests: verification, publish semantics, persistence.

use super::*;
use tempfile::tempdir;

struct Fixture {
    path: ListDoc,
    hindrances: ListDoc,
    path_members: Vec<DhammaDoc>,
    hindrance_members: Vec<DhammaDoc>,
}

impl Fixture {
    fn new() -> Self {
        let mut path = ListDoc::new("Noble Eightfold Path", "Ariya Atthangika Magga", "noble-eightfold-path");
        let mut hindrances = ListDoc::new("Five Hindrances", "Panca Nivarana", "five-hindrances");

        let path_members: Vec<DhammaDoc> = ["Right Effort", "Right Mindfulness", "Right Concentration"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let slug = name.to_lowercase().replace(' ', "-");
                DhammaDoc::new(*name, "", slug, path.id, i)
            })
            .collect();
        let hindrance_members: Vec<DhammaDoc> = ["Sensual Desire", "Ill Will"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let slug = name.to_lowercase().replace(' ', "-");
                DhammaDoc::new(*name, "", slug, hindrances.id, i)
            })
            .collect();

        path.children = path_members.iter().map(|d| d.id).collect();
        path.item_count = path.children.len();
        hindrances.children = hindrance_members.iter().map(|d| d.id).collect();
        hindrances.item_count = hindrances.children.len();

        let mut fixture = Self {
            path,
            hindrances,
            path_members,
            hindrance_members,
        };
        fixture.path_members[2]
            .downstream
            .push(EntityRef::list(fixture.hindrances.id));
        fixture.hindrances.upstream_from = vec![fixture.path_members[2].id];
        fixture
    }

    fn snapshot(&self) -> GraphSnapshot {
        let dhammas = self
            .path_members
            .iter()
            .chain(self.hindrance_members.iter())
            .cloned()
            .collect();
        GraphSnapshot::new(vec![self.path.clone(), self.hindrances.clone()], dhammas)
    }
}

// ============================================================================
// Verification
// ============================================================================

#[test]
fn test_consistent_graph_verifies() {
    let snapshot = Fixture::new().snapshot();
    verify_invariants(&snapshot).expect("fixture should be consistent");
    assert!(validate(&snapshot).all_passed());
}

#[test]
fn test_containment_as_zoom_is_rejected() {
    let mut fx = Fixture::new();
    let parent = fx.path.id;
    fx.path_members[0].downstream.push(EntityRef::list(parent));
    fx.path.upstream_from.push(fx.path_members[0].id);

    let err = verify_invariants(&fx.snapshot()).unwrap_err();
    assert_eq!(err.broken(), vec![Invariant::ContainmentIsNotZoom]);
    assert!(err.to_string().contains("right-effort"));
}

#[test]
fn test_downstream_checked_under_declared_kind() {
    let mut fx = Fixture::new();
    // The id exists, but as a List, not a Dhamma.
    let list_id = fx.hindrances.id;
    fx.path_members[0].downstream.push(EntityRef::dhamma(list_id));

    let err = verify_invariants(&fx.snapshot()).unwrap_err();
    assert!(err.violations.iter().any(|v| matches!(
        v,
        InvariantViolation::DanglingDownstream { kind: EntityKind::Dhamma, .. }
    )));
}

#[test]
fn test_stale_upstream_is_rejected() {
    let mut fx = Fixture::new();
    fx.hindrances.upstream_from.push(fx.path_members[0].id);

    let err = verify_invariants(&fx.snapshot()).unwrap_err();
    assert_eq!(err.broken(), vec![Invariant::DerivedUpstream]);
}

#[test]
fn test_position_gap_is_rejected() {
    let mut fx = Fixture::new();
    fx.path_members[2].position_in_list = 5;

    let err = verify_invariants(&fx.snapshot()).unwrap_err();
    assert_eq!(err.broken(), vec![Invariant::ContiguousPositions]);
}

#[test]
fn test_child_owned_elsewhere_is_rejected() {
    let mut fx = Fixture::new();
    let stray = fx.hindrance_members[0].id;
    fx.path.children.push(stray);

    let err = verify_invariants(&fx.snapshot()).unwrap_err();
    assert!(err.broken().contains(&Invariant::ContainmentSymmetry));
}

#[test]
fn test_duplicate_slug_within_kind_is_rejected() {
    let mut fx = Fixture::new();
    fx.hindrance_members[1].slug = "sensual-desire".to_string();

    let err = verify_invariants(&fx.snapshot()).unwrap_err();
    assert_eq!(err.broken(), vec![Invariant::KindQualifiedSlugs]);
}

#[test]
fn test_same_slug_across_kinds_is_allowed() {
    let mut fx = Fixture::new();
    fx.path_members[0].slug = "noble-eightfold-path".to_string();

    let snapshot = fx.snapshot();
    verify_invariants(&snapshot).expect("cross-kind slug reuse is legal");
    assert_ne!(
        snapshot.list_by_slug("noble-eightfold-path").map(|l| l.id),
        snapshot.dhamma_by_slug("noble-eightfold-path").map(|d| d.id)
    );
}

#[test]
fn test_report_warns_on_cycles_and_missing_essays() {
    let mut fx = Fixture::new();
    // sensual-desire zooms back into the path, which contains right-concentration,
    // which zooms into the hindrances.
    fx.hindrance_members[0]
        .downstream
        .push(EntityRef::list(fx.path.id));
    fx.path.upstream_from.push(fx.hindrance_members[0].id);

    let report = validate(&fx.snapshot());
    assert!(report.all_passed());
    assert!(report.warnings.iter().any(|w| w.contains("essay coverage")));
    assert!(report.warnings.iter().any(|w| w.contains("reach themselves")));
}

// ============================================================================
// Publish
// ============================================================================

#[test]
fn test_publish_swaps_and_bumps_generation() {
    let published = PublishedGraph::new();
    let before = published.current();
    assert_eq!(before.generation(), 0);
    assert!(before.is_empty());

    let guard = published.begin_load().unwrap();
    let after = guard.publish(Fixture::new().snapshot());

    assert_eq!(after.generation(), 1);
    assert_eq!(published.generation(), 1);
    // A reader that pinned the old graph keeps it.
    assert!(before.is_empty());
    assert_eq!(published.current().lists().len(), 2);
}

#[test]
fn test_second_load_is_refused_while_first_holds_lock() {
    let published = PublishedGraph::new();
    let guard = published.begin_load().unwrap();
    assert!(matches!(
        published.begin_load(),
        Err(StoreError::LoadInProgress)
    ));
    drop(guard);
    assert!(published.begin_load().is_ok());
    assert_eq!(published.generation(), 0);
}

#[test]
fn test_lock_file_is_exclusive_and_released() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("graph.json");

    let lock = LockFile::acquire(&snapshot_path).unwrap();
    assert!(lock.path().exists());
    assert!(matches!(
        LockFile::acquire(&snapshot_path),
        Err(StoreError::LockHeld { .. })
    ));
    let lock_path = lock.path().to_path_buf();
    drop(lock);
    assert!(!lock_path.exists());
    assert!(LockFile::acquire(&snapshot_path).is_ok());
}

#[test]
fn test_lock_file_names_its_holder() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("graph.json");

    let lock = LockFile::acquire(&snapshot_path).unwrap();
    assert_eq!(LockFile::read_holder(lock.path()), Some(std::process::id()));

    let err = LockFile::acquire(&snapshot_path).unwrap_err();
    match &err {
        StoreError::LockHeld { path, holder } => {
            assert_eq!(path, lock.path());
            assert_eq!(*holder, Some(std::process::id()));
        }
        other => panic!("expected LockHeld, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains(&format!("process {}", std::process::id())));
    assert!(message.contains("delete it"));
}

#[test]
fn test_stale_lock_without_pid_still_reports_path() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("graph.json");
    let lock_path = dir.path().join("graph.json.lock");
    std::fs::write(&lock_path, "").unwrap();

    let err = LockFile::acquire(&snapshot_path).unwrap_err();
    assert!(matches!(err, StoreError::LockHeld { holder: None, .. }));
    assert!(err.to_string().contains("an unknown process"));
    assert!(err.to_string().contains("graph.json.lock"));
    // The stale file is left for the operator to remove.
    assert!(lock_path.exists());
}

#[test]
fn test_snapshot_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let fx = Fixture::new();
    let snapshot = fx.snapshot();

    snapshot.save(&path).unwrap();
    assert!(!dir.path().join("graph.json.tmp").exists());

    let restored = GraphSnapshot::load(&path).unwrap();
    assert_eq!(restored.lists(), snapshot.lists());
    assert_eq!(restored.dhammas(), snapshot.dhammas());
    // Indexes are rebuilt on load.
    assert_eq!(
        restored.dhamma_by_slug("right-concentration").map(|d| d.id),
        Some(fx.path_members[2].id)
    );
    assert_eq!(restored.kind_of(fx.hindrances.id), Some(EntityKind::List));
}

// ============================================================================
// Document store
// ============================================================================

#[tokio::test]
async fn test_batched_lookup_skips_missing_ids() {
    let fx = Fixture::new();
    let snapshot = fx.snapshot();
    let ids = vec![fx.path_members[0].id, EntityId::new(), fx.hindrance_members[1].id];

    let found = snapshot.find_dhammas(&ids).await.unwrap();
    assert_eq!(found.len(), 2);
    // A list id never comes back from the dhamma collection.
    assert!(snapshot.find_dhammas(&[fx.path.id]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sibling_filter_by_position() {
    let fx = Fixture::new();
    let snapshot = fx.snapshot();

    let siblings = snapshot.find_dhammas_at(fx.path.id, &[0, 2]).await.unwrap();
    let slugs: Vec<&str> = siblings.iter().map(|d| d.slug.as_str()).collect();
    assert_eq!(slugs, vec!["right-effort", "right-concentration"]);
}

#[tokio::test]
async fn test_pinned_store_serves_one_generation() {
    let fx = Fixture::new();
    let published = PublishedGraph::from_snapshot(fx.snapshot());
    let store = published.store();
    assert_eq!(store.generation(), 0);

    let mut renamed = fx.path.clone();
    renamed.name = "Path".to_string();
    let next = GraphSnapshot::new(vec![renamed, fx.hindrances.clone()], Vec::new());
    published.begin_load().unwrap().publish(next);

    let list = store.find_list(fx.path.id).await.unwrap().unwrap();
    assert_eq!(list.name, "Noble Eightfold Path");
    assert_eq!(store.find_dhammas(&fx.path.children).await.unwrap().len(), 3);

    let fresh = published.store();
    assert_eq!(fresh.generation(), 1);
    assert_eq!(fresh.find_list(fx.path.id).await.unwrap().unwrap().name, "Path");
    assert!(fresh.find_dhammas(&fx.path.children).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_instrumented_store_counts_roundtrips() {
    let fx = Fixture::new();
    let store = InstrumentedStore::new(std::sync::Arc::new(fx.snapshot()));
    let stats = store.stats();

    store.find_list(fx.path.id).await.unwrap();
    store.find_dhammas(&fx.path.children).await.unwrap();
    store.find_dhammas_at(fx.path.id, &[1]).await.unwrap();

    assert_eq!(stats.roundtrips(), 3);
    assert_eq!(
        stats.ids_requested.load(std::sync::atomic::Ordering::Relaxed),
        3
    );
    stats.reset();
    assert_eq!(stats.roundtrips(), 0);
}
