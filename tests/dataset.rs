use std::path::PathBuf;

use football_terminal::{dataset, features};

fn fixture_events() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/data/events")
}

#[test]
fn builds_then_reuses_the_pass_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("cache/pass_data.sqlite");

    let (rows, summary) =
        dataset::build_all_passes_dataset(&fixture_events(), &db, None).expect("build");
    assert!(!summary.from_cache);
    assert_eq!(summary.files_total, 1);
    assert_eq!(summary.files_succeeded, 1);
    assert_eq!(summary.passes_inserted, 8);
    assert!(summary.errors.is_empty());
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.match_id == 9001));
    assert_eq!(dataset::records(&rows).iter().filter(|r| r.completed).count(), 7);

    let (cached, again) =
        dataset::build_all_passes_dataset(&fixture_events(), &db, None).expect("reuse");
    assert!(again.from_cache);
    assert_eq!(cached, rows);
}

#[test]
fn empty_events_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let events = dir.path().join("events");
    std::fs::create_dir_all(&events).expect("mkdir");
    let db = dir.path().join("pass_data.sqlite");
    assert!(dataset::build_all_passes_dataset(&events, &db, None).is_err());
}

#[test]
fn passes_without_a_finished_build_are_rebuilt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("pass_data.sqlite");
    {
        let conn = dataset::open_db(&db).expect("open");
        let passes =
            features::build_pass_dataset(&fixture_events().join("9001.json")).expect("passes");
        dataset::insert_match_passes(&conn, 1234, &passes[..2]).expect("insert leftover");
        assert_eq!(dataset::count_passes(&conn).expect("count"), 2);
        assert_eq!(dataset::count_builds(&conn).expect("builds"), 0);
    }

    let (rows, summary) =
        dataset::build_all_passes_dataset(&fixture_events(), &db, None).expect("build");
    assert!(!summary.from_cache);
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.match_id == 9001));

    let (_, again) = dataset::build_all_passes_dataset(&fixture_events(), &db, None).expect("reuse");
    assert!(again.from_cache);
}

#[test]
fn open_db_reports_an_unusable_parent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").expect("write");
    let err = dataset::open_db(&blocker.join("cache/pass_data.sqlite")).expect_err("blocked");
    assert!(format!("{err:#}").contains("create"));
}
