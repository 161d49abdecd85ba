use std::fs;

use football_terminal::tracking::{RunStatus, TrackingStore, load_run_table};

#[test]
fn runs_round_trip_params_metrics_and_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TrackingStore::open(&dir.path().join("mlruns/tracking.sqlite")).expect("open store");
    let exp = store.get_or_create_experiment("passes").expect("experiment");
    assert_eq!(store.get_or_create_experiment("passes").expect("experiment"), exp);

    let run_id = store.start_run(exp, "xgboost-run-1").expect("start");
    assert_eq!(run_id.len(), 32);
    store.log_param(&run_id, "max_depth", "6").expect("param");
    store
        .log_params(&run_id, &[("learning_rate", "0.1".to_string())])
        .expect("params");
    store.log_metric(&run_id, "accuracy", 0.81).expect("metric");
    store.log_metric(&run_id, "accuracy", 0.82).expect("metric overwrite");

    let report = dir.path().join("report.txt");
    fs::write(&report, "precision recall").expect("write report");
    let copied = store.log_artifact(&run_id, &report).expect("artifact");
    assert!(copied.starts_with(store.artifact_root()));
    assert_eq!(fs::read_to_string(&copied).expect("read copy"), "precision recall");
    assert_eq!(store.artifacts(&run_id).expect("artifacts"), vec![copied]);

    store.end_run(&run_id, RunStatus::Finished).expect("end");
    let run = store.get_run(&run_id).expect("get").expect("run exists");
    assert_eq!(run.status, "FINISHED");
    assert!(run.end_time.is_some());
    assert_eq!(run.metric("accuracy"), Some(0.82));
    assert_eq!(run.param("max_depth"), Some("6"));
    assert_eq!(run.param("learning_rate"), Some("0.1"));
}

#[test]
fn ending_an_unknown_run_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TrackingStore::open(&dir.path().join("tracking.sqlite")).expect("open store");
    assert!(store.end_run("missing", RunStatus::Failed).is_err());
    assert!(store.get_run("missing").expect("query").is_none());
}

#[test]
fn search_orders_by_metric_with_missing_last() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("tracking.sqlite");
    let store = TrackingStore::open(&db).expect("open store");
    let exp = store.get_or_create_experiment("passes").expect("experiment");
    let other = store.get_or_create_experiment("eda").expect("experiment");

    let mut ids = Vec::new();
    for (name, accuracy) in [("low", Some(0.6)), ("none", None), ("high", Some(0.9))] {
        let id = store.start_run(exp, name).expect("start");
        if let Some(acc) = accuracy {
            store.log_metric(&id, "accuracy", acc).expect("metric");
            store.log_metric(&id, "roc_auc", acc - 0.1).expect("metric");
        }
        ids.push(id);
    }
    let stray = store.start_run(other, "eda").expect("start");
    store.log_metric(&stray, "accuracy", 1.0).expect("metric");

    let runs = store.search_runs("passes", "accuracy", 10).expect("search");
    let names: Vec<&str> = runs.iter().map(|r| r.run_name.as_str()).collect();
    assert_eq!(names, vec!["high", "low", "none"]);
    assert_eq!(store.search_runs("passes", "accuracy", 1).expect("search").len(), 1);
    assert!(store.search_runs("unknown", "accuracy", 10).expect("search").is_empty());

    let best = store.best_run("passes").expect("best").expect("has best");
    assert_eq!(best.run_name, "high");

    drop(store);
    let table = load_run_table(&db, "passes").expect("table");
    assert_eq!(table.rows.len(), 3);
    let top = table.best.expect("best row");
    assert_eq!(top.accuracy, Some(0.9));
    assert_eq!(top.short_id().len(), 8);
    assert!(table.rows[2].accuracy.is_none());
}

#[test]
fn experiment_without_metrics_has_no_best() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("tracking.sqlite");
    let store = TrackingStore::open(&db).expect("open store");
    let exp = store.get_or_create_experiment("passes").expect("experiment");
    store.start_run(exp, "unscored").expect("start");

    let table = store.fetch_run_summaries("passes").expect("table");
    assert_eq!(table.rows.len(), 1);
    assert!(table.best.is_none());
    assert!(store.best_run("passes").expect("best").is_none());
}
