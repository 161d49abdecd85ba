use std::path::Path;

use football_terminal::boosting::BoostParams;
use football_terminal::config::Settings;
use football_terminal::features::{self, EngineeredPass, PassRecord};
use football_terminal::model::{self, LOGISTIC_REGRESSION, ModelError, PassPipeline, XGBOOST};
use football_terminal::tracking::TrackingStore;
use football_terminal::training::{self, CONFUSION_MATRIX_FILE, REPORT_FILE};
use football_terminal::tuning::{self, SearchSpace};

/// Short passes succeed, long ones fail, with every 17th label flipped as noise.
fn synthetic_records(n: usize) -> Vec<PassRecord> {
    (0..n)
        .map(|i| {
            let start_x = 5.0 + (i * 7 % 100) as f64;
            let start_y = 5.0 + (i * 13 % 70) as f64;
            let length = 5.0 + (i * 11 % 60) as f64;
            let angle = ((i * 29 % 360) as f64).to_radians() - std::f64::consts::PI;
            let end_x = start_x + length * angle.cos();
            let end_y = start_y + length * angle.sin();
            let mut completed = length < 30.0;
            if i % 17 == 0 {
                completed = !completed;
            }
            PassRecord {
                start_x,
                start_y,
                end_x,
                end_y,
                distance: features::calculate_distance(start_x, start_y, end_x, end_y),
                angle: features::calculate_angle(start_x, start_y, end_x, end_y),
                completed,
                minute: 1 + (i * 3 % 95) as u32,
            }
        })
        .collect()
}

fn synthetic_rows(n: usize) -> Vec<EngineeredPass> {
    features::engineer_all(&synthetic_records(n))
}

fn temp_settings(root: &Path, model_name: &str) -> Settings {
    Settings {
        model_name: model_name.to_string(),
        model_dir: root.join("models"),
        resources_dir: root.join("resources"),
        tracking_db: root.join("mlruns/tracking.sqlite"),
        dataset_db: root.join("cache/pass_data.sqlite"),
        experiment: "test-experiment".to_string(),
        ..Settings::default()
    }
}

#[test]
fn logistic_training_logs_a_finished_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = temp_settings(dir.path(), LOGISTIC_REGRESSION);
    let rows = synthetic_rows(240);

    let report = training::train_on_rows(&settings, &rows).expect("training");
    let metrics = report.evaluation.metrics;
    assert_eq!(report.evaluation.test_rows + report.evaluation.train_rows, 240);
    assert_eq!(metrics.samples, report.evaluation.test_rows);
    assert!(metrics.accuracy > 0.7, "accuracy {}", metrics.accuracy);
    assert!(metrics.roc_auc > 0.7, "roc_auc {}", metrics.roc_auc);
    assert_eq!(report.evaluation.confusion.total(), report.evaluation.test_rows);

    assert!(report.model_path.exists());
    assert!(settings.plots_dir().join(CONFUSION_MATRIX_FILE).exists());
    assert!(settings.plots_dir().join(REPORT_FILE).exists());

    let store = TrackingStore::open(&settings.tracking_db).expect("store");
    let run = store.get_run(&report.run_id).expect("get").expect("run");
    assert_eq!(run.status, "FINISHED");
    assert_eq!(run.param("model_name"), Some(LOGISTIC_REGRESSION));
    assert_eq!(run.metric("accuracy"), Some(metrics.accuracy));
    assert_eq!(
        store.artifacts(&report.run_id).expect("artifacts").len(),
        report.artifacts.len()
    );

    let summary = training::render_summary(&report);
    assert!(summary.contains("accuracy"));
    assert!(summary.contains(&report.run_id));
}

#[test]
fn saved_model_predicts_probabilities() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = temp_settings(dir.path(), LOGISTIC_REGRESSION);
    let report = training::train_on_rows(&settings, &synthetic_rows(200)).expect("training");

    let records = synthetic_records(10);
    let probs = training::predict_pass_outcome(&report.model_path, &records).expect("predict");
    assert_eq!(probs.len(), 10);
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));

    let reloaded = PassPipeline::load(&report.model_path).expect("load");
    let again = reloaded
        .predict_proba(&features::engineer_all(&records))
        .expect("predict");
    assert_eq!(probs, again);
}

#[test]
fn boosted_model_learns_pass_length() {
    let rows = synthetic_rows(300);
    let params = BoostParams {
        n_estimators: 30,
        max_depth: 3,
        ..BoostParams::default()
    };
    let classifier = model::get_model(XGBOOST, Some(params)).expect("model");
    let evaluation = training::fit_and_evaluate(&rows, classifier, 0.2, 42).expect("fit");
    assert_eq!(evaluation.train_rows + evaluation.test_rows, 300);
    assert!((55..=65).contains(&evaluation.test_rows));
    assert!(evaluation.metrics.accuracy > 0.7, "accuracy {}", evaluation.metrics.accuracy);
    assert_eq!(evaluation.calibration.len(), 10);
}

#[test]
fn failed_model_save_marks_the_run_failed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "plain file").expect("write blocker");
    let settings = Settings {
        model_dir: blocker.join("models"),
        ..temp_settings(dir.path(), LOGISTIC_REGRESSION)
    };

    assert!(training::train_on_rows(&settings, &synthetic_rows(120)).is_err());

    let store = TrackingStore::open(&settings.tracking_db).expect("store");
    let runs = store
        .search_runs(&settings.experiment, "accuracy", 10)
        .expect("search");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "FAILED");
    assert!(runs[0].end_time.is_some());
}

#[test]
fn unsupported_model_is_rejected_before_any_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = temp_settings(dir.path(), "random_forest");
    let err = training::train_on_rows(&settings, &synthetic_rows(50)).expect_err("unsupported");
    assert_eq!(
        err.downcast_ref::<ModelError>(),
        Some(&ModelError::Unsupported("random_forest".to_string()))
    );
    assert!(!settings.tracking_db.exists());
}

#[test]
fn unfitted_pipeline_refuses_to_predict() {
    let pipeline = PassPipeline::new(model::get_model(LOGISTIC_REGRESSION, None).expect("model"));
    let err = pipeline.predict_proba(&synthetic_rows(3)).expect_err("unfitted");
    assert_eq!(err, ModelError::NotFitted);
}

#[test]
fn random_search_logs_every_trial() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TrackingStore::open(&dir.path().join("tracking.sqlite")).expect("store");
    let space = SearchSpace {
        max_depth: (2, 4),
        n_estimators: (10, 30),
        ..SearchSpace::default()
    };

    let outcome = tuning::tune(
        &synthetic_rows(200),
        &space,
        4,
        0.25,
        7,
        Some((&store, "tuning")),
    )
    .expect("tune");
    assert_eq!(outcome.trials.len(), 4);
    let numbers: Vec<usize> = outcome.trials.iter().map(|t| t.number).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
    assert!(outcome.trials.iter().all(|t| t.run_id.is_some()));

    let best = outcome.best_trial().expect("best");
    assert!(outcome.trials.iter().all(|t| t.objective() <= best.objective()));

    let runs = store.search_runs("tuning", "accuracy", 10).expect("search");
    assert_eq!(runs.len(), 4);
    assert_eq!(runs[0].metric("accuracy"), Some(best.metrics.accuracy));
    assert!(tuning::render_outcome(&outcome).contains("Best trial"));
}

#[test]
fn zero_trials_is_an_error() {
    assert!(tuning::tune(&synthetic_rows(50), &SearchSpace::default(), 0, 0.2, 1, None).is_err());
}
