use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::dataset;
use crate::eda;
use crate::features::{self, EngineeredPass, PassRecord};
use crate::metrics::{self, CalibrationBin, ConfusionMatrix, Metrics};
use crate::model::{self, Classifier, DECISION_THRESHOLD, ModelError, PassPipeline};
use crate::split::stratified_split;
use crate::tracking::{RunStatus, TrackingStore};

pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.json";
pub const REPORT_FILE: &str = "classification_report.txt";
pub const CALIBRATION_FILE: &str = "calibration_bins.json";

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub pipeline: PassPipeline,
    pub metrics: Metrics,
    pub confusion: ConfusionMatrix,
    pub calibration: Vec<CalibrationBin>,
    pub report: String,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub run_id: String,
    pub run_name: String,
    pub model_name: String,
    pub model_path: PathBuf,
    pub evaluation: Evaluation,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ConfusionArtifact<'a> {
    labels: [&'a str; 2],
    matrix: [[usize; 2]; 2],
}

/// Cached dataset → engineered, de-duplicated rows.
pub fn load_training_rows(settings: &Settings, limit: Option<usize>) -> Result<Vec<EngineeredPass>> {
    let (rows, summary) =
        dataset::build_all_passes_dataset(&settings.events_dir(), &settings.dataset_db, limit)?;
    if !summary.errors.is_empty() {
        warn!(failed = summary.errors.len(), "some event files could not be read");
    }
    Ok(eda::basic_checks(&dataset::records(&rows)))
}

/// Stratified split, fit on the train part, score the held-out part.
pub fn fit_and_evaluate(
    rows: &[EngineeredPass],
    classifier: Classifier,
    test_size: f64,
    seed: u64,
) -> Result<Evaluation, ModelError> {
    let split = stratified_split(rows, EngineeredPass::label, test_size, seed);
    if split.test.is_empty() {
        return Err(ModelError::EmptyData);
    }

    let mut pipeline = PassPipeline::new(classifier);
    pipeline.fit(&split.train)?;

    let probs = pipeline.predict_proba(&split.test)?;
    let actual: Vec<u8> = split.test.iter().map(EngineeredPass::label).collect();
    let predicted: Vec<u8> = probs
        .iter()
        .map(|&p| u8::from(p >= DECISION_THRESHOLD))
        .collect();

    Ok(Evaluation {
        metrics: metrics::evaluate(&actual, &probs, DECISION_THRESHOLD),
        confusion: metrics::confusion_matrix(&actual, &predicted),
        calibration: metrics::calibration_bins(&actual, &probs, 10),
        report: metrics::classification_report(&actual, &predicted),
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        pipeline,
    })
}

pub fn train(settings: &Settings, limit: Option<usize>) -> Result<TrainingReport> {
    let rows = load_training_rows(settings, limit)?;
    train_on_rows(settings, &rows)
}

/// Fits the configured model, saves it, and records the run in the tracking store.
pub fn train_on_rows(settings: &Settings, rows: &[EngineeredPass]) -> Result<TrainingReport> {
    let classifier = model::get_model(&settings.model_name, None)?;
    let logged_params = classifier.params();

    let store = TrackingStore::open(&settings.tracking_db)?;
    let experiment_id = store.get_or_create_experiment(&settings.experiment)?;
    let run_name = settings.run_name();
    let run_id = store.start_run(experiment_id, &run_name)?;
    info!(run_id = %run_id, run_name = %run_name, rows = rows.len(), "training started");

    let outcome = fit_and_evaluate(rows, classifier, settings.test_size, settings.random_seed);
    let evaluation = match outcome {
        Ok(evaluation) => evaluation,
        Err(err) => {
            store.end_run(&run_id, RunStatus::Failed)?;
            return Err(err.into());
        }
    };

    let recorded = record_run(&store, &run_id, settings, &logged_params, &evaluation);
    let status = if recorded.is_ok() {
        RunStatus::Finished
    } else {
        RunStatus::Failed
    };
    store.end_run(&run_id, status)?;
    let (model_path, artifacts) = recorded?;

    info!(
        run_id = %run_id,
        accuracy = evaluation.metrics.accuracy,
        roc_auc = evaluation.metrics.roc_auc,
        "training finished"
    );
    Ok(TrainingReport {
        run_id,
        run_name,
        model_name: settings.model_name.clone(),
        model_path,
        evaluation,
        artifacts,
    })
}

/// Params, metrics, the saved model and evaluation artifacts for one run.
fn record_run(
    store: &TrackingStore,
    run_id: &str,
    settings: &Settings,
    logged_params: &[(&'static str, String)],
    evaluation: &Evaluation,
) -> Result<(PathBuf, Vec<PathBuf>)> {
    store.log_param(run_id, "model_name", &settings.model_name)?;
    store.log_param(run_id, "test_size", &settings.test_size.to_string())?;
    store.log_param(run_id, "random_seed", &settings.random_seed.to_string())?;
    store.log_params(run_id, logged_params)?;
    for (key, value) in evaluation.metrics.as_pairs() {
        store.log_metric(run_id, key, value)?;
    }

    let model_path = settings.model_path();
    evaluation.pipeline.save(&model_path)?;
    info!(path = %model_path.display(), "model saved");

    let mut artifacts = write_evaluation_artifacts(evaluation, &settings.plots_dir())?;
    artifacts.push(model_path.clone());
    for path in &artifacts {
        store.log_artifact(run_id, path)?;
    }
    Ok((model_path, artifacts))
}

pub fn write_evaluation_artifacts(evaluation: &Evaluation, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let confusion = ConfusionArtifact {
        labels: ["failed", "complete"],
        matrix: evaluation.confusion.as_rows(),
    };
    let files = [
        (
            CONFUSION_MATRIX_FILE,
            serde_json::to_string_pretty(&confusion).context("serialize confusion matrix")?,
        ),
        (REPORT_FILE, evaluation.report.clone()),
        (
            CALIBRATION_FILE,
            serde_json::to_string_pretty(&evaluation.calibration)
                .context("serialize calibration bins")?,
        ),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, body) in files {
        let path = dir.join(name);
        fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Success probability for each raw pass, using a saved pipeline.
pub fn predict_pass_outcome(model_path: &Path, records: &[PassRecord]) -> Result<Vec<f64>> {
    let pipeline = PassPipeline::load(model_path)?;
    let rows = features::engineer_all(records);
    Ok(pipeline.predict_proba(&rows)?)
}

pub fn render_summary(report: &TrainingReport) -> String {
    let m = &report.evaluation.metrics;
    let mut lines = vec![
        format!("Run:       {} ({})", report.run_name, report.run_id),
        format!("Model:     {}", report.model_name),
        format!(
            "Rows:      {} train / {} test",
            report.evaluation.train_rows, report.evaluation.test_rows
        ),
        String::new(),
    ];
    for (key, value) in m.as_pairs() {
        lines.push(format!("{key:<10} {value:.4}"));
    }
    lines.push(String::new());
    lines.push(report.evaluation.report.clone());
    lines.push(String::new());
    lines.push(format!("Model saved to {}", report.model_path.display()));
    lines.join("\n")
}
