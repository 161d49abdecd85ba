use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::boosting::{BoostParams, GradientBoosting};
use crate::features::EngineeredPass;
use crate::metrics::{self, Metrics};
use crate::model::{Classifier, DECISION_THRESHOLD, ModelError};
use crate::preprocess::Preprocessor;
use crate::split::stratified_split;
use crate::tracking::{RunStatus, TrackingStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSpace {
    pub max_depth: (usize, usize),
    pub learning_rate: (f64, f64),
    pub n_estimators: (usize, usize),
    pub subsample: (f64, f64),
    pub colsample_bytree: (f64, f64),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            max_depth: (3, 10),
            learning_rate: (0.01, 0.3),
            n_estimators: (50, 300),
            subsample: (0.5, 1.0),
            colsample_bytree: (0.5, 1.0),
        }
    }
}

impl SearchSpace {
    /// Learning rate is drawn log-uniformly, everything else uniformly.
    pub fn sample(&self, rng: &mut StdRng, seed: u64) -> BoostParams {
        let (lr_lo, lr_hi) = self.learning_rate;
        let log_lr = rng.gen_range(lr_lo.ln()..=lr_hi.ln());
        BoostParams {
            max_depth: rng.gen_range(self.max_depth.0..=self.max_depth.1),
            learning_rate: log_lr.exp().clamp(lr_lo, lr_hi),
            n_estimators: rng.gen_range(self.n_estimators.0..=self.n_estimators.1),
            subsample: rng.gen_range(self.subsample.0..=self.subsample.1),
            colsample_bytree: rng.gen_range(self.colsample_bytree.0..=self.colsample_bytree.1),
            seed,
            ..BoostParams::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrialResult {
    pub number: usize,
    pub params: BoostParams,
    pub metrics: Metrics,
    pub run_id: Option<String>,
}

impl TrialResult {
    pub fn objective(&self) -> f64 {
        self.metrics.accuracy
    }
}

#[derive(Debug, Clone)]
pub struct TuningOutcome {
    pub trials: Vec<TrialResult>,
    pub best: usize,
}

impl TuningOutcome {
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.trials.get(self.best)
    }
}

/// Seeded random search over the boosted model. Trials run in parallel on a shared
/// preprocessed split; each finished trial is logged as its own run when a store is given.
pub fn tune(
    rows: &[EngineeredPass],
    space: &SearchSpace,
    n_trials: usize,
    test_size: f64,
    seed: u64,
    tracking: Option<(&TrackingStore, &str)>,
) -> Result<TuningOutcome> {
    if n_trials == 0 {
        return Err(ModelError::EmptyData.into());
    }
    let split = stratified_split(rows, EngineeredPass::label, test_size, seed);
    if split.test.is_empty() {
        return Err(ModelError::EmptyData.into());
    }
    let preprocessor = Preprocessor::fit(&split.train)?;
    let x_train = preprocessor.transform(&split.train);
    let y_train: Vec<u8> = split.train.iter().map(EngineeredPass::label).collect();
    let x_test = preprocessor.transform(&split.test);
    let y_test: Vec<u8> = split.test.iter().map(EngineeredPass::label).collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let candidates: Vec<BoostParams> = (0..n_trials).map(|_| space.sample(&mut rng, seed)).collect();
    info!(trials = n_trials, train = x_train.len(), test = x_test.len(), "search started");

    let evaluated: Vec<(usize, BoostParams, Result<Metrics, ModelError>)> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(number, params)| {
            let mut model = Classifier::Boosted(GradientBoosting::new(params));
            let result = model.fit(&x_train, &y_train).map(|()| {
                let probs: Vec<f64> = x_test.iter().map(|r| model.predict_proba_row(r)).collect();
                metrics::evaluate(&y_test, &probs, DECISION_THRESHOLD)
            });
            (number, params, result)
        })
        .collect();

    let mut trials = Vec::with_capacity(evaluated.len());
    for (number, params, result) in evaluated {
        let metrics = match result {
            Ok(metrics) => metrics,
            Err(err) => {
                warn!(trial = number, "trial failed: {err}");
                continue;
            }
        };
        let run_id = match tracking {
            Some((store, experiment)) => Some(log_trial(store, experiment, number, &params, &metrics)?),
            None => None,
        };
        info!(trial = number, accuracy = metrics.accuracy, "trial finished");
        trials.push(TrialResult {
            number,
            params,
            metrics,
            run_id,
        });
    }

    let best = best_index(&trials).ok_or(ModelError::EmptyData)?;
    Ok(TuningOutcome { trials, best })
}

/// Highest objective; ties keep the earliest trial.
pub fn best_index(trials: &[TrialResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, trial) in trials.iter().enumerate() {
        if best.is_none_or(|b| trial.objective() > trials[b].objective()) {
            best = Some(i);
        }
    }
    best
}

fn log_trial(
    store: &TrackingStore,
    experiment: &str,
    number: usize,
    params: &BoostParams,
    metrics: &Metrics,
) -> Result<String> {
    let experiment_id = store.get_or_create_experiment(experiment)?;
    let run_id = store.start_run(experiment_id, &format!("xgboost-trial-{number}"))?;
    let classifier = Classifier::Boosted(GradientBoosting::new(*params));
    let logged = (|| -> Result<()> {
        store.log_param(&run_id, "model_name", "xgboost")?;
        store.log_param(&run_id, "trial", &number.to_string())?;
        store.log_params(&run_id, &classifier.params())?;
        for (key, value) in metrics.as_pairs() {
            store.log_metric(&run_id, key, value)?;
        }
        Ok(())
    })();
    let status = if logged.is_ok() {
        RunStatus::Finished
    } else {
        RunStatus::Failed
    };
    store.end_run(&run_id, status)?;
    logged?;
    Ok(run_id)
}

pub fn render_outcome(outcome: &TuningOutcome) -> String {
    let mut lines = vec![format!(
        "{:>5}  {:>5}  {:>8}  {:>6}  {:>9}  {:>9}  {:>8}",
        "trial", "depth", "lr", "trees", "subsample", "colsample", "accuracy"
    )];
    for t in &outcome.trials {
        lines.push(format!(
            "{:>5}  {:>5}  {:>8.4}  {:>6}  {:>9.3}  {:>9.3}  {:>8.4}",
            t.number,
            t.params.max_depth,
            t.params.learning_rate,
            t.params.n_estimators,
            t.params.subsample,
            t.params.colsample_bytree,
            t.metrics.accuracy
        ));
    }
    if let Some(best) = outcome.best_trial() {
        lines.push(String::new());
        lines.push(format!(
            "Best trial {}: accuracy {:.4} (max_depth={}, learning_rate={:.4}, n_estimators={}, subsample={:.3}, colsample_bytree={:.3})",
            best.number,
            best.metrics.accuracy,
            best.params.max_depth,
            best.params.learning_rate,
            best.params.n_estimators,
            best.params.subsample,
            best.params.colsample_bytree
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::SearchSpace;

    #[test]
    fn samples_stay_inside_the_space() {
        let space = SearchSpace::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = space.sample(&mut rng, 42);
            assert!((3..=10).contains(&p.max_depth));
            assert!((50..=300).contains(&p.n_estimators));
            assert!(p.learning_rate >= 0.01 && p.learning_rate <= 0.3);
            assert!(p.subsample >= 0.5 && p.subsample <= 1.0);
            assert!(p.colsample_bytree >= 0.5 && p.colsample_bytree <= 1.0);
            assert_eq!(p.seed, 42);
        }
    }

    #[test]
    fn same_seed_same_candidates() {
        let space = SearchSpace::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(space.sample(&mut a, 1), space.sample(&mut b, 1));
    }
}
