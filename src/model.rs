use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boosting::{BoostParams, GradientBoosting};
use crate::features::EngineeredPass;
use crate::logistic::LogisticRegression;
use crate::preprocess::Preprocessor;

pub const LOGISTIC_REGRESSION: &str = "logistic_regression";
pub const XGBOOST: &str = "xgboost";
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Unsupported model: {0}")]
    Unsupported(String),
    #[error("no training rows")]
    EmptyData,
    #[error("{rows} feature rows but {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("feature rows have different lengths")]
    RaggedRows,
    #[error("Newton step hit a singular Hessian")]
    Singular,
    #[error("model has not been fitted")]
    NotFitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    Logistic(LogisticRegression),
    Boosted(GradientBoosting),
}

impl Classifier {
    pub fn name(&self) -> &'static str {
        match self {
            Classifier::Logistic(_) => LOGISTIC_REGRESSION,
            Classifier::Boosted(_) => XGBOOST,
        }
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        match self {
            Classifier::Logistic(m) => m.fit(x, y),
            Classifier::Boosted(m) => m.fit(x, y),
        }
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        match self {
            Classifier::Logistic(m) => m.predict_proba_row(row),
            Classifier::Boosted(m) => m.predict_proba_row(row),
        }
    }

    /// Hyperparameters as `(name, value)` pairs, in the order they are logged.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Classifier::Logistic(m) => vec![
                ("C", m.c.to_string()),
                ("max_iter", m.max_iter.to_string()),
            ],
            Classifier::Boosted(m) => {
                let p = &m.params;
                vec![
                    ("n_estimators", p.n_estimators.to_string()),
                    ("learning_rate", p.learning_rate.to_string()),
                    ("max_depth", p.max_depth.to_string()),
                    ("subsample", p.subsample.to_string()),
                    ("colsample_bytree", p.colsample_bytree.to_string()),
                    ("reg_lambda", p.reg_lambda.to_string()),
                    ("min_child_weight", p.min_child_weight.to_string()),
                    ("random_state", p.seed.to_string()),
                ]
            }
        }
    }
}

/// Builds an unfitted classifier by name. `params` only applies to the boosted model.
pub fn get_model(name: &str, params: Option<BoostParams>) -> Result<Classifier, ModelError> {
    match name {
        LOGISTIC_REGRESSION => Ok(Classifier::Logistic(LogisticRegression::default())),
        XGBOOST => Ok(Classifier::Boosted(GradientBoosting::new(
            params.unwrap_or_default(),
        ))),
        other => Err(ModelError::Unsupported(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassPipeline {
    pub preprocessor: Option<Preprocessor>,
    pub classifier: Classifier,
}

impl PassPipeline {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            preprocessor: None,
            classifier,
        }
    }

    pub fn fit(&mut self, rows: &[EngineeredPass]) -> Result<(), ModelError> {
        let preprocessor = Preprocessor::fit(rows)?;
        let x = preprocessor.transform(rows);
        let y: Vec<u8> = rows.iter().map(EngineeredPass::label).collect();
        self.classifier.fit(&x, &y)?;
        self.preprocessor = Some(preprocessor);
        Ok(())
    }

    pub fn predict_proba(&self, rows: &[EngineeredPass]) -> Result<Vec<f64>, ModelError> {
        let preprocessor = self.preprocessor.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(rows
            .iter()
            .map(|r| self.classifier.predict_proba_row(&preprocessor.transform_row(r)))
            .collect())
    }

    pub fn predict(&self, rows: &[EngineeredPass]) -> Result<Vec<u8>, ModelError> {
        Ok(self
            .predict_proba(rows)?
            .into_iter()
            .map(|p| u8::from(p >= DECISION_THRESHOLD))
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let raw = serde_json::to_string(self).context("serialize pipeline")?;
        fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse model {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelError, get_model};

    #[test]
    fn unknown_model_name_is_rejected() {
        let err = get_model("random_forest", None).unwrap_err();
        assert_eq!(err, ModelError::Unsupported("random_forest".to_string()));
        assert_eq!(err.to_string(), "Unsupported model: random_forest");
    }

    #[test]
    fn boosted_defaults_are_logged() {
        let model = get_model("xgboost", None).expect("model");
        let params = model.params();
        assert!(params.contains(&("max_depth", "6".to_string())));
        assert!(params.contains(&("learning_rate", "0.1".to_string())));
        assert_eq!(model.name(), "xgboost");
    }
}
