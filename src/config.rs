use std::env;
use std::path::PathBuf;

use chrono::Local;

pub const DEFAULT_MODEL_NAME: &str = "xgboost";
pub const DEFAULT_EXPERIMENT: &str = "football-pass-prediction";
pub const EDA_EXPERIMENT: &str = "football-pass-eda";
pub const DEFAULT_OVERVIEW_MATCH: u64 = 3764230;
pub const DEFAULT_COMPETITIONS: &[&str] = &["English Premier League", "La Liga", "Champions League"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub model_name: String,
    pub random_seed: u64,
    pub test_size: f64,
    pub model_dir: PathBuf,
    pub resources_dir: PathBuf,
    pub tracking_db: PathBuf,
    pub experiment: String,
    pub dataset_db: PathBuf,
    pub overview_match: u64,
    pub competitions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("open-data/data"),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            random_seed: 42,
            test_size: 0.2,
            model_dir: PathBuf::from("models"),
            resources_dir: PathBuf::from("resources"),
            tracking_db: PathBuf::from("mlruns/tracking.sqlite"),
            experiment: DEFAULT_EXPERIMENT.to_string(),
            dataset_db: PathBuf::from(".cache/pass_data.sqlite"),
            overview_match: DEFAULT_OVERVIEW_MATCH,
            competitions: DEFAULT_COMPETITIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Loads `.env.local` / `.env` (if present) and overlays `FSP_*` variables on the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = Self::default();
        Self {
            data_dir: path_env("FSP_DATA_DIR").unwrap_or(defaults.data_dir),
            model_name: string_env("FSP_MODEL_NAME").unwrap_or(defaults.model_name),
            random_seed: env::var("FSP_RANDOM_SEED")
                .ok()
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(defaults.random_seed),
            test_size: env::var("FSP_TEST_SIZE")
                .ok()
                .and_then(|val| val.trim().parse::<f64>().ok())
                .unwrap_or(defaults.test_size)
                .clamp(0.05, 0.5),
            model_dir: path_env("FSP_MODEL_DIR").unwrap_or(defaults.model_dir),
            resources_dir: path_env("FSP_RESOURCES_DIR").unwrap_or(defaults.resources_dir),
            tracking_db: path_env("FSP_TRACKING_DB").unwrap_or(defaults.tracking_db),
            experiment: string_env("FSP_EXPERIMENT").unwrap_or(defaults.experiment),
            dataset_db: path_env("FSP_DATASET_DB").unwrap_or(defaults.dataset_db),
            overview_match: env::var("FSP_OVERVIEW_MATCH")
                .ok()
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(defaults.overview_match),
            competitions: string_env("FSP_COMPETITIONS")
                .map(|raw| parse_list(&raw))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.competitions),
        }
    }

    pub fn events_dir(&self) -> PathBuf {
        self.data_dir.join("events")
    }

    pub fn matches_dir(&self) -> PathBuf {
        self.data_dir.join("matches")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.resources_dir.join("plots")
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_path_for(&self.model_name)
    }

    pub fn model_path_for(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(format!("{model_name}_model.json"))
    }

    pub fn run_name(&self) -> String {
        format!(
            "{}-run-{}",
            self.model_name,
            Local::now().format("%Y%m%d-%H%M%S")
        )
    }
}

fn string_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn path_env(key: &str) -> Option<PathBuf> {
    string_env(key).map(PathBuf::from)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Settings, parse_list};

    #[test]
    fn competition_list_skips_blanks() {
        let list = parse_list(" La Liga, ,Champions League,");
        assert_eq!(list, vec!["La Liga".to_string(), "Champions League".to_string()]);
    }

    #[test]
    fn model_path_uses_template() {
        let settings = Settings::default();
        assert_eq!(
            settings.model_path().to_string_lossy(),
            "models/xgboost_model.json"
        );
        assert!(settings.run_name().starts_with("xgboost-run-"));
    }
}
