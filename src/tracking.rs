use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use uuid::Uuid;

pub const RUN_TABLE_LIMIT: usize = 50;
pub const LEADERBOARD_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub run_name: String,
    pub status: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
}

impl RunRecord {
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// One row of the model leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub run_name: String,
    pub accuracy: Option<f64>,
    pub roc_auc: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub max_depth: Option<String>,
    pub learning_rate: Option<String>,
    pub n_estimators: Option<String>,
}

impl RunSummary {
    fn from_record(run: &RunRecord) -> Self {
        Self {
            run_id: run.run_id.clone(),
            run_name: run.run_name.clone(),
            accuracy: run.metric("accuracy"),
            roc_auc: run.metric("roc_auc"),
            precision: run.metric("precision"),
            recall: run.metric("recall"),
            max_depth: run.param("max_depth").map(str::to_string),
            learning_rate: run.param("learning_rate").map(str::to_string),
            n_estimators: run.param("n_estimators").map(str::to_string),
        }
    }

    pub fn short_id(&self) -> &str {
        self.run_id.get(..8).unwrap_or(&self.run_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTable {
    pub rows: Vec<RunSummary>,
    pub best: Option<RunSummary>,
}

/// Local experiment store: experiments, runs, params, metrics and copied artifacts.
pub struct TrackingStore {
    conn: Connection,
    artifact_root: PathBuf,
}

impl TrackingStore {
    /// Opens (creating if needed) the store; artifacts live next to the db in `artifacts/`.
    pub fn open(path: &Path) -> Result<Self> {
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&root).with_context(|| format!("create {}", root.display()))?;
        let conn = Connection::open(path)
            .with_context(|| format!("open tracking db {}", path.display()))?;
        let store = Self {
            conn,
            artifact_root: root.join("artifacts"),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;
                CREATE TABLE IF NOT EXISTS experiments (
                    experiment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS runs (
                    run_id TEXT PRIMARY KEY,
                    experiment_id INTEGER NOT NULL REFERENCES experiments(experiment_id),
                    run_name TEXT NOT NULL,
                    status TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT
                );
                CREATE TABLE IF NOT EXISTS params (
                    run_id TEXT NOT NULL REFERENCES runs(run_id),
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (run_id, key)
                );
                CREATE TABLE IF NOT EXISTS metrics (
                    run_id TEXT NOT NULL REFERENCES runs(run_id),
                    key TEXT NOT NULL,
                    value REAL NOT NULL,
                    logged_at TEXT NOT NULL,
                    PRIMARY KEY (run_id, key)
                );
                CREATE TABLE IF NOT EXISTS artifacts (
                    run_id TEXT NOT NULL REFERENCES runs(run_id),
                    path TEXT NOT NULL,
                    PRIMARY KEY (run_id, path)
                );
                "#,
            )
            .context("create tracking schema")?;
        Ok(())
    }

    pub fn artifact_root(&self) -> &Path {
        &self.artifact_root
    }

    pub fn find_experiment(&self, name: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT experiment_id FROM experiments WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("look up experiment")
    }

    pub fn get_or_create_experiment(&self, name: &str) -> Result<i64> {
        if let Some(id) = self.find_experiment(name)? {
            return Ok(id);
        }
        self.conn
            .execute(
                "INSERT INTO experiments (name, created_at) VALUES (?1, ?2)",
                params![name, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("create experiment {name}"))?;
        info!(experiment = name, "created experiment");
        Ok(self.conn.last_insert_rowid())
    }

    pub fn start_run(&self, experiment_id: i64, run_name: &str) -> Result<String> {
        let run_id = Uuid::new_v4().simple().to_string();
        self.conn
            .execute(
                "INSERT INTO runs (run_id, experiment_id, run_name, status, start_time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    experiment_id,
                    run_name,
                    RunStatus::Running.as_str(),
                    Utc::now().to_rfc3339()
                ],
            )
            .context("start run")?;
        debug!(run_id = %run_id, run_name, "run started");
        Ok(run_id)
    }

    pub fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE runs SET status = ?2, end_time = ?3 WHERE run_id = ?1",
                params![run_id, status.as_str(), Utc::now().to_rfc3339()],
            )
            .context("end run")?;
        if changed == 0 {
            return Err(anyhow!("unknown run {run_id}"));
        }
        Ok(())
    }

    pub fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO params (run_id, key, value) VALUES (?1, ?2, ?3)",
                params![run_id, key, value],
            )
            .with_context(|| format!("log param {key}"))?;
        Ok(())
    }

    pub fn log_params<K: AsRef<str>>(&self, run_id: &str, pairs: &[(K, String)]) -> Result<()> {
        for (key, value) in pairs {
            self.log_param(run_id, key.as_ref(), value)?;
        }
        Ok(())
    }

    pub fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metrics (run_id, key, value, logged_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![run_id, key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("log metric {key}"))?;
        Ok(())
    }

    /// Copies `path` into `artifacts/<run_id>/` and records it against the run.
    pub fn log_artifact(&self, run_id: &str, path: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| anyhow!("artifact path has no file name: {}", path.display()))?;
        let dir = self.artifact_root.join(run_id);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let dest = dir.join(name);
        fs::copy(path, &dest)
            .with_context(|| format!("copy artifact {} -> {}", path.display(), dest.display()))?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO artifacts (run_id, path) VALUES (?1, ?2)",
                params![run_id, dest.to_string_lossy().into_owned()],
            )
            .context("record artifact")?;
        Ok(dest)
    }

    pub fn artifacts(&self, run_id: &str) -> Result<Vec<PathBuf>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM artifacts WHERE run_id = ?1 ORDER BY path")
            .context("prepare artifact query")?;
        let rows = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))
            .context("query artifacts")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(PathBuf::from(row.context("read artifact row")?));
        }
        Ok(out)
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let head = self
            .conn
            .query_row(
                "SELECT run_id, run_name, status, start_time, end_time FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        run_id: row.get(0)?,
                        run_name: row.get(1)?,
                        status: row.get(2)?,
                        start_time: row.get(3)?,
                        end_time: row.get(4)?,
                        params: BTreeMap::new(),
                        metrics: BTreeMap::new(),
                    })
                },
            )
            .optional()
            .context("load run")?;
        let Some(mut run) = head else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM params WHERE run_id = ?1")
            .context("prepare param query")?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("query params")?;
        for row in rows {
            let (key, value): (String, String) = row.context("read param row")?;
            run.params.insert(key, value);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM metrics WHERE run_id = ?1")
            .context("prepare metric query")?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("query metrics")?;
        for row in rows {
            let (key, value): (String, f64) = row.context("read metric row")?;
            run.metrics.insert(key, value);
        }
        Ok(Some(run))
    }

    /// Runs of `experiment` ordered by `order_by` descending; runs without that metric go last.
    pub fn search_runs(
        &self,
        experiment: &str,
        order_by: &str,
        max_results: usize,
    ) -> Result<Vec<RunRecord>> {
        let Some(experiment_id) = self.find_experiment(experiment)? else {
            return Ok(Vec::new());
        };
        let mut stmt = self
            .conn
            .prepare(
                "SELECT r.run_id FROM runs r
                 LEFT JOIN metrics m ON m.run_id = r.run_id AND m.key = ?2
                 WHERE r.experiment_id = ?1
                 ORDER BY m.value IS NULL, m.value DESC, r.start_time, r.run_id
                 LIMIT ?3",
            )
            .context("prepare run search")?;
        let ids = stmt
            .query_map(
                params![experiment_id, order_by, max_results as i64],
                |row| row.get::<_, String>(0),
            )
            .context("search runs")?;

        let mut out = Vec::new();
        for id in ids {
            let id = id.context("read run id")?;
            if let Some(run) = self.get_run(&id)? {
                out.push(run);
            }
        }
        Ok(out)
    }

    pub fn fetch_run_summaries(&self, experiment: &str) -> Result<RunTable> {
        let runs = self.search_runs(experiment, "accuracy", RUN_TABLE_LIMIT)?;
        let rows: Vec<RunSummary> = runs.iter().map(RunSummary::from_record).collect();
        let best = rows.first().filter(|r| r.accuracy.is_some()).cloned();
        Ok(RunTable { rows, best })
    }

    pub fn best_run(&self, experiment: &str) -> Result<Option<RunRecord>> {
        Ok(self
            .search_runs(experiment, "accuracy", 1)?
            .into_iter()
            .next()
            .filter(|r| r.metric("accuracy").is_some()))
    }
}

/// Read-only convenience for the dashboard: a missing store is an empty table.
pub fn load_run_table(db_path: &Path, experiment: &str) -> Result<RunTable> {
    if !db_path.exists() {
        return Ok(RunTable::default());
    }
    TrackingStore::open(db_path)?.fetch_run_summaries(experiment)
}
