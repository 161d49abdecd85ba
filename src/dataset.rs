use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rayon::prelude::*;
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::features::{self, PassRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredPass {
    pub match_id: u64,
    pub record: PassRecord,
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub db_path: PathBuf,
    pub files_total: usize,
    pub files_succeeded: usize,
    pub passes_inserted: usize,
    pub from_cache: bool,
    pub errors: Vec<String>,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS passes (
            match_id INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            start_x REAL NOT NULL,
            start_y REAL NOT NULL,
            end_x REAL NOT NULL,
            end_y REAL NOT NULL,
            distance REAL NOT NULL,
            angle REAL NOT NULL,
            completed INTEGER NOT NULL,
            minute INTEGER NOT NULL,
            PRIMARY KEY (match_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_passes_match ON passes(match_id);

        CREATE TABLE IF NOT EXISTS build_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            built_at TEXT NOT NULL,
            files_total INTEGER NOT NULL,
            files_succeeded INTEGER NOT NULL,
            passes_inserted INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn count_passes(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM passes", [], |row| row.get(0))
        .context("count passes")?;
    Ok(n.max(0) as usize)
}

/// Builds that ran to completion; a pass table without one is a leftover and gets rebuilt.
pub fn count_builds(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM build_runs", [], |row| row.get(0))
        .context("count build runs")?;
    Ok(n.max(0) as usize)
}

pub fn load_cached_dataset(conn: &Connection) -> Result<Vec<StoredPass>> {
    let mut stmt = conn
        .prepare(
            "SELECT match_id, start_x, start_y, end_x, end_y, distance, angle, completed, minute
             FROM passes ORDER BY match_id, seq",
        )
        .context("prepare pass query")?;
    let rows = stmt
        .query_map([], |row| {
            let match_id: i64 = row.get(0)?;
            let completed: i64 = row.get(7)?;
            let minute: i64 = row.get(8)?;
            Ok(StoredPass {
                match_id: match_id.max(0) as u64,
                record: PassRecord {
                    start_x: row.get(1)?,
                    start_y: row.get(2)?,
                    end_x: row.get(3)?,
                    end_y: row.get(4)?,
                    distance: row.get(5)?,
                    angle: row.get(6)?,
                    completed: completed != 0,
                    minute: minute.max(0) as u32,
                },
            })
        })
        .context("query passes")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read pass row")?);
    }
    Ok(out)
}

/// Inserts one match's passes on `conn`; the caller owns the transaction.
pub fn insert_match_passes(conn: &Connection, match_id: u64, passes: &[PassRecord]) -> Result<usize> {
    {
        let mut stmt = conn
            .prepare(
                "INSERT OR REPLACE INTO passes
                 (match_id, seq, start_x, start_y, end_x, end_y, distance, angle, completed, minute)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .context("prepare pass insert")?;
        for (seq, p) in passes.iter().enumerate() {
            stmt.execute(params![
                match_id as i64,
                seq as i64,
                p.start_x,
                p.start_y,
                p.end_x,
                p.end_y,
                p.distance,
                p.angle,
                i64::from(p.completed),
                i64::from(p.minute),
            ])
            .context("insert pass")?;
        }
    }
    Ok(passes.len())
}

/// Event files in `events_dir`, sorted by name so `limit` always picks the same matches.
pub fn list_event_files(events_dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut files = fs::read_dir(events_dir)
        .with_context(|| format!("read events dir {}", events_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .filter_map(|path| {
            let id = path.file_stem()?.to_str()?.parse::<u64>().ok()?;
            Some((id, path))
        })
        .collect::<Vec<_>>();
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Builds (or reuses) the cached pass table for the first `limit` event files.
pub fn build_all_passes_dataset(
    events_dir: &Path,
    db_path: &Path,
    limit: Option<usize>,
) -> Result<(Vec<StoredPass>, BuildSummary)> {
    let mut conn = open_db(db_path)?;
    if count_builds(&conn)? > 0 && count_passes(&conn)? > 0 {
        let rows = load_cached_dataset(&conn)?;
        info!(rows = rows.len(), db = %db_path.display(), "loaded cached pass dataset");
        let summary = BuildSummary {
            db_path: db_path.to_path_buf(),
            files_total: 0,
            files_succeeded: 0,
            passes_inserted: 0,
            from_cache: true,
            errors: Vec::new(),
        };
        return Ok((rows, summary));
    }

    let mut files = list_event_files(events_dir)?;
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    if files.is_empty() {
        return Err(anyhow!("no event files found in {}", events_dir.display()));
    }

    let parsed: Vec<(u64, Result<Vec<PassRecord>>)> = files
        .par_iter()
        .map(|(id, path)| (*id, features::build_pass_dataset(path)))
        .collect();

    let mut summary = BuildSummary {
        db_path: db_path.to_path_buf(),
        files_total: files.len(),
        files_succeeded: 0,
        passes_inserted: 0,
        from_cache: false,
        errors: Vec::new(),
    };

    let tx = conn.transaction().context("begin build transaction")?;
    tx.execute("DELETE FROM passes", [])
        .context("clear unfinished pass table")?;
    for (match_id, result) in parsed {
        match result {
            Ok(passes) => {
                summary.passes_inserted += insert_match_passes(&tx, match_id, &passes)?;
                summary.files_succeeded += 1;
            }
            Err(err) => {
                warn!(match_id, "skipping event file: {err:#}");
                summary.errors.push(format!("{match_id}: {err:#}"));
            }
        }
    }

    let errors_json = serde_json::to_string(&summary.errors).context("serialize build errors")?;
    tx.execute(
        "INSERT INTO build_runs (built_at, files_total, files_succeeded, passes_inserted, errors_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            Utc::now().to_rfc3339(),
            summary.files_total as i64,
            summary.files_succeeded as i64,
            summary.passes_inserted as i64,
            errors_json,
        ],
    )
    .context("record build run")?;
    tx.commit().context("commit pass dataset")?;

    info!(
        files = summary.files_succeeded,
        passes = summary.passes_inserted,
        "built pass dataset"
    );
    let rows = load_cached_dataset(&conn)?;
    Ok((rows, summary))
}

pub fn records(rows: &[StoredPass]) -> Vec<PassRecord> {
    rows.iter().map(|row| row.record).collect()
}
