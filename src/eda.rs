use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::events::{PITCH_LENGTH, PITCH_WIDTH, Point};
use crate::features::{self, EngineeredPass, PassRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCount {
    pub column: &'static str,
    pub missing: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDistribution {
    pub completed: usize,
    pub failed: usize,
}

impl ClassDistribution {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    pub fn completed_pct(&self) -> f64 {
        pct(self.completed, self.total())
    }

    pub fn failed_pct(&self) -> f64 {
        pct(self.failed, self.total())
    }
}

/// 2-D count histogram over the pitch, row-major with `bins_y` rows of `bins_x` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityGrid {
    pub bins_x: usize,
    pub bins_y: usize,
    pub counts: Vec<u32>,
}

impl DensityGrid {
    pub fn get(&self, col: usize, row: usize) -> u32 {
        if col >= self.bins_x || row >= self.bins_y {
            return 0;
        }
        self.counts[row * self.bins_x + col]
    }

    pub fn max(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
struct OutcomeSummary {
    outcome: &'static str,
    count: usize,
    mean_distance: f64,
    median_distance: f64,
    mean_angle: f64,
    median_angle: f64,
}

/// Column-wise missing counts; only the bucket columns and non-finite numerics can be missing.
pub fn missing_values(rows: &[EngineeredPass]) -> Vec<MissingCount> {
    let numeric: [(&'static str, fn(&EngineeredPass) -> f64); 7] = [
        ("start_x", |r| r.base.start_x),
        ("start_y", |r| r.base.start_y),
        ("end_x", |r| r.base.end_x),
        ("end_y", |r| r.base.end_y),
        ("distance", |r| r.base.distance),
        ("angle", |r| r.base.angle),
        ("abs_angle", |r| r.abs_angle),
    ];

    let mut out = numeric
        .iter()
        .map(|(column, get)| MissingCount {
            column: *column,
            missing: rows.iter().filter(|r| !get(r).is_finite()).count(),
        })
        .collect::<Vec<_>>();
    out.push(MissingCount {
        column: "length_bucket",
        missing: rows.iter().filter(|r| r.length_bucket.is_none()).count(),
    });
    out.push(MissingCount {
        column: "minute_bucket",
        missing: rows.iter().filter(|r| r.minute_bucket.is_none()).count(),
    });
    out
}

pub fn class_distribution(rows: &[EngineeredPass]) -> ClassDistribution {
    let completed = rows.iter().filter(|r| r.base.completed).count();
    ClassDistribution {
        completed,
        failed: rows.len() - completed,
    }
}

/// Drops exact duplicates, keeping the first occurrence. Returns the number removed.
pub fn remove_duplicates(rows: &mut Vec<EngineeredPass>) -> usize {
    let before = rows.len();
    let mut seen = HashSet::new();
    rows.retain(|r| seen.insert(record_key(&r.base)));
    before - rows.len()
}

/// Engineer features, report missing values and drop duplicate passes.
pub fn basic_checks(records: &[PassRecord]) -> Vec<EngineeredPass> {
    let mut rows = features::engineer_all(records);
    for m in missing_values(&rows).iter().filter(|m| m.missing > 0) {
        info!(column = m.column, missing = m.missing, "missing values");
    }
    let removed = remove_duplicates(&mut rows);
    info!(removed, remaining = rows.len(), "duplicate passes removed");
    rows
}

pub fn density_grid(points: impl IntoIterator<Item = Point>, bins_x: usize, bins_y: usize) -> DensityGrid {
    let bins_x = bins_x.max(1);
    let bins_y = bins_y.max(1);
    let mut counts = vec![0u32; bins_x * bins_y];
    for p in points {
        if !(0.0..=PITCH_LENGTH).contains(&p.x) || !(0.0..=PITCH_WIDTH).contains(&p.y) {
            continue;
        }
        let col = ((p.x / PITCH_LENGTH * bins_x as f64).floor() as usize).min(bins_x - 1);
        let row = ((p.y / PITCH_WIDTH * bins_y as f64).floor() as usize).min(bins_y - 1);
        counts[row * bins_x + col] += 1;
    }
    DensityGrid {
        bins_x,
        bins_y,
        counts,
    }
}

pub fn report_text(rows: &[EngineeredPass], removed: usize) -> String {
    let mut lines = vec!["=== Missing Values ===".to_string()];
    let missing = missing_values(rows)
        .into_iter()
        .filter(|m| m.missing > 0)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        lines.push("No missing values.".to_string());
    } else {
        for m in missing {
            lines.push(format!("{:<16}{}", m.column, m.missing));
        }
    }

    let dist = class_distribution(rows);
    lines.push(String::new());
    lines.push("=== Class Distribution ===".to_string());
    lines.push(format!("1 (completed)  {:>8}  {:>6.2}%", dist.completed, dist.completed_pct()));
    lines.push(format!("0 (failed)     {:>8}  {:>6.2}%", dist.failed, dist.failed_pct()));

    lines.push(String::new());
    lines.push("=== Duplicate Rows ===".to_string());
    lines.push(format!("Total duplicated rows: {removed}"));
    lines.join("\n")
}

/// Writes location densities and outcome summaries as JSON files under `dir`.
pub fn write_eda_artifacts(rows: &[EngineeredPass], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let starts = density_grid(
        rows.iter().map(|r| Point::new(r.base.start_x, r.base.start_y)),
        30,
        20,
    );
    let ends = density_grid(
        rows.iter().map(|r| Point::new(r.base.end_x, r.base.end_y)),
        30,
        20,
    );
    let summaries = vec![
        outcome_summary(rows, true),
        outcome_summary(rows, false),
    ];

    let mut written = Vec::new();
    for (name, value) in [
        ("pass_start_density.json", serde_json::to_string_pretty(&starts)),
        ("pass_end_density.json", serde_json::to_string_pretty(&ends)),
        ("pass_outcome_summary.json", serde_json::to_string_pretty(&summaries)),
    ] {
        let path = dir.join(name);
        let raw = value.with_context(|| format!("serialize {name}"))?;
        fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "eda artifacts written");
    Ok(written)
}

fn outcome_summary(rows: &[EngineeredPass], completed: bool) -> OutcomeSummary {
    let mut distances = Vec::new();
    let mut angles = Vec::new();
    for r in rows.iter().filter(|r| r.base.completed == completed) {
        distances.push(r.base.distance);
        angles.push(r.base.angle);
    }
    OutcomeSummary {
        outcome: if completed { "completed" } else { "failed" },
        count: distances.len(),
        mean_distance: mean(&distances),
        median_distance: median(&mut distances),
        mean_angle: mean(&angles),
        median_angle: median(&mut angles),
    }
}

fn record_key(r: &PassRecord) -> [u64; 8] {
    [
        r.start_x.to_bits(),
        r.start_y.to_bits(),
        r.end_x.to_bits(),
        r.end_y.to_bits(),
        r.distance.to_bits(),
        r.angle.to_bits(),
        u64::from(r.completed),
        u64::from(r.minute),
    ]
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::density_grid;
    use crate::events::Point;

    #[test]
    fn density_grid_clamps_far_edge() {
        let grid = density_grid(
            vec![Point::new(0.0, 0.0), Point::new(120.0, 80.0), Point::new(130.0, 10.0)],
            30,
            20,
        );
        assert_eq!(grid.get(0, 0), 1);
        assert_eq!(grid.get(29, 19), 1);
        assert_eq!(grid.total(), 2);
    }
}
