use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub match_id: u64,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub season: String,
    pub date: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    match_id: u64,
    #[serde(default)]
    match_date: String,
    competition: RawCompetition,
    season: RawSeason,
    home_team: RawHomeTeam,
    away_team: RawAwayTeam,
    #[serde(default)]
    home_score: Option<u32>,
    #[serde(default)]
    away_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawCompetition {
    competition_name: String,
}

#[derive(Debug, Deserialize)]
struct RawSeason {
    season_name: String,
}

#[derive(Debug, Deserialize)]
struct RawHomeTeam {
    home_team_name: String,
}

#[derive(Debug, Deserialize)]
struct RawAwayTeam {
    away_team_name: String,
}

pub fn parse_matches_json(raw: &str) -> Result<Vec<MatchInfo>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let rows: Vec<RawMatch> = serde_json::from_str(trimmed).context("invalid matches json")?;
    Ok(rows
        .into_iter()
        .map(|m| MatchInfo {
            match_id: m.match_id,
            home_team: m.home_team.home_team_name,
            away_team: m.away_team.away_team_name,
            competition: m.competition.competition_name,
            season: m.season.season_name,
            date: m.match_date,
            home_score: m.home_score,
            away_score: m.away_score,
        })
        .collect())
}

/// Reads `matches/<competition>/<season>.json`, keeping only the listed competitions.
/// An empty filter keeps everything.
pub fn load_match_index(matches_dir: &Path, competitions: &[String]) -> Result<Vec<MatchInfo>> {
    let mut out = Vec::new();
    for comp_dir in sorted_entries(matches_dir)? {
        if !comp_dir.is_dir() {
            continue;
        }
        for season_path in sorted_entries(&comp_dir)? {
            if season_path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read_to_string(&season_path)
                .with_context(|| format!("read {}", season_path.display()))?;
            let rows = parse_matches_json(&raw)
                .with_context(|| format!("parse {}", season_path.display()))?;
            out.extend(
                rows.into_iter()
                    .filter(|m| competitions.is_empty() || competitions.contains(&m.competition)),
            );
        }
    }
    sort_matches(&mut out);
    Ok(out)
}

pub fn sort_matches(rows: &mut [MatchInfo]) {
    rows.sort_by(|a, b| {
        a.competition
            .cmp(&b.competition)
            .then_with(|| a.season.cmp(&b.season))
            .then_with(|| a.date.cmp(&b.date))
            .then_with(|| a.match_id.cmp(&b.match_id))
    });
}

pub fn match_label(m: &MatchInfo) -> String {
    format!("{} vs {} ({})", m.home_team, m.away_team, m.date)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("read dir {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}
