use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use once_cell::sync::Lazy;

use crate::eda::{self, DensityGrid};
use crate::events::{self, MatchEvent, PITCH_LENGTH, PITCH_WIDTH, Point, TYPE_PASS, TYPE_SHOT};

pub const MIN_LINK_PASSES: usize = 3;
pub const HEATMAP_BINS: (usize, usize) = (30, 20);
pub const UNKNOWN_OUTCOME: &str = "Unknown";

type EventCache = HashMap<(PathBuf, u64), Arc<Vec<MatchEvent>>>;

static EVENT_CACHE: Lazy<Mutex<EventCache>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Event files are immutable once published, so parsed matches are kept for the process lifetime.
pub fn cached_match_events(data_dir: &Path, match_id: u64) -> Result<Arc<Vec<MatchEvent>>> {
    let key = (data_dir.to_path_buf(), match_id);
    if let Ok(cache) = EVENT_CACHE.lock() {
        if let Some(hit) = cache.get(&key) {
            return Ok(Arc::clone(hit));
        }
    }
    let parsed = Arc::new(events::load_match_events(data_dir, match_id)?);
    if let Ok(mut cache) = EVENT_CACHE.lock() {
        cache.insert(key, Arc::clone(&parsed));
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchKpis {
    pub shots: usize,
    pub passes: usize,
    pub completed_passes: usize,
    pub pass_accuracy: f64,
    pub total_xg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotPoint {
    pub team: Option<String>,
    pub player: Option<String>,
    pub location: Point,
    pub xg: f64,
    pub outcome: String,
    pub minute: u32,
}

impl ShotPoint {
    pub fn is_goal(&self) -> bool {
        self.outcome == "Goal"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XgTimeline {
    pub home_team: String,
    pub away_team: String,
    pub times: Vec<u32>,
    pub home: Vec<f64>,
    pub away: Vec<f64>,
}

impl XgTimeline {
    pub fn home_total(&self) -> f64 {
        self.home.last().copied().unwrap_or(0.0)
    }

    pub fn away_total(&self) -> f64 {
        self.away.last().copied().unwrap_or(0.0)
    }

    /// Cumulative `(home, away)` xG at `seconds` on the match clock.
    pub fn at(&self, seconds: f64) -> (f64, f64) {
        let mut out = (0.0, 0.0);
        for ((&t, &h), &a) in self.times.iter().zip(&self.home).zip(&self.away) {
            if f64::from(t) > seconds {
                break;
            }
            out = (h, a);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassLink {
    pub team: String,
    pub passer: String,
    pub recipient: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNode {
    pub player: String,
    pub team: String,
    pub total_passes: usize,
    pub size: f64,
    /// Mean location of the player's passes, used to lay the network out on the pitch.
    pub position: Point,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassNetwork {
    pub teams: Vec<String>,
    pub links: Vec<PassLink>,
    pub nodes: Vec<NetworkNode>,
}

impl PassNetwork {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn node(&self, player: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.player == player)
    }

    pub fn team_index(&self, team: &str) -> usize {
        self.teams.iter().position(|t| t == team).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPerformance {
    pub player: String,
    pub passes: usize,
    pub completed_passes: usize,
    pub pass_accuracy: f64,
    pub shots: usize,
    pub xg: f64,
    pub touches: Vec<Point>,
    pub shot_points: Vec<ShotPoint>,
    pub heatmap: DensityGrid,
}

pub fn match_kpis(events: &[MatchEvent]) -> MatchKpis {
    let shots = events.iter().filter(|e| e.is_type(TYPE_SHOT)).count();
    let passes = events.iter().filter(|e| e.is_type(TYPE_PASS)).count();
    let completed_passes = events
        .iter()
        .filter(|e| e.is_type(TYPE_PASS) && e.pass_completed())
        .count();
    MatchKpis {
        shots,
        passes,
        completed_passes,
        pass_accuracy: pct(completed_passes, passes),
        total_xg: events.iter().map(MatchEvent::xg).sum(),
    }
}

pub fn shot_map(events: &[MatchEvent]) -> Vec<ShotPoint> {
    events
        .iter()
        .filter(|e| e.is_type(TYPE_SHOT))
        .filter_map(|e| {
            Some(ShotPoint {
                team: e.team_name().map(str::to_string),
                player: e.player_name().map(str::to_string),
                location: e.location()?,
                xg: e.xg(),
                outcome: e.shot_outcome().unwrap_or(UNKNOWN_OUTCOME).to_string(),
                minute: e.minute,
            })
        })
        .collect()
}

/// Home side is the team of the first event; any other team counts as away.
pub fn xg_timeline(events: &[MatchEvent]) -> XgTimeline {
    let home_team = events
        .first()
        .and_then(|e| e.team_name())
        .unwrap_or("Home")
        .to_string();
    let away_team = events
        .iter()
        .filter_map(|e| e.team_name())
        .find(|t| *t != home_team)
        .unwrap_or("Away")
        .to_string();

    let mut shots: Vec<(u32, bool, f64)> = events
        .iter()
        .filter(|e| e.is_type(TYPE_SHOT))
        .map(|e| (e.clock_seconds(), e.team_name() == Some(home_team.as_str()), e.xg()))
        .collect();
    shots.sort_by_key(|(t, _, _)| *t);

    if shots.is_empty() {
        return XgTimeline {
            home_team,
            away_team,
            times: vec![0],
            home: vec![0.0],
            away: vec![0.0],
        };
    }

    let mut times = Vec::with_capacity(shots.len());
    let mut home = Vec::with_capacity(shots.len());
    let mut away = Vec::with_capacity(shots.len());
    let (mut h, mut a) = (0.0_f64, 0.0_f64);
    for (t, is_home, xg) in shots {
        if is_home {
            h += xg;
        } else {
            a += xg;
        }
        times.push(t);
        home.push(h);
        away.push(a);
    }
    XgTimeline {
        home_team,
        away_team,
        times,
        home,
        away,
    }
}

pub fn pass_network(events: &[MatchEvent]) -> PassNetwork {
    let mut counts: HashMap<(String, String, String), usize> = HashMap::new();
    let mut teams: Vec<String> = Vec::new();
    let mut positions: HashMap<String, (f64, f64, usize)> = HashMap::new();

    for e in events.iter().filter(|e| e.is_type(TYPE_PASS)) {
        let (Some(team), Some(passer), Some(location)) = (e.team_name(), e.player_name(), e.location())
        else {
            continue;
        };
        let entry = positions.entry(passer.to_string()).or_insert((0.0, 0.0, 0));
        entry.0 += location.x;
        entry.1 += location.y;
        entry.2 += 1;

        let Some(recipient) = e.pass_recipient() else {
            continue;
        };
        *counts
            .entry((team.to_string(), passer.to_string(), recipient.to_string()))
            .or_default() += 1;
        if !teams.iter().any(|t| t == team) {
            teams.push(team.to_string());
        }
    }

    let mut links: Vec<PassLink> = counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_LINK_PASSES)
        .map(|((team, passer, recipient), count)| PassLink {
            team,
            passer,
            recipient,
            count,
        })
        .collect();
    links.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.passer.cmp(&b.passer))
            .then_with(|| a.recipient.cmp(&b.recipient))
    });
    teams.retain(|t| links.iter().any(|l| &l.team == t));

    let mut players: BTreeSet<&str> = BTreeSet::new();
    for link in &links {
        players.insert(link.passer.as_str());
        players.insert(link.recipient.as_str());
    }
    let nodes = players
        .into_iter()
        .map(|player| {
            let total_passes: usize = links
                .iter()
                .filter(|l| l.passer == player || l.recipient == player)
                .map(|l| l.count)
                .sum();
            let team = links
                .iter()
                .find(|l| l.passer == player)
                .or_else(|| links.iter().find(|l| l.recipient == player))
                .map(|l| l.team.clone())
                .unwrap_or_default();
            let position = positions
                .get(player)
                .filter(|(_, _, n)| *n > 0)
                .map(|(x, y, n)| Point::new(x / *n as f64, y / *n as f64))
                .unwrap_or(Point::new(PITCH_LENGTH / 2.0, PITCH_WIDTH / 2.0));
            NetworkNode {
                player: player.to_string(),
                team,
                total_passes,
                size: (10.0 + total_passes as f64 * 0.5).min(40.0),
                position,
            }
        })
        .collect();

    PassNetwork {
        teams,
        links,
        nodes,
    }
}

pub fn players(events: &[MatchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(MatchEvent::player_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn player_performance(events: &[MatchEvent], player: &str) -> PlayerPerformance {
    let own: Vec<&MatchEvent> = events
        .iter()
        .filter(|e| e.player_name() == Some(player))
        .collect();

    let passes = own.iter().filter(|e| e.is_type(TYPE_PASS)).count();
    let completed_passes = own
        .iter()
        .filter(|e| e.is_type(TYPE_PASS) && e.pass_completed())
        .count();
    let touches: Vec<Point> = own.iter().filter_map(|e| e.location()).collect();
    let shot_points: Vec<ShotPoint> = own
        .iter()
        .filter(|e| e.is_type(TYPE_SHOT))
        .filter_map(|e| {
            Some(ShotPoint {
                team: e.team_name().map(str::to_string),
                player: Some(player.to_string()),
                location: e.location()?,
                xg: e.xg(),
                outcome: e.shot_outcome().unwrap_or(UNKNOWN_OUTCOME).to_string(),
                minute: e.minute,
            })
        })
        .collect();

    PlayerPerformance {
        player: player.to_string(),
        passes,
        completed_passes,
        pass_accuracy: pct(completed_passes, passes),
        shots: own.iter().filter(|e| e.is_type(TYPE_SHOT)).count(),
        xg: own.iter().map(|e| e.xg()).sum(),
        heatmap: eda::density_grid(touches.iter().copied(), HEATMAP_BINS.0, HEATMAP_BINS.1),
        touches,
        shot_points,
    }
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
