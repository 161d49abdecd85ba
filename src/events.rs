use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const TYPE_PASS: &str = "Pass";
pub const TYPE_SHOT: &str = "Shot";
pub const TYPE_CARRY: &str = "Carry";
pub const TYPE_DRIBBLE: &str = "Dribble";
pub const TYPE_PRESSURE: &str = "Pressure";
pub const TYPE_BALL_RECOVERY: &str = "Ball Recovery";
pub const TYPE_MISCONTROL: &str = "Miscontrol";
pub const TYPE_DISPOSSESSED: &str = "Dispossessed";

/// Pitch length and width in StatsBomb units.
pub const PITCH_LENGTH: f64 = 120.0;
pub const PITCH_WIDTH: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Raw coordinate list as it appears in the feed (`[x, y]` or `[x, y, z]` for shot end locations).
pub type RawLocation = Option<Vec<Option<f64>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassDetail {
    #[serde(default)]
    pub recipient: Option<NamedRef>,
    #[serde(default)]
    pub end_location: RawLocation,
    #[serde(default)]
    pub outcome: Option<NamedRef>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShotDetail {
    #[serde(default)]
    pub statsbomb_xg: Option<f64>,
    #[serde(default)]
    pub end_location: RawLocation,
    #[serde(default)]
    pub outcome: Option<NamedRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarryDetail {
    #[serde(default)]
    pub end_location: RawLocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DribbleDetail {
    #[serde(default)]
    pub outcome: Option<NamedRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub period: u8,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
    #[serde(rename = "type", default)]
    pub kind: NamedRef,
    #[serde(default)]
    pub team: Option<NamedRef>,
    #[serde(default)]
    pub player: Option<NamedRef>,
    #[serde(default)]
    pub location: RawLocation,
    #[serde(default)]
    pub related_events: Vec<String>,
    #[serde(default)]
    pub pass: Option<PassDetail>,
    #[serde(default)]
    pub shot: Option<ShotDetail>,
    #[serde(default)]
    pub carry: Option<CarryDetail>,
    #[serde(default)]
    pub dribble: Option<DribbleDetail>,
}

impl MatchEvent {
    pub fn type_name(&self) -> &str {
        &self.kind.name
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.kind.name == name
    }

    pub fn team_name(&self) -> Option<&str> {
        self.team
            .as_ref()
            .map(|t| t.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn player_name(&self) -> Option<&str> {
        self.player
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn location(&self) -> Option<Point> {
        point_from_raw(&self.location)
    }

    /// Seconds since the start of the match clock (`minute * 60 + second`).
    pub fn clock_seconds(&self) -> u32 {
        self.minute * 60 + self.second
    }

    pub fn xg(&self) -> f64 {
        self.shot
            .as_ref()
            .and_then(|s| s.statsbomb_xg)
            .unwrap_or(0.0)
    }

    /// A pass with no outcome object is a completed pass.
    pub fn pass_completed(&self) -> bool {
        self.pass.as_ref().map(|p| p.outcome.is_none()).unwrap_or(true)
    }

    pub fn pass_end(&self) -> Option<Point> {
        self.pass.as_ref().and_then(|p| point_from_raw(&p.end_location))
    }

    pub fn pass_recipient(&self) -> Option<&str> {
        self.pass
            .as_ref()
            .and_then(|p| p.recipient.as_ref())
            .map(|r| r.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn carry_end(&self) -> Option<Point> {
        self.carry.as_ref().and_then(|c| point_from_raw(&c.end_location))
    }

    pub fn shot_end(&self) -> Option<Point> {
        self.shot.as_ref().and_then(|s| point_from_raw(&s.end_location))
    }

    pub fn shot_outcome(&self) -> Option<&str> {
        self.shot
            .as_ref()
            .and_then(|s| s.outcome.as_ref())
            .map(|o| o.name.as_str())
    }

    pub fn dribble_complete(&self) -> bool {
        self.dribble
            .as_ref()
            .and_then(|d| d.outcome.as_ref())
            .is_some_and(|o| o.name == "Complete")
    }
}

/// First two coordinates, or `None` when the list is short or has a null component.
pub fn point_from_raw(raw: &RawLocation) -> Option<Point> {
    let coords = raw.as_ref()?;
    let x = (*coords.first()?)?;
    let y = (*coords.get(1)?)?;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(Point::new(x, y))
}

pub fn parse_events_json(raw: &str) -> Result<Vec<MatchEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid events json")
}

pub fn load_events(path: &Path) -> Result<Vec<MatchEvent>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read events file {}", path.display()))?;
    parse_events_json(&raw).with_context(|| format!("parse events file {}", path.display()))
}

pub fn event_file_path(data_dir: &Path, match_id: u64) -> PathBuf {
    data_dir.join("events").join(format!("{match_id}.json"))
}

pub fn load_match_events(data_dir: &Path, match_id: u64) -> Result<Vec<MatchEvent>> {
    load_events(&event_file_path(data_dir, match_id))
}

pub fn is_pass(event: &MatchEvent) -> bool {
    event.is_type(TYPE_PASS)
}

pub fn filter_pass_events(events: &[MatchEvent]) -> Vec<&MatchEvent> {
    events.iter().filter(|e| is_pass(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::{RawLocation, parse_events_json, point_from_raw};

    #[test]
    fn null_coordinate_is_absent() {
        let raw: RawLocation = Some(vec![Some(10.0), None]);
        assert!(point_from_raw(&raw).is_none());
        let raw: RawLocation = Some(vec![Some(10.0), Some(20.0), Some(1.5)]);
        let p = point_from_raw(&raw).expect("point");
        assert_eq!((p.x, p.y), (10.0, 20.0));
    }

    #[test]
    fn parses_minimal_event() {
        let events = parse_events_json(
            r#"[{"type":{"name":"Pass"},"location":[1,2],"pass":{"end_location":[3,4]},"minute":7,"extra":true}]"#,
        )
        .expect("should parse");
        assert_eq!(events.len(), 1);
        assert!(events[0].pass_completed());
        assert_eq!(events[0].minute, 7);
        assert_eq!(events[0].pass_end().map(|p| p.x), Some(3.0));
    }
}
