use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveTime, Timelike};

use crate::events::{MatchEvent, Point, TYPE_CARRY, TYPE_PASS, TYPE_SHOT};

pub const SPEEDS: [f64; 3] = [0.5, 1.0, 2.0];
/// Seconds of match time a tick covers at 1x.
pub const FRAME_STEP: f64 = 0.5;

pub fn parse_timestamp(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S%.f")
        .with_context(|| format!("invalid timestamp {raw:?}"))
}

pub fn seconds_of(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) + f64::from(time.nanosecond()) / 1e9
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Pass,
    Carry,
    Shot,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Pass => "pass",
            ActionKind::Carry => "carry",
            ActionKind::Shot => "shot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub timestamp: String,
    pub period: u8,
    pub team: Option<String>,
    pub player: Option<String>,
    pub start: Point,
    pub end: Point,
    /// Match clock (`minute * 60 + second`), the axis the xG timeline uses.
    pub clock: u32,
    pub time_sec: f64,
}

/// Passes, carries and shots with both ends on the pitch, timed from the first one.
///
/// Period clocks restart at zero, so each period is offset by the length of the
/// periods before it (the last timestamp seen in each) to keep time monotonic.
pub fn load_actions(events: &[MatchEvent]) -> Result<Vec<Action>> {
    let mut raw: Vec<(Action, f64)> = Vec::new();
    let mut period_len: BTreeMap<u8, f64> = BTreeMap::new();

    for e in events {
        let kind = match e.type_name() {
            TYPE_PASS => ActionKind::Pass,
            TYPE_CARRY => ActionKind::Carry,
            TYPE_SHOT => ActionKind::Shot,
            _ => continue,
        };
        let end = match kind {
            ActionKind::Pass => e.pass_end(),
            ActionKind::Carry => e.carry_end(),
            ActionKind::Shot => e.shot_end(),
        };
        let (Some(start), Some(end)) = (e.location(), end) else {
            continue;
        };
        let clock = seconds_of(parse_timestamp(&e.timestamp)?);
        let len = period_len.entry(e.period).or_insert(0.0);
        *len = len.max(clock);
        raw.push((
            Action {
                kind,
                timestamp: e.timestamp.clone(),
                period: e.period,
                team: e.team_name().map(str::to_string),
                player: e.player_name().map(str::to_string),
                start,
                end,
                clock: e.clock_seconds(),
                time_sec: 0.0,
            },
            clock,
        ));
    }
    if raw.is_empty() {
        return Err(anyhow!("no valid passes, carries, or shots found"));
    }

    let mut offsets: BTreeMap<u8, f64> = BTreeMap::new();
    let mut acc = 0.0;
    for (period, len) in &period_len {
        offsets.insert(*period, acc);
        acc += len;
    }

    let elapsed = |action: &Action, clock: f64| {
        offsets.get(&action.period).copied().unwrap_or(0.0) + clock
    };
    let base = elapsed(&raw[0].0, raw[0].1);
    let mut actions: Vec<Action> = raw
        .iter()
        .map(|(action, clock)| Action {
            time_sec: elapsed(action, *clock) - base,
            ..action.clone()
        })
        .collect();
    actions.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));
    Ok(actions)
}

/// Playhead over a sorted action list.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub frame: f64,
    pub playing: bool,
    speed_idx: usize,
    pub end: f64,
}

impl Playback {
    pub fn new(end: f64) -> Self {
        Self {
            frame: 0.0,
            playing: false,
            speed_idx: 1,
            end: end.max(0.0),
        }
    }

    pub fn for_actions(actions: &[Action]) -> Self {
        Self::new(actions.last().map(|a| a.time_sec).unwrap_or(0.0))
    }

    pub fn speed(&self) -> f64 {
        SPEEDS[self.speed_idx]
    }

    pub fn toggle(&mut self) {
        if !self.playing && self.frame >= self.end {
            self.frame = 0.0;
        }
        self.playing = !self.playing;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn cycle_speed(&mut self) {
        self.speed_idx = (self.speed_idx + 1) % SPEEDS.len();
    }

    pub fn seek(&mut self, frame: f64) {
        self.frame = frame.clamp(0.0, self.end);
    }

    pub fn seek_by(&mut self, delta: f64) {
        self.seek(self.frame + delta);
    }

    /// Advances one frame step scaled by speed; stops at the last action.
    pub fn tick(&mut self) {
        if !self.playing {
            return;
        }
        self.frame += FRAME_STEP * self.speed();
        if self.frame >= self.end {
            self.frame = self.end;
            self.playing = false;
        }
    }

    pub fn progress(&self) -> f64 {
        if self.end <= 0.0 {
            return 1.0;
        }
        (self.frame / self.end).clamp(0.0, 1.0)
    }
}

pub fn visible_actions(actions: &[Action], frame: f64) -> &[Action] {
    let n = actions.partition_point(|a| a.time_sec <= frame);
    &actions[..n]
}

pub fn ball_position(actions: &[Action], frame: f64) -> Option<Point> {
    visible_actions(actions, frame).last().map(|a| a.end)
}

pub fn match_clock(actions: &[Action], frame: f64) -> u32 {
    visible_actions(actions, frame).last().map_or(0, |a| a.clock)
}

/// Replays events in real time: one `[timestamp] Type by Player` line per event, with
/// `sleep` called for the gap between consecutive timestamps.
pub fn simulate_events<W: Write>(
    events: &[MatchEvent],
    sink: &mut W,
    mut sleep: impl FnMut(Duration),
) -> Result<usize> {
    let mut previous: Option<f64> = None;
    for event in events {
        let current = seconds_of(parse_timestamp(&event.timestamp)?);
        if let Some(prev) = previous {
            let gap = current - prev;
            sleep(Duration::from_secs_f64(gap.max(0.0)));
        }
        previous = Some(current);
        writeln!(
            sink,
            "[{}] {} by {}",
            event.timestamp,
            event.type_name(),
            event.player_name().unwrap_or("N/A")
        )
        .context("write event line")?;
    }
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::{Playback, parse_timestamp, seconds_of};

    #[test]
    fn parses_fractional_timestamps() {
        let t = parse_timestamp("00:01:30.250").expect("timestamp");
        assert!((seconds_of(t) - 90.25).abs() < 1e-9);
        assert!(parse_timestamp("not a time").is_err());
    }

    #[test]
    fn playback_stops_at_end() {
        let mut p = Playback::new(1.2);
        p.toggle();
        p.tick();
        assert!((p.frame - 0.5).abs() < 1e-12);
        p.cycle_speed();
        p.tick();
        assert!((p.frame - 1.2).abs() < 1e-12);
        assert!(!p.playing);
        p.toggle();
        assert_eq!(p.frame, 0.0);
        assert!(p.playing);
    }
}
