use std::collections::{BTreeMap, HashMap};

use crate::events::{
    MatchEvent, TYPE_BALL_RECOVERY, TYPE_CARRY, TYPE_DISPOSSESSED, TYPE_DRIBBLE, TYPE_MISCONTROL,
    TYPE_PASS, TYPE_PRESSURE, TYPE_SHOT,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamSummary {
    pub pass_attempts: usize,
    pub pass_completions: usize,
    pub carries: usize,
    pub dribble_attempts: usize,
    pub successful_dribbles: usize,
    pub total_xg: f64,
    pub turnovers: usize,
    pub ball_recoveries: usize,
    pub pressures: usize,
    pub successful_pressures: usize,
}

impl TeamSummary {
    pub fn pass_accuracy(&self) -> f64 {
        pct(self.pass_completions, self.pass_attempts)
    }

    pub fn dribble_success_rate(&self) -> f64 {
        pct(self.successful_dribbles, self.dribble_attempts)
    }

    pub fn pressure_success_rate(&self) -> f64 {
        pct(self.successful_pressures, self.pressures)
    }
}

/// Per-team summary keyed by team name (sorted).
pub fn analyze_match_metrics(events: &[MatchEvent]) -> BTreeMap<String, TeamSummary> {
    let by_id: HashMap<&str, &MatchEvent> = events.iter().map(|e| (e.id.as_str(), e)).collect();
    let mut out: BTreeMap<String, TeamSummary> = BTreeMap::new();

    for event in events {
        let Some(team) = event.team_name() else {
            continue;
        };
        let summary = out.entry(team.to_string()).or_default();
        match event.type_name() {
            TYPE_PASS => {
                summary.pass_attempts += 1;
                if event.pass_completed() {
                    summary.pass_completions += 1;
                }
            }
            TYPE_CARRY => summary.carries += 1,
            TYPE_DRIBBLE => {
                summary.dribble_attempts += 1;
                if event.dribble_complete() {
                    summary.successful_dribbles += 1;
                }
            }
            TYPE_SHOT => summary.total_xg += event.xg(),
            TYPE_MISCONTROL | TYPE_DISPOSSESSED => summary.turnovers += 1,
            TYPE_BALL_RECOVERY => summary.ball_recoveries += 1,
            TYPE_PRESSURE => {
                summary.pressures += 1;
                let forced_error = event
                    .related_events
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()))
                    .any(|related| forces_error(related));
                if forced_error {
                    summary.successful_pressures += 1;
                }
            }
            _ => {}
        }
    }
    out
}

fn forces_error(event: &MatchEvent) -> bool {
    event.is_type(TYPE_MISCONTROL)
        || event.is_type(TYPE_DISPOSSESSED)
        || (event.is_type(TYPE_PASS) && !event.pass_completed())
}

pub fn render_summary(summary: &BTreeMap<String, TeamSummary>) -> String {
    let sections: [(&str, fn(&TeamSummary) -> String); 9] = [
        ("Pass Accuracy (%)", |s| format!("{:.2}", s.pass_accuracy())),
        ("Carries", |s| s.carries.to_string()),
        ("Successful Dribbles", |s| s.successful_dribbles.to_string()),
        ("Dribble Success Rate (%)", |s| format!("{:.2}", s.dribble_success_rate())),
        ("Total xG", |s| format!("{:.2}", s.total_xg)),
        ("Turnovers", |s| s.turnovers.to_string()),
        ("Ball Recoveries", |s| s.ball_recoveries.to_string()),
        ("Pressures Applied", |s| s.pressures.to_string()),
        ("Pressure Success Rate (%)", |s| format!("{:.2}", s.pressure_success_rate())),
    ];

    let mut lines = Vec::new();
    for (title, value) in sections {
        lines.push(format!("{title}:"));
        for (team, s) in summary {
            lines.push(format!("  {team}: {}", value(s)));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
