use std::collections::{BTreeMap, VecDeque};

use crate::analysis::{MatchKpis, PassNetwork, PlayerPerformance, ShotPoint, XgTimeline};
use crate::match_summary::TeamSummary;
use crate::matches::MatchInfo;
use crate::simulate::{Action, Playback};
use crate::tracking::{LEADERBOARD_LIMIT, RunSummary, RunTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Overview,
    MatchAnalysis,
    ModelInsights,
    Simulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTab {
    ShotMap,
    PlayerPerformance,
    PassNetwork,
    XgTimeline,
}

impl AnalysisTab {
    pub const ALL: [AnalysisTab; 4] = [
        AnalysisTab::ShotMap,
        AnalysisTab::PlayerPerformance,
        AnalysisTab::PassNetwork,
        AnalysisTab::XgTimeline,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Metric plotted in the run comparison chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightMetric {
    Accuracy,
    RocAuc,
    Precision,
    Recall,
}

impl InsightMetric {
    pub fn next(self) -> Self {
        match self {
            InsightMetric::Accuracy => InsightMetric::RocAuc,
            InsightMetric::RocAuc => InsightMetric::Precision,
            InsightMetric::Precision => InsightMetric::Recall,
            InsightMetric::Recall => InsightMetric::Accuracy,
        }
    }

    pub fn value(self, run: &RunSummary) -> Option<f64> {
        match self {
            InsightMetric::Accuracy => run.accuracy,
            InsightMetric::RocAuc => run.roc_auc,
            InsightMetric::Precision => run.precision,
            InsightMetric::Recall => run.recall,
        }
    }
}

/// Everything the match pages draw for one match, computed off the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchView {
    pub match_id: u64,
    pub kpis: MatchKpis,
    pub shots: Vec<ShotPoint>,
    pub timeline: XgTimeline,
    pub network: PassNetwork,
    pub performances: Vec<PlayerPerformance>,
    pub summary: BTreeMap<String, TeamSummary>,
}

impl MatchView {
    /// Most involved player first; used as the overview heatmap subject.
    pub fn busiest_player(&self) -> Option<&PlayerPerformance> {
        self.performances
            .iter()
            .max_by(|a, b| a.touches.len().cmp(&b.touches.len()).then(b.player.cmp(&a.player)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorView {
    pub match_id: u64,
    pub actions: Vec<Action>,
    pub timeline: XgTimeline,
    pub playback: Playback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
    Matches,
    Overview,
    Match,
    Runs,
    Simulation,
}

pub struct AppState {
    pub screen: Screen,
    pub help_overlay: bool,
    pub overview_match_id: u64,
    pub experiment: String,
    pub matches: Vec<MatchInfo>,
    pub matches_loading: bool,
    pub selected: usize,
    pub overview: Option<MatchView>,
    pub overview_loading: bool,
    pub analysis: Option<MatchView>,
    pub analysis_loading: bool,
    pub analysis_tab: AnalysisTab,
    pub player_selected: usize,
    pub runs: RunTable,
    pub runs_loading: bool,
    pub run_selected: usize,
    pub insight_metric: InsightMetric,
    pub simulator: Option<SimulatorView>,
    pub simulator_loading: bool,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Overview,
            help_overlay: false,
            overview_match_id: crate::config::DEFAULT_OVERVIEW_MATCH,
            experiment: crate::config::DEFAULT_EXPERIMENT.to_string(),
            matches: Vec::new(),
            matches_loading: true,
            selected: 0,
            overview: None,
            overview_loading: true,
            analysis: None,
            analysis_loading: false,
            analysis_tab: AnalysisTab::ShotMap,
            player_selected: 0,
            runs: RunTable::default(),
            runs_loading: true,
            run_selected: 0,
            insight_metric: InsightMetric::Accuracy,
            simulator: None,
            simulator_loading: false,
            logs: VecDeque::new(),
        }
    }

    pub fn selected_match(&self) -> Option<&MatchInfo> {
        self.matches.get(self.selected)
    }

    pub fn selected_match_id(&self) -> Option<u64> {
        self.selected_match().map(|m| m.match_id)
    }

    pub fn match_info(&self, match_id: u64) -> Option<&MatchInfo> {
        self.matches.iter().find(|m| m.match_id == match_id)
    }

    pub fn select_next(&mut self) {
        match self.screen {
            Screen::ModelInsights => {
                if self.run_selected + 1 < self.runs.rows.len() {
                    self.run_selected += 1;
                }
            }
            _ => {
                if self.selected + 1 < self.matches.len() {
                    self.selected += 1;
                }
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.screen {
            Screen::ModelInsights => self.run_selected = self.run_selected.saturating_sub(1),
            _ => self.selected = self.selected.saturating_sub(1),
        }
    }

    pub fn clamp_selection(&mut self) {
        if self.matches.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.matches.len() {
            self.selected = self.matches.len() - 1;
        }
        if self.runs.rows.is_empty() {
            self.run_selected = 0;
        } else if self.run_selected >= self.runs.rows.len() {
            self.run_selected = self.runs.rows.len() - 1;
        }
        let players = self.analysis.as_ref().map_or(0, |v| v.performances.len());
        if self.player_selected >= players {
            self.player_selected = players.saturating_sub(1);
        }
    }

    pub fn cycle_analysis_tab(&mut self) {
        self.analysis_tab = self.analysis_tab.next();
    }

    pub fn cycle_analysis_tab_back(&mut self) {
        self.analysis_tab = self.analysis_tab.prev();
    }

    pub fn select_player_next(&mut self) {
        let players = self.analysis.as_ref().map_or(0, |v| v.performances.len());
        if self.player_selected + 1 < players {
            self.player_selected += 1;
        }
    }

    pub fn select_player_prev(&mut self) {
        self.player_selected = self.player_selected.saturating_sub(1);
    }

    pub fn selected_performance(&self) -> Option<&PlayerPerformance> {
        self.analysis
            .as_ref()
            .and_then(|v| v.performances.get(self.player_selected))
    }

    pub fn leaderboard(&self) -> &[RunSummary] {
        let n = self.runs.rows.len().min(LEADERBOARD_LIMIT);
        &self.runs.rows[..n]
    }

    pub fn selected_run(&self) -> Option<&RunSummary> {
        self.runs.rows.get(self.run_selected)
    }

    pub fn cycle_insight_metric(&mut self) {
        self.insight_metric = self.insight_metric.next();
    }

    /// Advances the simulator playhead; called once per UI tick.
    pub fn tick(&mut self) {
        if let Some(sim) = self.simulator.as_mut() {
            sim.playback.tick();
        }
    }

    pub fn playback_mut(&mut self) -> Option<&mut Playback> {
        self.simulator.as_mut().map(|s| &mut s.playback)
    }

    /// Playback the transport keys may drive; only while the simulator page is showing.
    pub fn playback_controls(&mut self) -> Option<&mut Playback> {
        if self.screen != Screen::Simulator {
            return None;
        }
        self.playback_mut()
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetMatches(Vec<MatchInfo>),
    SetOverview(MatchView),
    SetMatchView(MatchView),
    SetRuns(RunTable),
    SetSimulation {
        match_id: u64,
        actions: Vec<Action>,
        timeline: XgTimeline,
    },
    LoadFailed {
        target: LoadTarget,
        message: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    LoadMatches,
    LoadOverview { match_id: u64 },
    LoadMatch { match_id: u64 },
    LoadRuns,
    LoadSimulation { match_id: u64 },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetMatches(matches) => {
            let selected_id = state.selected_match_id();
            state.matches = matches;
            state.matches_loading = false;
            if let Some(id) = selected_id
                && let Some(idx) = state.matches.iter().position(|m| m.match_id == id)
            {
                state.selected = idx;
            }
            state.clamp_selection();
            let count = state.matches.len();
            state.push_log(format!("[INFO] {count} matches indexed"));
        }
        Delta::SetOverview(view) => {
            state.overview = Some(view);
            state.overview_loading = false;
        }
        Delta::SetMatchView(view) => {
            // A slow load for a match the user already moved away from is dropped.
            let wanted = state.selected_match_id();
            if wanted.is_some_and(|id| id != view.match_id) {
                return;
            }
            let same_match = state
                .analysis
                .as_ref()
                .is_some_and(|v| v.match_id == view.match_id);
            if !same_match {
                state.player_selected = 0;
            }
            state.analysis = Some(view);
            state.analysis_loading = false;
            state.clamp_selection();
        }
        Delta::SetRuns(runs) => {
            let selected_id = state.selected_run().map(|r| r.run_id.clone());
            state.runs = runs;
            state.runs_loading = false;
            state.run_selected = selected_id
                .and_then(|id| state.runs.rows.iter().position(|r| r.run_id == id))
                .unwrap_or(0);
            state.clamp_selection();
        }
        Delta::SetSimulation {
            match_id,
            actions,
            timeline,
        } => {
            let playback = Playback::for_actions(&actions);
            state.simulator = Some(SimulatorView {
                match_id,
                actions,
                timeline,
                playback,
            });
            state.simulator_loading = false;
        }
        Delta::LoadFailed { target, message } => {
            match target {
                LoadTarget::Matches => state.matches_loading = false,
                LoadTarget::Overview => state.overview_loading = false,
                LoadTarget::Match => state.analysis_loading = false,
                LoadTarget::Runs => state.runs_loading = false,
                LoadTarget::Simulation => state.simulator_loading = false,
            }
            state.push_log(format!("[WARN] {message}"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

pub fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Overview => "OVERVIEW",
        Screen::MatchAnalysis => "MATCH ANALYSIS",
        Screen::ModelInsights => "MODEL INSIGHTS",
        Screen::Simulator => "SIMULATOR",
    }
}

pub fn tab_label(tab: AnalysisTab) -> &'static str {
    match tab {
        AnalysisTab::ShotMap => "Shot Map",
        AnalysisTab::PlayerPerformance => "Player Performance",
        AnalysisTab::PassNetwork => "Pass Network",
        AnalysisTab::XgTimeline => "xG Timeline",
    }
}

pub fn metric_label(metric: InsightMetric) -> &'static str {
    match metric {
        InsightMetric::Accuracy => "Accuracy",
        InsightMetric::RocAuc => "ROC AUC",
        InsightMetric::Precision => "Precision",
        InsightMetric::Recall => "Recall",
    }
}
