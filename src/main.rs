use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, mpsc};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine, Points, Rectangle};
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset, Gauge, GraphType, Paragraph, Tabs,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use football_terminal::analysis::{PassNetwork, PlayerPerformance, ShotPoint, XgTimeline};
use football_terminal::config::Settings;
use football_terminal::eda::DensityGrid;
use football_terminal::events::{PITCH_LENGTH, PITCH_WIDTH};
use football_terminal::match_summary::TeamSummary;
use football_terminal::matches::match_label;
use football_terminal::provider;
use football_terminal::simulate::{self, ActionKind};
use football_terminal::state::{
    self, AnalysisTab, AppState, MatchView, ProviderCommand, Screen, apply_delta, metric_label, screen_label,
    tab_label,
};
use football_terminal::tracking::RunSummary;

const LOG_FILE: &str = ".cache/football_terminal.log";
const SEEK_STEP: f64 = 10.0;
const TEAM_COLORS: [Color; 2] = [Color::Cyan, Color::LightRed];
/// Older simulator actions are dimmed; this many of the latest stay highlighted.
const TRAIL: usize = 12;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(settings: &Settings, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        let mut state = AppState::new();
        state.overview_match_id = settings.overview_match;
        state.experiment = settings.experiment.clone();
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            KeyCode::Char('1') => self.state.screen = Screen::Overview,
            KeyCode::Char('2') => {
                self.state.screen = Screen::MatchAnalysis;
                if self.state.analysis.is_none() && !self.state.analysis_loading {
                    self.load_selected_match();
                }
            }
            KeyCode::Char('3') => {
                self.state.screen = Screen::ModelInsights;
                if self.state.runs.rows.is_empty() && !self.state.runs_loading {
                    self.request_runs(false);
                }
            }
            KeyCode::Char('4') => {
                self.state.screen = Screen::Simulator;
                if self.state.simulator.is_none() && !self.state.simulator_loading {
                    self.load_selected_simulation();
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter => match self.state.screen {
                Screen::Overview | Screen::MatchAnalysis => {
                    self.state.screen = Screen::MatchAnalysis;
                    self.load_selected_match();
                }
                Screen::Simulator => self.load_selected_simulation(),
                Screen::ModelInsights => {}
            },
            KeyCode::Tab if self.state.screen == Screen::MatchAnalysis => self.state.cycle_analysis_tab(),
            KeyCode::BackTab if self.state.screen == Screen::MatchAnalysis => {
                self.state.cycle_analysis_tab_back()
            }
            KeyCode::Char(']') => self.state.select_player_next(),
            KeyCode::Char('[') => self.state.select_player_prev(),
            KeyCode::Char('m') => self.state.cycle_insight_metric(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char(' ') => {
                if let Some(playback) = self.state.playback_controls() {
                    playback.toggle();
                }
            }
            KeyCode::Char('s') => {
                if let Some(playback) = self.state.playback_controls() {
                    playback.cycle_speed();
                }
            }
            KeyCode::Left => {
                if let Some(playback) = self.state.playback_controls() {
                    playback.seek_by(-SEEK_STEP);
                }
            }
            KeyCode::Right => {
                if let Some(playback) = self.state.playback_controls() {
                    playback.seek_by(SEEK_STEP);
                }
            }
            KeyCode::Home | KeyCode::Char('0') => {
                if let Some(playback) = self.state.playback_controls() {
                    playback.pause();
                    playback.seek(0.0);
                }
            }
            _ => {}
        }
    }

    fn refresh(&mut self) {
        match self.state.screen {
            Screen::Overview => {
                let match_id = self.state.overview_match_id;
                self.state.overview_loading = true;
                self.send(ProviderCommand::LoadOverview { match_id }, "Overview", true);
                self.request_runs(false);
            }
            Screen::ModelInsights => self.request_runs(true),
            Screen::MatchAnalysis | Screen::Simulator => {
                self.state.matches_loading = true;
                self.send(ProviderCommand::LoadMatches, "Match index", true);
            }
        }
    }

    fn load_selected_match(&mut self) {
        let Some(match_id) = self.state.selected_match_id() else {
            self.state.push_log("[INFO] No match selected");
            return;
        };
        self.state.analysis_loading = true;
        self.send(ProviderCommand::LoadMatch { match_id }, "Match analysis", true);
    }

    fn load_selected_simulation(&mut self) {
        let Some(match_id) = self.state.selected_match_id() else {
            self.state.push_log("[INFO] No match selected");
            return;
        };
        self.state.simulator_loading = true;
        self.send(ProviderCommand::LoadSimulation { match_id }, "Simulation", true);
    }

    fn request_runs(&mut self, announce: bool) {
        self.state.runs_loading = true;
        self.send(ProviderCommand::LoadRuns, "Run table", announce);
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} loader unavailable"));
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
        } else if announce {
            self.state.push_log(format!("[INFO] {what} request sent"));
        }
    }
}

fn main() -> io::Result<()> {
    let settings = Settings::from_env();
    init_file_logging();
    info!(data_dir = %settings.data_dir.display(), "starting dashboard");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    provider::spawn_provider(settings.clone(), tx, cmd_rx);

    let mut app = App::new(&settings, Some(cmd_tx));
    app.send(ProviderCommand::LoadMatches, "Match index", false);
    app.send(
        ProviderCommand::LoadOverview {
            match_id: settings.overview_match,
        },
        "Overview",
        false,
    );
    app.send(ProviderCommand::LoadRuns, "Run table", false);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

/// The terminal owns stdout, so tracing goes to a file; failures leave logging disabled.
fn init_file_logging() {
    let path = Path::new(LOG_FILE);
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            app.state.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Overview => render_overview(frame, chunks[1], &app.state),
        Screen::MatchAnalysis => render_match_analysis(frame, chunks[1], &app.state),
        Screen::ModelInsights => render_model_insights(frame, chunks[1], &app.state),
        Screen::Simulator => render_simulator(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let context = match state.screen {
        Screen::Overview => match_title(state, state.overview_match_id),
        Screen::MatchAnalysis => state
            .analysis
            .as_ref()
            .map(|v| match_title(state, v.match_id))
            .unwrap_or_else(|| "no match loaded".to_string()),
        Screen::ModelInsights => format!("Experiment: {}", state.experiment),
        Screen::Simulator => state
            .simulator
            .as_ref()
            .map(|s| match_title(state, s.match_id))
            .unwrap_or_else(|| "no match loaded".to_string()),
    };
    let line1 = format!("  .-.  FOOTBALL TERMINAL | {} | {}", screen_label(state.screen), context);
    let line2 = " ( o )".to_string();
    let line3 = "  '-'".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn match_title(state: &AppState, match_id: u64) -> String {
    state
        .match_info(match_id)
        .map(match_label)
        .unwrap_or_else(|| format!("Match {match_id}"))
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Overview => "1-4 Screens | Enter Analyse selected | r Refresh | ? Help | q Quit".to_string(),
        Screen::MatchAnalysis => {
            "1-4 Screens | j/k Match | Enter Load | Tab Page | [/] Player | r Reload list | ? Help | q Quit"
                .to_string()
        }
        Screen::ModelInsights => "1-4 Screens | j/k Run | m Metric | r Refresh | ? Help | q Quit".to_string(),
        Screen::Simulator => {
            "1-4 Screens | j/k Match | Enter Load | Space Play | s Speed | ←/→ Seek | 0 Reset | ? Help | q Quit"
                .to_string()
        }
    }
}

fn render_overview(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(view) = state.overview.as_ref() else {
        let msg = if state.overview_loading {
            format!("Loading match {}...", state.overview_match_id)
        } else {
            format!("Overview match {} unavailable", state.overview_match_id)
        };
        frame.render_widget(placeholder(&msg, "Overview"), area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(50),
            Constraint::Min(6),
        ])
        .split(area);

    let best = state.runs.best.as_ref();
    render_kpi_cards(
        frame,
        rows[0],
        &[
            ("Shots", view.kpis.shots.to_string()),
            ("Passes", view.kpis.passes.to_string()),
            ("Pass Acc", format!("{:.1}%", view.kpis.pass_accuracy)),
            ("Total xG", format!("{:.2}", view.kpis.total_xg)),
            ("Best Acc", fmt_metric(best.and_then(|r| r.accuracy))),
            ("Best AUC", fmt_metric(best.and_then(|r| r.roc_auc))),
        ],
    );

    let pitches = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_shot_canvas(frame, pitches[0], "Shot Map", &view.shots);
    match view.busiest_player() {
        Some(perf) => {
            let title = format!("Heatmap: {}", perf.player);
            render_heatmap_canvas(frame, pitches[1], &title, &perf.heatmap);
        }
        None => frame.render_widget(placeholder("No player events", "Heatmap"), pitches[1]),
    }

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);
    let leaderboard = Paragraph::new(run_table_text(state.leaderboard(), None, state.runs_loading))
        .block(Block::default().title("Model Leaderboard").borders(Borders::ALL));
    frame.render_widget(leaderboard, bottom[0]);
    render_network_canvas(frame, bottom[1], &view.network);
}

fn render_match_analysis(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(area);
    render_match_list(frame, columns[0], state);

    let Some(view) = state.analysis.as_ref() else {
        let msg = if state.analysis_loading {
            "Loading match events..."
        } else {
            "Press Enter to load the selected match"
        };
        frame.render_widget(placeholder(msg, "Match Analysis"), columns[1]);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(5),
        ])
        .split(columns[1]);

    render_kpi_cards(
        frame,
        rows[0],
        &[
            ("Shots", view.kpis.shots.to_string()),
            ("Passes", view.kpis.passes.to_string()),
            ("Completed", view.kpis.completed_passes.to_string()),
            ("Pass Acc", format!("{:.1}%", view.kpis.pass_accuracy)),
            ("Total xG", format!("{:.2}", view.kpis.total_xg)),
        ],
    );

    let selected = AnalysisTab::ALL
        .iter()
        .position(|t| *t == state.analysis_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(AnalysisTab::ALL.iter().map(|t| tab_label(*t)).collect::<Vec<_>>())
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .divider("|");
    frame.render_widget(tabs, rows[1]);

    match state.analysis_tab {
        AnalysisTab::ShotMap => render_shot_tab(frame, rows[2], view),
        AnalysisTab::PlayerPerformance => render_player_tab(frame, rows[2], state, view),
        AnalysisTab::PassNetwork => render_network_tab(frame, rows[2], view),
        AnalysisTab::XgTimeline => render_timeline_tab(frame, rows[2], view),
    }
}

fn render_shot_tab(frame: &mut Frame, area: Rect, view: &MatchView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Min(20)])
        .split(area);
    render_shot_canvas(frame, cols[0], "Shot Map", &view.shots);

    let mut shots: Vec<&ShotPoint> = view.shots.iter().collect();
    shots.sort_by_key(|s| s.minute);
    let lines: Vec<Line> = shots
        .iter()
        .map(|s| {
            let text = format!(
                "{:>3}' {} xG {:.2} {}",
                s.minute,
                s.player.as_deref().unwrap_or("-"),
                s.xg,
                s.outcome
            );
            Line::styled(text, Style::default().fg(outcome_color(&s.outcome)))
        })
        .collect();
    let list = Paragraph::new(lines).block(Block::default().title("Shots").borders(Borders::ALL));
    frame.render_widget(list, cols[1]);
}

fn render_player_tab(frame: &mut Frame, area: Rect, state: &AppState, view: &MatchView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(area);

    let names: Vec<&str> = view.performances.iter().map(|p| p.player.as_str()).collect();
    let list = Paragraph::new(selectable_lines(&names, state.player_selected, cols[0].height))
        .block(Block::default().title("Players [ ]").borders(Borders::ALL));
    frame.render_widget(list, cols[0]);

    let Some(perf) = state.selected_performance() else {
        frame.render_widget(placeholder("No players in this match", "Player"), cols[1]);
        return;
    };
    render_player_detail(frame, cols[1], perf);
}

fn render_player_detail(frame: &mut Frame, area: Rect, perf: &PlayerPerformance) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);
    render_kpi_cards(
        frame,
        rows[0],
        &[
            ("Passes", perf.passes.to_string()),
            ("Pass Acc", format!("{:.1}%", perf.pass_accuracy)),
            ("Shots", perf.shots.to_string()),
            ("xG", format!("{:.2}", perf.xg)),
            ("Touches", perf.touches.len().to_string()),
        ],
    );
    let pitches = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_heatmap_canvas(frame, pitches[0], &format!("Heatmap: {}", perf.player), &perf.heatmap);
    render_shot_canvas(frame, pitches[1], "Shots", &perf.shot_points);
}

fn render_network_tab(frame: &mut Frame, area: Rect, view: &MatchView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Min(20)])
        .split(area);
    render_network_canvas(frame, cols[0], &view.network);

    let lines: Vec<Line> = view
        .network
        .links
        .iter()
        .map(|l| {
            let color = TEAM_COLORS[view.network.team_index(&l.team) % TEAM_COLORS.len()];
            Line::styled(
                format!("{:>3} {} → {}", l.count, short_name(&l.passer), short_name(&l.recipient)),
                Style::default().fg(color),
            )
        })
        .collect();
    let links = Paragraph::new(lines).block(Block::default().title("Top Links").borders(Borders::ALL));
    frame.render_widget(links, cols[1]);
}

fn render_timeline_tab(frame: &mut Frame, area: Rect, view: &MatchView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Min(30)])
        .split(area);
    render_xg_chart(frame, cols[0], &view.timeline, None);
    let summary = Paragraph::new(team_summary_text(&view.summary))
        .block(Block::default().title("Team Summary").borders(Borders::ALL));
    frame.render_widget(summary, cols[1]);
}

fn render_model_insights(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.runs.rows.is_empty() {
        let msg = if state.runs_loading {
            "Loading runs...".to_string()
        } else {
            format!(
                "No runs logged in experiment '{}'. Train a model to populate this page.",
                state.experiment
            )
        };
        frame.render_widget(placeholder(&msg, "Model Insights"), area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(area);

    let best = state.runs.best.as_ref();
    render_kpi_cards(
        frame,
        rows[0],
        &[
            ("Runs", state.runs.rows.len().to_string()),
            ("Best Acc", fmt_metric(best.and_then(|r| r.accuracy))),
            ("ROC AUC", fmt_metric(best.and_then(|r| r.roc_auc))),
            ("Precision", fmt_metric(best.and_then(|r| r.precision))),
            ("Recall", fmt_metric(best.and_then(|r| r.recall))),
        ],
    );

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    let table = Paragraph::new(run_table_text(
        &state.runs.rows,
        Some(state.run_selected),
        state.runs_loading,
    ))
    .block(Block::default().title("Runs").borders(Borders::ALL));
    frame.render_widget(table, cols[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Min(5)])
        .split(cols[1]);
    render_run_comparison(frame, right[0], state);

    let detail = Paragraph::new(run_detail_text(state.selected_run()))
        .block(Block::default().title("Selected Run").borders(Borders::ALL));
    frame.render_widget(detail, right[1]);
}

fn render_run_comparison(frame: &mut Frame, area: Rect, state: &AppState) {
    let metric = state.insight_metric;
    let bars: Vec<Bar> = state
        .leaderboard()
        .iter()
        .map(|run| {
            let value = metric.value(run).unwrap_or(0.0);
            Bar::default()
                .value((value * 1000.0).round() as u64)
                .text_value(format!("{value:.3}"))
                .label(Line::from(run.short_id().to_string()))
                .style(Style::default().fg(Color::Green))
        })
        .collect();
    let chart = BarChart::default()
        .block(
            Block::default()
                .title(format!("{} by run (m)", metric_label(metric)))
                .borders(Borders::ALL),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(8)
        .bar_gap(1)
        .max(1000);
    frame.render_widget(chart, area);
}

fn render_simulator(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(area);
    render_match_list(frame, columns[0], state);

    let Some(sim) = state.simulator.as_ref() else {
        let msg = if state.simulator_loading {
            "Loading actions..."
        } else {
            "Press Enter to load the selected match"
        };
        frame.render_widget(placeholder(msg, "Simulator"), columns[1]);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(65),
            Constraint::Length(3),
            Constraint::Min(5),
        ])
        .split(columns[1]);

    let frame_time = sim.playback.frame;
    let visible = simulate::visible_actions(&sim.actions, frame_time);
    let ball = simulate::ball_position(&sim.actions, frame_time);
    let trail_start = visible.len().saturating_sub(TRAIL);
    let pitch = pitch_canvas("Replay", |ctx| {
        draw_pitch(ctx);
        ctx.layer();
        for (idx, action) in visible.iter().enumerate() {
            let color = if idx < trail_start {
                Color::DarkGray
            } else {
                action_color(action.kind)
            };
            ctx.draw(&CanvasLine {
                x1: action.start.x,
                y1: flip(action.start.y),
                x2: action.end.x,
                y2: flip(action.end.y),
                color,
            });
        }
        if let Some(ball) = ball {
            ctx.layer();
            ctx.draw(&Circle {
                x: ball.x,
                y: flip(ball.y),
                radius: 1.5,
                color: Color::White,
            });
        }
    });
    frame.render_widget(pitch, rows[0]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(sim.playback.progress())
        .label(format!(
            "{} / {}",
            clock_label(frame_time),
            clock_label(sim.playback.end)
        ));
    frame.render_widget(gauge, rows[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Min(24)])
        .split(rows[2]);
    let clock = simulate::match_clock(&sim.actions, frame_time);
    render_xg_chart(frame, bottom[0], &sim.timeline, Some(clock));

    let (home_xg, away_xg) = sim.timeline.at(f64::from(clock));
    let last = visible.last();
    let status = [
        format!(
            "State: {}",
            if sim.playback.playing { "PLAYING" } else { "PAUSED" }
        ),
        format!("Speed: {:.1}x", sim.playback.speed()),
        format!("Actions: {}/{}", visible.len(), sim.actions.len()),
        format!("Match clock: {}", clock_label(f64::from(clock))),
        format!("xG {} {:.2}", sim.timeline.home_team, home_xg),
        format!("xG {} {:.2}", sim.timeline.away_team, away_xg),
        last.map(|a| {
            format!(
                "Last: {} by {}",
                a.kind.label(),
                a.player.as_deref().unwrap_or("N/A")
            )
        })
        .unwrap_or_else(|| "Last: -".to_string()),
    ]
    .join("\n");
    let status = Paragraph::new(status).block(Block::default().title("Playback").borders(Borders::ALL));
    frame.render_widget(status, bottom[1]);
}

fn render_match_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Matches").borders(Borders::ALL);
    if state.matches.is_empty() {
        let msg = if state.matches_loading {
            "Indexing matches..."
        } else {
            "No matches found"
        };
        frame.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }
    let labels: Vec<String> = state
        .matches
        .iter()
        .map(|m| format!("{} v {}", m.home_team, m.away_team))
        .collect();
    let names: Vec<&str> = labels.iter().map(String::as_str).collect();
    let list = Paragraph::new(selectable_lines(&names, state.selected, area.height)).block(block);
    frame.render_widget(list, area);
}

/// Scrolls the window so the selected row stays visible inside a bordered block.
fn selectable_lines(items: &[&str], selected: usize, height: u16) -> Vec<Line<'static>> {
    let visible = height.saturating_sub(2) as usize;
    let (start, end) = visible_range(selected, items.len(), visible);
    items[start..end]
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if start + i == selected {
                Line::styled(
                    format!("> {item}"),
                    Style::default().fg(Color::White).bg(Color::DarkGray),
                )
            } else {
                Line::raw(format!("  {item}"))
            }
        })
        .collect()
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_kpi_cards(frame: &mut Frame, area: Rect, cards: &[(&str, String)]) {
    if cards.is_empty() {
        return;
    }
    let n = cards.len() as u32;
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(cards.iter().map(|_| Constraint::Ratio(1, n)).collect::<Vec<_>>())
        .split(area);
    for ((label, value), col) in cards.iter().zip(cols.iter()) {
        let card = Paragraph::new(value.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().title(*label).borders(Borders::ALL));
        frame.render_widget(card, *col);
    }
}

fn pitch_canvas<'a, F>(title: &'a str, painter: F) -> Canvas<'a, F>
where
    F: Fn(&mut Context),
{
    Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([0.0, PITCH_LENGTH])
        .y_bounds([0.0, PITCH_WIDTH])
        .paint(painter)
}

/// Event data puts y = 0 on the top touchline; the canvas origin is bottom-left.
fn flip(y: f64) -> f64 {
    PITCH_WIDTH - y
}

fn draw_pitch(ctx: &mut Context) {
    let color = Color::DarkGray;
    ctx.draw(&Rectangle {
        x: 0.0,
        y: 0.0,
        width: PITCH_LENGTH,
        height: PITCH_WIDTH,
        color,
    });
    ctx.draw(&CanvasLine {
        x1: PITCH_LENGTH / 2.0,
        y1: 0.0,
        x2: PITCH_LENGTH / 2.0,
        y2: PITCH_WIDTH,
        color,
    });
    ctx.draw(&Circle {
        x: PITCH_LENGTH / 2.0,
        y: PITCH_WIDTH / 2.0,
        radius: 10.0,
        color,
    });
    for (x, box_w, box_h) in [(0.0, 18.0, 44.0), (0.0, 6.0, 20.0)] {
        let y = (PITCH_WIDTH - box_h) / 2.0;
        ctx.draw(&Rectangle {
            x,
            y,
            width: box_w,
            height: box_h,
            color,
        });
        ctx.draw(&Rectangle {
            x: PITCH_LENGTH - box_w,
            y,
            width: box_w,
            height: box_h,
            color,
        });
    }
}

fn render_shot_canvas(frame: &mut Frame, area: Rect, title: &str, shots: &[ShotPoint]) {
    let canvas = pitch_canvas(title, |ctx| {
        draw_pitch(ctx);
        ctx.layer();
        for shot in shots {
            ctx.draw(&Circle {
                x: shot.location.x,
                y: flip(shot.location.y),
                radius: 0.8 + shot.xg * 5.0,
                color: outcome_color(&shot.outcome),
            });
        }
    });
    frame.render_widget(canvas, area);
}

fn render_heatmap_canvas(frame: &mut Frame, area: Rect, title: &str, grid: &DensityGrid) {
    const SUB: usize = 3;
    const SHADES: [Color; 4] = [Color::Blue, Color::Cyan, Color::Yellow, Color::Red];

    let max = grid.max();
    let cell_w = PITCH_LENGTH / grid.bins_x.max(1) as f64;
    let cell_h = PITCH_WIDTH / grid.bins_y.max(1) as f64;
    let mut layers: [Vec<(f64, f64)>; 4] = Default::default();
    if max > 0 {
        for row in 0..grid.bins_y {
            for col in 0..grid.bins_x {
                let count = grid.get(col, row);
                if count == 0 {
                    continue;
                }
                let ratio = f64::from(count) / f64::from(max);
                let shade = ((ratio * SHADES.len() as f64).ceil() as usize).clamp(1, SHADES.len()) - 1;
                for sx in 0..SUB {
                    for sy in 0..SUB {
                        let x = col as f64 * cell_w + (sx as f64 + 0.5) * cell_w / SUB as f64;
                        let y = row as f64 * cell_h + (sy as f64 + 0.5) * cell_h / SUB as f64;
                        layers[shade].push((x, flip(y)));
                    }
                }
            }
        }
    }

    let canvas = pitch_canvas(title, |ctx| {
        draw_pitch(ctx);
        for (coords, color) in layers.iter().zip(SHADES) {
            ctx.layer();
            ctx.draw(&Points {
                coords: coords.as_slice(),
                color,
            });
        }
    });
    frame.render_widget(canvas, area);
}

fn render_network_canvas(frame: &mut Frame, area: Rect, network: &PassNetwork) {
    if network.is_empty() {
        frame.render_widget(placeholder("Not enough repeated passes", "Pass Network"), area);
        return;
    }
    let canvas = pitch_canvas("Pass Network", |ctx| {
        draw_pitch(ctx);
        ctx.layer();
        for link in &network.links {
            let (Some(a), Some(b)) = (network.node(&link.passer), network.node(&link.recipient)) else {
                continue;
            };
            ctx.draw(&CanvasLine {
                x1: a.position.x,
                y1: flip(a.position.y),
                x2: b.position.x,
                y2: flip(b.position.y),
                color: TEAM_COLORS[network.team_index(&link.team) % TEAM_COLORS.len()],
            });
        }
        ctx.layer();
        for node in &network.nodes {
            let color = TEAM_COLORS[network.team_index(&node.team) % TEAM_COLORS.len()];
            ctx.draw(&Circle {
                x: node.position.x,
                y: flip(node.position.y),
                radius: node.size / 10.0,
                color,
            });
            ctx.print(
                node.position.x,
                flip(node.position.y),
                Span::styled(short_name(&node.player).to_string(), Style::default().fg(Color::White)),
            );
        }
    });
    frame.render_widget(canvas, area);
}

fn render_xg_chart(frame: &mut Frame, area: Rect, timeline: &XgTimeline, playhead: Option<u32>) {
    let home = step_points(&timeline.times, &timeline.home);
    let away = step_points(&timeline.times, &timeline.away);
    let last_minute = timeline
        .times
        .last()
        .map(|t| f64::from(*t) / 60.0)
        .unwrap_or(0.0)
        .max(90.0);
    let top = timeline.home_total().max(timeline.away_total()).max(0.5) * 1.1;
    let marker: Vec<(f64, f64)> = playhead
        .map(|clock| {
            let minute = f64::from(clock) / 60.0;
            vec![(minute, 0.0), (minute, top)]
        })
        .unwrap_or_default();

    let mut datasets = vec![
        Dataset::default()
            .name(timeline.home_team.clone())
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(TEAM_COLORS[0]))
            .data(&home),
        Dataset::default()
            .name(timeline.away_team.clone())
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(TEAM_COLORS[1]))
            .data(&away),
    ];
    if !marker.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::White))
                .data(&marker),
        );
    }

    let chart = Chart::new(datasets)
        .block(Block::default().title("Cumulative xG").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("min")
                .bounds([0.0, last_minute])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", last_minute / 2.0)),
                    Span::raw(format!("{last_minute:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("xG")
                .bounds([0.0, top])
                .labels(vec![Span::raw("0"), Span::raw(format!("{top:.1}"))]),
        );
    frame.render_widget(chart, area);
}

/// Cumulative totals as a step line in minutes, starting from kick-off.
fn step_points(times: &[u32], values: &[f64]) -> Vec<(f64, f64)> {
    let mut out = vec![(0.0, 0.0)];
    let mut prev = 0.0;
    for (t, v) in times.iter().zip(values) {
        let minute = f64::from(*t) / 60.0;
        out.push((minute, prev));
        out.push((minute, *v));
        prev = *v;
    }
    out
}

fn run_table_text(rows: &[RunSummary], selected: Option<usize>, loading: bool) -> Vec<Line<'static>> {
    if rows.is_empty() {
        let msg = if loading { "Loading runs..." } else { "No runs yet" };
        return vec![Line::styled(msg, Style::default().fg(Color::DarkGray))];
    }
    let mut lines = vec![Line::styled(
        format!(
            "  {:<9}{:<26}{:>7}{:>7}{:>7}{:>7}",
            "Run", "Name", "Acc", "AUC", "Prec", "Rec"
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for (idx, run) in rows.iter().enumerate() {
        let is_selected = selected == Some(idx);
        let prefix = if is_selected { "> " } else { "  " };
        let name: String = run.run_name.chars().take(25).collect();
        let text = format!(
            "{prefix}{:<9}{:<26}{:>7}{:>7}{:>7}{:>7}",
            run.short_id(),
            name,
            fmt_metric(run.accuracy),
            fmt_metric(run.roc_auc),
            fmt_metric(run.precision),
            fmt_metric(run.recall),
        );
        let style = if is_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        lines.push(Line::styled(text, style));
    }
    lines
}

fn run_detail_text(run: Option<&RunSummary>) -> String {
    let Some(run) = run else {
        return "No run selected".to_string();
    };
    let param = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    [
        format!("Run: {}", run.run_id),
        format!("Name: {}", run.run_name),
        format!("max_depth: {}", param(&run.max_depth)),
        format!("learning_rate: {}", param(&run.learning_rate)),
        format!("n_estimators: {}", param(&run.n_estimators)),
    ]
    .join("\n")
}

fn team_summary_text(summary: &BTreeMap<String, TeamSummary>) -> Vec<Line<'static>> {
    if summary.is_empty() {
        return vec![Line::raw("No team events")];
    }
    let teams: Vec<&String> = summary.keys().collect();
    let mut header = format!("{:<18}", "");
    for team in &teams {
        let short: String = team.chars().take(12).collect();
        header.push_str(&format!("{short:>13}"));
    }
    let mut lines = vec![Line::styled(header, Style::default().add_modifier(Modifier::BOLD))];
    let metrics: [(&str, fn(&TeamSummary) -> String); 8] = [
        ("Pass acc %", |s| format!("{:.1}", s.pass_accuracy())),
        ("Carries", |s| s.carries.to_string()),
        ("Dribbles won", |s| s.successful_dribbles.to_string()),
        ("Dribble %", |s| format!("{:.1}", s.dribble_success_rate())),
        ("xG", |s| format!("{:.2}", s.total_xg)),
        ("Turnovers", |s| s.turnovers.to_string()),
        ("Recoveries", |s| s.ball_recoveries.to_string()),
        ("Pressure %", |s| format!("{:.1}", s.pressure_success_rate())),
    ];
    for (label, value) in metrics {
        let mut line = format!("{label:<18}");
        for s in summary.values() {
            line.push_str(&format!("{:>13}", value(s)));
        }
        lines.push(Line::raw(line));
    }
    lines
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn placeholder<'a>(msg: &'a str, title: &'a str) -> Paragraph<'a> {
    Paragraph::new(msg)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(title).borders(Borders::ALL))
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string())
}

fn clock_label(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn short_name(name: &str) -> &str {
    name.rsplit(' ').next().unwrap_or(name)
}

fn outcome_color(outcome: &str) -> Color {
    match outcome {
        "Goal" => Color::Green,
        "Saved" | "Saved To Post" => Color::Yellow,
        "Blocked" => Color::Magenta,
        "Off T" | "Wayward" | "Post" => Color::Red,
        _ => Color::Gray,
    }
}

fn action_color(kind: ActionKind) -> Color {
    match kind {
        ActionKind::Pass => Color::Cyan,
        ActionKind::Carry => Color::Green,
        ActionKind::Shot => Color::Red,
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Football Terminal - Help",
        "",
        "Global:",
        "  1 / 2 / 3 / 4  Overview / Analysis / Insights / Simulator",
        "  j/k or ↑/↓     Move selection",
        "  r              Refresh current page",
        "  ?              Toggle help",
        "  q              Quit",
        "",
        "Match Analysis:",
        "  Enter          Load selected match",
        "  Tab / S-Tab    Next / previous page",
        "  [ / ]          Previous / next player",
        "",
        "Model Insights:",
        "  m              Cycle comparison metric",
        "",
        "Simulator:",
        "  Enter          Load selected match",
        "  Space          Play / pause",
        "  s              Cycle speed (0.5x, 1x, 2x)",
        "  ← / →          Seek 10s",
        "  0 / Home       Reset",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
