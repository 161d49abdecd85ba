use football_terminal::state::{
    AnalysisTab, AppState, Delta, InsightMetric, Screen, apply_delta, metric_label, tab_label,
};
use football_terminal::tracking::{RunSummary, RunTable};

fn run(i: usize, accuracy: Option<f64>) -> RunSummary {
    RunSummary {
        run_id: format!("{i:032x}"),
        run_name: format!("xgboost-run-{i}"),
        accuracy,
        roc_auc: accuracy.map(|a| a - 0.05),
        precision: Some(0.8),
        recall: Some(0.9),
        max_depth: Some("6".to_string()),
        learning_rate: Some("0.1".to_string()),
        n_estimators: Some("100".to_string()),
    }
}

fn table(n: usize) -> RunTable {
    let rows: Vec<RunSummary> = (0..n).map(|i| run(i, Some(0.9 - i as f64 * 0.001))).collect();
    RunTable {
        best: rows.first().cloned(),
        rows,
    }
}

#[test]
fn leaderboard_is_capped_at_twenty() {
    let mut state = AppState::new();
    apply_delta(&mut state, Delta::SetRuns(table(35)));
    assert_eq!(state.runs.rows.len(), 35);
    assert_eq!(state.leaderboard().len(), 20);
    assert_eq!(state.leaderboard()[0].run_id, state.runs.rows[0].run_id);
}

#[test]
fn run_selection_moves_only_on_insights_page() {
    let mut state = AppState::new();
    apply_delta(&mut state, Delta::SetRuns(table(3)));

    state.select_next();
    assert_eq!(state.run_selected, 0);

    state.screen = Screen::ModelInsights;
    state.select_next();
    state.select_next();
    state.select_next();
    assert_eq!(state.run_selected, 2);
    state.select_prev();
    assert_eq!(state.selected_run().map(|r| r.run_name.as_str()), Some("xgboost-run-1"));
}

#[test]
fn refreshed_runs_keep_the_selected_run() {
    let mut state = AppState::new();
    state.screen = Screen::ModelInsights;
    apply_delta(&mut state, Delta::SetRuns(table(5)));
    state.select_next();
    state.select_next();
    let chosen = state.selected_run().map(|r| r.run_id.clone());

    let mut refreshed = table(5);
    refreshed.rows.insert(0, run(99, Some(0.99)));
    apply_delta(&mut state, Delta::SetRuns(refreshed));
    assert_eq!(state.run_selected, 3);
    assert_eq!(state.selected_run().map(|r| r.run_id.clone()), chosen);

    apply_delta(&mut state, Delta::SetRuns(RunTable::default()));
    assert_eq!(state.run_selected, 0);
    assert!(state.selected_run().is_none());
}

#[test]
fn analysis_tabs_wrap_both_ways() {
    let mut state = AppState::new();
    assert_eq!(state.analysis_tab, AnalysisTab::ShotMap);
    state.cycle_analysis_tab_back();
    assert_eq!(state.analysis_tab, AnalysisTab::XgTimeline);
    for _ in 0..AnalysisTab::ALL.len() {
        state.cycle_analysis_tab();
    }
    assert_eq!(state.analysis_tab, AnalysisTab::XgTimeline);
    assert_eq!(tab_label(AnalysisTab::PlayerPerformance), "Player Performance");
}

#[test]
fn insight_metric_reads_the_matching_column() {
    let mut state = AppState::new();
    let summary = run(1, Some(0.75));
    assert_eq!(state.insight_metric.value(&summary), Some(0.75));

    state.cycle_insight_metric();
    assert_eq!(state.insight_metric, InsightMetric::RocAuc);
    assert_eq!(metric_label(state.insight_metric), "ROC AUC");
    assert!((state.insight_metric.value(&summary).unwrap_or_default() - 0.70).abs() < 1e-12);

    for _ in 0..3 {
        state.cycle_insight_metric();
    }
    assert_eq!(state.insight_metric, InsightMetric::Accuracy);
    assert_eq!(InsightMetric::Accuracy.value(&run(2, None)), None);
}

#[test]
fn empty_state_has_no_selection() {
    let mut state = AppState::new();
    assert!(state.selected_match().is_none());
    assert!(state.selected_performance().is_none());
    state.select_next();
    state.select_prev();
    state.select_player_next();
    assert_eq!(state.selected, 0);
    assert_eq!(state.player_selected, 0);
    assert!(state.playback_mut().is_none());
    state.tick();
}
