use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use anyhow::Result;
use tracing::{debug, warn};

use crate::analysis;
use crate::config::Settings;
use crate::match_summary;
use crate::matches;
use crate::simulate;
use crate::state::{Delta, LoadTarget, MatchView, ProviderCommand};
use crate::tracking;

/// Background loader: reads event files and the tracking store on request and posts deltas
/// back to the UI thread. Exits when the command channel closes.
pub fn spawn_provider(settings: Settings, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            debug!(?cmd, "provider command");
            let delta = handle_command(&settings, cmd);
            if tx.send(delta).is_err() {
                break;
            }
        }
    });
}

pub fn handle_command(settings: &Settings, cmd: ProviderCommand) -> Delta {
    match cmd {
        ProviderCommand::LoadMatches => {
            match matches::load_match_index(&settings.matches_dir(), &settings.competitions) {
                Ok(rows) => Delta::SetMatches(rows),
                Err(err) => failed(LoadTarget::Matches, "Match index", err),
            }
        }
        ProviderCommand::LoadOverview { match_id } => {
            match build_match_view(&settings.data_dir, match_id) {
                Ok(view) => Delta::SetOverview(view),
                Err(err) => failed(LoadTarget::Overview, &format!("Overview match {match_id}"), err),
            }
        }
        ProviderCommand::LoadMatch { match_id } => {
            match build_match_view(&settings.data_dir, match_id) {
                Ok(view) => Delta::SetMatchView(view),
                Err(err) => failed(LoadTarget::Match, &format!("Match {match_id}"), err),
            }
        }
        ProviderCommand::LoadRuns => {
            match tracking::load_run_table(&settings.tracking_db, &settings.experiment) {
                Ok(runs) => Delta::SetRuns(runs),
                Err(err) => failed(LoadTarget::Runs, "Tracking store", err),
            }
        }
        ProviderCommand::LoadSimulation { match_id } => {
            let loaded = analysis::cached_match_events(&settings.data_dir, match_id).and_then(|events| {
                let actions = simulate::load_actions(&events)?;
                Ok((actions, analysis::xg_timeline(&events)))
            });
            match loaded {
                Ok((actions, timeline)) => Delta::SetSimulation {
                    match_id,
                    actions,
                    timeline,
                },
                Err(err) => failed(LoadTarget::Simulation, &format!("Simulation {match_id}"), err),
            }
        }
    }
}

pub fn build_match_view(data_dir: &Path, match_id: u64) -> Result<MatchView> {
    let events = analysis::cached_match_events(data_dir, match_id)?;
    let performances = analysis::players(&events)
        .iter()
        .map(|player| analysis::player_performance(&events, player))
        .collect();
    Ok(MatchView {
        match_id,
        kpis: analysis::match_kpis(&events),
        shots: analysis::shot_map(&events),
        timeline: analysis::xg_timeline(&events),
        network: analysis::pass_network(&events),
        performances,
        summary: match_summary::analyze_match_metrics(&events),
    })
}

fn failed(target: LoadTarget, what: &str, err: anyhow::Error) -> Delta {
    warn!(?target, "{what} failed: {err:#}");
    Delta::LoadFailed {
        target,
        message: format!("{what} unavailable: {err}"),
    }
}
