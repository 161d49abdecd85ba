use std::io::{self, Write};
use std::thread;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use football_terminal::config::Settings;
use football_terminal::{events, simulate};

/// Replays a match event by event on stdout. `--fast` skips the real-time pauses.
fn main() -> Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    let match_id = match parse_arg("--match") {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid --match {raw:?}"))?,
        None => settings.overview_match,
    };
    let fast = has_flag("--fast") || has_flag("--no-sleep");

    let events = events::load_match_events(&settings.data_dir, match_id)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let count = simulate::simulate_events(&events, &mut out, |gap| {
        if !fast {
            thread::sleep(gap);
        }
    })?;
    writeln!(out, "Replayed {count} events").context("write summary")?;
    Ok(())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
