use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use football_terminal::config::Settings;
use football_terminal::{events, match_summary};

fn main() -> Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    let match_id = match parse_arg("--match") {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid --match {raw:?}"))?,
        None => settings.overview_match,
    };

    let events = events::load_match_events(&settings.data_dir, match_id)?;
    let summary = match_summary::analyze_match_metrics(&events);
    if summary.is_empty() {
        return Err(anyhow!("match {match_id} has no team events"));
    }
    println!("Match {match_id}");
    println!();
    println!("{}", match_summary::render_summary(&summary));
    Ok(())
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
