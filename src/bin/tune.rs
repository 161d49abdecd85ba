use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use football_terminal::config::Settings;
use football_terminal::tracking::TrackingStore;
use football_terminal::training;
use football_terminal::tuning::{self, SearchSpace};

const DEFAULT_TRIALS: usize = 20;

fn main() -> Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    let trials = parse_usize_arg("--trials")?.unwrap_or(DEFAULT_TRIALS);
    let limit = parse_usize_arg("--limit")?;
    let experiment = parse_arg("--experiment").unwrap_or_else(|| settings.experiment.clone());

    let rows = training::load_training_rows(&settings, limit)?;
    let store = TrackingStore::open(&settings.tracking_db)?;
    let outcome = tuning::tune(
        &rows,
        &SearchSpace::default(),
        trials,
        settings.test_size,
        settings.random_seed,
        Some((&store, experiment.as_str())),
    )?;

    println!("{}", tuning::render_outcome(&outcome));
    println!();
    println!("Trials logged to experiment '{experiment}'");
    Ok(())
}

fn parse_usize_arg(name: &str) -> Result<Option<usize>> {
    parse_arg(name)
        .map(|raw| {
            raw.parse::<usize>()
                .with_context(|| format!("invalid {name} {raw:?}"))
        })
        .transpose()
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
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
