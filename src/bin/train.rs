use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use football_terminal::config::Settings;
use football_terminal::training;

fn main() -> Result<()> {
    init_tracing();
    let mut settings = Settings::from_env();
    if let Some(model) = parse_arg("--model") {
        settings.model_name = model;
    }
    let limit = parse_arg("--limit")
        .map(|raw| {
            raw.parse::<usize>()
                .with_context(|| format!("invalid --limit {raw:?}"))
        })
        .transpose()?;

    let report = training::train(&settings, limit)?;
    println!("{}", training::render_summary(&report));
    println!();
    println!("Artifacts:");
    for path in &report.artifacts {
        println!(" - {}", path.display());
    }
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
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
