use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use football_terminal::config::Settings;
use football_terminal::dataset;

fn main() -> Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    let limit = parse_limit_arg()?;

    let (rows, summary) =
        dataset::build_all_passes_dataset(&settings.events_dir(), &settings.dataset_db, limit)?;

    println!("Pass dataset ready");
    println!("DB: {}", summary.db_path.display());
    if summary.from_cache {
        println!("Reused cached table");
    } else {
        println!(
            "Event files: {}/{}",
            summary.files_succeeded, summary.files_total
        );
        println!("Passes inserted: {}", summary.passes_inserted);
    }
    println!("Rows: {}", rows.len());
    if !summary.errors.is_empty() {
        println!("errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn parse_limit_arg() -> Result<Option<usize>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        let raw = if let Some(raw) = arg.strip_prefix("--limit=") {
            raw
        } else if arg == "--limit"
            && let Some(next) = args.get(idx + 1)
        {
            next.as_str()
        } else {
            continue;
        };
        let limit = raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid --limit {raw:?}"))?;
        return Ok(Some(limit));
    }
    Ok(None)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
