use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use football_terminal::config::{EDA_EXPERIMENT, Settings};
use football_terminal::tracking::{RunStatus, TrackingStore};
use football_terminal::{dataset, eda, features};

const REPORT_FILE: &str = "eda_report.txt";

fn main() -> Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    let limit = parse_limit_arg()?;

    let (stored, _) =
        dataset::build_all_passes_dataset(&settings.events_dir(), &settings.dataset_db, limit)?;
    let mut rows = features::engineer_all(&dataset::records(&stored));
    let removed = eda::remove_duplicates(&mut rows);
    let report = eda::report_text(&rows, removed);
    println!("{report}");

    let dir = settings.plots_dir();
    let mut artifacts = eda::write_eda_artifacts(&rows, &dir)?;
    let report_path = dir.join(REPORT_FILE);
    std::fs::write(&report_path, &report)
        .with_context(|| format!("write {}", report_path.display()))?;
    artifacts.push(report_path);

    let store = TrackingStore::open(&settings.tracking_db)?;
    let experiment_id = store.get_or_create_experiment(EDA_EXPERIMENT)?;
    let run_id = store.start_run(experiment_id, "eda")?;
    let logged = (|| -> Result<()> {
        store.log_param(&run_id, "rows", &rows.len().to_string())?;
        store.log_param(&run_id, "duplicates_removed", &removed.to_string())?;
        let dist = eda::class_distribution(&rows);
        store.log_metric(&run_id, "completed_pct", dist.completed_pct())?;
        for path in &artifacts {
            store.log_artifact(&run_id, path)?;
        }
        Ok(())
    })();
    let status = if logged.is_ok() {
        RunStatus::Finished
    } else {
        RunStatus::Failed
    };
    store.end_run(&run_id, status)?;
    logged?;
    info!(run_id = %run_id, artifacts = artifacts.len(), "eda logged");

    println!();
    println!("Artifacts ({}):", artifacts.len());
    for path in &artifacts {
        println!(" - {}", path.display());
    }
    println!("Logged to experiment '{EDA_EXPERIMENT}' as run {run_id}");
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
