use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use football_terminal::config::Settings;
use football_terminal::features::{self, PassRecord};
use football_terminal::model::DECISION_THRESHOLD;
use football_terminal::{events, training};

/// Scores every pass in a match file, or a single pass given by coordinates.
fn main() -> Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    let model_path = parse_arg("--model-path")
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.model_path());

    let records = if let Some(raw) = parse_arg("--match") {
        let match_id = raw
            .parse::<u64>()
            .with_context(|| format!("invalid --match {raw:?}"))?;
        let events = events::load_match_events(&settings.data_dir, match_id)?;
        features::extract_passes(&events)
    } else if let Some(raw) = parse_arg("--pass") {
        vec![parse_pass(&raw)?]
    } else {
        return Err(anyhow!(
            "usage: predict --match <id> | --pass start_x,start_y,end_x,end_y,minute [--model-path <file>]"
        ));
    };

    let probs = training::predict_pass_outcome(&model_path, &records)?;
    println!(
        "{:>4}  {:>6}  {:>6}  {:>6}  {:>6}  {:>8}  {:>6}",
        "min", "sx", "sy", "ex", "ey", "p(comp)", "actual"
    );
    let mut correct = 0usize;
    for (record, p) in records.iter().zip(&probs) {
        let predicted = *p >= DECISION_THRESHOLD;
        if predicted == record.completed {
            correct += 1;
        }
        println!(
            "{:>4}  {:>6.1}  {:>6.1}  {:>6.1}  {:>6.1}  {:>8.3}  {:>6}",
            record.minute,
            record.start_x,
            record.start_y,
            record.end_x,
            record.end_y,
            p,
            u8::from(record.completed)
        );
    }
    if records.len() > 1 {
        println!();
        println!(
            "Agreement with recorded outcome: {}/{} ({:.1}%)",
            correct,
            records.len(),
            correct as f64 / records.len() as f64 * 100.0
        );
    }
    Ok(())
}

fn parse_pass(raw: &str) -> Result<PassRecord> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --pass {raw:?}"))?;
    let [start_x, start_y, end_x, end_y, minute] = parts[..] else {
        return Err(anyhow!("--pass expects 5 comma-separated numbers"));
    };
    Ok(PassRecord {
        start_x,
        start_y,
        end_x,
        end_y,
        distance: features::calculate_distance(start_x, start_y, end_x, end_y),
        angle: features::calculate_angle(start_x, start_y, end_x, end_y),
        completed: false,
        minute: minute.max(0.0) as u32,
    })
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
