use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use fixture_sim::backtest::{self, BacktestConfig, DEFAULT_HOLDOUT};
use fixture_sim::calibration::{self, Outcome};
use fixture_sim::config::SimConfig;
use fixture_sim::match_table;
use fixture_sim::standings;

const DEFAULT_BACKTEST_TRIALS: usize = 2000;
const DEFAULT_BINS: usize = 5;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .filter(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/sample_league.csv"));

    let mut sim = SimConfig::from_env();
    if std::env::var("FIXTURE_SIM_TRIALS").is_err() {
        sim.trials = DEFAULT_BACKTEST_TRIALS;
    }
    if let Some(trials) = parse_usize_arg("--trials") {
        sim.trials = trials;
    }
    if let Some(seed) = parse_u64_arg("--seed") {
        sim.seed = seed;
    }
    if has_flag("--sequential") {
        sim.parallel = false;
    }
    let cfg = BacktestConfig {
        holdout: parse_usize_arg("--holdout").unwrap_or(DEFAULT_HOLDOUT).max(1),
        sim: sim.sanitized(),
    };

    let table = match_table::load_match_table(&path)?;
    let rows = match parse_path_arg("--standings") {
        Some(p) => {
            let raw = fs::read_to_string(&p)
                .with_context(|| format!("read standings {}", p.display()))?;
            Some(standings::parse_standings_json(&raw)?)
        }
        None => None,
    };

    let report = backtest::walk_forward(&table, rows.as_deref(), &HashMap::new(), &cfg)?;

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Backtest: {} ({} fixtures, {} trials each, seed {})",
        path.display(),
        report.predictions.len(),
        cfg.sim.trials,
        cfg.sim.seed
    );
    print_metrics("Model", report.model);
    print_metrics("Empirical baseline", report.empirical);
    print_metrics("Uniform baseline", report.uniform);

    let bins = parse_usize_arg("--bins").unwrap_or(DEFAULT_BINS);
    let probs = report.probs();
    let outcomes = report.outcomes();
    println!("Home-win calibration:");
    for bin in calibration::calibration_bins(&probs, &outcomes, Outcome::Home, bins) {
        if bin.count == 0 {
            continue;
        }
        println!(
            "  [{:.2}, {:.2}) n={} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }

    Ok(())
}

fn print_metrics(label: &str, metrics: calibration::Metrics) {
    println!("{label}:");
    println!(
        "  samples={} brier={:.4} log_loss={:.4} accuracy={:.3}",
        metrics.samples, metrics.brier, metrics.log_loss, metrics.accuracy
    );
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    arg_value(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    arg_value(name).and_then(|v| v.parse::<usize>().ok())
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    arg_value(name).and_then(|v| v.parse::<u64>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
