use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use fixture_sim::config::SimConfig;
use fixture_sim::engine::MatchEngine;
use fixture_sim::league::LeagueContext;
use fixture_sim::match_table;
use fixture_sim::standings::{self, StandingsRow};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let positional = positional_args();
    let [csv_path, home, away] = positional.as_slice() else {
        return Err(anyhow!(
            "usage: simulate_fixture <matches.csv> <home> <away> [--standings file.json] \
             [--aliases file.json] [--config file.json] [--trials N] [--seed S] \
             [--lookback N] [--chunk N] [--sequential] [--json] [--legacy]"
        ));
    };

    let mut cfg = match parse_path_arg("--config") {
        Some(path) => SimConfig::load(&path)?.with_env_overrides(),
        None => SimConfig::from_env(),
    };
    if let Some(trials) = parse_usize_arg("--trials") {
        cfg.trials = trials;
    }
    if let Some(seed) = parse_u64_arg("--seed") {
        cfg.seed = seed;
    }
    if let Some(lookback) = parse_usize_arg("--lookback") {
        cfg.lookback = lookback;
    }
    if let Some(chunk) = parse_usize_arg("--chunk") {
        cfg.chunk_size = chunk;
    }
    if has_flag("--sequential") {
        cfg.parallel = false;
    }
    let cfg = cfg.sanitized();

    let table = match_table::load_match_table(&PathBuf::from(csv_path))?;
    let rows = load_standings(parse_path_arg("--standings"))?;
    let aliases = load_aliases(parse_path_arg("--aliases"))?;
    let ctx = LeagueContext::from_table(table, rows.as_deref(), &aliases)?;

    for team in [home, away] {
        if !ctx.knows_team(team) {
            log::warn!("{team} has no matches in {csv_path}; using league defaults");
        }
    }

    let mut engine = MatchEngine::new(cfg);
    let result = engine.simulate_match(home, away, &ctx)?;

    if has_flag("--legacy") {
        println!("{}", serde_json::to_string_pretty(&result.to_legacy())?);
        return Ok(());
    }
    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let e = &result.explanation;
    println!("{} vs {} ({} trials)", result.home_team, result.away_team, result.trials);
    println!(
        "Score: {}-{}  (avg {:.2}-{:.2})",
        result.home_goals_round,
        result.away_goals_round,
        result.home_goals_avg,
        result.away_goals_avg
    );
    println!(
        "Possession: {:.1}% / {:.1}%",
        result.home_pos_pct, result.away_pos_pct
    );
    println!("Home: {:.1}%", result.win_p_home * 100.0);
    println!("Draw: {:.1}%", result.draw_p * 100.0);
    println!("Away: {:.1}%", result.win_p_away * 100.0);
    println!(
        "lambda {:.3}/{:.3} kappa {:.3} elo x{:.3} pace {:.3} rank {:.3}/{:.3}",
        e.lambda_home,
        e.lambda_away,
        e.kappa,
        e.elo_multiplier,
        e.pace,
        e.rank_boost_home,
        e.rank_boost_away
    );

    Ok(())
}

fn load_standings(path: Option<PathBuf>) -> Result<Option<Vec<StandingsRow>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read standings {}", path.display()))?;
    Ok(Some(standings::parse_standings_json(&raw)?))
}

fn load_aliases(path: Option<PathBuf>) -> Result<HashMap<String, String>> {
    let Some(path) = path else {
        return Ok(HashMap::new());
    };
    let raw =
        fs::read_to_string(&path).with_context(|| format!("read aliases {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse aliases {}", path.display()))
}

const VALUE_FLAGS: [&str; 7] = [
    "--standings",
    "--aliases",
    "--config",
    "--trials",
    "--seed",
    "--lookback",
    "--chunk",
];

fn positional_args() -> Vec<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        out.push(arg);
    }
    out
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
