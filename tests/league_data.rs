use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use fixture_sim::backtest::{self, BacktestConfig};
use fixture_sim::config::SimConfig;
use fixture_sim::engine::MatchEngine;
use fixture_sim::league::LeagueContext;
use fixture_sim::match_table::{self, MatchTable};
use fixture_sim::result::MatchResult;
use fixture_sim::standings::{self, StandingsRow};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn sample_table() -> MatchTable {
    match_table::load_match_table(&fixture_path("sample_league.csv"))
        .expect("fixture csv should parse")
}

fn sample_standings() -> Vec<StandingsRow> {
    let raw = fs::read_to_string(fixture_path("standings.json"))
        .expect("fixture file should be readable");
    standings::parse_standings_json(&raw).expect("fixture json should parse")
}

fn aliases() -> HashMap<String, String> {
    HashMap::from([
        ("man united".to_string(), "Manchester United".to_string()),
        ("tottenham".to_string(), "Tottenham Hotspur".to_string()),
    ])
}

#[test]
fn loads_sample_csv() {
    let table = sample_table();
    assert_eq!(table.len(), 31);
    assert!(table.has_shots);
    assert!(table.has_corners);

    let first = &table.matches[0];
    assert_eq!(first.home_team, "Liverpool");
    assert_eq!(first.away_team, "Everton");
    assert_eq!((first.home_goals, first.away_goals), (Some(3), Some(0)));
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 8, 12));

    let postponed = table.matches.last().unwrap();
    assert_eq!(postponed.home_goals, None);
    assert_eq!(postponed.home_shots, None);
    assert_eq!(postponed.outcome(), None);
}

#[test]
fn missing_goal_column_is_an_error() {
    let raw = "HomeTeam,AwayTeam,FTHG\nA,B,1\n";
    let err = match_table::parse_match_table(raw.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("FTAG"), "{err}");
}

#[test]
fn standings_resolve_through_aliases() {
    let rows = sample_standings();
    assert_eq!(rows.len(), 6);
    let ctx = LeagueContext::from_table(sample_table(), Some(rows.as_slice()), &aliases()).unwrap();

    assert_eq!(ctx.teams.len(), 6);
    assert_eq!(ctx.table_size, 20);
    assert_eq!(ctx.rank_of("Arsenal"), Some(1));
    assert_eq!(ctx.rank_of("Man United"), Some(3));
    assert_eq!(ctx.rank_of("Tottenham"), Some(5));
    assert_eq!(ctx.rank_of("Everton"), Some(6));
    assert_eq!(ctx.rank_of("Fulham"), None);
}

#[test]
fn unmapped_names_stay_unranked() {
    let rows = sample_standings();
    let ctx =
        LeagueContext::from_table(sample_table(), Some(rows.as_slice()), &HashMap::new()).unwrap();
    assert_eq!(ctx.rank_of("Liverpool"), Some(2));
    assert_eq!(ctx.rank_of("Man United"), None);
}

#[test]
fn table_leader_outrates_the_bottom_side() {
    let rows = sample_standings();
    let ctx = LeagueContext::from_table(sample_table(), Some(rows.as_slice()), &aliases()).unwrap();
    assert!(ctx.rating("Arsenal") > ctx.rating("Everton"));

    let engine = MatchEngine::with_seed(11);
    let r = engine
        .simulate_match_seeded("Arsenal", "Everton", &ctx, 4000, 11)
        .unwrap();
    assert!(r.explanation.rank_boost_home > 1.0);
    assert!(r.explanation.rank_boost_away < 1.0);
    assert!(r.win_p_home > r.win_p_away);
}

#[test]
fn legacy_view_round_trips_engine_output() {
    let ctx = LeagueContext::from_table(sample_table(), None, &HashMap::new()).unwrap();
    let engine = MatchEngine::with_seed(5);
    let r = engine
        .simulate_match_seeded("Chelsea", "Tottenham", &ctx, 1000, 5)
        .unwrap();

    let map = r.to_legacy_map().unwrap();
    for key in [
        "home_team",
        "win_p_home",
        "draw_p",
        "home_pos_pct",
        "lambda_home",
        "kappa",
        "rank_boost_away",
        "pace",
    ] {
        assert!(map.contains_key(key), "missing {key}");
    }
    assert_eq!(MatchResult::from_legacy_map(map).unwrap(), r);
}

#[test]
fn walk_forward_over_sample_league() {
    let rows = sample_standings();
    let cfg = BacktestConfig {
        holdout: 8,
        sim: SimConfig {
            trials: 500,
            ..SimConfig::default()
        },
    };
    let report =
        backtest::walk_forward(&sample_table(), Some(rows.as_slice()), &aliases(), &cfg).unwrap();
    assert_eq!(report.predictions.len(), 7);
    assert_eq!(report.model.samples, 7);
    assert!(report.model.brier.is_finite());
    assert!(report.model.log_loss > 0.0);
    assert!((0.0..=1.0).contains(&report.model.accuracy));

    let again =
        backtest::walk_forward(&sample_table(), Some(rows.as_slice()), &aliases(), &cfg).unwrap();
    assert_eq!(report.probs(), again.probs());
}
