use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fixture_sim::config::SimConfig;
use fixture_sim::engine::MatchEngine;
use fixture_sim::league::LeagueContext;
use fixture_sim::match_table::{HistoricalMatch, MatchTable, parse_match_table};
use fixture_sim::strength::{DEFAULT_LOOKBACK, Venue, team_strength};

const TEAMS: [&str; 8] = [
    "Arsenal",
    "Liverpool",
    "Man City",
    "Chelsea",
    "Newcastle",
    "Brighton",
    "Everton",
    "Fulham",
];

fn season() -> Vec<HistoricalMatch> {
    let mut rows = Vec::new();
    for round in 0..4u32 {
        for (i, home) in TEAMS.iter().enumerate() {
            for (j, away) in TEAMS.iter().enumerate() {
                if i == j {
                    continue;
                }
                let hg = (round + i as u32 * 3 + j as u32) % 4;
                let ag = (round + j as u32 * 2 + i as u32) % 3;
                rows.push(
                    HistoricalMatch::new(home, away, hg, ag)
                        .with_shots(8 + hg * 3, 6 + ag * 3)
                        .with_corners(3 + hg, 2 + ag),
                );
            }
        }
    }
    rows
}

fn season_csv() -> String {
    let mut out = String::from("HomeTeam,AwayTeam,FTHG,FTAG,HS,AS,HC,AC\n");
    for m in season() {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            m.home_team,
            m.away_team,
            m.home_goals.unwrap_or(0),
            m.away_goals.unwrap_or(0),
            m.home_shots.unwrap_or(0),
            m.away_shots.unwrap_or(0),
            m.home_corners.unwrap_or(0),
            m.away_corners.unwrap_or(0),
        ));
    }
    out
}

fn context() -> LeagueContext {
    LeagueContext::from_table(MatchTable::from_matches(season()), None, &HashMap::new())
        .expect("valid bench league")
}

fn bench_csv_parse(c: &mut Criterion) {
    let raw = season_csv();
    c.bench_function("match_table_parse", |b| {
        b.iter(|| {
            let table = parse_match_table(black_box(raw.as_bytes())).unwrap();
            black_box(table.len());
        })
    });
}

fn bench_team_strength(c: &mut Criterion) {
    let ctx = context();
    c.bench_function("team_strength", |b| {
        b.iter(|| {
            let s = team_strength(black_box("Arsenal"), &ctx, Venue::Home, DEFAULT_LOOKBACK);
            black_box(s.attack);
        })
    });
}

fn bench_simulate(c: &mut Criterion) {
    let ctx = context();
    let mut group = c.benchmark_group("simulate_6000");
    for parallel in [false, true] {
        let engine = MatchEngine::new(SimConfig {
            parallel,
            ..SimConfig::default()
        });
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let r = engine
                    .simulate_match_seeded("Arsenal", "Fulham", &ctx, 6000, black_box(42))
                    .unwrap();
                black_box(r.win_p_home);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_csv_parse, bench_team_strength, bench_simulate);
criterion_main!(benches);
