use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::match_table::HistoricalMatch;

const GOAL_CLIP: f64 = 6.0;
const MIN_AVG_GOALS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueBaselines {
    pub avg_home_goals: f64,
    pub avg_away_goals: f64,
    /// Multiplier on the home baseline (divisor on the away one).
    pub home_field_advantage: f64,
}

impl LeagueBaselines {
    pub fn defaults() -> Self {
        Self {
            avg_home_goals: 1.4,
            avg_away_goals: 1.1,
            home_field_advantage: home_field_advantage(1.4, 1.1),
        }
    }

    /// League-wide goals per team per match, used when a team is unknown.
    pub fn mid_point(&self) -> f64 {
        (self.avg_home_goals + self.avg_away_goals) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamAverages {
    pub scored_avg: f64,
    pub conceded_avg: f64,
}

pub fn compute_league_baselines(matches: &[HistoricalMatch]) -> LeagueBaselines {
    if matches.is_empty() {
        return LeagueBaselines::defaults();
    }

    let home = clipped_mean(matches.iter().filter_map(|m| m.home_goals));
    let away = clipped_mean(matches.iter().filter_map(|m| m.away_goals));
    let d = LeagueBaselines::defaults();
    let avg_home_goals = home.unwrap_or(d.avg_home_goals).max(MIN_AVG_GOALS);
    let avg_away_goals = away.unwrap_or(d.avg_away_goals).max(MIN_AVG_GOALS);

    LeagueBaselines {
        avg_home_goals,
        avg_away_goals,
        home_field_advantage: home_field_advantage(avg_home_goals, avg_away_goals),
    }
}

/// Fourth root of the home/away scoring ratio, held to [0.9, 1.2].
pub fn home_field_advantage(avg_home_goals: f64, avg_away_goals: f64) -> f64 {
    (avg_home_goals / avg_away_goals.max(1e-6))
        .powf(0.25)
        .clamp(0.9, 1.2)
}

/// Season scoring/conceding averages per team, both venues pooled.
pub fn compute_team_averages(
    matches: &[HistoricalMatch],
    teams: &[String],
    baselines: &LeagueBaselines,
) -> HashMap<String, TeamAverages> {
    let mut scored: HashMap<&str, Vec<u32>> = HashMap::new();
    let mut conceded: HashMap<&str, Vec<u32>> = HashMap::new();

    for m in matches {
        if let Some(g) = m.home_goals {
            scored.entry(m.home_team.as_str()).or_default().push(g);
            conceded.entry(m.away_team.as_str()).or_default().push(g);
        }
        if let Some(g) = m.away_goals {
            scored.entry(m.away_team.as_str()).or_default().push(g);
            conceded.entry(m.home_team.as_str()).or_default().push(g);
        }
    }

    let fallback = baselines.mid_point();
    teams
        .iter()
        .map(|team| {
            let avg = |src: &HashMap<&str, Vec<u32>>| {
                src.get(team.as_str())
                    .and_then(|goals| clipped_mean(goals.iter().copied()))
                    .unwrap_or(fallback)
                    .max(MIN_AVG_GOALS)
            };
            (
                team.clone(),
                TeamAverages {
                    scored_avg: avg(&scored),
                    conceded_avg: avg(&conceded),
                },
            )
        })
        .collect()
}

fn clipped_mean(goals: impl Iterator<Item = u32>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for g in goals {
        sum += (g as f64).min(GOAL_CLIP);
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}
