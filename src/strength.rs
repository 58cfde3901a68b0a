use serde::{Deserialize, Serialize};

use crate::league::LeagueContext;
use crate::match_table::HistoricalMatch;

pub const DEFAULT_LOOKBACK: usize = 10;

const RATIO_FLOOR: f64 = 0.25;
const EMA_ALPHA: f64 = 0.35;
const SHRINK_BASE: f64 = 0.55;
const SHRINK_WEIGHT: f64 = 0.45;
const RATING_MIN: f64 = 0.65;
const RATING_MAX: f64 = 1.6;

const CORNER_TO_SHOT: f64 = 0.8;
const MATCH_SHARE_MIN: f64 = 0.35;
const MATCH_SHARE_MAX: f64 = 0.65;
const POSSESSION_MIN: f64 = 0.40;
const POSSESSION_MAX: f64 = 0.60;

const TEMPO_PER_SHOT: f64 = 0.02;
const TEMPO_PER_CORNER: f64 = 0.01;
const MATCH_TEMPO_MIN: f64 = 0.75;
const MATCH_TEMPO_MAX: f64 = 1.6;
const TEMPO_MIN: f64 = 0.85;
const TEMPO_MAX: f64 = 1.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

/// Per-side inputs to the expected-goals model for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamStrength {
    /// Goals scored relative to what opponents usually concede, shrunk to 1.0.
    pub attack: f64,
    /// Goals conceded relative to what opponents usually score, shrunk to 1.0.
    pub defense: f64,
    pub possession: f64,
    /// League scoring rate for the venue, home-field adjusted.
    pub baseline: f64,
    pub table_percentile: f64,
    pub tempo: f64,
}

/// Estimates a side's strength from its last `lookback` matches at `venue`.
///
/// Teams with no qualifying matches (including names the league has never
/// seen) get neutral ratings on top of the venue baseline.
pub fn team_strength(
    team: &str,
    ctx: &LeagueContext,
    venue: Venue,
    lookback: usize,
) -> TeamStrength {
    let baseline = venue_baseline(ctx, venue);
    let table_percentile = table_percentile(team, ctx);

    let history: Vec<&HistoricalMatch> = ctx
        .matches
        .iter()
        .filter(|m| match venue {
            Venue::Home => m.home_team == team,
            Venue::Away => m.away_team == team,
        })
        .collect();
    let window = &history[history.len().saturating_sub(lookback)..];

    if window.is_empty() {
        log::debug!("no {venue:?} history for {team}; using neutral ratings");
        return TeamStrength {
            attack: 1.0,
            defense: 1.0,
            possession: 0.5,
            baseline,
            table_percentile,
            tempo: 1.0,
        };
    }

    let mut attack_obs: Vec<(f64, f64)> = Vec::with_capacity(window.len());
    let mut defense_obs: Vec<(f64, f64)> = Vec::with_capacity(window.len());
    let mut possession_obs: Vec<(f64, f64)> = Vec::with_capacity(window.len());
    let mut tempo_obs: Vec<(f64, f64)> = Vec::with_capacity(window.len());

    for m in window {
        let (opponent, goals_for, goals_against) = match venue {
            Venue::Home => (&m.away_team, m.home_goals, m.away_goals),
            Venue::Away => (&m.home_team, m.away_goals, m.home_goals),
        };
        let opp = ctx.averages_for(opponent);
        let w = opponent_quality_weight(opponent, ctx);

        if let Some(gf) = goals_for {
            attack_obs.push((gf as f64 / opp.conceded_avg.max(RATIO_FLOOR), w));
        }
        if let Some(ga) = goals_against {
            defense_obs.push((ga as f64 / opp.scored_avg.max(RATIO_FLOOR), w));
        }

        let (home_share, away_share) = possession_share(m, ctx);
        let share = match venue {
            Venue::Home => home_share,
            Venue::Away => away_share,
        };
        possession_obs.push((share, w));
        tempo_obs.push((match_tempo(m, ctx), w));
    }

    let possession = weighted_mean(&possession_obs)
        .unwrap_or(0.5)
        .clamp(POSSESSION_MIN, POSSESSION_MAX);
    let tempo = weighted_mean(&tempo_obs)
        .unwrap_or(1.0)
        .clamp(TEMPO_MIN, TEMPO_MAX);

    TeamStrength {
        attack: shrunk_rating(&attack_obs),
        defense: shrunk_rating(&defense_obs),
        possession,
        baseline,
        table_percentile,
        tempo,
    }
}

/// 1.0 for the league leader, 0.0 for last place, 0.5 when unranked.
pub fn table_percentile(team: &str, ctx: &LeagueContext) -> f64 {
    if !ctx.has_table() {
        return 0.5;
    }
    let Some(rank) = ctx.rank_of(team) else {
        return 0.5;
    };
    let denom = ctx.table_size.saturating_sub(1).max(1) as f64;
    (1.0 - (rank as f64 - 1.0) / denom).clamp(0.0, 1.0)
}

/// Results against stronger opponents count for more: 0.6 at the bottom of
/// the table up to 1.4 at the top.
pub fn opponent_quality_weight(opponent: &str, ctx: &LeagueContext) -> f64 {
    0.6 + 0.8 * table_percentile(opponent, ctx)
}

/// Home/away share of attacking volume, a stand-in for possession.
pub fn possession_share(m: &HistoricalMatch, ctx: &LeagueContext) -> (f64, f64) {
    if !ctx.has_shots && !ctx.has_corners {
        return (0.5, 0.5);
    }
    let stat = |present: bool, v: Option<u32>| {
        if present {
            v.map(f64::from).unwrap_or(0.0)
        } else {
            0.0
        }
    };
    let home = stat(ctx.has_shots, m.home_shots)
        + CORNER_TO_SHOT * stat(ctx.has_corners, m.home_corners);
    let away = stat(ctx.has_shots, m.away_shots)
        + CORNER_TO_SHOT * stat(ctx.has_corners, m.away_corners);
    let total = home + away;
    if total <= 0.0 {
        return (0.5, 0.5);
    }
    let home_share = (home / total).clamp(MATCH_SHARE_MIN, MATCH_SHARE_MAX);
    (home_share, 1.0 - home_share)
}

/// Busier matches (more shots and corners) score higher.
pub fn match_tempo(m: &HistoricalMatch, ctx: &LeagueContext) -> f64 {
    let mut tempo = 1.0;
    if ctx.has_shots
        && let (Some(h), Some(a)) = (m.home_shots, m.away_shots)
    {
        tempo *= 1.0 + TEMPO_PER_SHOT * f64::from(h + a);
    }
    if ctx.has_corners
        && let (Some(h), Some(a)) = (m.home_corners, m.away_corners)
    {
        tempo *= 1.0 + TEMPO_PER_CORNER * f64::from(h + a);
    }
    tempo.clamp(MATCH_TEMPO_MIN, MATCH_TEMPO_MAX)
}

fn venue_baseline(ctx: &LeagueContext, venue: Venue) -> f64 {
    let b = &ctx.baselines;
    let rate = match venue {
        Venue::Home => b.avg_home_goals * b.home_field_advantage,
        Venue::Away => b.avg_away_goals / b.home_field_advantage,
    };
    rate.max(0.0)
}

/// Weighted mean, smoothed in match order, then pulled toward 1.0.
fn shrunk_rating(obs: &[(f64, f64)]) -> f64 {
    let seed = weighted_mean(obs).unwrap_or(1.0);
    let smoothed = ema_seeded(obs.iter().map(|(v, _)| *v), EMA_ALPHA, seed);
    (SHRINK_BASE + SHRINK_WEIGHT * smoothed).clamp(RATING_MIN, RATING_MAX)
}

fn weighted_mean(obs: &[(f64, f64)]) -> Option<f64> {
    let weight_sum: f64 = obs.iter().map(|(_, w)| w).sum();
    if obs.is_empty() || weight_sum <= 0.0 {
        return None;
    }
    Some(obs.iter().map(|(v, w)| v * w).sum::<f64>() / weight_sum)
}

fn ema_seeded(values: impl Iterator<Item = f64>, alpha: f64, seed: f64) -> f64 {
    values.fold(seed, |acc, v| acc + alpha * (v - acc))
}
