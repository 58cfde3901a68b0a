use std::collections::HashMap;

use crate::match_table::HistoricalMatch;

pub const BASE_RATING: f64 = 1500.0;

#[derive(Debug, Clone, Copy)]
pub struct EloConfig {
    pub k: f64,
    pub home_adv_pts: f64,
    /// Scales `ln(1 + |goal difference|)` into the update size.
    pub goal_diff_weight: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k: 20.0,
            home_adv_pts: 60.0,
            goal_diff_weight: 0.5,
        }
    }
}

/// Running skill rating per team, replayed over the match history.
///
/// Every team in `teams` starts at [`BASE_RATING`]. Rows are replayed by date
/// when any row carries one (undated rows keep their relative order and go
/// last), otherwise in table order. Rows without a full score are skipped.
pub fn build_skill_ratings(
    matches: &[HistoricalMatch],
    teams: &[String],
    cfg: EloConfig,
) -> HashMap<String, f64> {
    let mut elo: HashMap<String, f64> = teams.iter().map(|t| (t.clone(), BASE_RATING)).collect();

    let mut ordered: Vec<&HistoricalMatch> = matches.iter().collect();
    if ordered.iter().any(|m| m.date.is_some()) {
        // Stable sort: same-day rows keep table order.
        ordered.sort_by_key(|m| (m.date.is_none(), m.date));
    }

    for m in ordered {
        let (Some(home_goals), Some(away_goals)) = (m.home_goals, m.away_goals) else {
            continue;
        };
        let eh = *elo.entry(m.home_team.clone()).or_insert(BASE_RATING);
        let ea = *elo.entry(m.away_team.clone()).or_insert(BASE_RATING);

        let expected_home = expected_score(eh + cfg.home_adv_pts, ea);
        let s_home = if home_goals > away_goals {
            1.0
        } else if home_goals < away_goals {
            0.0
        } else {
            0.5
        };
        let gd = (home_goals as f64 - away_goals as f64).abs();
        let mult = 1.0 + gd.ln_1p() * cfg.goal_diff_weight;

        let delta = cfg.k * mult * (s_home - expected_home);
        elo.insert(m.home_team.clone(), eh + delta);
        elo.insert(m.away_team.clone(), ea - delta);
    }

    elo
}

fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-(r_a - r_b) / 400.0))
}
