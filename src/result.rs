use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calibration::Prob3;

/// Every factor that went into a fixture's goal intensities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub pos_prior_home: f64,
    pub pos_prior_away: f64,
    /// Mean of the goal component both sides share.
    pub kappa: f64,
    pub base_home: f64,
    pub base_away: f64,
    pub att_home: f64,
    pub def_home: f64,
    pub att_away: f64,
    pub def_away: f64,
    pub rank_boost_home: f64,
    pub rank_boost_away: f64,
    pub elo_multiplier: f64,
    pub pace: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_team: String,
    pub away_team: String,
    pub trials: usize,
    pub home_goals_avg: f64,
    pub away_goals_avg: f64,
    pub home_goals_round: u32,
    pub away_goals_round: u32,
    pub home_pos_pct: f64,
    pub away_pos_pct: f64,
    pub win_p_home: f64,
    pub win_p_away: f64,
    pub draw_p: f64,
    pub explanation: MatchExplanation,
}

/// Flat shape older callers consume: the result fields and the explanation
/// fields side by side in one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyMatchResult {
    pub home_team: String,
    pub away_team: String,
    pub trials: usize,
    pub home_goals_avg: f64,
    pub away_goals_avg: f64,
    pub home_goals_round: u32,
    pub away_goals_round: u32,
    pub home_pos_pct: f64,
    pub away_pos_pct: f64,
    pub win_p_home: f64,
    pub win_p_away: f64,
    pub draw_p: f64,
    #[serde(flatten)]
    pub explanation: MatchExplanation,
}

impl MatchResult {
    pub fn probabilities(&self) -> Prob3 {
        Prob3 {
            home: self.win_p_home,
            draw: self.draw_p,
            away: self.win_p_away,
        }
    }

    pub fn to_legacy(&self) -> LegacyMatchResult {
        LegacyMatchResult::from(self.clone())
    }

    pub fn to_legacy_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self.to_legacy()).context("serialize legacy match result")? {
            Value::Object(map) => Ok(map),
            other => bail!("legacy match result serialized to a non-object: {other}"),
        }
    }

    pub fn from_legacy_map(map: Map<String, Value>) -> Result<Self> {
        let legacy: LegacyMatchResult =
            serde_json::from_value(Value::Object(map)).context("invalid legacy match result")?;
        Ok(legacy.into())
    }

    pub fn from_legacy_json(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw).context("invalid legacy json")? {
            Value::Object(map) => Self::from_legacy_map(map),
            other => Err(anyhow!("legacy match result must be an object, got {other}")),
        }
    }
}

impl From<MatchResult> for LegacyMatchResult {
    fn from(r: MatchResult) -> Self {
        Self {
            home_team: r.home_team,
            away_team: r.away_team,
            trials: r.trials,
            home_goals_avg: r.home_goals_avg,
            away_goals_avg: r.away_goals_avg,
            home_goals_round: r.home_goals_round,
            away_goals_round: r.away_goals_round,
            home_pos_pct: r.home_pos_pct,
            away_pos_pct: r.away_pos_pct,
            win_p_home: r.win_p_home,
            win_p_away: r.win_p_away,
            draw_p: r.draw_p,
            explanation: r.explanation,
        }
    }
}

impl From<LegacyMatchResult> for MatchResult {
    fn from(l: LegacyMatchResult) -> Self {
        Self {
            home_team: l.home_team,
            away_team: l.away_team,
            trials: l.trials,
            home_goals_avg: l.home_goals_avg,
            away_goals_avg: l.away_goals_avg,
            home_goals_round: l.home_goals_round,
            away_goals_round: l.away_goals_round,
            home_pos_pct: l.home_pos_pct,
            away_pos_pct: l.away_pos_pct,
            win_p_home: l.win_p_home,
            win_p_away: l.win_p_away,
            draw_p: l.draw_p,
            explanation: l.explanation,
        }
    }
}
