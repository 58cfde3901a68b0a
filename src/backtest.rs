use std::collections::HashMap;

use anyhow::{Result, ensure};
use rayon::prelude::*;
use serde::Serialize;

use crate::calibration::{self, Metrics, Outcome, Prob3};
use crate::config::SimConfig;
use crate::engine::MatchEngine;
use crate::league::LeagueContext;
use crate::match_table::MatchTable;
use crate::result::MatchResult;
use crate::standings::StandingsRow;

pub const DEFAULT_HOLDOUT: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct BacktestConfig {
    /// Trailing rows scored, each against a context of the rows before it.
    pub holdout: usize,
    pub sim: SimConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            holdout: DEFAULT_HOLDOUT,
            sim: SimConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixturePrediction {
    /// Row index in the full table.
    pub index: usize,
    pub result: MatchResult,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub predictions: Vec<FixturePrediction>,
    pub model: Metrics,
    pub empirical: Metrics,
    pub uniform: Metrics,
}

impl BacktestReport {
    pub fn probs(&self) -> Vec<Prob3> {
        self.predictions
            .iter()
            .map(|p| p.result.probabilities())
            .collect()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.predictions.iter().map(|p| p.outcome).collect()
    }
}

/// Walk-forward evaluation over the last `cfg.holdout` rows with a known
/// score. Row `i` is simulated with seed `cfg.sim.seed + i`, so reports are
/// reproducible and independent of how fixtures are scheduled.
pub fn walk_forward(
    table: &MatchTable,
    standings: Option<&[StandingsRow]>,
    aliases: &HashMap<String, String>,
    cfg: &BacktestConfig,
) -> Result<BacktestReport> {
    ensure!(cfg.holdout >= 1, "holdout must cover at least one match");
    let start = table.len().saturating_sub(cfg.holdout);
    let targets: Vec<(usize, Outcome)> = table.matches[start..]
        .iter()
        .enumerate()
        .filter_map(|(offset, m)| m.outcome().map(|o| (start + offset, o)))
        .collect();
    ensure!(
        !targets.is_empty(),
        "no scored matches in the last {} rows",
        cfg.holdout
    );

    // Fixtures already run on the pool; keep each simulation on its thread.
    let engine = MatchEngine::new(SimConfig {
        parallel: false,
        ..cfg.sim
    });
    let predict = |&(index, outcome): &(usize, Outcome)| -> Result<FixturePrediction> {
        let ctx = LeagueContext::from_table(table.truncated(index), standings, aliases)?;
        let m = &table.matches[index];
        let seed = cfg.sim.seed.wrapping_add(index as u64);
        let result =
            engine.simulate_match_seeded(&m.home_team, &m.away_team, &ctx, cfg.sim.trials, seed)?;
        Ok(FixturePrediction {
            index,
            result,
            outcome,
        })
    };

    let predictions: Vec<FixturePrediction> = if cfg.sim.parallel {
        targets.par_iter().map(predict).collect::<Result<_>>()?
    } else {
        targets.iter().map(predict).collect::<Result<_>>()?
    };

    let results: Vec<MatchResult> = predictions.iter().map(|p| p.result.clone()).collect();
    let outcomes: Vec<Outcome> = predictions.iter().map(|p| p.outcome).collect();

    let model = calibration::evaluate_results(&results, &outcomes);
    let empirical_prob = calibration::empirical_outcome_probs(&outcomes);
    let empirical = calibration::evaluate_probs(&vec![empirical_prob; outcomes.len()], &outcomes);
    let uniform = calibration::evaluate_probs(&vec![Prob3::uniform(); outcomes.len()], &outcomes);

    log::info!(
        "backtest: {} fixtures, brier model={:.4} empirical={:.4} uniform={:.4}",
        predictions.len(),
        model.brier,
        empirical.brier,
        uniform.brier
    );

    Ok(BacktestReport {
        predictions,
        model,
        empirical,
        uniform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_table::HistoricalMatch;

    fn league() -> MatchTable {
        let mut rows = Vec::new();
        for round in 0..6u32 {
            rows.push(HistoricalMatch::new("Strong", "Weak", 3, round % 2));
            rows.push(HistoricalMatch::new("Weak", "Strong", 0, 2));
            rows.push(HistoricalMatch::new("Mid", "Weak", 1, 1));
        }
        let mut unscored = HistoricalMatch::new("Mid", "Strong", 0, 0);
        unscored.home_goals = None;
        unscored.away_goals = None;
        rows.push(unscored);
        MatchTable::from_matches(rows)
    }

    fn cfg(parallel: bool) -> BacktestConfig {
        BacktestConfig {
            holdout: 6,
            sim: SimConfig {
                trials: 400,
                parallel,
                ..SimConfig::default()
            },
        }
    }

    #[test]
    fn skips_unscored_rows() {
        let report = walk_forward(&league(), None, &HashMap::new(), &cfg(false)).unwrap();
        assert_eq!(report.predictions.len(), 5);
        assert_eq!(report.model.samples, 5);
        assert_eq!(report.predictions[0].index, 13);
        for p in &report.predictions {
            assert!((p.result.probabilities().sum() - 1.0).abs() < 1e-9);
            assert_eq!(p.result.trials, 400);
        }
    }

    #[test]
    fn scheduling_does_not_change_report() {
        let seq = walk_forward(&league(), None, &HashMap::new(), &cfg(false)).unwrap();
        let par = walk_forward(&league(), None, &HashMap::new(), &cfg(true)).unwrap();
        assert_eq!(seq.probs(), par.probs());
        assert_eq!(seq.outcomes(), par.outcomes());
    }

    #[test]
    fn uniform_baseline_has_fixed_brier() {
        let report = walk_forward(&league(), None, &HashMap::new(), &cfg(false)).unwrap();
        // (1 - 1/3)^2 + 2 * (1/3)^2
        assert!((report.uniform.brier - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn needs_scored_rows() {
        let table = MatchTable::default();
        assert!(walk_forward(&table, None, &HashMap::new(), &cfg(false)).is_err());
        let zero = BacktestConfig {
            holdout: 0,
            ..cfg(false)
        };
        assert!(walk_forward(&league(), None, &HashMap::new(), &zero).is_err());
    }
}
