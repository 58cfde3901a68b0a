use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::result::MatchResult;

/// Floor on the probability given to the realized outcome when taking logs.
const LOG_LOSS_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];
}

/// Home / draw / away probabilities for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    /// All mass on the realized outcome.
    pub fn certain(outcome: Outcome) -> Self {
        let on = |o: Outcome| if o == outcome { 1.0 } else { 0.0 };
        Self {
            home: on(Outcome::Home),
            draw: on(Outcome::Draw),
            away: on(Outcome::Away),
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Most likely outcome; ties go to home, then draw.
    pub fn favourite(&self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }

    /// Squared error against the realized outcome, summed over the three
    /// classes (0 is perfect, 2 is confidently wrong).
    pub fn brier(&self, outcome: Outcome) -> f64 {
        let truth = Prob3::certain(outcome);
        Outcome::ALL
            .iter()
            .map(|&o| (self.get(o) - truth.get(o)).powi(2))
            .sum()
    }

    pub fn log_loss(&self, outcome: Outcome) -> f64 {
        -self.get(outcome).clamp(LOG_LOSS_FLOOR, 1.0).ln()
    }
}

impl From<&MatchResult> for Prob3 {
    fn from(r: &MatchResult) -> Self {
        r.probabilities()
    }
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    match home_goals.cmp(&away_goals) {
        Ordering::Greater => Outcome::Home,
        Ordering::Less => Outcome::Away,
        Ordering::Equal => Outcome::Draw,
    }
}

/// Observed outcome frequencies; uniform when nothing was observed.
pub fn empirical_outcome_probs(outcomes: &[Outcome]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::uniform();
    }
    let n = outcomes.len() as f64;
    let share = |target: Outcome| outcomes.iter().filter(|&&o| o == target).count() as f64 / n;
    Prob3 {
        home: share(Outcome::Home),
        draw: share(Outcome::Draw),
        away: share(Outcome::Away),
    }
}

/// Mean Brier score, mean log-loss and hit rate of `predictions` against
/// `outcomes`. Mismatched or empty inputs score as zero samples.
pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::default();
    }

    let (brier, log_loss, hits) = predictions.iter().zip(outcomes).fold(
        (0.0, 0.0, 0usize),
        |(brier, log_loss, hits), (p, &o)| {
            (
                brier + p.brier(o),
                log_loss + p.log_loss(o),
                hits + usize::from(p.favourite() == o),
            )
        },
    );

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier / n,
        log_loss: log_loss / n,
        accuracy: hits as f64 / n,
    }
}

/// Scores simulated fixtures directly against what happened.
pub fn evaluate_results(results: &[MatchResult], outcomes: &[Outcome]) -> Metrics {
    let probs: Vec<Prob3> = results.iter().map(Prob3::from).collect();
    evaluate_probs(&probs, outcomes)
}

/// Reliability table for one outcome class: predictions bucketed into
/// `bins` equal-width slices of [0, 1] with the hit rate in each.
pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let width = 1.0 / bins as f64;
    let mut table: Vec<CalibrationBin> = (0..bins)
        .map(|i| CalibrationBin {
            bucket_start: i as f64 * width,
            bucket_end: (i + 1) as f64 * width,
            count: 0,
            avg_pred: 0.0,
            actual_rate: 0.0,
        })
        .collect();

    // Running sums first, turned into means below.
    for (p, &o) in predictions.iter().zip(outcomes) {
        let prob = p.get(class).clamp(0.0, 1.0);
        let bin = &mut table[((prob * bins as f64) as usize).min(bins - 1)];
        bin.count += 1;
        bin.avg_pred += prob;
        if o == class {
            bin.actual_rate += 1.0;
        }
    }
    for bin in table.iter_mut().filter(|b| b.count > 0) {
        bin.avg_pred /= bin.count as f64;
        bin.actual_rate /= bin.count as f64;
    }
    table
}
