use crate::league::LeagueContext;
use crate::result::MatchExplanation;
use crate::strength::TeamStrength;

const DEFENSE_FLOOR: f64 = 1e-3;
const BOOST_FLOOR: f64 = 1e-6;

const RANK_BOOST_BASE: f64 = 0.7;
const RANK_BOOST_SPAN: f64 = 0.6;
const RANK_BOOST_EXP: f64 = 1.5;

const ELO_SCALE: f64 = 800.0;
const ELO_MULT_MIN: f64 = 0.6;
const ELO_MULT_MAX: f64 = 1.8;

const PACE_MIN: f64 = 0.85;
const PACE_MAX: f64 = 1.30;

const LAMBDA_MIN: f64 = 0.2;
const LAMBDA_MAX: f64 = 3.2;

const KAPPA_SHARE: f64 = 0.18;
const KAPPA_CAP: f64 = 0.49;

/// Combines both sides' strengths into goal intensities for the fixture.
///
/// Pure: the same strengths, ratings and table always give the same
/// explanation.
pub fn expected_goals(
    home_team: &str,
    away_team: &str,
    home: &TeamStrength,
    away: &TeamStrength,
    ctx: &LeagueContext,
) -> MatchExplanation {
    let mut lambda_home = home.baseline * home.attack / away.defense.max(DEFENSE_FLOOR);
    let mut lambda_away = away.baseline * away.attack / home.defense.max(DEFENSE_FLOOR);

    let (rank_boost_home, rank_boost_away) = if ctx.has_table() {
        rank_boost_ratios(home.table_percentile, away.table_percentile)
    } else {
        (1.0, 1.0)
    };
    lambda_home *= rank_boost_home;
    lambda_away *= rank_boost_away;

    let elo_multiplier = elo_multiplier(ctx.rating(home_team), ctx.rating(away_team));
    lambda_home *= elo_multiplier;
    lambda_away /= elo_multiplier;

    let pace = (0.5 * (home.tempo + away.tempo)).clamp(PACE_MIN, PACE_MAX);
    lambda_home *= pace;
    lambda_away *= pace;

    let lambda_home = lambda_home.clamp(LAMBDA_MIN, LAMBDA_MAX);
    let lambda_away = lambda_away.clamp(LAMBDA_MIN, LAMBDA_MAX);
    let kappa = shared_component(lambda_home, lambda_away, pace);

    let explanation = MatchExplanation {
        lambda_home,
        lambda_away,
        pos_prior_home: home.possession,
        pos_prior_away: away.possession,
        kappa,
        base_home: home.baseline,
        base_away: away.baseline,
        att_home: home.attack,
        def_home: home.defense,
        att_away: away.attack,
        def_away: away.defense,
        rank_boost_home,
        rank_boost_away,
        elo_multiplier,
        pace,
    };
    log::debug!("{home_team} vs {away_team}: {explanation:?}");
    explanation
}

/// Each side's table boost relative to the other's, so the pair multiplies
/// to one.
pub fn rank_boost_ratios(home_percentile: f64, away_percentile: f64) -> (f64, f64) {
    let boost_home = rank_boost(home_percentile);
    let boost_away = rank_boost(away_percentile);
    (
        boost_home / boost_away.max(BOOST_FLOOR),
        boost_away / boost_home.max(BOOST_FLOOR),
    )
}

fn rank_boost(percentile: f64) -> f64 {
    RANK_BOOST_BASE + RANK_BOOST_SPAN * percentile.clamp(0.0, 1.0).powf(RANK_BOOST_EXP)
}

pub fn elo_multiplier(rating_home: f64, rating_away: f64) -> f64 {
    ((rating_home - rating_away) / ELO_SCALE)
        .exp()
        .clamp(ELO_MULT_MIN, ELO_MULT_MAX)
}

/// Shared goal mean, held below half of the weaker side's intensity so both
/// independent parts stay positive.
pub fn shared_component(lambda_home: f64, lambda_away: f64, pace: f64) -> f64 {
    let low = lambda_home.min(lambda_away).max(0.0);
    (KAPPA_SHARE * low * pace).clamp(0.0, KAPPA_CAP * low)
}
