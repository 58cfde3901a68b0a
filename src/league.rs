use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, bail, ensure};

use crate::elo::{self, BASE_RATING, EloConfig};
use crate::league_params::{self, LeagueBaselines, TeamAverages};
use crate::match_table::{HistoricalMatch, MatchTable};
use crate::names::{self, normalize_team_name};
use crate::standings::{self, MIN_TABLE_SIZE, StandingsRow};

/// Read-only snapshot of everything the model needs about one league.
///
/// Built once per data refresh and shared by reference; nothing in the
/// engine mutates it.
#[derive(Debug, Clone)]
pub struct LeagueContext {
    pub matches: Vec<HistoricalMatch>,
    pub teams: Vec<String>,
    pub has_shots: bool,
    pub has_corners: bool,
    pub baselines: LeagueBaselines,
    /// Normalized standings name to table position (1 = top).
    pub rank_lookup: HashMap<String, u32>,
    pub table_size: u32,
    /// Match-table name to standings name.
    pub name_map: HashMap<String, String>,
    pub team_averages: HashMap<String, TeamAverages>,
    pub ratings: HashMap<String, f64>,
}

impl LeagueContext {
    /// Derives every league-level signal from the raw inputs.
    ///
    /// `aliases` maps a normalized match-table name to a standings name and
    /// only matters when `standings` is given.
    pub fn from_table(
        table: MatchTable,
        standings: Option<&[StandingsRow]>,
        aliases: &HashMap<String, String>,
    ) -> Result<Self> {
        let MatchTable {
            matches,
            has_shots,
            has_corners,
        } = table;

        let teams: Vec<String> = matches
            .iter()
            .flat_map(|m| [m.home_team.clone(), m.away_team.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let baselines = league_params::compute_league_baselines(&matches);
        let team_averages = league_params::compute_team_averages(&matches, &teams, &baselines);
        let ratings = elo::build_skill_ratings(&matches, &teams, EloConfig::default());

        let standings = standings.filter(|rows| !rows.is_empty());
        let (rank_lookup, table_size, name_map) = match standings {
            Some(rows) => {
                let (lookup, size) = standings::rank_lookup(rows);
                let api_names: Vec<&str> = rows.iter().map(|r| r.team.as_str()).collect();
                (lookup, size, names::build_name_map(&teams, &api_names, aliases))
            }
            None => (
                HashMap::new(),
                MIN_TABLE_SIZE,
                teams.iter().map(|t| (t.clone(), t.clone())).collect(),
            ),
        };

        let ctx = Self {
            matches,
            teams,
            has_shots,
            has_corners,
            baselines,
            rank_lookup,
            table_size,
            name_map,
            team_averages,
            ratings,
        };
        ctx.validate()?;

        log::info!(
            "league context: {} matches, {} teams, ranked={}, shots={}, corners={}, hfa={:.3}",
            ctx.matches.len(),
            ctx.teams.len(),
            ctx.has_table(),
            ctx.has_shots,
            ctx.has_corners,
            ctx.baselines.home_field_advantage,
        );
        Ok(ctx)
    }

    /// Checks the invariants the model divides by or scales with.
    pub fn validate(&self) -> Result<()> {
        let b = &self.baselines;
        ensure!(
            b.avg_home_goals.is_finite() && b.avg_home_goals > 0.0,
            "league average home goals must be positive, got {}",
            b.avg_home_goals
        );
        ensure!(
            b.avg_away_goals.is_finite() && b.avg_away_goals > 0.0,
            "league average away goals must be positive, got {}",
            b.avg_away_goals
        );
        ensure!(
            b.home_field_advantage.is_finite() && b.home_field_advantage > 0.0,
            "home-field coefficient must be positive, got {}",
            b.home_field_advantage
        );
        if self.has_table() && self.table_size == 0 {
            bail!("rank lookup has {} entries but table size is 0", self.rank_lookup.len());
        }
        if let Some((team, rank)) = self
            .rank_lookup
            .iter()
            .find(|(_, r)| **r == 0 || **r > self.table_size)
        {
            bail!("rank {rank} for {team} is outside 1..={}", self.table_size);
        }
        if let Some((team, r)) = self.ratings.iter().find(|(_, r)| !r.is_finite()) {
            bail!("skill rating for {team} is not finite: {r}");
        }
        Ok(())
    }

    pub fn has_table(&self) -> bool {
        !self.rank_lookup.is_empty()
    }

    pub fn knows_team(&self, team: &str) -> bool {
        self.teams.iter().any(|t| t == team)
    }

    pub fn rating(&self, team: &str) -> f64 {
        self.ratings.get(team).copied().unwrap_or(BASE_RATING)
    }

    pub fn averages_for(&self, team: &str) -> TeamAverages {
        let mid = self.baselines.mid_point();
        self.team_averages.get(team).copied().unwrap_or(TeamAverages {
            scored_avg: mid,
            conceded_avg: mid,
        })
    }

    /// Table position after resolving the team through the name map.
    pub fn rank_of(&self, team: &str) -> Option<u32> {
        let resolved = self.name_map.get(team).map(String::as_str).unwrap_or(team);
        self.rank_lookup
            .get(&normalize_team_name(resolved))
            .copied()
            .filter(|r| *r >= 1)
    }
}
