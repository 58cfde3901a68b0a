use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calibration::{Outcome, classify_outcome};

const COL_HOME: &str = "HomeTeam";
const COL_AWAY: &str = "AwayTeam";
const COL_HOME_GOALS: &str = "FTHG";
const COL_AWAY_GOALS: &str = "FTAG";
const COL_HOME_SHOTS: &str = "HS";
const COL_AWAY_SHOTS: &str = "AS";
const COL_HOME_CORNERS: &str = "HC";
const COL_AWAY_CORNERS: &str = "AC";
const COL_DATE: &str = "Date";

/// One finished fixture from the historical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMatch {
    pub home_team: String,
    pub away_team: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub home_shots: Option<u32>,
    pub away_shots: Option<u32>,
    pub home_corners: Option<u32>,
    pub away_corners: Option<u32>,
    pub date: Option<NaiveDate>,
}

impl HistoricalMatch {
    pub fn new(home_team: &str, away_team: &str, home_goals: u32, away_goals: u32) -> Self {
        Self {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals: Some(home_goals),
            away_goals: Some(away_goals),
            home_shots: None,
            away_shots: None,
            home_corners: None,
            away_corners: None,
            date: None,
        }
    }

    pub fn with_shots(mut self, home: u32, away: u32) -> Self {
        self.home_shots = Some(home);
        self.away_shots = Some(away);
        self
    }

    pub fn with_corners(mut self, home: u32, away: u32) -> Self {
        self.home_corners = Some(home);
        self.away_corners = Some(away);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn outcome(&self) -> Option<Outcome> {
        let (Some(home_goals), Some(away_goals)) = (self.home_goals, self.away_goals) else {
            return None;
        };
        Some(classify_outcome(home_goals, away_goals))
    }
}

/// Parsed match table plus which optional stat columns the source carried.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    pub matches: Vec<HistoricalMatch>,
    pub has_shots: bool,
    pub has_corners: bool,
}

impl MatchTable {
    /// Builds a table from in-memory records; stat columns count as present
    /// when any record carries them.
    pub fn from_matches(matches: Vec<HistoricalMatch>) -> Self {
        let has_shots = matches
            .iter()
            .any(|m| m.home_shots.is_some() || m.away_shots.is_some());
        let has_corners = matches
            .iter()
            .any(|m| m.home_corners.is_some() || m.away_corners.is_some());
        Self {
            matches,
            has_shots,
            has_corners,
        }
    }

    /// Prefix of the table, keeping the column flags. Used for walk-forward
    /// evaluation where only earlier rows may be seen.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            matches: self.matches[..len.min(self.matches.len())].to_vec(),
            has_shots: self.has_shots,
            has_corners: self.has_corners,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

pub fn load_match_table(path: &Path) -> Result<MatchTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open match table {}", path.display()))?;
    parse_match_table(file).with_context(|| format!("parse match table {}", path.display()))
}

/// Reads a football-data style CSV. Missing `HomeTeam`, `AwayTeam`, `FTHG`
/// or `FTAG` columns are a hard error; blank cells become `None`.
pub fn parse_match_table<R: Read>(reader: R) -> Result<MatchTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("read csv header")?.clone();
    let find = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| -> Result<usize> {
        match find(name) {
            Some(idx) => Ok(idx),
            None => bail!("missing column: {name}"),
        }
    };

    let home_idx = require(COL_HOME)?;
    let away_idx = require(COL_AWAY)?;
    let home_goals_idx = require(COL_HOME_GOALS)?;
    let away_goals_idx = require(COL_AWAY_GOALS)?;

    let shots = find(COL_HOME_SHOTS).zip(find(COL_AWAY_SHOTS));
    let corners = find(COL_HOME_CORNERS).zip(find(COL_AWAY_CORNERS));
    let date_idx = find(COL_DATE);

    let mut matches = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("read csv row {}", line + 2))?;
        let home_team = record.get(home_idx).unwrap_or_default();
        let away_team = record.get(away_idx).unwrap_or_default();
        if home_team.is_empty() || away_team.is_empty() {
            skipped += 1;
            continue;
        }

        let count = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(parse_count);
        matches.push(HistoricalMatch {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals: count(Some(home_goals_idx)),
            away_goals: count(Some(away_goals_idx)),
            home_shots: count(shots.map(|(h, _)| h)),
            away_shots: count(shots.map(|(_, a)| a)),
            home_corners: count(corners.map(|(h, _)| h)),
            away_corners: count(corners.map(|(_, a)| a)),
            date: date_idx.and_then(|i| record.get(i)).and_then(parse_match_date),
        });
    }

    if skipped > 0 {
        log::warn!("match table: skipped {skipped} rows without team names");
    }

    Ok(MatchTable {
        matches,
        has_shots: shots.is_some(),
        has_corners: corners.is_some(),
    })
}

fn parse_count(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    Some(v.round() as u32)
}

/// Accepts `dd/mm/yyyy`, `dd/mm/yy` and ISO `yyyy-mm-dd`.
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('-') {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    }
    let year_len = s.rsplit('/').next().map(str::len).unwrap_or(0);
    let fmt = if year_len == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
    NaiveDate::parse_from_str(s, fmt).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_optional_columns_and_blank_cells() {
        let raw = "Date,HomeTeam,AwayTeam,FTHG,FTAG,HS,AS\n\
                   12/08/23,Arsenal,Chelsea,2,1,14,9\n\
                   19/08/2023,Chelsea,Arsenal,,0,,7\n\
                   ,,,,,,\n";
        let table = parse_match_table(raw.as_bytes()).unwrap();
        assert!(table.has_shots);
        assert!(!table.has_corners);
        assert_eq!(table.len(), 2);

        let first = &table.matches[0];
        assert_eq!(first.home_goals, Some(2));
        assert_eq!(first.home_shots, Some(14));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 8, 12));
        assert_eq!(first.outcome(), Some(Outcome::Home));

        let second = &table.matches[1];
        assert_eq!(second.home_goals, None);
        assert_eq!(second.away_goals, Some(0));
        assert_eq!(second.home_shots, None);
        assert_eq!(second.outcome(), None);
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2023, 8, 19));
    }

    #[test]
    fn missing_goal_column_is_rejected() {
        let raw = "HomeTeam,AwayTeam,FTHG\nA,B,1\n";
        let err = parse_match_table(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("FTAG"));
    }

    #[test]
    fn shots_need_both_columns() {
        let raw = "HomeTeam,AwayTeam,FTHG,FTAG,HS,HC,AC\nA,B,1,1,10,4,3\n";
        let table = parse_match_table(raw.as_bytes()).unwrap();
        assert!(!table.has_shots);
        assert!(table.has_corners);
        assert_eq!(table.matches[0].home_shots, None);
        assert_eq!(table.matches[0].away_corners, Some(3));
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_match_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_match_date("01/03/24"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(parse_match_date("not a date").is_none());
    }

    #[test]
    fn truncated_keeps_flags() {
        let table = MatchTable {
            matches: vec![HistoricalMatch::new("A", "B", 1, 0); 3],
            has_shots: true,
            has_corners: false,
        };
        let head = table.truncated(2);
        assert_eq!(head.len(), 2);
        assert!(head.has_shots);
        assert_eq!(table.truncated(10).len(), 3);
    }
}
