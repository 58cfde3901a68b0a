use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::names::normalize_team_name;

/// Slots assumed for a league table when the standings are shorter or absent.
pub const MIN_TABLE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub rank: u32,
    pub team: String,
}

/// Reads the `TOTAL` table out of a football-data.org standings payload.
///
/// `null` or an empty body yields no rows, as does a payload without a
/// `TOTAL` table. Entries lacking a position or a team name are dropped.
pub fn parse_standings_json(raw: &str) -> Result<Vec<StandingsRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid standings json")?;

    let Some(total) = v
        .get("standings")
        .and_then(|s| s.as_array())
        .and_then(|arr| {
            arr.iter()
                .find(|s| s.get("type").and_then(|t| t.as_str()) == Some("TOTAL"))
        })
    else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    if let Some(table) = total.get("table").and_then(|t| t.as_array()) {
        for entry in table {
            let Some(rank) = entry.get("position").and_then(|p| p.as_u64()) else {
                continue;
            };
            let team = entry.get("team");
            let name = team
                .and_then(|t| t.get("name"))
                .and_then(|n| n.as_str())
                .filter(|n| !n.is_empty())
                .or_else(|| {
                    team.and_then(|t| t.get("shortName"))
                        .and_then(|n| n.as_str())
                        .filter(|n| !n.is_empty())
                });
            let Some(name) = name else {
                continue;
            };
            rows.push(StandingsRow {
                rank: rank as u32,
                team: name.to_string(),
            });
        }
    }

    rows.sort_by_key(|r| r.rank);
    Ok(rows)
}

/// Normalized team name to rank, plus the table size to scale percentiles by.
pub fn rank_lookup(rows: &[StandingsRow]) -> (HashMap<String, u32>, u32) {
    let lookup = rows
        .iter()
        .map(|r| (normalize_team_name(&r.team), r.rank))
        .collect();
    let table_size = rows
        .iter()
        .map(|r| r.rank)
        .max()
        .unwrap_or(0)
        .max(MIN_TABLE_SIZE);
    (lookup, table_size)
}
