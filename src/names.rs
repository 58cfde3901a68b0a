use std::collections::HashMap;

/// Canonical key for matching team names across data sources.
///
/// Trims, lowercases, drops `.`, turns `-` into a space and `&` into `and`.
/// External rank tables are keyed by this exact form, so the steps and their
/// order must not change.
pub fn normalize_team_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace('.', "")
        .replace('-', " ")
        .replace('&', "and")
}

/// Maps every known team to the name the standings table uses for it.
///
/// `aliases` is keyed by normalized match-table name and points at a
/// standings name (in any spelling). Teams that cannot be matched map to
/// themselves.
pub fn build_name_map<S: AsRef<str>>(
    teams: &[String],
    standings_names: &[S],
    aliases: &HashMap<String, String>,
) -> HashMap<String, String> {
    let api_names: HashMap<String, &str> = standings_names
        .iter()
        .map(|n| (normalize_team_name(n.as_ref()), n.as_ref()))
        .collect();

    let mut out = HashMap::with_capacity(teams.len());
    for team in teams {
        let key = normalize_team_name(team);
        let via_alias = aliases
            .get(&key)
            .and_then(|target| api_names.get(&normalize_team_name(target)));
        let resolved = match via_alias.or_else(|| api_names.get(&key)) {
            Some(name) => (*name).to_string(),
            None => team.clone(),
        };
        out.insert(team.clone(), resolved);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_matches_lookup_convention() {
        assert_eq!(normalize_team_name("  Brighton & Hove Albion "), "brighton and hove albion");
        assert_eq!(normalize_team_name("St. Etienne"), "st etienne");
        assert_eq!(normalize_team_name("Paris Saint-Germain"), "paris saint germain");
        assert_eq!(normalize_team_name("A.F.C. Bournemouth"), "afc bournemouth");
    }

    #[test]
    fn name_map_prefers_alias_then_direct_match() {
        let teams = vec![
            "Man United".to_string(),
            "Arsenal".to_string(),
            "Nowhere Town".to_string(),
        ];
        let standings = ["Manchester United FC", "arsenal"];
        let mut aliases = HashMap::new();
        aliases.insert("man united".to_string(), "Manchester United FC".to_string());

        let map = build_name_map(&teams, &standings, &aliases);
        assert_eq!(map["Man United"], "Manchester United FC");
        assert_eq!(map["Arsenal"], "arsenal");
        assert_eq!(map["Nowhere Town"], "Nowhere Town");
    }

    #[test]
    fn alias_to_unknown_standings_name_falls_back() {
        let teams = vec!["Spurs".to_string()];
        let standings = ["spurs"];
        let mut aliases = HashMap::new();
        aliases.insert("spurs".to_string(), "Tottenham Hotspur FC".to_string());

        let map = build_name_map(&teams, &standings, &aliases);
        assert_eq!(map["Spurs"], "spurs");
    }
}
