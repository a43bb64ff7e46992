use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::normalize::fold_captures;

/// The upstream has no code for "World". AA is an ISO 3166-1 user-assigned
/// code, so it can never clash with a real country.
pub const WORLD_COUNTRY_NAME: &str = "World";
pub const WORLD_COUNTRY_CODE: &str = "AA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueRecord {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaguesAndCountries {
    pub countries: BTreeMap<String, CountryRecord>,
    pub leagues: BTreeMap<u64, LeagueRecord>,
}

impl LeaguesAndCountries {
    pub fn merge(&mut self, other: LeaguesAndCountries) {
        self.countries.extend(other.countries);
        self.leagues.extend(other.leagues);
    }
}

#[derive(Debug, Deserialize)]
struct LeaguesPage {
    #[serde(default)]
    response: Vec<LeagueItem>,
}

#[derive(Debug, Deserialize)]
struct LeagueItem {
    league: LeagueInfo,
    country: CountryInfo,
}

#[derive(Debug, Deserialize)]
struct LeagueInfo {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CountryInfo {
    name: String,
    code: Option<String>,
}

pub fn country_code(name: &str, code: Option<&str>) -> Option<String> {
    if name == WORLD_COUNTRY_NAME {
        return Some(WORLD_COUNTRY_CODE.to_string());
    }
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

pub fn parse_leagues_page(raw: &str) -> Result<LeaguesAndCountries> {
    let page: LeaguesPage = serde_json::from_str(raw)?;
    let mut out = LeaguesAndCountries::default();
    for item in page.response {
        let Some(code) = country_code(&item.country.name, item.country.code.as_deref()) else {
            return Err(SyncError::malformed(
                PathBuf::new(),
                format!(
                    "league {} belongs to country {:?} without a code",
                    item.league.id, item.country.name
                ),
            ));
        };
        out.countries.insert(
            code.clone(),
            CountryRecord {
                name: item.country.name,
            },
        );
        out.leagues.insert(
            item.league.id,
            LeagueRecord {
                name: item.league.name,
                country: code,
            },
        );
    }
    Ok(out)
}

pub fn normalize_leagues(paths: &[PathBuf]) -> Result<LeaguesAndCountries> {
    fold_captures(paths, "leagues", |out: &mut LeaguesAndCountries, raw| {
        out.merge(parse_leagues_page(raw)?);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::{WORLD_COUNTRY_CODE, country_code, parse_leagues_page};
    use crate::error::SyncError;

    #[test]
    fn world_maps_to_reserved_code() {
        assert_eq!(country_code("World", None).as_deref(), Some(WORLD_COUNTRY_CODE));
        assert_eq!(country_code("Spain", Some("ES")).as_deref(), Some("ES"));
        assert_eq!(country_code("Atlantis", None), None);
    }

    #[test]
    fn leagues_store_owning_country_code() {
        let raw = r#"{
            "response": [
                {"league": {"id": 140, "name": "La Liga"}, "country": {"name": "Spain", "code": "ES"}},
                {"league": {"id": 2, "name": "UEFA Champions League"}, "country": {"name": "World", "code": null}}
            ]
        }"#;
        let data = parse_leagues_page(raw).expect("page parses");
        assert_eq!(data.leagues[&140].country, "ES");
        assert_eq!(data.leagues[&2].country, "AA");
        assert_eq!(data.countries["AA"].name, "World");
        assert_eq!(data.countries.len(), 2);
    }

    #[test]
    fn missing_country_code_is_malformed() {
        let raw = r#"{"response": [{"league": {"id": 9, "name": "X"}, "country": {"name": "Nowhere", "code": null}}]}"#;
        assert!(matches!(
            parse_leagues_page(raw),
            Err(SyncError::Malformed { .. })
        ));
    }
}
