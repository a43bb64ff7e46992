use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::normalize::fold_captures;

const END_CODES: &[&str] = &["FT", "AET", "PEN"];
const NOTEND_CODES: &[&str] = &["TBD", "NS", "1H", "HT", "2H", "ET", "P", "BT", "PST", "LIVE"];
const INVALID_CODES: &[&str] = &["SUSP", "INT", "CANC", "ABD", "AWD", "WO"];

/// Upstream fixture statuses collapsed to three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    End,
    NotEnd,
    Invalid,
}

impl MatchStatus {
    /// `None` for a code outside the three known lists. A null code is
    /// `Invalid`.
    pub fn from_short(code: Option<&str>) -> Option<Self> {
        let Some(code) = code else {
            return Some(MatchStatus::Invalid);
        };
        if END_CODES.contains(&code) {
            Some(MatchStatus::End)
        } else if NOTEND_CODES.contains(&code) {
            Some(MatchStatus::NotEnd)
        } else if INVALID_CODES.contains(&code) {
            Some(MatchStatus::Invalid)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: String,
    pub status: MatchStatus,
    pub home_team_external_id: u64,
    pub home_team_external_name: String,
    pub away_team_external_id: u64,
    pub away_team_external_name: String,
    pub league_id: u64,
}

pub type MatchesDataset = BTreeMap<u64, MatchRecord>;

#[derive(Debug, Deserialize)]
struct FixturesPage {
    #[serde(default)]
    response: Vec<FixtureItem>,
}

#[derive(Debug, Deserialize)]
struct FixtureItem {
    fixture: FixtureInfo,
    league: LeagueRef,
    teams: Teams,
}

#[derive(Debug, Deserialize)]
struct FixtureInfo {
    id: u64,
    date: String,
    status: FixtureStatus,
}

#[derive(Debug, Deserialize)]
struct FixtureStatus {
    short: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeagueRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Teams {
    home: TeamRef,
    away: TeamRef,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: u64,
    name: String,
}

/// Calendar date of the kickoff in the offset the upstream reported it in.
pub fn kickoff_date(raw: &str) -> Option<String> {
    let dt = DateTime::parse_from_rfc3339(raw.trim()).ok()?;
    Some(dt.date_naive().format("%Y-%m-%d").to_string())
}

pub fn parse_fixtures_page(raw: &str) -> Result<MatchesDataset> {
    let page: FixturesPage = serde_json::from_str(raw)?;
    let mut out = MatchesDataset::new();
    for item in page.response {
        let id = item.fixture.id;
        let short = item.fixture.status.short.as_deref();
        let Some(status) = MatchStatus::from_short(short) else {
            return Err(SyncError::UnknownMatchStatus {
                fixture_id: id,
                status: short.unwrap_or_default().to_string(),
            });
        };
        let Some(date) = kickoff_date(&item.fixture.date) else {
            return Err(SyncError::malformed(
                PathBuf::new(),
                format!("fixture {id} has unparseable date {:?}", item.fixture.date),
            ));
        };
        out.insert(
            id,
            MatchRecord {
                date,
                status,
                home_team_external_id: item.teams.home.id,
                home_team_external_name: item.teams.home.name,
                away_team_external_id: item.teams.away.id,
                away_team_external_name: item.teams.away.name,
                league_id: item.league.id,
            },
        );
    }
    Ok(out)
}

pub fn normalize_matches(paths: &[PathBuf]) -> Result<MatchesDataset> {
    fold_captures(paths, "matches", |out: &mut MatchesDataset, raw| {
        out.extend(parse_fixtures_page(raw)?);
        Ok(())
    })
}
