use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::normalize::{flexible_id, fold_capture_pages};

const GOAL_TYPE: &str = "Goal";
const SCORING_DETAILS: &[&str] = &["normal goal", "own goal", "penalty"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalEvent {
    pub team: u64,
    pub player_id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
}

/// Fixture id to its scoring events; fixtures without goals map to `[]`.
pub type EventsDataset = BTreeMap<u64, Vec<GoalEvent>>;

#[derive(Debug, Deserialize)]
struct EventsPage {
    parameters: EventsParameters,
    #[serde(default)]
    response: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventsParameters {
    #[serde(deserialize_with = "flexible_id")]
    fixture: u64,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(rename = "type")]
    kind: String,
    detail: Option<String>,
    team: TeamRef,
    #[serde(default)]
    player: Option<PlayerRef>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct PlayerRef {
    id: Option<u64>,
}

/// Only scored goals count: missed penalties and disallowed goals are
/// also typed "Goal" upstream and are dropped here.
pub fn scoring_detail(kind: &str, detail: Option<&str>) -> Option<String> {
    if kind != GOAL_TYPE {
        return None;
    }
    let detail = detail?.trim().to_lowercase();
    SCORING_DETAILS.contains(&detail.as_str()).then_some(detail)
}

/// One page holds the events of a single fixture.
pub fn parse_events_page(raw: &str) -> Result<(u64, Vec<GoalEvent>)> {
    let page: EventsPage = serde_json::from_str(raw)?;
    let goals = page
        .response
        .into_iter()
        .filter_map(|event| {
            let detail = scoring_detail(&event.kind, event.detail.as_deref())?;
            Some(GoalEvent {
                team: event.team.id,
                player_id: event.player.and_then(|p| p.id),
                kind: "goal".to_string(),
                detail,
            })
        })
        .collect();
    Ok((page.parameters.fixture, goals))
}

/// Page 1 of a fixture's capture replaces its goal list; later pages of the
/// same capture extend it.
pub fn normalize_events(paths: &[PathBuf]) -> Result<EventsDataset> {
    fold_capture_pages(paths, "events", |out: &mut EventsDataset, page, raw| {
        let (fixture, goals) = parse_events_page(raw)?;
        if page <= 1 {
            out.insert(fixture, goals);
        } else {
            out.entry(fixture).or_default().extend(goals);
        }
        Ok(())
    })
}
