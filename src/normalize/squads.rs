use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::normalize::fold_captures;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub position: String,
}

pub type PlayersDataset = BTreeMap<u64, PlayerRecord>;

#[derive(Debug, Deserialize)]
struct SquadsPage {
    #[serde(default)]
    response: Vec<Squad>,
}

#[derive(Debug, Deserialize)]
struct Squad {
    #[serde(default)]
    players: Vec<SquadPlayer>,
}

#[derive(Debug, Deserialize)]
struct SquadPlayer {
    id: u64,
    name: String,
    position: String,
}

pub fn parse_squads_page(raw: &str) -> Result<PlayersDataset> {
    let page: SquadsPage = serde_json::from_str(raw)?;
    let out = page
        .response
        .into_iter()
        .flat_map(|squad| squad.players)
        .map(|p| {
            (
                p.id,
                PlayerRecord {
                    name: p.name,
                    position: p.position.to_lowercase(),
                },
            )
        })
        .collect();
    Ok(out)
}

pub fn normalize_squads(paths: &[PathBuf]) -> Result<PlayersDataset> {
    fold_captures(paths, "players", |out: &mut PlayersDataset, raw| {
        out.extend(parse_squads_page(raw)?);
        Ok(())
    })
}
