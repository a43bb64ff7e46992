//! Turns raw capture pages into the compact "latest known" datasets.
//!
//! Every normalizer folds its input files in order into one fresh mapping;
//! records from later files replace earlier ones on identifier collision.
//! Nothing is patched incrementally.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::capture::split_page_file_name;
use crate::error::{Result, SyncError};

pub mod events;
pub mod leagues;
pub mod matches;
pub mod squads;

pub use events::{EventsDataset, GoalEvent, normalize_events, parse_events_page};
pub use leagues::{
    CountryRecord, LeagueRecord, LeaguesAndCountries, normalize_leagues, parse_leagues_page,
};
pub use matches::{MatchRecord, MatchStatus, MatchesDataset, normalize_matches, parse_fixtures_page};
pub use squads::{PlayerRecord, PlayersDataset, normalize_squads, parse_squads_page};

/// Reads `paths` in order and hands each body to `absorb`. Fails with
/// `MissingInput` when there is nothing to read.
pub(crate) fn fold_captures<T, F>(paths: &[PathBuf], what: &str, mut absorb: F) -> Result<T>
where
    T: Default,
    F: FnMut(&mut T, &str) -> Result<()>,
{
    if paths.is_empty() {
        return Err(SyncError::MissingInput(format!(
            "no capture files provided for {what}"
        )));
    }
    let mut out = T::default();
    for path in paths {
        let raw = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        absorb(&mut out, &raw).map_err(|err| attach_path(err, path))?;
    }
    Ok(out)
}

/// Like [`fold_captures`], but hands `absorb` the page number of each file
/// and visits the pages of one capture (same run folder and stem) together,
/// in numeric page order.
pub(crate) fn fold_capture_pages<T, F>(paths: &[PathBuf], what: &str, mut absorb: F) -> Result<T>
where
    T: Default,
    F: FnMut(&mut T, u32, &str) -> Result<()>,
{
    let mut ordered = paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (stem, page) = split_page_file_name(&name);
            ((path.parent().map(Path::to_path_buf), stem.to_string(), page), path.clone())
        })
        .collect::<Vec<_>>();
    ordered.sort_by(|(a, _), (b, _)| a.cmp(b));

    let pages = ordered.iter().map(|((_, _, page), _)| *page).collect::<Vec<_>>();
    let paths = ordered.into_iter().map(|(_, path)| path).collect::<Vec<_>>();
    let mut pages = pages.into_iter();
    fold_captures(&paths, what, |out: &mut T, raw| {
        absorb(out, pages.next().unwrap_or(1), raw)
    })
}

fn attach_path(err: SyncError, path: &Path) -> SyncError {
    match err {
        SyncError::Json(e) => SyncError::malformed(path, e.to_string()),
        SyncError::Malformed { path: p, message } if p.as_os_str().is_empty() => {
            SyncError::malformed(path, message)
        }
        other => other,
    }
}

/// The upstream is inconsistent about numeric ids: `parameters.fixture`
/// echoes the query string, so it arrives as `"215662"`.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| serde::de::Error::custom(format!("expected numeric id, got {value}")))
}
