//! Picks, for every resource type and file name, the capture from the newest
//! run folder in the raw store.
//!
//! A file `raw_data/fixtures/events/20230102_000000Z/fixture_7__p1.json`
//! belongs to identifier `fixtures/events` and competes only with other
//! `fixture_7__p1.json` files under the same identifier. The folder timestamp
//! is the sole ordering key: a strictly newer folder replaces the current
//! winner, and two different files at the same timestamp are a conflict.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::capture::{RunTimestamp, is_capture_file, split_page_file_name};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEntry {
    pub timestamp: RunTimestamp,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConflict {
    pub identifier: String,
    pub file_name: String,
    pub timestamp: RunTimestamp,
    pub first: PathBuf,
    pub second: PathBuf,
}

impl From<SnapshotConflict> for SyncError {
    fn from(c: SnapshotConflict) -> Self {
        SyncError::SnapshotConflict {
            identifier: c.identifier,
            file_name: c.file_name,
            timestamp: c.timestamp.to_string(),
            first: c.first,
            second: c.second,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Inserted,
    Replaced,
    Kept,
    Conflict,
}

type GroupKey = (String, String);

#[derive(Debug, Default)]
pub struct LatestSnapshotSet {
    groups: BTreeMap<String, BTreeMap<String, CaptureEntry>>,
    conflicts: BTreeMap<GroupKey, SnapshotConflict>,
}

impl LatestSnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(
        &mut self,
        identifier: &str,
        file_name: &str,
        timestamp: RunTimestamp,
        path: PathBuf,
    ) -> Offer {
        let files = self.groups.entry(identifier.to_string()).or_default();
        let Some(current) = files.get_mut(file_name) else {
            files.insert(file_name.to_string(), CaptureEntry { timestamp, path });
            return Offer::Inserted;
        };

        if timestamp > current.timestamp {
            *current = CaptureEntry { timestamp, path };
            // A conflict at an older timestamp no longer decides anything.
            self.conflicts
                .remove(&(identifier.to_string(), file_name.to_string()));
            return Offer::Replaced;
        }
        if timestamp < current.timestamp || path == current.path {
            return Offer::Kept;
        }

        let key = (identifier.to_string(), file_name.to_string());
        self.conflicts.entry(key).or_insert_with(|| SnapshotConflict {
            identifier: identifier.to_string(),
            file_name: file_name.to_string(),
            timestamp,
            first: current.path.clone(),
            second: path,
        });
        Offer::Conflict
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &SnapshotConflict> {
        self.conflicts.values()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn get(&self, identifier: &str, file_name: &str) -> Option<&CaptureEntry> {
        self.groups.get(identifier)?.get(file_name)
    }

    /// Winning paths for one identifier, ordered by stem then numeric page.
    pub fn latest(&self, identifier: &str) -> Vec<PathBuf> {
        self.groups
            .get(identifier)
            .map(|files| page_ordered(files.clone()))
            .unwrap_or_default()
    }

    /// Fails on the first unresolved same-timestamp conflict.
    pub fn into_groups(mut self) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        if let Some((_, conflict)) = self.conflicts.pop_first() {
            return Err(conflict.into());
        }
        Ok(self
            .groups
            .into_iter()
            .map(|(id, files)| (id, page_ordered(files)))
            .collect())
    }
}

// Text order would put `__p10` before `__p2`.
fn page_ordered(files: BTreeMap<String, CaptureEntry>) -> Vec<PathBuf> {
    let mut entries = files.into_iter().collect::<Vec<_>>();
    entries.sort_by(|(a, _), (b, _)| split_page_file_name(a).cmp(&split_page_file_name(b)));
    entries.into_iter().map(|(_, e)| e.path).collect()
}

/// Where a capture file sits in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureLocation {
    pub identifier: String,
    pub timestamp: RunTimestamp,
    pub file_name: String,
}

/// Splits `<root>/<identifier...>/<timestamp>/<file>.json`. The run folder
/// is found by its timestamp format and must be the file's direct parent.
pub fn locate_capture(root: &Path, path: &Path) -> Option<CaptureLocation> {
    if !is_capture_file(path) {
        return None;
    }
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let folder_idx = parts.iter().position(|p| RunTimestamp::parse(p).is_some())?;
    if folder_idx == 0 || folder_idx + 2 != parts.len() {
        return None;
    }
    Some(CaptureLocation {
        identifier: parts[..folder_idx].join("/"),
        timestamp: RunTimestamp::parse(parts[folder_idx])?,
        file_name: parts[folder_idx + 1].to_string(),
    })
}

/// Scans the whole store. An empty `identifiers` slice keeps everything.
pub fn scan_latest(root: &Path, identifiers: &[&str]) -> Result<LatestSnapshotSet> {
    let mut set = LatestSnapshotSet::new();
    if !root.exists() {
        debug!(root = %root.display(), "raw store does not exist yet");
        return Ok(set);
    }

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    for path in files {
        let Some(loc) = locate_capture(root, &path) else {
            debug!(path = %path.display(), "not a capture file, skipping");
            continue;
        };
        if !identifiers.is_empty() && !identifiers.contains(&loc.identifier.as_str()) {
            continue;
        }
        let outcome = set.offer(&loc.identifier, &loc.file_name, loc.timestamp, path);
        debug!(
            identifier = %loc.identifier,
            file = %loc.file_name,
            timestamp = %loc.timestamp,
            ?outcome,
            "capture offered"
        );
    }
    Ok(set)
}

/// `identifier -> newest capture paths`, failing on timestamp conflicts.
pub fn resolve_latest(root: &Path, identifiers: &[&str]) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    scan_latest(root, identifiers)?.into_groups()
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    for path in paths {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
