//! On-disk layout of raw captures:
//! `raw_data/<resource>/<YYYYMMDD_HHMMSSZ>/<canonical params>__p<page>.json`.
//!
//! Folders are append-only. Every fetch of a resource lands in a folder named
//! after its run timestamp; several requests of one run can share a folder.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{Result, SyncError};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%SZ";
pub const NO_PARAMS_STEM: &str = "no_params";
const JSON_EXT: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunTimestamp(NaiveDateTime);

impl RunTimestamp {
    pub fn now() -> Self {
        Self::from_naive(Utc::now().naive_utc())
    }

    /// Truncates to whole seconds, the precision of folder names.
    pub fn from_naive(at: NaiveDateTime) -> Self {
        let secs = at.and_utc().timestamp();
        let truncated = chrono::DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(at);
        Self(truncated)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .ok()
            .map(Self)
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

/// Query parameters kept sorted by key so that the query string and the file
/// name do not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn file_stem(&self) -> String {
        if self.is_empty() {
            return NO_PARAMS_STEM.to_string();
        }
        self.canonical().replace('=', "_").replace('&', "__")
    }

    /// Canonical query plus the page selector for paginated endpoints.
    pub fn paged_query(&self, page: u32) -> String {
        let base = self.canonical();
        if base.is_empty() {
            format!("page={page}")
        } else {
            format!("{base}&page={page}")
        }
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

pub fn page_file_name(params: &QueryParams, page: u32) -> String {
    format!("{}__p{page}.{JSON_EXT}", params.file_stem())
}

/// Inverse of [`page_file_name`]: `("fixture_7", 2)` for `fixture_7__p2.json`.
/// Names without a page suffix count as page 1 of a stem equal to the name.
pub fn split_page_file_name(name: &str) -> (&str, u32) {
    let parsed = name
        .strip_suffix(JSON_EXT)
        .and_then(|rest| rest.strip_suffix('.'))
        .and_then(|rest| rest.rsplit_once("__p"))
        .and_then(|(stem, page)| page.parse::<u32>().ok().map(|page| (stem, page)));
    parsed.unwrap_or((name, 1))
}

#[derive(Debug, Clone)]
pub struct RawStore {
    root: PathBuf,
}

impl RawStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn capture_folder(&self, resource: &str, run: RunTimestamp) -> PathBuf {
        let mut path = self.root.clone();
        for segment in resource.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(run.to_string());
        path
    }

    pub fn ensure_capture_folder(&self, resource: &str, run: RunTimestamp) -> Result<PathBuf> {
        let folder = self.capture_folder(resource, run);
        fs::create_dir_all(&folder).map_err(|e| SyncError::io(&folder, e))?;
        Ok(folder)
    }

    pub fn page_path(
        &self,
        resource: &str,
        run: RunTimestamp,
        params: &QueryParams,
        page: u32,
    ) -> PathBuf {
        self.capture_folder(resource, run)
            .join(page_file_name(params, page))
    }

    /// Writes the response body pretty-printed, verbatim otherwise.
    pub fn write_page(&self, path: &Path, body: &Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(body)?;
        fs::write(path, json).map_err(|e| SyncError::io(path, e))?;
        Ok(())
    }
}

pub fn is_capture_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(JSON_EXT)
}
