use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetName {
    Countries,
    Leagues,
    Matches,
    Players,
    Events,
}

impl DatasetName {
    pub const ALL: [DatasetName; 5] = [
        DatasetName::Countries,
        DatasetName::Leagues,
        DatasetName::Matches,
        DatasetName::Players,
        DatasetName::Events,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetName::Countries => "countries_data",
            DatasetName::Leagues => "leagues_data",
            DatasetName::Matches => "matches_data",
            DatasetName::Players => "players_data",
            DatasetName::Events => "events_data",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

/// The `newest_data` directory. Each dataset file is replaced wholesale.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: DatasetName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    pub fn write<T: Serialize>(&self, name: DatasetName, data: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| SyncError::io(&self.dir, e))?;
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&tmp, json).map_err(|e| SyncError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| SyncError::io(&path, e))?;
        info!(dataset = name.as_str(), path = %path.display(), "dataset written");
        Ok(path)
    }

    pub fn read<T: DeserializeOwned>(&self, name: DatasetName) -> Result<T> {
        let path = self.path_for(name);
        let raw = fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;
        serde_json::from_str(&raw).map_err(|e| SyncError::malformed(&path, e.to_string()))
    }
}
