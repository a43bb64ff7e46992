//! Download-then-normalize use cases, plus the convergence entry point that
//! rebuilds every dataset from the newest captures already on disk.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::capture::{RawStore, RunTimestamp};
use crate::dataset_store::{DatasetName, DatasetStore};
use crate::error::{Result, SyncError};
use crate::fetcher::{
    EVENTS_ENDPOINT, FIXTURES_ENDPOINT, FetchPolicy, Fetcher, LEAGUES_ENDPOINT, ResourceRequest,
    SQUADS_ENDPOINT,
};
use crate::normalize;
use crate::quota::{QuotaGate, QuotaStatus};
use crate::resolver;
use crate::settings::{Settings, dedup_ids};
use crate::transport::{ApiTransport, HttpTransport};

/// Which normalizer consumes a resource type's captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    LeaguesAndCountries,
    Matches,
    Players,
    Events,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Matches,
        DatasetKind::Events,
        DatasetKind::LeaguesAndCountries,
        DatasetKind::Players,
    ];

    /// Resource-type identifier in the raw store.
    pub fn identifier(self) -> &'static str {
        match self {
            DatasetKind::LeaguesAndCountries => LEAGUES_ENDPOINT,
            DatasetKind::Matches => FIXTURES_ENDPOINT,
            DatasetKind::Players => SQUADS_ENDPOINT,
            DatasetKind::Events => EVENTS_ENDPOINT,
        }
    }

    pub fn outputs(self) -> &'static [DatasetName] {
        match self {
            DatasetKind::LeaguesAndCountries => &[DatasetName::Countries, DatasetName::Leagues],
            DatasetKind::Matches => &[DatasetName::Matches],
            DatasetKind::Players => &[DatasetName::Players],
            DatasetKind::Events => &[DatasetName::Events],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDataset {
    pub name: DatasetName,
    pub path: PathBuf,
    pub records: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub captures: Vec<PathBuf>,
    pub datasets: Vec<WrittenDataset>,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshSummary {
    pub datasets: Vec<WrittenDataset>,
    pub captures_used: usize,
    /// Identifiers with no captures on disk.
    pub skipped: Vec<&'static str>,
}

/// Normalizes captures into the dataset store. Needs no network access.
#[derive(Debug, Clone)]
pub struct Converger {
    raw: RawStore,
    datasets: DatasetStore,
}

impl Converger {
    pub fn new(raw: RawStore, datasets: DatasetStore) -> Self {
        Self { raw, datasets }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            RawStore::new(settings.raw_data_dir()),
            DatasetStore::new(settings.newest_data_dir()),
        )
    }

    pub fn datasets(&self) -> &DatasetStore {
        &self.datasets
    }

    /// Rebuilds every dataset from the newest capture per file name, without
    /// touching the network. Resource types with no captures are skipped.
    pub fn refresh_from_latest(&self) -> Result<RefreshSummary> {
        let identifiers = DatasetKind::ALL
            .iter()
            .map(|k| k.identifier())
            .collect::<Vec<_>>();
        let mut groups = resolver::resolve_latest(self.raw.root(), &identifiers)?;

        let mut summary = RefreshSummary::default();
        for kind in DatasetKind::ALL {
            let paths = groups.remove(kind.identifier()).unwrap_or_default();
            if paths.is_empty() {
                warn!(identifier = kind.identifier(), "no captures on disk, dataset left as is");
                summary.skipped.push(kind.identifier());
                continue;
            }
            summary.captures_used += paths.len();
            summary.datasets.extend(self.write_dataset(kind, &paths)?);
        }
        info!(
            rebuilt = summary.datasets.len(),
            skipped = summary.skipped.len(),
            "refresh from latest captures complete"
        );
        Ok(summary)
    }

    /// Runs the normalizer for `kind` over `paths` and overwrites its
    /// dataset file(s).
    pub fn write_dataset(&self, kind: DatasetKind, paths: &[PathBuf]) -> Result<Vec<WrittenDataset>> {
        let written = match kind {
            DatasetKind::LeaguesAndCountries => {
                let data = normalize::normalize_leagues(paths)?;
                vec![
                    self.write_one(DatasetName::Countries, &data.countries, data.countries.len())?,
                    self.write_one(DatasetName::Leagues, &data.leagues, data.leagues.len())?,
                ]
            }
            DatasetKind::Matches => {
                let data = normalize::normalize_matches(paths)?;
                vec![self.write_one(DatasetName::Matches, &data, data.len())?]
            }
            DatasetKind::Players => {
                let data = normalize::normalize_squads(paths)?;
                vec![self.write_one(DatasetName::Players, &data, data.len())?]
            }
            DatasetKind::Events => {
                let data = normalize::normalize_events(paths)?;
                vec![self.write_one(DatasetName::Events, &data, data.len())?]
            }
        };
        Ok(written)
    }

    fn write_one<D: Serialize>(
        &self,
        name: DatasetName,
        data: &D,
        records: usize,
    ) -> Result<WrittenDataset> {
        let path = self.datasets.write(name, data)?;
        Ok(WrittenDataset {
            name,
            path,
            records,
        })
    }
}

pub struct Pipeline<T> {
    settings: Settings,
    fetcher: Fetcher<T>,
    converger: Converger,
}

impl Pipeline<HttpTransport> {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let transport = HttpTransport::from_settings(&settings)?;
        Ok(Self::new(settings, transport))
    }
}

impl<T: ApiTransport> Pipeline<T> {
    pub fn new(settings: Settings, transport: T) -> Self {
        let converger = Converger::from_settings(&settings);
        let store = RawStore::new(settings.raw_data_dir());
        let policy = FetchPolicy::from_settings(&settings);
        Self {
            fetcher: Fetcher::new(transport, store, policy),
            converger,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn converger(&self) -> &Converger {
        &self.converger
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    pub fn check_quota(&self) -> Result<QuotaStatus> {
        QuotaGate::check(self.fetcher.transport())
    }

    /// Once per season, or when a league or country we follow changes.
    pub fn sync_leagues(&self) -> Result<SyncSummary> {
        let captures = self.fetcher.fetch(&ResourceRequest::leagues(), None)?;
        self.normalize_captures(DatasetKind::LeaguesAndCountries, captures)
    }

    /// Fixtures of the current season for every active league, captured as
    /// one run.
    pub fn sync_season_matches(&self) -> Result<SyncSummary> {
        let leagues = dedup_ids(self.settings.active_leagues.clone());
        if leagues.is_empty() {
            return Err(SyncError::MissingInput(
                "no active leagues configured".to_string(),
            ));
        }
        let season = self.settings.current_season;
        let requests = leagues
            .iter()
            .map(|league_id| ResourceRequest::season_fixtures(*league_id, season))
            .collect::<Vec<_>>();
        let captures = self.fetch_run(&requests)?;
        self.normalize_captures(DatasetKind::Matches, captures)
    }

    pub fn sync_squads(&self, team_ids: &[u32]) -> Result<SyncSummary> {
        let team_ids = dedup_ids(team_ids.to_vec());
        if team_ids.is_empty() {
            return Err(SyncError::MissingInput("team ids not provided".to_string()));
        }
        let requests = team_ids
            .iter()
            .map(|team_id| ResourceRequest::team_squad(*team_id))
            .collect::<Vec<_>>();
        let captures = self.fetch_run(&requests)?;
        self.normalize_captures(DatasetKind::Players, captures)
    }

    /// Meant to run once the last match of a round has ended.
    pub fn sync_events(&self, fixture_ids: &[u64]) -> Result<SyncSummary> {
        let fixture_ids = dedup_ids(fixture_ids.to_vec());
        if fixture_ids.is_empty() {
            return Err(SyncError::MissingInput(
                "fixture ids not provided".to_string(),
            ));
        }
        let requests = fixture_ids
            .iter()
            .map(|fixture_id| ResourceRequest::fixture_events(*fixture_id))
            .collect::<Vec<_>>();
        let captures = self.fetch_run(&requests)?;
        self.normalize_captures(DatasetKind::Events, captures)
    }

    pub fn refresh_from_latest(&self) -> Result<RefreshSummary> {
        self.converger.refresh_from_latest()
    }

    fn fetch_run(&self, requests: &[ResourceRequest]) -> Result<Vec<PathBuf>> {
        let run = RunTimestamp::now();
        let mut captures = Vec::new();
        for request in requests {
            captures.extend(self.fetcher.fetch(request, Some(run))?);
        }
        Ok(captures)
    }

    fn normalize_captures(&self, kind: DatasetKind, captures: Vec<PathBuf>) -> Result<SyncSummary> {
        let datasets = self.converger.write_dataset(kind, &captures)?;
        Ok(SyncSummary { captures, datasets })
    }
}
