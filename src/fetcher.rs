//! Paginated fetcher for a single logical resource request.
//!
//! Pages are fetched strictly one at a time. Every page is preceded by a
//! fresh quota check and a fixed delay; the upstream caps connections per
//! minute and requests per day, and pacing is the whole mitigation.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::capture::{QueryParams, RawStore, RunTimestamp};
use crate::error::{Result, SyncError};
use crate::quota::QuotaGate;
use crate::settings::Settings;
use crate::transport::ApiTransport;

pub const LEAGUES_ENDPOINT: &str = "leagues";
pub const FIXTURES_ENDPOINT: &str = "fixtures";
pub const EVENTS_ENDPOINT: &str = "fixtures/events";
pub const SQUADS_ENDPOINT: &str = "players/squads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub endpoint: String,
    pub params: QueryParams,
    /// Whether the endpoint understands `page=`; when false exactly one
    /// request is made.
    pub paginated: bool,
}

impl ResourceRequest {
    pub fn new(endpoint: impl Into<String>, params: QueryParams, paginated: bool) -> Self {
        Self {
            endpoint: endpoint.into(),
            params,
            paginated,
        }
    }

    pub fn leagues() -> Self {
        Self::new(LEAGUES_ENDPOINT, QueryParams::new(), false)
    }

    pub fn season_fixtures(league_id: u32, season: u32) -> Self {
        let params = QueryParams::new()
            .with("league", league_id)
            .with("season", season);
        Self::new(FIXTURES_ENDPOINT, params, true)
    }

    pub fn fixture_events(fixture_id: u64) -> Self {
        Self::new(
            EVENTS_ENDPOINT,
            QueryParams::new().with("fixture", fixture_id),
            true,
        )
    }

    pub fn team_squad(team_id: u32) -> Self {
        Self::new(
            SQUADS_ENDPOINT,
            QueryParams::new().with("team", team_id),
            true,
        )
    }

    fn query_for(&self, page: u32) -> String {
        if self.paginated {
            self.params.paged_query(page)
        } else {
            self.params.canonical()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub request_delay: Duration,
    pub quota_floor: u64,
    pub bypass_quota_floor: bool,
}

impl FetchPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            request_delay: settings.request_delay,
            quota_floor: settings.quota_floor,
            bypass_quota_floor: settings.bypass_quota_floor,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_secs(crate::settings::DEFAULT_REQUEST_DELAY_SECS),
            quota_floor: crate::settings::DEFAULT_QUOTA_FLOOR,
            bypass_quota_floor: false,
        }
    }
}

#[derive(Debug)]
enum FetchState {
    BeforePage { page: u32 },
    AwaitingQuota { page: u32, dest: PathBuf },
    Fetching { page: u32, dest: PathBuf },
    Done,
    Failed(SyncError),
}

pub struct Fetcher<T> {
    transport: T,
    store: RawStore,
    policy: FetchPolicy,
}

impl<T: ApiTransport> Fetcher<T> {
    pub fn new(transport: T, store: RawStore, policy: FetchPolicy) -> Self {
        Self {
            transport,
            store,
            policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &RawStore {
        &self.store
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches every page of `request` into one capture folder and returns
    /// the written paths in page order. Any failure aborts the whole request;
    /// a partial list is never returned.
    ///
    /// Pages written before the failure stay on disk: the raw store is
    /// append-only. A later refresh resolves newest captures per file name,
    /// so those pages win over the same pages of older runs while the
    /// missing ones still come from the older run. Re-run the request to get
    /// a complete capture.
    pub fn fetch(
        &self,
        request: &ResourceRequest,
        run: Option<RunTimestamp>,
    ) -> Result<Vec<PathBuf>> {
        let run = run.unwrap_or_else(RunTimestamp::now);
        self.store.ensure_capture_folder(&request.endpoint, run)?;

        let mut written = Vec::new();
        let mut state = FetchState::BeforePage { page: 1 };
        loop {
            state = match state {
                FetchState::Done => return Ok(written),
                FetchState::Failed(err) => return Err(err),
                FetchState::BeforePage { page } => {
                    let dest = self
                        .store
                        .page_path(&request.endpoint, run, &request.params, page);
                    FetchState::AwaitingQuota { page, dest }
                }
                FetchState::AwaitingQuota { page, dest } => match self.await_quota() {
                    Ok(()) => FetchState::Fetching { page, dest },
                    Err(err) => FetchState::Failed(err),
                },
                FetchState::Fetching { page, dest } => {
                    match self.fetch_page(request, page, &dest) {
                        Ok(next) => {
                            written.push(dest);
                            next
                        }
                        Err(err) => FetchState::Failed(err),
                    }
                }
            };
        }
    }

    fn await_quota(&self) -> Result<()> {
        let quota = QuotaGate::check(&self.transport)?;
        quota.admit(self.policy.quota_floor, self.policy.bypass_quota_floor)?;
        debug!(remaining = quota.remaining, "quota admitted");
        // Paces requests under the per-minute connection cap.
        if !self.policy.request_delay.is_zero() {
            thread::sleep(self.policy.request_delay);
        }
        Ok(())
    }

    fn fetch_page(
        &self,
        request: &ResourceRequest,
        page: u32,
        dest: &Path,
    ) -> Result<FetchState> {
        let query = request.query_for(page);
        info!(endpoint = %request.endpoint, %query, page, "fetching page");
        let reply = self.transport.get(&request.endpoint, &query)?;
        let context = format!("{}?{}", request.endpoint, query);
        let body = reply.into_checked_json(&context)?;
        self.store.write_page(dest, &body)?;

        if !request.paginated {
            return Ok(FetchState::Done);
        }
        let (current, total) = read_paging(&body, dest)?;
        if u64::from(page) != current {
            return Err(SyncError::malformed(
                dest,
                format!("asked for page {page} but upstream answered page {current}"),
            ));
        }
        if current >= total {
            Ok(FetchState::Done)
        } else {
            Ok(FetchState::BeforePage { page: page + 1 })
        }
    }
}

fn read_paging(body: &Value, dest: &Path) -> Result<(u64, u64)> {
    let paging = body
        .get("paging")
        .ok_or_else(|| SyncError::malformed(dest, "paginated response without paging"))?;
    let current = paging.get("current").and_then(Value::as_u64);
    let total = paging.get("total").and_then(Value::as_u64);
    match (current, total) {
        (Some(current), Some(total)) => Ok((current, total)),
        _ => Err(SyncError::malformed(
            dest,
            "paging.current/paging.total missing or not numbers",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceRequest;

    #[test]
    fn non_paginated_query_has_no_page() {
        assert_eq!(ResourceRequest::leagues().query_for(1), "");
    }

    #[test]
    fn only_leagues_is_single_page() {
        assert!(!ResourceRequest::leagues().paginated);
        assert!(ResourceRequest::season_fixtures(39, 2022).paginated);
        assert!(ResourceRequest::team_squad(50).paginated);
    }

    #[test]
    fn paginated_query_appends_page() {
        let r = ResourceRequest::season_fixtures(39, 2022);
        assert_eq!(r.query_for(2), "league=39&season=2022&page=2");
        let e = ResourceRequest::fixture_events(215662);
        assert_eq!(e.query_for(1), "fixture=215662&page=1");
    }
}
