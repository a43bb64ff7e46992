#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use apifootball_sync::Settings;
use apifootball_sync::error::{Result, SyncError};
use apifootball_sync::transport::{ApiReply, ApiTransport};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn test_settings(project_dir: &Path) -> Settings {
    let mut settings = Settings::new(project_dir);
    settings.api_key = Some("test-key".to_string());
    settings.request_delay = Duration::ZERO;
    settings
}

pub fn quota_body(limit_day: u64, current: u64) -> String {
    format!(
        r#"{{"get":"status","errors":[],"response":{{"requests":{{"current":{current},"limit_day":{limit_day}}}}}}}"#
    )
}

pub fn paged_body(current: u32, total: u32, marker: &str) -> String {
    format!(
        r#"{{"errors":[],"paging":{{"current":{current},"total":{total}}},"response":[{{"marker":"{marker}"}}]}}"#
    )
}

/// Answers `status` from a queue of `(limit_day, current)` pairs (plenty of
/// quota once the queue is empty) and everything else from a queue of
/// replies, recording every call.
#[derive(Default)]
pub struct ScriptedTransport {
    quota: RefCell<VecDeque<(u64, u64)>>,
    replies: RefCell<VecDeque<ApiReply>>,
    calls: RefCell<Vec<(String, String)>>,
    timeline: RefCell<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(self, limit_day: u64, current: u64) -> Self {
        self.quota.borrow_mut().push_back((limit_day, current));
        self
    }

    pub fn with_reply(self, body: impl Into<String>) -> Self {
        self.replies.borrow_mut().push_back(ApiReply::ok(body));
        self
    }

    pub fn with_status_reply(self, status: u16, body: impl Into<String>) -> Self {
        self.replies.borrow_mut().push_back(ApiReply {
            status,
            body: body.into(),
        });
        self
    }

    pub fn data_calls(&self) -> Vec<(String, String)> {
        self.calls
            .borrow()
            .iter()
            .filter(|(endpoint, _)| endpoint != "status")
            .cloned()
            .collect()
    }

    /// Endpoint and arrival time of every call, in order.
    pub fn timeline(&self) -> Vec<(String, Instant)> {
        self.timeline.borrow().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(endpoint, _)| endpoint == "status")
            .count()
    }
}

impl ApiTransport for ScriptedTransport {
    fn get(&self, endpoint: &str, query: &str) -> Result<ApiReply> {
        self.calls
            .borrow_mut()
            .push((endpoint.to_string(), query.to_string()));
        self.timeline
            .borrow_mut()
            .push((endpoint.to_string(), Instant::now()));
        if endpoint == "status" {
            let (limit, current) = self.quota.borrow_mut().pop_front().unwrap_or((100, 0));
            return Ok(ApiReply::ok(quota_body(limit, current)));
        }
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| SyncError::MissingInput(format!("no scripted reply for {endpoint}")))
    }
}

pub fn write_capture(root: &Path, identifier: &str, folder: &str, file: &str, body: &str) -> PathBuf {
    let mut dir = root.to_path_buf();
    for part in identifier.split('/') {
        dir.push(part);
    }
    dir.push(folder);
    fs::create_dir_all(&dir).expect("create capture folder");
    let path = dir.join(file);
    fs::write(&path, body).expect("write capture");
    path
}
