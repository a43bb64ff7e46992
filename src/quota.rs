use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SyncError};
use crate::transport::ApiTransport;

pub const STATUS_ENDPOINT: &str = "status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub daily_limit: u64,
    pub used: u64,
    pub remaining: u64,
}

impl QuotaStatus {
    pub fn new(daily_limit: u64, used: u64) -> Self {
        Self {
            daily_limit,
            used,
            remaining: daily_limit.saturating_sub(used),
        }
    }

    /// Zero remaining always fails; at or under the floor fails unless the
    /// caller explicitly bypasses it.
    pub fn admit(&self, floor: u64, bypass_floor: bool) -> Result<()> {
        if self.remaining == 0 {
            return Err(SyncError::QuotaExceeded {
                daily_limit: self.daily_limit,
            });
        }
        if self.remaining <= floor && !bypass_floor {
            return Err(SyncError::SafetyMargin {
                remaining: self.remaining,
                floor,
            });
        }
        Ok(())
    }
}

/// Reads the daily budget straight from upstream on every call. The status
/// call itself is free but the numbers it reports lag real usage.
pub struct QuotaGate;

impl QuotaGate {
    pub fn check<T: ApiTransport>(transport: &T) -> Result<QuotaStatus> {
        warn!(
            "quota numbers can lag real usage by a couple of minutes; do not fire rapid series of calls trusting them"
        );
        let reply = transport.get(STATUS_ENDPOINT, "")?;
        let raw_body = reply.body.clone();
        let status_code = reply.status;
        let value = reply.into_checked_json("quota status")?;
        parse_status(&value).ok_or_else(|| SyncError::Upstream {
            context: "quota status without response.requests".to_string(),
            status: status_code,
            body: raw_body,
        })
    }
}

pub fn parse_status(value: &Value) -> Option<QuotaStatus> {
    let requests = value.get("response")?.get("requests")?;
    let daily_limit = requests.get("limit_day")?.as_u64()?;
    let used = requests.get("current")?.as_u64()?;
    Some(QuotaStatus::new(daily_limit, used))
}
