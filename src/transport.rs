//! The seam between the pipeline and the upstream API.
//!
//! The pipeline only ever issues `GET <base>/<endpoint>?<query>`; everything
//! above this trait is written against [`ApiReply`] so it can be driven by a
//! scripted transport in tests.

use serde_json::Value;
use tracing::info;

use crate::error::{Result, SyncError};
use crate::http_client::http_client;
use crate::settings::Settings;

const HOST_HEADER: &str = "x-rapidapi-host";
const KEY_HEADER: &str = "x-rapidapi-key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(self.body.trim()).ok()
    }

    /// The upstream reports most failures with a 200 and a non-empty
    /// `errors` array or object.
    pub fn error_payload(value: &Value) -> Option<&Value> {
        let errors = value.get("errors")?;
        let present = match errors {
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Null | Value::Bool(false) => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        };
        present.then_some(errors)
    }

    /// Parses the body and fails with `Upstream` on a bad status, an
    /// unparseable body or an error payload.
    pub fn into_checked_json(self, context: &str) -> Result<Value> {
        let upstream = |reply: ApiReply| SyncError::Upstream {
            context: context.to_string(),
            status: reply.status,
            body: reply.body,
        };
        if !self.is_success() {
            return Err(upstream(self));
        }
        let Some(value) = self.json() else {
            return Err(upstream(self));
        };
        if Self::error_payload(&value).is_some() {
            return Err(upstream(self));
        }
        Ok(value)
    }
}

pub trait ApiTransport {
    /// `query` is already canonical (`k=v&k=v`) and may be empty.
    fn get(&self, endpoint: &str, query: &str) -> Result<ApiReply>;
}

impl<T: ApiTransport + ?Sized> ApiTransport for &T {
    fn get(&self, endpoint: &str, query: &str) -> Result<ApiReply> {
        (**self).get(endpoint, query)
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    host: String,
    key: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, host: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            host: host.into(),
            key: key.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let Some(key) = settings.api_key.as_deref() else {
            return Err(SyncError::MissingInput(
                "FOOTBALL_API_KEY is not set".to_string(),
            ));
        };
        Ok(Self::new(
            settings.api_url.clone(),
            settings.api_host.clone(),
            key,
        ))
    }

    pub fn url_for(&self, endpoint: &str, query: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        if query.is_empty() {
            format!("{base}/{endpoint}")
        } else {
            format!("{base}/{endpoint}?{query}")
        }
    }
}

impl ApiTransport for HttpTransport {
    fn get(&self, endpoint: &str, query: &str) -> Result<ApiReply> {
        let client = http_client()?;
        let url = self.url_for(endpoint, query);
        info!(%url, "making request");
        let resp = client
            .get(&url)
            .header(HOST_HEADER, &self.host)
            .header(KEY_HEADER, &self.key)
            .send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(ApiReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ApiReply, HttpTransport};
    use crate::error::SyncError;

    #[test]
    fn url_joins_base_endpoint_and_query() {
        let t = HttpTransport::new("https://api.example/", "api.example", "k");
        assert_eq!(
            t.url_for("fixtures/events", "fixture=7"),
            "https://api.example/fixtures/events?fixture=7"
        );
        assert_eq!(t.url_for("status", ""), "https://api.example/status");
    }

    #[test]
    fn empty_errors_are_not_a_payload() {
        assert!(ApiReply::error_payload(&json!({"errors": []})).is_none());
        assert!(ApiReply::error_payload(&json!({"errors": {}})).is_none());
        assert!(ApiReply::error_payload(&json!({"response": []})).is_none());
        assert!(ApiReply::error_payload(&json!({"errors": {"token": "bad"}})).is_some());
    }

    #[test]
    fn error_payload_on_200_is_upstream_error() {
        let reply = ApiReply::ok(r#"{"errors":{"requests":"limit"},"response":[]}"#);
        let err = reply.into_checked_json("leagues").unwrap_err();
        assert!(matches!(err, SyncError::Upstream { status: 200, .. }));
    }

    #[test]
    fn bad_status_keeps_raw_body() {
        let reply = ApiReply {
            status: 499,
            body: "nope".to_string(),
        };
        match reply.into_checked_json("status").unwrap_err() {
            SyncError::Upstream { status, body, .. } => {
                assert_eq!(status, 499);
                assert_eq!(body, "nope");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
