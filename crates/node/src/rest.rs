//! Remote store over a Realtime-Database-style REST API:
//!
//! | operation     | request                                  |
//! |---------------|------------------------------------------|
//! | `get`         | `GET    <endpoint>/<path>.json?auth=…`   |
//! | `set_*`       | `PUT    <endpoint>/<path>.json` + value  |
//! | `update_json` | `PATCH  <endpoint>/<path>.json` + object |
//! | `push_json`   | `POST   <endpoint>/<path>.json` + value → `{"name": "<id>"}` |
//!
//! A missing path reads back as JSON `null`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::path::segments;
use crate::remote::{check_finite, RemoteError, RemoteStore};

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    endpoint: String,
    auth_secret: Option<String>,
}

impl RestStore {
    /// `request_timeout` bounds every call so a dead endpoint cannot stall
    /// the cooperative loop.
    pub fn new(
        endpoint: &str,
        auth_secret: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth_secret: auth_secret.filter(|s| !s.is_empty()),
        })
    }

    pub fn url(&self, path: &str) -> String {
        resource_url(&self.endpoint, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.auth_secret {
            Some(secret) => req.query(&[("auth", secret.as_str())]),
            None => req,
        }
    }

    async fn send(
        &self,
        op: &'static str,
        path: &str,
        req: RequestBuilder,
    ) -> Result<Value, RemoteError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("{op} {path}: {e}")))?;
        read_body(op, path, resp).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<(), RemoteError> {
        debug!(%path, %body, "rest put");
        let req = self.request(Method::PUT, path).json(&body);
        self.send("set", path, req).await.map(|_| ())
    }
}

impl RemoteStore for RestStore {
    async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        let req = self.request(Method::GET, path);
        match self.send("get", path, req).await? {
            Value::Null => Err(RemoteError::NotFound {
                path: path.to_string(),
            }),
            v => Ok(v),
        }
    }

    async fn set_int(&self, path: &str, value: i64) -> Result<(), RemoteError> {
        self.put(path, Value::from(value)).await
    }

    async fn set_float(&self, path: &str, value: f64) -> Result<(), RemoteError> {
        check_finite("set", path, value)?;
        self.put(path, Value::from(value)).await
    }

    async fn set_string(&self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.put(path, Value::from(value)).await
    }

    async fn push_json(&self, path: &str, json: &Value) -> Result<String, RemoteError> {
        let req = self.request(Method::POST, path).json(json);
        let body = self.send("push", path, req).await?;
        parse_push_id(&body)
    }

    async fn update_json(&self, path: &str, json: &Value) -> Result<(), RemoteError> {
        let req = self.request(Method::PATCH, path).json(json);
        self.send("update", path, req).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `<endpoint>/<path>.json` with duplicate slashes collapsed.
pub fn resource_url(endpoint: &str, path: &str) -> String {
    let clean: Vec<&str> = segments(path).collect();
    format!("{}/{}.json", endpoint.trim_end_matches('/'), clean.join("/"))
}

/// Extract the generated key from a push reply (`{"name": "-Nabc…"}`).
pub fn parse_push_id(body: &Value) -> Result<String, RemoteError> {
    body.get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Malformed(format!("push reply without name: {body}")))
}

async fn read_body(op: &'static str, path: &str, resp: Response) -> Result<Value, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Rejected {
            op,
            path: path.to_string(),
            reason: format!("http {}: {}", status.as_u16(), error_message(&text)),
        });
    }
    resp.json::<Value>()
        .await
        .map_err(|e| RemoteError::Malformed(format!("{op} {path}: {e}")))
}

/// Error replies look like `{"error": "Permission denied"}`; fall back to the
/// raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// ===========================================================================
// Tests
// ===========================================================================
