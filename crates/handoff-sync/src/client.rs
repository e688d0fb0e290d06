//! HTTP client for the sync backend's data and auth APIs.
//!
//! Transport-level sync (push/pull scheduling, retry policy, conflict
//! resolution) belongs to the external service; this client only covers the
//! contract the core depends on: fire-and-forget auth calls and the data-API
//! item insertion an external agent uses as well.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use handoff_core::HandoffItem;

use crate::error::SyncError;

#[derive(Clone)]
pub struct CloudClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CloudClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("handoff-sync/0.1")
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Start an email login flow. The service answers out-of-band with an
    /// auth interaction (OTP prompt) relayed through the bridge.
    pub async fn login(&self, email: &str) -> Result<(), SyncError> {
        let res = self
            .request(reqwest::Method::POST, "/auth/login")
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        ok_or_rejected(res.status())
    }

    pub async fn submit_otp(&self, code: &str) -> Result<(), SyncError> {
        let res = self
            .request(reqwest::Method::POST, "/auth/otp")
            .json(&serde_json::json!({ "otp": code }))
            .send()
            .await?;
        ok_or_rejected(res.status())
    }

    pub async fn logout(&self) -> Result<(), SyncError> {
        let res = self
            .request(reqwest::Method::POST, "/auth/logout")
            .send()
            .await?;
        ok_or_rejected(res.status())
    }

    /// Insert an item through the data API, in the exact shape local items
    /// use. Ownership/realm fields pass through untouched. Returns the id
    /// the backend settled on (it may assign its own).
    pub async fn insert_item(&self, item: &HandoffItem) -> Result<String, SyncError> {
        let res = self
            .request(reqwest::Method::POST, "/items")
            .json(item)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(SyncError::Rejected(res.status().as_u16()));
        }
        let body: Value = res.json().await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(&item.id)
            .to_string();
        debug!(%id, "item inserted via data API");
        Ok(id)
    }

    /// Fetch items changed since the given epoch-millis watermark.
    pub async fn fetch_items(&self, since: Option<i64>) -> Result<Vec<HandoffItem>, SyncError> {
        let mut builder = self.request(reqwest::Method::GET, "/items");
        if let Some(since) = since {
            builder = builder.query(&[("since", since.to_string())]);
        }
        let res = builder.send().await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        if !res.status().is_success() {
            return Err(SyncError::Rejected(res.status().as_u16()));
        }
        let body: Value = res.json().await?;
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut out = Vec::new();
        for value in items {
            match serde_json::from_value::<HandoffItem>(value) {
                Ok(item) => out.push(item),
                Err(err) => debug!(error = %err, "skipping malformed item from data API"),
            }
        }
        Ok(out)
    }
}

fn ok_or_rejected(status: StatusCode) -> Result<(), SyncError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SyncError::Rejected(status.as_u16()))
    }
}
