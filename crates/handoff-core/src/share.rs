//! Share-target ingestion: turns a query-string payload from a deep link or
//! OS share sheet into the store's input shape.

use crate::compose::validate_outgoing;
use crate::model::{DeviceCategory, DeviceProfile, SharePayload};

/// Parse a raw query string (with or without the leading `?`).
///
/// Returns `None` when no content parameter is present: the invocation was
/// not a share. `autoSend` defaults to true — hand-off from external share
/// sources should be frictionless — and is disabled only by the literal
/// string `false`.
pub fn parse_share_payload(raw_query: &str) -> Option<SharePayload> {
    let query = raw_query.trim_start_matches('?');
    let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let get = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };

    let content = get("content")
        .or_else(|| get("url"))
        .or_else(|| get("text"))?;
    if content.is_empty() {
        return None;
    }

    let auto_send = match get("autoSend") {
        Some(value) => value != "false",
        None => true,
    };

    Some(SharePayload {
        content,
        title: get("title"),
        category: get("category").and_then(|c| c.parse::<DeviceCategory>().ok()),
        sensitive: get("sensitive").as_deref() == Some("true"),
        auto_send,
    })
}

/// Inverse of [`parse_share_payload`]: the query string another device or an
/// OS shortcut would use to hand content to us.
pub fn build_share_query(
    content: &str,
    title: Option<&str>,
    category: Option<DeviceCategory>,
    sensitive: bool,
) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("content", content);
    if let Some(title) = title {
        query.append_pair("title", title);
    }
    if let Some(category) = category {
        query.append_pair("category", category.as_str());
    }
    if sensitive {
        query.append_pair("sensitive", "true");
    }
    query.finish()
}

impl SharePayload {
    /// Whether this payload may be sent without user confirmation.
    ///
    /// Auto-send is suppressed when the content would fail outgoing
    /// validation on this device (work-mode restriction, invalid URL), and
    /// sensitive payloads always require manual confirmation: an encrypted
    /// send needs a passphrase.
    pub fn should_auto_send(&self, profile: &DeviceProfile) -> bool {
        self.auto_send && !self.sensitive && validate_outgoing(profile, &self.content).is_ok()
    }
}
