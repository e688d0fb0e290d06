//! Outgoing-content validation and assembly.
//!
//! Everything here is pure: the caller hands the resulting [`NewItem`] to
//! `Store::add_item`. Encryption happens inline when the request is marked
//! sensitive.

use url::Url;

use crate::crypto::encrypt_content;
use crate::error::{ComposeError, ValidationError};
use crate::model::{
    DeviceProfile, ItemContent, ItemKind, NewItem, PlainContent,
};
use crate::session::SessionPassphrase;

pub const MIN_PASSPHRASE_LEN: usize = 4;
pub const URL_PREVIEW_LEN: usize = 50;
pub const TEXT_PREVIEW_LEN: usize = 100;

/// Only http(s) URLs count; everything else is treated as text.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

pub fn detect_kind(content: &str) -> ItemKind {
    if is_valid_url(content.trim()) {
        ItemKind::Url
    } else {
        ItemKind::Text
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Hostname + path preview for a URL, falling back to the raw string.
pub fn url_preview(raw: &str, max: usize) -> String {
    match Url::parse(raw) {
        Ok(url) => truncate(
            &format!("{}{}", url.host_str().unwrap_or_default(), url.path()),
            max,
        ),
        Err(_) => truncate(raw, max),
    }
}

/// Whitespace-collapsed preview for plain text.
pub fn text_preview(text: &str, max: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&cleaned, max)
}

/// Validate content against this device's outgoing restrictions and return
/// the detected kind.
pub fn validate_outgoing(
    profile: &DeviceProfile,
    content: &str,
) -> Result<ItemKind, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let kind = detect_kind(trimmed);
    if profile.work_mode && kind == ItemKind::Text {
        return Err(ValidationError::WorkModeUrlOnly);
    }
    Ok(kind)
}

pub fn validate_passphrase(passphrase: &str, confirm: &str) -> Result<(), ValidationError> {
    if passphrase.is_empty() {
        return Err(ValidationError::MissingPassphrase);
    }
    if passphrase != confirm {
        return Err(ValidationError::PassphraseMismatch);
    }
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(ValidationError::PassphraseTooShort {
            min: MIN_PASSPHRASE_LEN,
        });
    }
    Ok(())
}

/// A send request as it arrives from a composer surface or a share payload.
#[derive(Debug, Clone, Default)]
pub struct ComposeRequest {
    pub content: String,
    /// `None` detects the kind from the content.
    pub kind: Option<ItemKind>,
    /// `None` falls back to the profile's default target category.
    pub target_category: Option<crate::model::DeviceCategory>,
    pub target_device_id: Option<String>,
    pub title: Option<String>,
    pub sensitive: bool,
    pub passphrase: Option<String>,
    pub confirm_passphrase: Option<String>,
}

/// Validate a request and assemble the item to insert.
///
/// For sensitive requests the plain content is encrypted here and the
/// passphrase is offered to the session cache (which only keeps it when the
/// profile opts in). Nothing is mutated on failure.
pub fn compose_item(
    profile: &DeviceProfile,
    session: &SessionPassphrase,
    request: &ComposeRequest,
) -> Result<NewItem, ComposeError> {
    let trimmed = request.content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent.into());
    }

    let kind = request.kind.unwrap_or_else(|| detect_kind(trimmed));
    if profile.work_mode && kind == ItemKind::Text {
        return Err(ValidationError::WorkModeUrlOnly.into());
    }
    if kind == ItemKind::Url && !is_valid_url(trimmed) {
        return Err(ValidationError::InvalidUrl(trimmed.to_string()).into());
    }

    let plain = match kind {
        ItemKind::Url => PlainContent::url(trimmed),
        ItemKind::Text => PlainContent::text(trimmed),
    };
    let preview = match kind {
        ItemKind::Url => url_preview(trimmed, URL_PREVIEW_LEN),
        ItemKind::Text => text_preview(trimmed, TEXT_PREVIEW_LEN),
    };

    let content = if request.sensitive {
        let passphrase = request.passphrase.as_deref().unwrap_or_default();
        let confirm = request.confirm_passphrase.as_deref().unwrap_or(passphrase);
        validate_passphrase(passphrase, confirm)?;
        let encrypted = encrypt_content(&plain, passphrase)?;
        session.remember(profile, passphrase);
        ItemContent::Encrypted(encrypted)
    } else {
        ItemContent::Plain(plain)
    };

    Ok(NewItem {
        sender_device_id: profile.device_id.clone(),
        sender_device_name: profile.device_name.clone(),
        sender_category: profile.category,
        target_category: request.target_category.unwrap_or(profile.default_target_category),
        target_device_id: request.target_device_id.clone(),
        kind,
        is_sensitive: request.sensitive,
        content,
        title: request.title.clone(),
        preview: Some(preview),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::decrypt_content;
    use crate::model::{DeviceCategory, RememberPassphrase};

    fn profile() -> DeviceProfile {
        DeviceProfile {
            device_id: "dev-1".into(),
            device_name: "Laptop".into(),
            category: DeviceCategory::Private,
            default_target_category: DeviceCategory::Any,
            ..DeviceProfile::default()
        }
    }

    #[test]
    fn url_detection_requires_http_scheme() {
        assert!(is_valid_url("https://example.com/a"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("example.com"));
        assert_eq!(detect_kind("  https://example.com  "), ItemKind::Url);
        assert_eq!(detect_kind("grocery list"), ItemKind::Text);
    }

    #[test]
    fn previews_truncate_with_ellipsis() {
        let long_text = "word ".repeat(50);
        let preview = text_preview(&long_text, TEXT_PREVIEW_LEN);
        assert_eq!(preview.chars().count(), TEXT_PREVIEW_LEN);
        assert!(preview.ends_with("..."));

        let url = "https://example.com/some/quite/long/path/segment/even/longer";
        let preview = url_preview(url, URL_PREVIEW_LEN);
        assert!(preview.starts_with("example.com/"));
        assert!(preview.chars().count() <= URL_PREVIEW_LEN);
    }

    #[test]
    fn work_mode_rejects_text() {
        let mut p = profile();
        p.work_mode = true;
        assert!(matches!(
            validate_outgoing(&p, "some note"),
            Err(ValidationError::WorkModeUrlOnly)
        ));
        assert_eq!(
            validate_outgoing(&p, "https://example.com").unwrap(),
            ItemKind::Url
        );
    }

    #[test]
    fn passphrase_rules() {
        assert!(matches!(
            validate_passphrase("", ""),
            Err(ValidationError::MissingPassphrase)
        ));
        assert!(matches!(
            validate_passphrase("abcd", "abce"),
            Err(ValidationError::PassphraseMismatch)
        ));
        assert!(matches!(
            validate_passphrase("abc", "abc"),
            Err(ValidationError::PassphraseTooShort { min: 4 })
        ));
        assert!(validate_passphrase("abcd", "abcd").is_ok());
    }

    #[test]
    fn compose_plain_url_item() {
        let session = SessionPassphrase::new();
        let item = compose_item(
            &profile(),
            &session,
            &ComposeRequest {
                content: " https://example.com/article ".into(),
                ..ComposeRequest::default()
            },
        )
        .unwrap();
        assert_eq!(item.kind, ItemKind::Url);
        assert_eq!(item.sender_device_id, "dev-1");
        assert_eq!(item.target_category, DeviceCategory::Any);
        assert_eq!(
            item.content,
            ItemContent::Plain(PlainContent::url("https://example.com/article"))
        );
        assert_eq!(item.preview.as_deref(), Some("example.com/article"));
    }

    #[test]
    fn forcing_url_kind_on_invalid_content_fails() {
        let session = SessionPassphrase::new();
        let err = compose_item(
            &profile(),
            &session,
            &ComposeRequest {
                content: "not a url".into(),
                kind: Some(ItemKind::Url),
                ..ComposeRequest::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Validation(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn sensitive_compose_encrypts_and_caches_per_preference() {
        let mut p = profile();
        p.remember_passphrase = RememberPassphrase::Session;
        let session = SessionPassphrase::new();

        let item = compose_item(
            &p,
            &session,
            &ComposeRequest {
                content: "the door code is 4812".into(),
                sensitive: true,
                passphrase: Some("hunter2!".into()),
                confirm_passphrase: Some("hunter2!".into()),
                ..ComposeRequest::default()
            },
        )
        .unwrap();

        assert!(item.is_sensitive);
        let encrypted = match &item.content {
            ItemContent::Encrypted(enc) => enc,
            ItemContent::Plain(_) => panic!("sensitive item must carry encrypted content"),
        };
        let plain = decrypt_content(encrypted, "hunter2!").unwrap();
        assert_eq!(plain.text.as_deref(), Some("the door code is 4812"));

        assert_eq!(
            session.get().as_deref().map(String::as_str),
            Some("hunter2!")
        );
    }
}
