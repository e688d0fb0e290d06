//! Auth-interaction relay types.
//!
//! The external service may at any time need user input (email capture,
//! one-time code, an informational alert, a logout confirmation). The bridge
//! exposes the request as plain data; completion flows back through
//! `SyncBridge::submit_interaction` / `SyncBridge::cancel_interaction`, so
//! business logic never couples to the service's API shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    Email,
    Otp,
    MessageAlert,
    LogoutConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthAlert {
    pub severity: AlertSeverity,
    pub message: String,
}

/// One named input field in an interaction form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthField {
    pub name: String,
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// The current pending interaction. At most one exists at a time; a new
/// request from the service replaces the previous one outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInteraction {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<AuthAlert>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AuthField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_label: Option<String>,
}

impl AuthInteraction {
    /// A failed submit comes back as the same interaction with the failure
    /// appended as an error alert, never as a silent close.
    pub fn with_error_alert(mut self, message: impl Into<String>) -> Self {
        self.alerts.push(AuthAlert {
            severity: AlertSeverity::Error,
            message: message.into(),
        });
        self
    }
}
