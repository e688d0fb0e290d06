//! The bridge between local state and an external synchronization service.
//!
//! Events flow in from whatever drives the actual service (phase changes,
//! auth-interaction requests, items observed on the sync channel, login
//! state); the bridge projects them into two `watch` channels, the
//! [`SyncState`] and the current [`AuthInteraction`] if any, and feeds
//! observed items into the local store. Outbound user actions (login,
//! logout, interaction submit/cancel) are forwarded as [`ServiceRequest`]s,
//! fire-and-forget.
//!
//! Nothing here may block an Item Store operation: a slow or absent network
//! degrades the projected status only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use handoff_core::{HandoffItem, Store};

use crate::auth::AuthInteraction;
use crate::status::{project, ServicePhase, SyncState, SyncStatus};

/// Inbound: what the external service reports to the client.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    Phase(ServicePhase),
    /// Replaces any pending interaction outright. A failed submit is
    /// re-delivered through this event with an added error alert.
    InteractionRequested(AuthInteraction),
    InteractionCleared,
    /// An item (local shape, ownership fields included) observed on the
    /// sync channel — possibly inserted by an external agent.
    ItemObserved(HandoffItem),
    LoginStateChanged { logged_in: bool },
}

/// Outbound: fire-and-forget user actions relayed to the service driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    Login { email: String },
    Logout,
    SubmitInteraction { values: HashMap<String, String> },
    CancelInteraction,
}

struct BridgeInner {
    cloud_url: Option<String>,
    online: bool,
    phase: ServicePhase,
    logged_in: bool,
    last_sync_time: Option<i64>,
}

impl BridgeInner {
    fn snapshot(&self) -> SyncState {
        let cloud_enabled = self.cloud_url.is_some();
        let mut status = project(cloud_enabled, self.online, &self.phase);
        // A logged-in user upgrades the indeterminate states; an active
        // sync or error report is left alone.
        if self.logged_in
            && matches!(status, SyncStatus::Connecting | SyncStatus::Disconnected)
        {
            status = SyncStatus::Connected;
        }
        SyncState {
            status,
            is_cloud_enabled: cloud_enabled,
            last_sync_time: self.last_sync_time,
            error: match &self.phase {
                ServicePhase::Error(message) if cloud_enabled => Some(message.clone()),
                _ => None,
            },
        }
    }
}

/// Clonable bridge handle.
#[derive(Clone)]
pub struct SyncBridge {
    store: Store,
    inner: Arc<Mutex<BridgeInner>>,
    state_tx: Arc<watch::Sender<SyncState>>,
    interaction_tx: Arc<watch::Sender<Option<AuthInteraction>>>,
    requests_tx: mpsc::UnboundedSender<ServiceRequest>,
}

impl SyncBridge {
    /// Build a bridge for the given (possibly absent) endpoint. The returned
    /// receiver carries outbound [`ServiceRequest`]s for the service driver.
    pub fn new(
        store: Store,
        cloud_url: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<ServiceRequest>) {
        let inner = BridgeInner {
            cloud_url,
            online: true,
            phase: ServicePhase::Initial,
            logged_in: false,
            last_sync_time: None,
        };
        let (state_tx, _) = watch::channel(inner.snapshot());
        let (interaction_tx, _) = watch::channel(None);
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                inner: Arc::new(Mutex::new(inner)),
                state_tx: Arc::new(state_tx),
                interaction_tx: Arc::new(interaction_tx),
                requests_tx,
            },
            requests_rx,
        )
    }

    /// Consume service events until the sender side is dropped.
    pub fn spawn(&self, mut events: mpsc::UnboundedReceiver<ServiceEvent>) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                bridge.handle_event(event).await;
            }
            debug!("service event channel closed");
        })
    }

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> SyncState {
        self.state_tx.borrow().clone()
    }

    pub fn interaction(&self) -> watch::Receiver<Option<AuthInteraction>> {
        self.interaction_tx.subscribe()
    }

    /// Platform connectivity signal. Offline wins over any service phase.
    pub fn set_online(&self, online: bool) {
        self.inner.lock().online = online;
        self.publish_state();
    }

    /// Endpoint configuration change: `local-only` is recomputed reactively.
    /// The new endpoint itself takes effect once the service driver
    /// reconnects; a partial hot swap is not attempted here.
    pub fn set_cloud_url(&self, cloud_url: Option<String>) {
        {
            let mut inner = self.inner.lock();
            inner.cloud_url = cloud_url;
            inner.phase = ServicePhase::Initial;
            inner.last_sync_time = None;
        }
        self.publish_state();
    }

    /// Fire-and-forget login request. User cancellation of the interactive
    /// flow that follows is not an error.
    pub fn login(&self, email: &str) {
        info!("login requested");
        let _ = self.requests_tx.send(ServiceRequest::Login {
            email: email.to_string(),
        });
    }

    pub fn logout(&self) {
        info!("logout requested");
        let _ = self.requests_tx.send(ServiceRequest::Logout);
    }

    /// Asynchronous completion of the pending interaction. The interaction
    /// stays pending until the service either clears it or replaces it with
    /// a retry carrying an error alert.
    pub fn submit_interaction(&self, values: HashMap<String, String>) {
        let _ = self
            .requests_tx
            .send(ServiceRequest::SubmitInteraction { values });
    }

    /// Synchronous cancellation: always clears the pending interaction.
    pub fn cancel_interaction(&self) {
        let _ = self.interaction_tx.send(None);
        let _ = self.requests_tx.send(ServiceRequest::CancelInteraction);
    }

    async fn handle_event(&self, event: ServiceEvent) {
        match event {
            ServiceEvent::Phase(phase) => {
                let mut inner = self.inner.lock();
                if phase == ServicePhase::InSync {
                    inner.last_sync_time = Some(Utc::now().timestamp_millis());
                }
                inner.phase = phase;
                drop(inner);
                self.publish_state();
            }
            ServiceEvent::InteractionRequested(interaction) => {
                debug!(kind = ?interaction.kind, "auth interaction requested");
                let _ = self.interaction_tx.send(Some(interaction));
            }
            ServiceEvent::InteractionCleared => {
                let _ = self.interaction_tx.send(None);
            }
            ServiceEvent::ItemObserved(item) => {
                // Local-first: a failing local write must not kill the event
                // loop; it is logged and the next observation retries.
                if let Err(err) = self.store.apply_remote(&item).await {
                    warn!(id = %item.id, error = %err, "failed to apply observed item");
                }
            }
            ServiceEvent::LoginStateChanged { logged_in } => {
                self.inner.lock().logged_in = logged_in;
                self.publish_state();
            }
        }
    }

    fn publish_state(&self) {
        let snapshot = self.inner.lock().snapshot();
        self.state_tx.send_if_modified(|state| {
            if *state == snapshot {
                false
            } else {
                *state = snapshot;
                true
            }
        });
    }
}
