use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use handoff_core::compose::{compose_item, ComposeRequest};
use handoff_core::crypto::decrypt_content;
use handoff_core::model::{
    DeviceCategory, HandoffItem, InboxFilter, ItemContent, ItemStatus, RememberPassphrase,
};
use handoff_core::share::parse_share_payload;
use handoff_core::{paths, LocalCache, SessionPassphrase, Store};
use handoff_sync::{CloudClient, SyncBridge};

#[derive(Parser)]
#[command(name = "handoff", version, about = "Local-first handoff inbox", long_about = None)]
struct Cli {
    /// Override the data directory (default: platform data dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up this device: assign its identity and preferences
    Init {
        /// Display name for this device
        #[arg(long)]
        name: String,

        /// Device category: work, private or any
        #[arg(long, default_value = "any")]
        category: String,

        /// Restrict outgoing items to URLs
        #[arg(long)]
        work_mode: bool,

        /// Days before items are swept to the archive (1-30)
        #[arg(long, default_value_t = 7)]
        retention_days: u32,

        /// Remember encryption passphrases for the session
        #[arg(long)]
        remember_passphrase: bool,
    },

    /// Send a URL or text to other devices
    Send {
        content: String,

        /// Target category (defaults to the profile's default target)
        #[arg(long)]
        target: Option<String>,

        /// Pin the item to one specific device id
        #[arg(long)]
        device: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Encrypt the payload with a passphrase (prompted)
        #[arg(long)]
        sensitive: bool,
    },

    /// List inbox items
    List {
        /// Filter: new, active, archived or all
        #[arg(long, default_value = "active")]
        filter: String,

        /// Ignore this device's targeting (show every stored item)
        #[arg(long)]
        everything: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show one item, decrypting sensitive content after a passphrase prompt
    Show {
        id: String,
    },

    /// Mark an item opened
    Open { id: String },

    /// Mark an item done
    Done { id: String },

    /// Archive an item
    Archive { id: String },

    /// Bring an archived item back (to done)
    Unarchive { id: String },

    /// Hard-delete an item
    Delete { id: String },

    /// List devices that have sent items to this inbox
    Devices,

    /// Archive items older than the configured retention window
    Cleanup,

    /// Permanently delete all archived items
    ClearArchived,

    /// Feed a share-target query string through the ingestion path
    Ingest { query: String },

    /// Set or clear the sync endpoint (takes effect on next start)
    SetCloudUrl { url: Option<String> },

    /// Show the sync connection status for the configured endpoint
    Status,

    /// Insert an item through the sync backend's data API, as an external
    /// agent would
    Push {
        content: String,

        #[arg(long)]
        target: Option<String>,

        /// Endpoint (defaults to the configured cloud URL)
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer token for the data API
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => paths::data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)?;

    let mut cache = LocalCache::load(data_dir.join("device.json"));
    let store = Store::open(&data_dir.join("handoff.db")).await?;

    match cli.command {
        Commands::Init {
            name,
            category,
            work_mode,
            retention_days,
            remember_passphrase,
        } => {
            let mut profile = store.initialize_device(&mut cache).await?;
            profile.device_name = name;
            profile.category = category.parse::<DeviceCategory>().map_err(|e| anyhow!(e))?;
            profile.work_mode = work_mode;
            profile.retention_days = retention_days;
            profile.remember_passphrase = if remember_passphrase {
                RememberPassphrase::Session
            } else {
                RememberPassphrase::Off
            };
            profile.validate()?;
            store.save_profile(&profile).await?;
            let profile = store.mark_setup_complete(&mut cache).await?;
            println!("Device ready: {} ({})", profile.device_name, profile.device_id);
        }

        Commands::Send {
            content,
            target,
            device,
            title,
            sensitive,
        } => {
            let profile = require_setup(&store, &cache).await?;
            let passphrase = if sensitive {
                Some(prompt_passphrase_twice()?)
            } else {
                None
            };
            let session = SessionPassphrase::new();
            let request = ComposeRequest {
                content,
                kind: None,
                target_category: parse_optional_category(target.as_deref())?,
                target_device_id: device,
                title,
                sensitive,
                passphrase: passphrase.clone(),
                confirm_passphrase: passphrase,
            };
            let item = compose_item(&profile, &session, &request)?;
            let id = store.add_item(item).await?;
            println!("Sent {id}");
        }

        Commands::List {
            filter,
            everything,
            json,
        } => {
            let profile = require_setup(&store, &cache).await?;
            let filter = filter.parse::<InboxFilter>().map_err(|e| anyhow!(e))?;
            let items = if everything {
                store.items_by_filter(filter, None, None).await?
            } else {
                store
                    .items_by_filter(filter, Some(profile.category), Some(&profile.device_id))
                    .await?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in &items {
                    print_item_line(item);
                }
                if items.is_empty() {
                    println!("(empty)");
                }
            }
        }

        Commands::Show { id } => {
            let item = store
                .get_item(&id)
                .await?
                .ok_or_else(|| anyhow!("no item with id {id}"))?;
            println!("{}", serde_json::to_string_pretty(&item)?);
            if let ItemContent::Encrypted(encrypted) = &item.content {
                let passphrase = rpassword::prompt_password("Passphrase: ")?;
                let plain = decrypt_content(encrypted, &passphrase)?;
                println!(
                    "decrypted: {}",
                    plain.url.or(plain.text).unwrap_or_default()
                );
            }
        }

        Commands::Open { id } => transition(&store, &id, ItemStatus::Opened).await?,
        Commands::Done { id } => transition(&store, &id, ItemStatus::Done).await?,
        Commands::Archive { id } => transition(&store, &id, ItemStatus::Archived).await?,
        Commands::Unarchive { id } => transition(&store, &id, ItemStatus::Done).await?,

        Commands::Delete { id } => {
            store.delete_item(&id).await?;
            println!("Deleted {id}");
        }

        Commands::Devices => {
            for device in store.known_devices().await? {
                let last_seen = chrono::DateTime::from_timestamp_millis(device.last_seen)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!(
                    "{}  {}  {}  last seen {}",
                    device.device_id, device.device_name, device.category, last_seen
                );
            }
        }

        Commands::Cleanup => {
            let profile = require_setup(&store, &cache).await?;
            let archived = store.run_retention_cleanup(profile.retention_days).await?;
            println!("Archived {archived} stale item(s)");
        }

        Commands::ClearArchived => {
            let deleted = store.clear_archived().await?;
            println!("Deleted {deleted} archived item(s)");
        }

        Commands::Ingest { query } => {
            let profile = require_setup(&store, &cache).await?;
            let Some(payload) = parse_share_payload(&query) else {
                println!("Not a share invocation (no content)");
                return Ok(());
            };
            if payload.should_auto_send(&profile) {
                let session = SessionPassphrase::new();
                let request = ComposeRequest {
                    content: payload.content.clone(),
                    target_category: payload.category,
                    title: payload.title.clone(),
                    ..ComposeRequest::default()
                };
                let item = compose_item(&profile, &session, &request)?;
                let id = store.add_item(item).await?;
                println!("Auto-sent {id}");
            } else {
                // Work-mode violations, invalid URLs and sensitive payloads
                // all require the user to finish the send explicitly.
                println!("Needs confirmation; parsed payload:");
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
        }

        Commands::SetCloudUrl { url } => {
            store.update_cloud_url(&mut cache, url.as_deref()).await?;
            match cache.cloud_url() {
                Some(url) => println!("Sync endpoint set to {url} (restart to connect)"),
                None => println!("Sync endpoint cleared; running local-only"),
            }
        }

        Commands::Status => {
            let profile = store.get_profile(&cache).await?;
            let (bridge, _requests) = SyncBridge::new(store.clone(), profile.cloud_url);
            let state = bridge.current_state();
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Push {
            content,
            target,
            endpoint,
            token,
        } => {
            let profile = require_setup(&store, &cache).await?;
            let endpoint = endpoint
                .or_else(|| profile.cloud_url.clone())
                .ok_or_else(|| anyhow!("no endpoint configured; pass --endpoint"))?;

            let session = SessionPassphrase::new();
            let request = ComposeRequest {
                content,
                target_category: parse_optional_category(target.as_deref())?,
                ..ComposeRequest::default()
            };
            let new_item = compose_item(&profile, &session, &request)?;
            let now = chrono::Utc::now().timestamp_millis();
            let item = HandoffItem {
                id: uuid::Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
                sender_device_id: new_item.sender_device_id,
                sender_device_name: new_item.sender_device_name,
                sender_category: new_item.sender_category,
                target_category: new_item.target_category,
                target_device_id: new_item.target_device_id,
                kind: new_item.kind,
                status: ItemStatus::New,
                is_sensitive: new_item.is_sensitive,
                content: new_item.content,
                title: new_item.title,
                preview: new_item.preview,
                opened_at: None,
                done_at: None,
                archived_at: None,
                owner: None,
                realm_id: None,
            };

            let client = CloudClient::new(&endpoint, token);
            let id = client.insert_item(&item).await?;
            println!("Pushed {id}");
        }
    }

    Ok(())
}

async fn require_setup(store: &Store, cache: &LocalCache) -> Result<handoff_core::DeviceProfile> {
    let profile = store.get_profile(cache).await?;
    if !profile.is_setup_complete {
        return Err(anyhow!("device not set up; run `handoff init` first"));
    }
    Ok(profile)
}

async fn transition(store: &Store, id: &str, status: ItemStatus) -> Result<()> {
    store.update_status(id, status).await?;
    println!("{id} -> {status}");
    Ok(())
}

fn parse_optional_category(raw: Option<&str>) -> Result<Option<DeviceCategory>> {
    raw.map(|c| c.parse::<DeviceCategory>().map_err(|e| anyhow!(e)))
        .transpose()
}

fn prompt_passphrase_twice() -> Result<String> {
    let first = rpassword::prompt_password("Passphrase: ")?;
    let second = rpassword::prompt_password("Confirm passphrase: ")?;
    if first != second {
        return Err(anyhow!("passphrases do not match"));
    }
    Ok(first)
}

fn print_item_line(item: &HandoffItem) {
    let preview = item.preview.as_deref().unwrap_or(match &item.content {
        ItemContent::Plain(plain) => plain
            .url
            .as_deref()
            .or(plain.text.as_deref())
            .unwrap_or_default(),
        ItemContent::Encrypted(_) => "(encrypted)",
    });
    let target = match &item.target_device_id {
        Some(device) => format!("@{device}"),
        None => format!("#{}", item.target_category),
    };
    println!(
        "{}  [{}] {} {}  from {}  {}",
        item.id, item.status, item.kind, target, item.sender_device_name, preview
    );
}
