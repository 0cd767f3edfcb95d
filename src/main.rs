//! Census Field Console
//!
//! Line-oriented front end for an enumerator's device:
//! - Capture citizen declarations while offline
//! - Inspect the pending / synced queue
//! - Toggle connectivity and sync with the census server

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;

use census_field_sync::config::FieldConfig;
use census_field_sync::store::{CitizenDeclaration, EnumeratorSession, RecordStore, SqliteRecordStore, SurveyRecord};
use census_field_sync::sync::{spawn_reconnect_sync, HttpSubmissionClient, SyncCoordinator};
use census_field_sync::utils::{init_logging, truncate_text};
use census_field_sync::{ConnectivitySignal, SyncError};

const CASTE_CATEGORIES: [&str; 6] = [
    "General",
    "OBC (Other Backward Class)",
    "SC (Scheduled Caste)",
    "ST (Scheduled Tribe)",
    "EWS (Economically Weaker Section)",
    "Prefer not to say",
];

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// First eight characters of a survey id, for display.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn print_record(record: &SurveyRecord) {
    let name = record.payload_field("name").unwrap_or_else(|| "(unnamed)".to_string());
    let captured = record.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let hash = record
        .receipt
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .filter(|h| !h.is_empty())
        .map(|h| truncate_text(h, 20))
        .unwrap_or_else(|| "-".to_string());
    println!("   • {name:<24} {captured}  receipt {hash}  [{}]", short_id(&record.id));
}

async fn login(store: &dyn RecordStore) -> Result<()> {
    let session = EnumeratorSession {
        id: prompt("Enumerator ID")?,
        name: prompt("Name")?,
        assigned_area: prompt("Assigned area")?,
        assigned_ward: prompt("Assigned ward")?,
    };
    if session.id.is_empty() {
        println!("⚠️  Enumerator ID is required.\n");
        return Ok(());
    }
    store.set_session(session.clone()).await?;
    println!("👤 Logged in as {} ({}, {})\n", session.name, session.assigned_area, session.assigned_ward);
    Ok(())
}

async fn capture(store: &dyn RecordStore) -> Result<()> {
    if store.session().await?.is_none() {
        println!("⚠️  Log in before capturing surveys.\n");
        return Ok(());
    }

    let name = prompt("Citizen name")?;
    if name.is_empty() {
        println!("⚠️  Name is required.\n");
        return Ok(());
    }
    let age = prompt("Age")?;
    let guardian = prompt("Guardian")?;
    let sex = prompt("Sex")?;
    for (i, category) in CASTE_CATEGORIES.iter().enumerate() {
        println!("   {}. {}", i + 1, category);
    }
    let caste = prompt("Caste category (number)")?
        .parse::<usize>()
        .ok()
        .and_then(|n| CASTE_CATEGORIES.get(n.wrapping_sub(1)))
        .unwrap_or(&CASTE_CATEGORIES[5])
        .to_string();
    let income = prompt("Annual income (₹)")?;

    let declaration = CitizenDeclaration {
        name,
        age,
        guardian,
        sex,
        caste,
        income,
        voice_note: None,
        photo_base64: None,
    };
    // Verification and anchoring happen elsewhere; record them as not yet done.
    let record = declaration.into_record(
        json!({ "incomeStatus": "Not verified", "confidence": 0, "conflictDetected": false }),
        json!({ "transactionHash": "", "timestamp": Utc::now().to_rfc3339(), "status": "Pending" }),
    )?;
    let id = record.id.clone();
    store.append(record).await?;

    println!("📝 Survey saved locally ({}). It will sync when you run 'sync'.\n", short_id(&id));
    Ok(())
}

async fn show_status(store: &dyn RecordStore, signal: &ConnectivitySignal) -> Result<()> {
    let counts = store.counts().await?;
    let network = if signal.is_online() { "🟢 Online - Data syncing enabled" } else { "🔴 Offline - Data stored locally" };
    println!("\n{network}");
    println!("⏳ Pending: {}   ✅ Synced: {}", counts.pending, counts.synced);
    if let Some(session) = store.session().await? {
        println!("👤 {} · {} · {}", session.name, session.assigned_area, session.assigned_ward);
    }
    println!();
    Ok(())
}

async fn run_sync(coordinator: &SyncCoordinator) -> Result<()> {
    if coordinator.store().counts().await?.pending == 0 {
        println!("📭 No data to sync. All surveys are already synced.\n");
        return Ok(());
    }

    println!("\n☁️  Syncing...\n");
    match coordinator.sync().await {
        Ok(summary) if summary.is_complete() => {
            println!("✅ Sync complete: {} survey(s) sent to the server.\n", summary.success_count);
        }
        Ok(summary) => {
            println!(
                "⚠️  Sync partial: {} survey(s) synced, {} failed - will retry later.\n",
                summary.success_count, summary.failure_count
            );
        }
        Err(SyncError::Offline) => {
            println!("📴 Cannot sync while offline. Data will be synced when connection is restored.\n");
        }
        Err(SyncError::InProgress) => {
            println!("⏳ A sync is already running. Try again in a moment.\n");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = FieldConfig::from_env()?;
    let _log_guard = init_logging(&config.log_dir)?;

    println!("\n{}", "═".repeat(60));
    println!("📋 Census Field Console v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "═".repeat(60));
    println!("Offline capture | Durable queue | Idempotent sync");
    println!("{}\n", "═".repeat(60));

    let store: Arc<dyn RecordStore> = Arc::new(
        SqliteRecordStore::open(&config.db_path)
            .await
            .with_context(|| format!("Failed to open survey store at {}", config.db_path.display()))?,
    );
    let signal = ConnectivitySignal::new(config.start_online);
    let client = Arc::new(
        HttpSubmissionClient::new(&config.api_base_url, config.request_timeout)
            .context("Failed to build HTTP client")?,
    );
    info!("Submitting surveys to {}", client.endpoint());

    let coordinator = Arc::new(SyncCoordinator::new(store.clone(), client, signal.clone()));
    let watcher = spawn_reconnect_sync(coordinator.clone());

    match store.session().await? {
        Some(session) => println!("👤 Welcome back, {}", session.name),
        None => println!("👤 No enumerator logged in. Use 'login' to start."),
    }
    show_status(store.as_ref(), &signal).await?;

    println!("💡 Commands: login | capture | pending | synced | status | online | offline | sync | logout | quit\n");

    loop {
        let command = prompt("🧾 census")?;
        if command.is_empty() {
            continue;
        }

        let outcome = match command.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("\n👋 Goodbye!\n");
                break;
            }
            "login" => login(store.as_ref()).await,
            "capture" | "new" => capture(store.as_ref()).await,
            "pending" => store.list_pending().await.map_err(anyhow::Error::from).map(|records| {
                println!("\n⏳ Pending Surveys ({})", records.len());
                records.iter().for_each(print_record);
                println!();
            }),
            "synced" => store.list_synced().await.map_err(anyhow::Error::from).map(|records| {
                println!("\n✅ Synced Surveys ({})", records.len());
                records.iter().for_each(print_record);
                println!();
            }),
            "status" => show_status(store.as_ref(), &signal).await,
            "online" => {
                signal.set_online(true);
                println!("🟢 Online\n");
                Ok(())
            }
            "offline" => {
                signal.set_online(false);
                println!("🔴 Offline\n");
                Ok(())
            }
            "sync" => run_sync(&coordinator).await,
            "logout" => store.clear().await.map_err(anyhow::Error::from).map(|_| {
                println!("\n🗑️  Logged out. Local surveys and session cleared.\n");
            }),
            other => {
                println!("❓ Unknown command '{other}'\n");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("❌ Error: {e:#}\n");
        }
    }

    watcher.abort();
    Ok(())
}
