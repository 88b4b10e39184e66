use inbox_sync::adapters::{FileCache, FixtureRemoteFactory, LogFaultReporter};
use inbox_sync::models::Thread;
use inbox_sync::{logging, SessionOrchestrator, SyncConfig};

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: inbox-replay <fixture-dir> [--all-pages]";

fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("inbox-replay {}", VERSION);
        std::process::exit(0);
    }

    color_eyre::install()?;
    logging::init();

    let fixture_dir = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| eyre!(USAGE))?;
    let all_pages = std::env::args().any(|arg| arg == "--all-pages");

    let config = SyncConfig::from_env();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(replay(config, fixture_dir, all_pages))
}

/// Run one login-to-save cycle against a recorded fixture and print the result.
async fn replay(config: SyncConfig, fixture_dir: PathBuf, all_pages: bool) -> Result<()> {
    tracing::info!(fixture = %fixture_dir.display(), data_dir = %config.data_dir.display(), "Replaying fixture");

    let session = SessionOrchestrator::new(
        config.clone(),
        Arc::new(FixtureRemoteFactory::new(fixture_dir)),
        Arc::new(FileCache::new(config.data_dir.clone())),
        Arc::new(LogFaultReporter::new()),
    );
    session.initialize().await?;

    if !session.is_authenticated() {
        let outcome = session.login("fixture", "").await?;
        if !outcome.is_logged_in() {
            bail!("login did not complete: {:?}", outcome);
        }
    }
    session.on_logged_in().await?;

    if all_pages {
        while session.inbox().pagination().await?.has_older {
            if session.inbox().load_older().await? == 0 {
                break;
            }
        }
    }

    let user = session
        .logged_in_user()
        .map(|u| u.username)
        .unwrap_or_default();
    println!("Logged in as {}", user);

    let threads = session.inbox().snapshot().await?;
    let pagination = session.inbox().pagination().await?;
    println!(
        "\nInbox ({} threads, {} pages, {} unseen{})",
        threads.len(),
        pagination.pages_loaded,
        pagination.unseen_count,
        if pagination.has_older { ", more available" } else { "" }
    );
    for (_, thread) in &threads {
        println!("  {:<24} {:<32} {}", thread.thread_id, title(thread), preview(thread));
    }

    let reels = session.reels().reels().await?;
    println!("\nReels ({})", reels.len());
    for (_, reel) in &reels {
        let unseen = if reel.has_unseen() { "*" } else { " " };
        println!("  {} {:<24} {} items", unseen, reel.owner.username, reel.items.len());
    }

    println!(
        "\nPresence for {} users, {} users known",
        session.presence().map().len(),
        session.registry().len()
    );

    session.reels().stop();
    session.save_state().await?;
    Ok(())
}

fn title(thread: &Thread) -> String {
    if !thread.title.is_empty() {
        return thread.title.clone();
    }
    thread
        .users
        .iter()
        .map(|u| u.username.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn preview(thread: &Thread) -> &str {
    thread
        .latest_item()
        .or(thread.last_permanent_item.as_ref())
        .and_then(|item| item.text.as_deref())
        .unwrap_or("")
}
