//! # ReportBot — report collection bot
//!
//! Accepts report files from registered participants over Telegram, stores them
//! under a per-participant directory tree and reminds about missing formats.
//!
//! Usage:
//!   reportbot                              # Run with ~/.reportbot/config.yaml
//!   reportbot --config ./config.yaml       # Custom registry file
//!   reportbot --check                      # Validate registry, create dirs and exit

mod dispatch;

use anyhow::Result;
use clap::Parser;
use reportbot_channels::{TelegramChannel, TelegramConfig};
use reportbot_core::{Registry, RegistryStore};
use reportbot_scheduler::RetryPolicy;
use reportbot_tracker::{DocumentIntake, WatcherRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::dispatch::Dispatcher;

#[derive(Parser)]
#[command(
    name = "reportbot",
    version,
    about = "📚 ReportBot — collects report files and reminds about missing ones"
)]
struct Cli {
    /// Registry file (participants, admins, work items, report formats)
    #[arg(short, long)]
    config: Option<String>,

    /// Validate the registry, prepare directories and exit
    #[arg(long)]
    check: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "reportbot=debug"
    } else {
        "reportbot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli
        .config
        .as_deref()
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(Registry::default_path);

    tracing::info!("📄 Load registry from {}", config_path.display());
    let mut registry = Registry::load_from(&config_path)?;

    tracing::info!("📁 Prepare student workdirs");
    registry.prepare_work_dirs()?;

    if cli.check {
        println!("✅ Registry OK: {}", config_path.display());
        println!("   👥 Students:   {}", registry.student.len());
        println!("   🧑‍🏫 Admins:     {}", registry.admin.len());
        println!("   📚 Works:      {}", registry.work.join(", "));
        println!(
            "   📎 Formats:    {}",
            registry
                .report_kinds()
                .iter()
                .map(|k| format!("{} (≤{} MB)", k.extension, k.max_size_mb()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("   📂 Work dir:   {}", registry.work_root().display());
        return Ok(());
    }

    if registry.bot_token.trim().is_empty() {
        anyhow::bail!("bot_token is not set in {}", config_path.display());
    }

    let policy = RetryPolicy::new(
        Duration::from_secs(registry.reminder.interval_secs),
        registry.reminder.attempts,
    );
    let channel = Arc::new(TelegramChannel::new(TelegramConfig::new(
        &registry.bot_token,
        registry.poll_interval,
    )));

    let me = channel.get_me().await?;
    tracing::info!(
        "🤖 Authorized on account {}",
        me.username.as_deref().unwrap_or(&me.first_name)
    );

    let store = Arc::new(RegistryStore::new(registry, &config_path));
    let watchers = Arc::new(WatcherRegistry::new());
    let intake = Arc::new(DocumentIntake::new(
        store.clone(),
        channel.clone(),
        channel.clone(),
        watchers.clone(),
        policy,
    ));
    let dispatcher = Arc::new(Dispatcher::new(channel.clone(), store, intake));

    let messages = channel.clone().start_polling();
    tokio::select! {
        _ = dispatcher.run(messages) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("🛑 Shutdown requested");
        }
    }

    let pending = watchers.active_count();
    watchers.cancel_all();
    tracing::info!("Cancelled {pending} pending reminder job(s)");
    Ok(())
}
