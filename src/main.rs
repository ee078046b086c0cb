//! # Herald
//!
//! Telegram bot that announces thematic daily events to its subscribers.
//!
//! Usage:
//!   herald run                  # Start the bot (command loop + daily timer)
//!   herald dispatch             # Force one dispatch run now
//!   herald today                # Print today's event, if any
//!   herald config show          # Show configuration

mod bot;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use herald_channels::telegram::TelegramChannel;
use herald_core::HeraldConfig;
use herald_scheduler::calendar::ThematicCalendar;
use herald_scheduler::daily;
use herald_scheduler::dispatch::Dispatcher;
use herald_scheduler::store::SubscriberStore;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "📣 herald — thematic daily notification bot for Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot: command loop plus the daily notifier
    Run,
    /// Force one dispatch run now
    Dispatch,
    /// Show today's thematic event without sending anything
    Today,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write the default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "herald=debug,herald_core=debug,herald_scheduler=debug,herald_channels=debug"
    } else {
        "herald=info,herald_scheduler=info,herald_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = if let Some(path) = &cli.config {
        HeraldConfig::load_from(Path::new(path))?
    } else {
        HeraldConfig::load()?
    };

    match cli.command {
        Commands::Run => run_bot(config).await?,

        Commands::Dispatch => {
            require_token(&config)?;
            let calendar = ThematicCalendar::load(&config.storage.thematic_dates_file)?;
            let store = Mutex::new(SubscriberStore::open(&config.storage.subscriptions_file));
            let sender = TelegramChannel::new(config.telegram.clone());

            let summary = Dispatcher::new()
                .run_daily(
                    &store,
                    &calendar,
                    &sender,
                    &config.storage.media_dir,
                    chrono::Utc::now().date_naive(),
                )
                .await;
            println!(
                "Dispatch finished: {} delivered, {} failed",
                summary.succeeded, summary.failed
            );
        }

        Commands::Today => {
            let calendar = ThematicCalendar::load(&config.storage.thematic_dates_file)?;
            match calendar.match_day(chrono::Utc::now().date_naive()) {
                Some(event) => println!(
                    "🔔 {} ({:02}.{:02}, screenshot: {})",
                    event.name, event.day, event.month, event.screenshot
                ),
                None => println!("📅 No thematic event today."),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("Config file: {}", HeraldConfig::default_path().display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Init => {
                HeraldConfig::default().save()?;
                println!("✅ Wrote {}", HeraldConfig::default_path().display());
            }
        },
    }

    Ok(())
}

async fn run_bot(config: HeraldConfig) -> Result<()> {
    require_token(&config)?;

    // A missing or malformed table is loud at startup but does not stop the
    // bot: it runs in the "no event today" state until the file is fixed.
    let calendar = match ThematicCalendar::load(&config.storage.thematic_dates_file) {
        Ok(calendar) => {
            tracing::info!("Loaded {} thematic date(s)", calendar.len());
            calendar
        }
        Err(e) => {
            tracing::error!("Thematic table unavailable: {e}");
            ThematicCalendar::empty()
        }
    };
    let calendar = Arc::new(calendar);

    let store = Arc::new(Mutex::new(SubscriberStore::open(
        &config.storage.subscriptions_file,
    )));

    // One channel instance feeds the polling loop, the other sends replies
    // and notifications.
    let poller = TelegramChannel::new(config.telegram.clone());
    let sender = Arc::new(TelegramChannel::new(config.telegram.clone()));

    let me = sender.get_me().await?;
    tracing::info!("🤖 Bot: @{}", me.username.as_deref().unwrap_or("unknown"));

    daily::spawn_daily(
        store.clone(),
        calendar.clone(),
        sender.clone(),
        Arc::new(Dispatcher::new()),
        config.storage.media_dir.clone(),
        config.notify.hour,
        config.notify.minute,
    );

    let bot = bot::Bot::new(store, calendar, sender, config.storage.media_dir.clone());
    let stream = poller.start_polling();

    tokio::select! {
        _ = bot.run(stream) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("👋 Shutting down");
        }
    }
    Ok(())
}

fn require_token(config: &HeraldConfig) -> Result<()> {
    if config.telegram.token().is_empty() {
        anyhow::bail!("No bot token configured (set [telegram] bot_token or HERALD_BOT_TOKEN)");
    }
    Ok(())
}
