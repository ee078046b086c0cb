//! Daily trigger — sleeps until the configured time-of-day, then runs one
//! dispatch. Zero overhead between slots.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use herald_core::traits::Sender;

use crate::calendar::ThematicCalendar;
use crate::dispatch::Dispatcher;
use crate::store::SubscriberStore;

/// Next UTC instant with the given time-of-day, strictly after `after`.
/// Out-of-range config values clamp into the valid range.
pub fn next_notify_time(after: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let hour = hour.min(23);
    let minute = minute.min(59);
    let slot = match after.date_naive().and_hms_opt(hour, minute, 0) {
        Some(t) => t.and_utc(),
        None => after,
    };
    if slot > after {
        slot
    } else {
        slot + Duration::days(1)
    }
}

/// Spawn the daily notification loop as a background tokio task.
/// Fires at most once per slot; the dispatcher's own guard covers a manual
/// run overlapping a scheduled one.
pub fn spawn_daily(
    store: Arc<Mutex<SubscriberStore>>,
    calendar: Arc<ThematicCalendar>,
    sender: Arc<dyn Sender>,
    dispatcher: Arc<Dispatcher>,
    media_dir: PathBuf,
    hour: u32,
    minute: u32,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("⏰ Daily notifier started (fires at {hour:02}:{minute:02} UTC)");

        loop {
            let now = Utc::now();
            let next = next_notify_time(now, hour, minute);
            tracing::debug!("Next dispatch slot: {next}");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let today = Utc::now().date_naive();
            let summary = dispatcher
                .run_daily(&store, &calendar, sender.as_ref(), &media_dir, today)
                .await;
            tracing::info!(
                "Daily dispatch summary: {} delivered, {} failed",
                summary.succeeded,
                summary.failed
            );
        }
    })
}
