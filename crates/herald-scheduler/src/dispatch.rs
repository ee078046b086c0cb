//! Daily fan-out — deliver today's event to every subscriber.
//! One bad recipient, one missing screenshot, or one failed save never
//! aborts the batch.

use std::path::Path;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use herald_core::error::Result;
use herald_core::traits::Sender;
use herald_core::types::{DeliveryOutcome, DispatchSummary, RecipientId, ThematicEvent};

use crate::calendar::ThematicCalendar;
use crate::store::SubscriberStore;

/// Message payload for one run: caption plus optional screenshot bytes.
pub struct Payload {
    pub caption: String,
    pub photo: Option<(Vec<u8>, String)>,
}

impl Payload {
    /// Build the payload for an event. The screenshot is attached when the
    /// referenced file exists under `media_dir`, otherwise text-only.
    pub fn for_event(event: &ThematicEvent, media_dir: &Path) -> Self {
        let caption = event.caption();
        let photo = if event.screenshot.is_empty() {
            None
        } else {
            let path = media_dir.join(&event.screenshot);
            match std::fs::read(&path) {
                Ok(bytes) => Some((bytes, event.screenshot.clone())),
                Err(e) => {
                    tracing::warn!(
                        "Screenshot {} unavailable, sending text-only: {e}",
                        path.display()
                    );
                    None
                }
            }
        };
        Self { caption, photo }
    }
}

/// Outcome of an interactive "what about today" check.
#[derive(Debug, PartialEq, Eq)]
pub enum OnDemandOutcome {
    EventToday { delivered_photo: bool },
    NoEventToday,
}

/// Stateless fan-out dispatcher. Borrows the store and calendar for the
/// duration of one run; a `try_lock` guard skips a run that arrives while
/// another is still in flight.
pub struct Dispatcher {
    running: Mutex<()>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            running: Mutex::new(()),
        }
    }

    /// One daily run: reload subscribers from disk, match today against the
    /// calendar, fan the payload out. Per-recipient failures are counted and
    /// the batch continues; no retry within a run.
    pub async fn run_daily(
        &self,
        store: &Mutex<SubscriberStore>,
        calendar: &ThematicCalendar,
        sender: &dyn Sender,
        media_dir: &Path,
        today: NaiveDate,
    ) -> DispatchSummary {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Dispatch already in progress, skipping this run");
                return DispatchSummary::default();
            }
        };

        // Snapshot under the store lock, deliver outside it: a subscribe or
        // unsubscribe arriving mid-run affects the next run, not this one.
        let recipients = {
            let mut store = store.lock().await;
            store.reload();
            if store.is_empty() {
                tracing::info!("No subscribers, skipping dispatch");
                return DispatchSummary::default();
            }
            store.snapshot()
        };

        let Some(event) = calendar.match_day(today) else {
            tracing::info!("No thematic event on {today}, skipping dispatch");
            return DispatchSummary::default();
        };
        tracing::info!("🔔 Thematic event today: {}", event.name);

        let payload = Payload::for_event(event, media_dir);

        let mut summary = DispatchSummary::default();
        for recipient in recipients {
            let outcome = deliver(sender, recipient, &payload).await;
            if let DeliveryOutcome::Failed(reason) = &outcome {
                tracing::warn!("Delivery to {recipient} failed: {reason}");
            }
            summary.record(&outcome);
        }

        tracing::info!(
            "📣 Dispatch done: {} delivered, {} failed",
            summary.succeeded,
            summary.failed
        );
        summary
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-recipient variant for an interactive "check today" request.
/// A photo failure here falls back to text and is visible to the caller,
/// since this is one synchronous request-response rather than a batch.
pub async fn run_on_demand(
    calendar: &ThematicCalendar,
    sender: &dyn Sender,
    media_dir: &Path,
    recipient: RecipientId,
    today: NaiveDate,
) -> Result<OnDemandOutcome> {
    let Some(event) = calendar.match_day(today) else {
        return Ok(OnDemandOutcome::NoEventToday);
    };

    let payload = Payload::for_event(event, media_dir);
    match &payload.photo {
        Some((bytes, file_name)) => {
            match sender
                .send_photo(recipient, bytes.clone(), file_name, &payload.caption)
                .await
            {
                Ok(()) => Ok(OnDemandOutcome::EventToday {
                    delivered_photo: true,
                }),
                Err(e) => {
                    tracing::warn!("Photo send to {recipient} failed, falling back to text: {e}");
                    sender.send_text(recipient, &payload.caption).await?;
                    Ok(OnDemandOutcome::EventToday {
                        delivered_photo: false,
                    })
                }
            }
        }
        None => {
            sender.send_text(recipient, &payload.caption).await?;
            Ok(OnDemandOutcome::EventToday {
                delivered_photo: false,
            })
        }
    }
}

async fn deliver(sender: &dyn Sender, recipient: RecipientId, payload: &Payload) -> DeliveryOutcome {
    let result = match &payload.photo {
        Some((bytes, file_name)) => {
            sender
                .send_photo(recipient, bytes.clone(), file_name, &payload.caption)
                .await
        }
        None => sender.send_text(recipient, &payload.caption).await,
    };
    match result {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(e) => DeliveryOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use herald_core::error::HeraldError;
    use herald_core::types::ThematicTable;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("herald-test-dispatch").join(name);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    fn halloween_calendar() -> ThematicCalendar {
        ThematicCalendar::from_table(ThematicTable {
            thematic_dates: vec![ThematicEvent {
                month: 10,
                day: 31,
                name: "Halloween".into(),
                screenshot: "h.png".into(),
            }],
        })
    }

    fn halloween() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 31).unwrap()
    }

    /// Scripted sender: fails for the listed recipients, records the rest.
    struct MockSender {
        fail: HashSet<RecipientId>,
        sent: StdMutex<Vec<RecipientId>>,
    }

    impl MockSender {
        fn new(fail: impl IntoIterator<Item = RecipientId>) -> Self {
            Self {
                fail: fail.into_iter().collect(),
                sent: StdMutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<RecipientId> {
            self.sent.lock().unwrap().clone()
        }

        fn record(&self, recipient: RecipientId) -> Result<()> {
            if self.fail.contains(&recipient) {
                return Err(HeraldError::Channel(format!("chat {recipient} unreachable")));
            }
            self.sent.lock().unwrap().push(recipient);
            Ok(())
        }
    }

    #[async_trait]
    impl Sender for MockSender {
        async fn send_text(&self, recipient: RecipientId, _text: &str) -> Result<()> {
            self.record(recipient)
        }

        async fn send_photo(
            &self,
            recipient: RecipientId,
            _image: Vec<u8>,
            _file_name: &str,
            _caption: &str,
        ) -> Result<()> {
            self.record(recipient)
        }
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_batch() {
        let dir = scratch_dir("partial-failure");
        let path = dir.join("subscriptions.json");
        std::fs::remove_file(&path).ok();

        let store = Mutex::new(SubscriberStore::open(&path));
        {
            let mut s = store.lock().await;
            s.subscribe(1);
            s.subscribe(2);
            s.subscribe(3);
        }

        let sender = MockSender::new([2]);
        let summary = Dispatcher::new()
            .run_daily(&store, &halloween_calendar(), &sender, &dir, halloween())
            .await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        let mut sent = sender.sent();
        sent.sort_unstable();
        assert_eq!(sent, vec![1, 3]);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_empty_set_short_circuits_with_zero_attempts() {
        let dir = scratch_dir("empty-set");
        let path = dir.join("subscriptions.json");
        std::fs::remove_file(&path).ok();

        let store = Mutex::new(SubscriberStore::open(&path));
        let sender = MockSender::new([]);
        let summary = Dispatcher::new()
            .run_daily(&store, &halloween_calendar(), &sender, &dir, halloween())
            .await;

        assert_eq!(summary, DispatchSummary::default());
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_no_event_short_circuits() {
        let dir = scratch_dir("no-event");
        let path = dir.join("subscriptions.json");
        std::fs::remove_file(&path).ok();

        let store = Mutex::new(SubscriberStore::open(&path));
        store.lock().await.subscribe(1);

        let sender = MockSender::new([]);
        let summary = Dispatcher::new()
            .run_daily(
                &store,
                &halloween_calendar(),
                &sender,
                &dir,
                NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            )
            .await;

        assert_eq!(summary, DispatchSummary::default());
        assert!(sender.sent().is_empty());

        std::fs::remove_file(&path).ok();
    }

    /// Sender that subscribes a new recipient on its first delivery,
    /// simulating a /start arriving while a run is in flight.
    struct SubscribingSender {
        store: Arc<Mutex<SubscriberStore>>,
        new_id: RecipientId,
        sent: StdMutex<Vec<RecipientId>>,
    }

    #[async_trait]
    impl Sender for SubscribingSender {
        async fn send_text(&self, recipient: RecipientId, _text: &str) -> Result<()> {
            self.store.lock().await.subscribe(self.new_id);
            self.sent.lock().unwrap().push(recipient);
            Ok(())
        }

        async fn send_photo(
            &self,
            recipient: RecipientId,
            _image: Vec<u8>,
            _file_name: &str,
            _caption: &str,
        ) -> Result<()> {
            self.send_text(recipient, "").await
        }
    }

    #[tokio::test]
    async fn test_mid_run_subscribe_lands_in_next_run() {
        let dir = scratch_dir("mid-run-subscribe");
        let path = dir.join("subscriptions.json");
        std::fs::remove_file(&path).ok();

        let store = Arc::new(Mutex::new(SubscriberStore::open(&path)));
        {
            let mut s = store.lock().await;
            s.subscribe(1);
            s.subscribe(2);
            s.subscribe(3);
        }

        let sender = SubscribingSender {
            store: store.clone(),
            new_id: 4,
            sent: StdMutex::new(Vec::new()),
        };

        let dispatcher = Dispatcher::new();
        let first = dispatcher
            .run_daily(&store, &halloween_calendar(), &sender, &dir, halloween())
            .await;
        assert_eq!(first.total(), 3);
        assert!(!sender.sent.lock().unwrap().contains(&4));

        let second = dispatcher
            .run_daily(&store, &halloween_calendar(), &sender, &dir, halloween())
            .await;
        assert_eq!(second.total(), 4);
        assert!(sender.sent.lock().unwrap().contains(&4));

        std::fs::remove_file(&path).ok();
    }

    /// Slow sender used to hold a run open while a second one is attempted.
    struct SlowSender;

    #[async_trait]
    impl Sender for SlowSender {
        async fn send_text(&self, _recipient: RecipientId, _text: &str) -> Result<()> {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            Ok(())
        }

        async fn send_photo(
            &self,
            _recipient: RecipientId,
            _image: Vec<u8>,
            _file_name: &str,
            _caption: &str,
        ) -> Result<()> {
            self.send_text(_recipient, "").await
        }
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let dir = scratch_dir("overlap-guard");
        let path = dir.join("subscriptions.json");
        std::fs::remove_file(&path).ok();

        let store = Arc::new(Mutex::new(SubscriberStore::open(&path)));
        {
            let mut s = store.lock().await;
            s.subscribe(1);
            s.subscribe(2);
        }

        let dispatcher = Arc::new(Dispatcher::new());
        let calendar = Arc::new(halloween_calendar());

        let first = {
            let dispatcher = dispatcher.clone();
            let store = store.clone();
            let calendar = calendar.clone();
            let dir = dir.clone();
            tokio::spawn(async move {
                dispatcher
                    .run_daily(&store, &calendar, &SlowSender, &dir, halloween())
                    .await
            })
        };

        // Give the first run time to take the guard.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let second = dispatcher
            .run_daily(&store, &calendar, &SlowSender, &dir, halloween())
            .await;
        assert_eq!(second, DispatchSummary::default());

        let first = first.await.unwrap();
        assert_eq!(first.succeeded, 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_on_demand_photo_failure_falls_back_to_text() {
        let dir = scratch_dir("on-demand-fallback");
        std::fs::write(dir.join("h.png"), b"png bytes").unwrap();

        // Photo always fails, text succeeds.
        struct PhotolessSender {
            texts: StdMutex<Vec<(RecipientId, String)>>,
        }

        #[async_trait]
        impl Sender for PhotolessSender {
            async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<()> {
                self.texts.lock().unwrap().push((recipient, text.into()));
                Ok(())
            }

            async fn send_photo(
                &self,
                _recipient: RecipientId,
                _image: Vec<u8>,
                _file_name: &str,
                _caption: &str,
            ) -> Result<()> {
                Err(HeraldError::Channel("photo rejected".into()))
            }
        }

        let sender = PhotolessSender {
            texts: StdMutex::new(Vec::new()),
        };
        let outcome = run_on_demand(&halloween_calendar(), &sender, &dir, 7, halloween())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            OnDemandOutcome::EventToday {
                delivered_photo: false
            }
        );
        let texts = sender.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].1.contains("Halloween"));

        std::fs::remove_file(dir.join("h.png")).ok();
    }

    #[tokio::test]
    async fn test_on_demand_no_event() {
        let dir = scratch_dir("on-demand-none");
        let sender = MockSender::new([]);
        let outcome = run_on_demand(
            &halloween_calendar(),
            &sender,
            &dir,
            7,
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, OnDemandOutcome::NoEventToday);
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_payload_attaches_existing_screenshot() {
        let dir = scratch_dir("payload-photo");
        std::fs::write(dir.join("h.png"), b"png bytes").unwrap();

        let event = ThematicEvent {
            month: 10,
            day: 31,
            name: "Halloween".into(),
            screenshot: "h.png".into(),
        };
        let payload = Payload::for_event(&event, &dir);
        let (bytes, file_name) = payload.photo.expect("photo attached");
        assert_eq!(bytes, b"png bytes");
        assert_eq!(file_name, "h.png");

        std::fs::remove_file(dir.join("h.png")).ok();
    }

    #[test]
    fn test_payload_degrades_to_text_when_screenshot_missing() {
        let dir = scratch_dir("payload-missing");
        let event = ThematicEvent {
            month: 10,
            day: 31,
            name: "Halloween".into(),
            screenshot: "nope.png".into(),
        };
        let payload = Payload::for_event(&event, &dir);
        assert!(payload.photo.is_none());
        assert!(payload.caption.contains("Halloween"));
    }
}
