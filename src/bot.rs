//! Command loop — maps incoming chat commands onto the store and calendar.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_stream::{Stream, StreamExt};

use herald_core::traits::Sender;
use herald_core::types::{IncomingMessage, RecipientId, SubscribeOutcome, UnsubscribeOutcome};
use herald_scheduler::calendar::ThematicCalendar;
use herald_scheduler::dispatch::{run_on_demand, OnDemandOutcome};
use herald_scheduler::store::SubscriberStore;

const HELP_TEXT: &str = "🎮 Available commands:\n\n\
    /start - Subscribe to thematic daily notifications\n\
    /stop - Unsubscribe\n\
    /today - Check whether today is a thematic daily\n\
    /stats - Show subscriber stats\n\
    /help - Show this message";

/// The bot's interactive surface. Holds shared handles to the store and
/// calendar; every handler is a thin pass-through to them.
pub struct Bot<S: Sender> {
    store: Arc<Mutex<SubscriberStore>>,
    calendar: Arc<ThematicCalendar>,
    sender: Arc<S>,
    media_dir: PathBuf,
}

impl<S: Sender> Bot<S> {
    pub fn new(
        store: Arc<Mutex<SubscriberStore>>,
        calendar: Arc<ThematicCalendar>,
        sender: Arc<S>,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            calendar,
            sender,
            media_dir,
        }
    }

    /// Consume the incoming stream until it closes.
    pub async fn run<St>(self, mut stream: St)
    where
        St: Stream<Item = IncomingMessage> + Unpin,
    {
        tracing::info!("🤖 Command loop started");
        while let Some(msg) = stream.next().await {
            self.handle(msg).await;
        }
        tracing::warn!("Command loop ended (polling stream closed)");
    }

    pub async fn handle(&self, msg: IncomingMessage) {
        match parse_command(&msg.text) {
            Some("/start") => self.handle_start(msg.chat_id).await,
            Some("/stop") => self.handle_stop(msg.chat_id).await,
            Some("/today") => self.handle_today(msg.chat_id).await,
            Some("/stats") => self.handle_stats(&msg).await,
            Some("/help") => self.handle_help(msg.chat_id).await,
            _ => {}
        }
    }

    async fn handle_start(&self, chat_id: RecipientId) {
        let outcome = self.store.lock().await.subscribe(chat_id);
        let reply = match outcome {
            SubscribeOutcome::Added => {
                tracing::info!("Chat {chat_id} subscribed");
                "You're subscribed to thematic daily notifications! 🎮\n\n\
                 Expect a message on days with a thematic run.\n\
                 Use /stop to unsubscribe."
            }
            SubscribeOutcome::AlreadySubscribed => "You're already subscribed! ✅",
        };
        self.reply(chat_id, reply).await;
    }

    async fn handle_stop(&self, chat_id: RecipientId) {
        let outcome = self.store.lock().await.unsubscribe(chat_id);
        let reply = match outcome {
            UnsubscribeOutcome::Removed => {
                tracing::info!("Chat {chat_id} unsubscribed");
                "You're unsubscribed from notifications.\nChanged your mind? Just send /start"
            }
            UnsubscribeOutcome::NotSubscribed => "You weren't subscribed to begin with. 🤷",
        };
        self.reply(chat_id, reply).await;
    }

    async fn handle_today(&self, chat_id: RecipientId) {
        let today = Utc::now().date_naive();
        match run_on_demand(
            &self.calendar,
            self.sender.as_ref(),
            &self.media_dir,
            chat_id,
            today,
        )
        .await
        {
            Ok(OnDemandOutcome::EventToday { .. }) => {}
            Ok(OnDemandOutcome::NoEventToday) => {
                self.reply(chat_id, "📅 No thematic daily today.").await;
            }
            Err(e) => {
                tracing::warn!("On-demand check for {chat_id} failed: {e}");
                self.reply(chat_id, "Something went wrong checking today's daily, try again later.")
                    .await;
            }
        }
    }

    async fn handle_stats(&self, msg: &IncomingMessage) {
        let count = self.store.lock().await.count();
        let text = format!(
            "📊 Bot stats:\nSubscribers: {count}\nYour ID: {}",
            msg.sender_id
        );
        self.reply(msg.chat_id, &text).await;
    }

    async fn handle_help(&self, chat_id: RecipientId) {
        self.reply(chat_id, HELP_TEXT).await;
    }

    async fn reply(&self, chat_id: RecipientId, text: &str) {
        if let Err(e) = self.sender.send_text(chat_id, text).await {
            tracing::warn!("Reply to {chat_id} failed: {e}");
        }
    }
}

/// Extract the leading slash-command, stripping any "@botname" suffix that
/// Telegram appends in group chats.
fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    first.split('@').next()
}
