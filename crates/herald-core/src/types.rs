//! Core data model: recipients, thematic events, dispatch outcomes.

use serde::{Deserialize, Serialize};

/// Platform-assigned chat identifier. Identity only; no profile data is kept.
pub type RecipientId = i64;

/// A calendar-day-bound occasion with an optional illustrative screenshot.
/// The (month, day) pair recurs annually; the year is never part of identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThematicEvent {
    pub month: u32,
    pub day: u32,
    pub name: String,
    /// File name resolved relative to the configured media directory.
    pub screenshot: String,
}

impl ThematicEvent {
    /// Announcement caption for this event.
    pub fn caption(&self) -> String {
        format!("🌚 Today is {} - a thematic daily! Good luck!", self.name)
    }
}

/// Wire shape of the thematic table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThematicTable {
    pub thematic_dates: Vec<ThematicEvent>,
}

/// Result of a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
}

/// Result of an unsubscribe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Removed,
    NotSubscribed,
}

/// Per-recipient delivery result within one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Aggregated counts for one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub succeeded: u32,
    pub failed: u32,
}

impl DispatchSummary {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.succeeded += 1,
            DeliveryOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.succeeded + self.failed
    }
}

/// Incoming chat message, reduced to what the command surface needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Chat the message arrived in; replies and subscriptions target this.
    pub chat_id: RecipientId,
    /// User who sent it.
    pub sender_id: RecipientId,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_contains_name() {
        let event = ThematicEvent {
            month: 10,
            day: 31,
            name: "Halloween".into(),
            screenshot: "h.png".into(),
        };
        assert!(event.caption().contains("Halloween"));
    }

    #[test]
    fn test_event_json_field_names() {
        let json = r#"{"month":10,"day":31,"name":"Halloween","screenshot":"h.png"}"#;
        let event: ThematicEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.month, 10);
        assert_eq!(event.day, 31);
        assert_eq!(event.screenshot, "h.png");
    }

    #[test]
    fn test_table_wire_shape() {
        let json = r#"{"thematic_dates":[{"month":1,"day":1,"name":"New Year","screenshot":"ny.png"}]}"#;
        let table: ThematicTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.thematic_dates.len(), 1);
        assert_eq!(table.thematic_dates[0].name, "New Year");
    }

    #[test]
    fn test_summary_record() {
        let mut summary = DispatchSummary::default();
        summary.record(&DeliveryOutcome::Delivered);
        summary.record(&DeliveryOutcome::Delivered);
        summary.record(&DeliveryOutcome::Failed("chat not found".into()));
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
    }
}
