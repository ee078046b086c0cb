//! # Herald Core
//! Shared types, error taxonomy, and configuration for the herald bot.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
pub use traits::Sender;
pub use types::{
    DeliveryOutcome, DispatchSummary, IncomingMessage, RecipientId, SubscribeOutcome,
    ThematicEvent, ThematicTable, UnsubscribeOutcome,
};
