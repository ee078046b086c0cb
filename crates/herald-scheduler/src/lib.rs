//! # Herald Scheduler
//!
//! Subscriber registry, thematic calendar, and the daily fan-out dispatch.
//! File-based state only — no database, no queue.
//!
//! ## Architecture
//! ```text
//! daily timer (sleep until HH:MM UTC)
//!   └── Dispatcher::run_daily
//!         ├── SubscriberStore — reload from disk, snapshot recipients
//!         ├── ThematicCalendar — (month, day) match, first hit wins
//!         └── Sender — per-recipient delivery, failures counted not fatal
//! ```

pub mod calendar;
pub mod daily;
pub mod dispatch;
pub mod store;

pub use calendar::ThematicCalendar;
pub use dispatch::{Dispatcher, OnDemandOutcome, Payload};
pub use store::SubscriberStore;
