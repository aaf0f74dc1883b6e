//! # Features Layer
//!
//! The scheduling core: calendar rendering, the per-conversation selection
//! flow, the timer registry, and the advance-reminder scheduler.

pub mod calendar;
pub mod reminders;
pub mod selection;
pub mod timers;

pub use reminders::{derive_schedule, format_offset, ReminderScheduler, LONG_HORIZON_DAYS};
pub use selection::{
    decode_action, ConversationId, ConversationState, Reply, SelectionEvent, SelectionFlow,
    SelectionState,
};
pub use timers::{ReminderEntry, TimerId, TimerInfo, TimerRegistry, TimerState};
