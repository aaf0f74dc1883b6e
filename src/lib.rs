// Core layer - configuration and error taxonomy
pub mod core;

// Rendering layer - abstract keyboards and the action-token grammar
pub mod components;

// Features layer - calendar, selection flow, timers, reminders
pub mod features;

// Delivery boundary - notification sink consumed by the timer executor
pub mod sink;

// Re-export core items
pub use crate::core::{Config, FlowError, ScheduleError};

// Re-export rendering items
pub use components::{Cell, Keyboard};

// Re-export feature items
pub use features::{
    // Calendar
    calendar,
    // Reminders
    derive_schedule, ReminderScheduler,
    // Selection
    decode_action, ConversationId, ConversationState, Reply, SelectionEvent, SelectionFlow,
    SelectionState,
    // Timers
    ReminderEntry, TimerId, TimerInfo, TimerRegistry, TimerState,
};

// Re-export delivery boundary items
pub use sink::{DeliverySink, DeliveryTarget, LogSink};
