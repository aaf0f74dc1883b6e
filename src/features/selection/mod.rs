//! # Date/Time Selection Flow
//!
//! Per-conversation state machine that walks a user from "pick a date"
//! through "pick a time" to a committed timer. State is an explicit tagged
//! enum, so contradictory flag combinations cannot exist, and every
//! conversation navigates its own calendar independently.
//!
//! Flow: a day is selected (calendar tap, quick pick, or typed date). Dates
//! within the long horizon go straight to time selection; dates further out
//! first ask whether to attach a specific time at all ("no" commits the
//! timer at midnight). Invalid input never moves the machine: it surfaces a
//! [`FlowError`] and the transport re-prompts in place.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Quick-pick buttons on the start keyboard
//! - 1.0.0: Calendar flow with slot and free-text time entry

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::components::{self, Keyboard};
use crate::core::error::{FlowError, ScheduleError};
use crate::features::calendar;
use crate::features::reminders::LONG_HORIZON_DAYS;
use crate::features::timers::{TimerId, TimerRegistry};
use crate::sink::DeliveryTarget;

/// Identifies the conversation an event belongs to.
pub type ConversationId = u64;

/// Where a conversation currently is in the selection flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionState {
    /// No date chosen; the calendar or start keyboard is showing.
    Idle,
    /// A date is pending and the time-slot keyboard is showing.
    ChoosingTime { date: NaiveDate },
    /// A far-out date is pending; waiting for "attach a time?" yes/no.
    AwaitingConfirmation { date: NaiveDate },
    /// A date is pending; waiting for a free-text `HH:MM`.
    AwaitingManualEntry { date: NaiveDate },
}

impl SelectionState {
    /// The tentatively chosen date, in any non-idle state.
    pub fn pending_date(&self) -> Option<NaiveDate> {
        match *self {
            SelectionState::Idle => None,
            SelectionState::ChoosingTime { date }
            | SelectionState::AwaitingConfirmation { date }
            | SelectionState::AwaitingManualEntry { date } => Some(date),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            SelectionState::Idle => "idle",
            SelectionState::ChoosingTime { .. } => "choosing a time",
            SelectionState::AwaitingConfirmation { .. } => "awaiting confirmation",
            SelectionState::AwaitingManualEntry { .. } => "awaiting manual time entry",
        }
    }
}

/// Everything the flow tracks per conversation. The displayed month belongs
/// to the navigator and survives selection resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub displayed_month: (i32, u32),
    pub state: SelectionState,
}

/// Discrete selection inputs, decoded from action tokens or free text by
/// the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEvent {
    CalendarRequested,
    DaySelected(NaiveDate),
    MonthNav { year: i32, month: u32 },
    TimeSlotSelected { hour: u32, minute: u32 },
    ManualEntryRequested,
    ManualTimeEntered(String),
    ConfirmationAnswered(String),
    BackRequested,
}

/// Map an echoed action token onto a selection event. `today` anchors the
/// quick-pick offsets. Unknown tokens yield `None`.
pub fn decode_action(token: &str, today: NaiveDate) -> Option<SelectionEvent> {
    match token {
        components::BACK => return Some(SelectionEvent::BackRequested),
        components::PICK_DATE => return Some(SelectionEvent::CalendarRequested),
        components::MANUAL_TIME => return Some(SelectionEvent::ManualEntryRequested),
        components::CONFIRM_YES => {
            return Some(SelectionEvent::ConfirmationAnswered("yes".to_string()))
        }
        components::CONFIRM_NO => {
            return Some(SelectionEvent::ConfirmationAnswered("no".to_string()))
        }
        _ => {}
    }
    if let Some(date) = components::parse_day_token(token) {
        return Some(SelectionEvent::DaySelected(date));
    }
    if let Some((year, month)) = components::parse_nav_token(token) {
        return Some(SelectionEvent::MonthNav { year, month });
    }
    if let Some((hour, minute)) = components::parse_slot_token(token) {
        return Some(SelectionEvent::TimeSlotSelected { hour, minute });
    }
    if let Some(days) = components::parse_quick_token(token) {
        // An offset too large for the calendar is as unknown as a bad prefix.
        let date = Duration::try_days(days).and_then(|offset| today.checked_add_signed(offset))?;
        return Some(SelectionEvent::DaySelected(date));
    }
    None
}

/// What the transport should show the user next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// A prompt, optionally with a keyboard to render.
    Prompt {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// A timer was committed; the flow is back at idle.
    TimerSet {
        id: TimerId,
        target: DateTime<Utc>,
        text: String,
    },
}

impl Reply {
    fn prompt(text: impl Into<String>, keyboard: Option<Keyboard>) -> Self {
        Reply::Prompt {
            text: text.into(),
            keyboard,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Reply::Prompt { text, .. } | Reply::TimerSet { text, .. } => text,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Reply::Prompt { keyboard, .. } => keyboard.as_ref(),
            Reply::TimerSet { .. } => None,
        }
    }
}

/// Drives the per-conversation selection state machines and commits
/// finished selections into the timer registry.
pub struct SelectionFlow {
    conversations: DashMap<ConversationId, ConversationState>,
    registry: TimerRegistry,
}

impl SelectionFlow {
    pub fn new(registry: TimerRegistry) -> Self {
        SelectionFlow {
            conversations: DashMap::new(),
            registry,
        }
    }

    /// Begin (or restart) the flow for a conversation: reset to idle, point
    /// the navigator at the current month, and offer the quick picks.
    pub fn start(
        &self,
        conversation: ConversationId,
        now: DateTime<Utc>,
        quick_days: &[i64],
    ) -> Reply {
        let today = now.date_naive();
        self.conversations.insert(
            conversation,
            ConversationState {
                displayed_month: (today.year(), today.month()),
                state: SelectionState::Idle,
            },
        );
        debug!("conversation {conversation}: flow started");
        Reply::prompt(
            "⏰ Pick a date for your timer:",
            Some(components::start_keyboard(quick_days)),
        )
    }

    /// Snapshot of a conversation's state, if the flow has seen it.
    pub fn state_of(&self, conversation: ConversationId) -> Option<ConversationState> {
        self.conversations
            .get(&conversation)
            .map(|entry| entry.value().clone())
    }

    /// Apply one selection event. `Ok` carries the next thing to show; `Err`
    /// means the input was rejected, the state did not move, and the
    /// transport should re-prompt with the error's message.
    pub fn handle_event(
        &self,
        conversation: ConversationId,
        event: SelectionEvent,
        now: DateTime<Utc>,
    ) -> Result<Reply, FlowError> {
        let mut conv = self
            .conversations
            .entry(conversation)
            .or_insert_with(|| ConversationState {
                displayed_month: (now.year(), now.month()),
                state: SelectionState::Idle,
            });

        match event {
            SelectionEvent::CalendarRequested => {
                let (year, month) = conv.displayed_month;
                Ok(calendar_reply(year, month))
            }
            SelectionEvent::MonthNav { year, month } => {
                let (year, month) = calendar::normalize(year, month as i32);
                conv.displayed_month = (year, month);
                Ok(calendar_reply(year, month))
            }
            SelectionEvent::BackRequested => {
                conv.state = SelectionState::Idle;
                let (year, month) = conv.displayed_month;
                Ok(calendar_reply(year, month))
            }
            SelectionEvent::DaySelected(date) => {
                if conv.state != SelectionState::Idle {
                    return Err(FlowError::UnknownAction(format!(
                        "day selection while {}",
                        conv.state.describe()
                    )));
                }
                if date < now.date_naive() {
                    return Err(FlowError::InvalidTarget);
                }
                let lead = at_utc(date, NaiveTime::MIN) - now;
                if lead > Duration::days(LONG_HORIZON_DAYS) {
                    conv.state = SelectionState::AwaitingConfirmation { date };
                    Ok(Reply::prompt(
                        format!("📅 {date} is a long way out. Attach a specific time of day?"),
                        Some(components::confirmation_keyboard()),
                    ))
                } else {
                    conv.state = SelectionState::ChoosingTime { date };
                    Ok(slot_reply(date))
                }
            }
            SelectionEvent::ConfirmationAnswered(answer) => {
                let SelectionState::AwaitingConfirmation { date } = conv.state else {
                    return Err(FlowError::UnknownAction(format!(
                        "confirmation while {}",
                        conv.state.describe()
                    )));
                };
                match parse_confirmation(&answer) {
                    Some(true) => {
                        conv.state = SelectionState::ChoosingTime { date };
                        Ok(slot_reply(date))
                    }
                    Some(false) => self.commit(&mut conv, conversation, date, NaiveTime::MIN, now),
                    None => Err(FlowError::UnrecognizedConfirmation(answer)),
                }
            }
            SelectionEvent::ManualEntryRequested => {
                let SelectionState::ChoosingTime { date } = conv.state else {
                    return Err(FlowError::UnknownAction(format!(
                        "manual entry while {}",
                        conv.state.describe()
                    )));
                };
                conv.state = SelectionState::AwaitingManualEntry { date };
                Ok(Reply::prompt(
                    "⌨️ Type a time as HH:MM (24-hour, UTC):",
                    None,
                ))
            }
            SelectionEvent::TimeSlotSelected { hour, minute } => {
                let date = self.pending_date_for_time(&conv)?;
                let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
                    FlowError::MalformedTimeInput(format!("{hour:02}:{minute:02}"))
                })?;
                self.commit(&mut conv, conversation, date, time, now)
            }
            SelectionEvent::ManualTimeEntered(text) => {
                let date = self.pending_date_for_time(&conv)?;
                let time = parse_manual_time(&text)?;
                self.commit(&mut conv, conversation, date, time, now)
            }
        }
    }

    fn pending_date_for_time(&self, conv: &ConversationState) -> Result<NaiveDate, FlowError> {
        match conv.state {
            SelectionState::ChoosingTime { date }
            | SelectionState::AwaitingManualEntry { date } => Ok(date),
            _ => Err(FlowError::UnknownAction(format!(
                "time entry while {}",
                conv.state.describe()
            ))),
        }
    }

    /// Resolve the target instant and hand it to the registry. On success
    /// the conversation drops back to idle; on rejection it stays put so the
    /// user can try another time.
    fn commit(
        &self,
        conv: &mut ConversationState,
        conversation: ConversationId,
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<Reply, FlowError> {
        let target = at_utc(date, time);
        let delivery = DeliveryTarget::conversation(conversation);
        match self.registry.schedule_at(target, delivery, now) {
            Ok(id) => {
                conv.state = SelectionState::Idle;
                info!("conversation {conversation}: committed timer {id} for {target}");
                Ok(Reply::TimerSet {
                    id,
                    target,
                    text: format!(
                        "⏰ Timer set for **{}**. I'll remind you as it approaches.",
                        target.format("%Y-%m-%d %H:%M UTC")
                    ),
                })
            }
            Err(ScheduleError::InvalidTarget { .. }) => Err(FlowError::InvalidTarget),
            Err(err @ ScheduleError::Exhausted { .. }) => {
                // Exhaustion is not the user's fault; report it without
                // disturbing their selection.
                error!("conversation {conversation}: {err}");
                Ok(Reply::prompt(format!("⚠️ {err}. Try again later."), None))
            }
        }
    }
}

/// Interpret a confirmation answer. `None` means unrecognized.
fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parse free-text `HH:MM` with strict range validation.
fn parse_manual_time(text: &str) -> Result<NaiveTime, FlowError> {
    let trimmed = text.trim();
    let malformed = || FlowError::MalformedTimeInput(trimmed.to_string());

    let (hour, minute) = trimmed.split_once(':').ok_or_else(malformed)?;
    let hour: u32 = hour.trim().parse().map_err(|_| malformed())?;
    let minute: u32 = minute.trim().parse().map_err(|_| malformed())?;
    if hour >= 24 || minute >= 60 {
        return Err(malformed());
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)
}

fn at_utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(date.and_time(time), Utc)
}

fn calendar_reply(year: i32, month: u32) -> Reply {
    Reply::prompt(
        "📅 Pick a date for your timer:",
        Some(calendar::render(year, month)),
    )
}

fn slot_reply(date: NaiveDate) -> Reply {
    Reply::prompt(
        format!("🕑 Pick a time for {date} (UTC):"),
        Some(components::time_slot_keyboard()),
    )
}
