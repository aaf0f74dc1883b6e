//! # Keyboard Components
//!
//! Abstract keyboard structures shared with the chat transport, plus the
//! action-token grammar. The transport renders a [`Keyboard`] however it
//! likes (inline buttons, console text) and echoes each button's token back
//! verbatim when the user taps it.
//!
//! Token grammar:
//! - `day_YYYY-MM-DD` — calendar day cell
//! - `nav_YYYY_MM` — show the given month
//! - `slot_HH:MM` — half-hour time slot
//! - `quick_N` — quick pick, N days from today
//! - `confirm_yes` / `confirm_no` — attach-a-time confirmation
//! - `manual_time` — switch to free-text time entry
//! - `pick_date` — open the calendar
//! - `back` — abandon the flow

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Token prefixes and fixed tokens for routing
pub const DAY_PREFIX: &str = "day_";
pub const NAV_PREFIX: &str = "nav_";
pub const SLOT_PREFIX: &str = "slot_";
pub const QUICK_PREFIX: &str = "quick_";
pub const CONFIRM_YES: &str = "confirm_yes";
pub const CONFIRM_NO: &str = "confirm_no";
pub const MANUAL_TIME: &str = "manual_time";
pub const PICK_DATE: &str = "pick_date";
pub const BACK: &str = "back";

/// One cell of a keyboard row: either static text or a tappable button
/// carrying an opaque action token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cell {
    Label { text: String },
    Button { label: String, token: String },
}

impl Cell {
    pub fn label(text: impl Into<String>) -> Self {
        Cell::Label { text: text.into() }
    }

    pub fn button(label: impl Into<String>, token: impl Into<String>) -> Self {
        Cell::Button {
            label: label.into(),
            token: token.into(),
        }
    }

    /// Blank, non-interactive padding cell.
    pub fn blank() -> Self {
        Cell::label(" ")
    }

    /// The action token, if this cell is interactive.
    pub fn token(&self) -> Option<&str> {
        match self {
            Cell::Label { .. } => None,
            Cell::Button { token, .. } => Some(token),
        }
    }
}

/// Ordered rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Cell>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    /// All interactive cells in row order.
    pub fn buttons(&self) -> impl Iterator<Item = &Cell> {
        self.rows
            .iter()
            .flatten()
            .filter(|cell| cell.token().is_some())
    }
}

pub fn day_token(date: NaiveDate) -> String {
    format!("{DAY_PREFIX}{}", date.format("%Y-%m-%d"))
}

pub fn nav_token(year: i32, month: u32) -> String {
    format!("{NAV_PREFIX}{year}_{month:02}")
}

pub fn slot_token(hour: u32, minute: u32) -> String {
    format!("{SLOT_PREFIX}{hour:02}:{minute:02}")
}

pub fn quick_token(days: i64) -> String {
    format!("{QUICK_PREFIX}{days}")
}

pub fn parse_day_token(token: &str) -> Option<NaiveDate> {
    let rest = token.strip_prefix(DAY_PREFIX)?;
    NaiveDate::parse_from_str(rest, "%Y-%m-%d").ok()
}

pub fn parse_nav_token(token: &str) -> Option<(i32, u32)> {
    let rest = token.strip_prefix(NAV_PREFIX)?;
    let (year, month) = rest.split_once('_')?;
    let year = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

pub fn parse_slot_token(token: &str) -> Option<(u32, u32)> {
    let rest = token.strip_prefix(SLOT_PREFIX)?;
    let (hour, minute) = rest.split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour < 24 && minute < 60 {
        Some((hour, minute))
    } else {
        None
    }
}

pub fn parse_quick_token(token: &str) -> Option<i64> {
    let rest = token.strip_prefix(QUICK_PREFIX)?;
    rest.parse().ok().filter(|&days| days >= 0)
}

/// Start keyboard: one quick-pick button per configured day offset, then a
/// button opening the calendar.
pub fn start_keyboard(quick_days: &[i64]) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for &days in quick_days {
        let label = match days {
            0 => "Today".to_string(),
            1 => "Tomorrow".to_string(),
            n => format!("In {n} days"),
        };
        keyboard = keyboard.row(vec![Cell::button(label, quick_token(days))]);
    }
    keyboard.row(vec![Cell::button("📅 Pick a date", PICK_DATE)])
}

/// All 48 half-hour slots of a day, eight rows of six, plus a control row
/// for free-text entry and backing out.
pub fn time_slot_keyboard() -> Keyboard {
    let mut keyboard = Keyboard::new();
    let mut row = Vec::with_capacity(6);
    for hour in 0..24 {
        for minute in [0, 30] {
            row.push(Cell::button(
                format!("{hour:02}:{minute:02}"),
                slot_token(hour, minute),
            ));
            if row.len() == 6 {
                keyboard.rows.push(std::mem::take(&mut row));
            }
        }
    }
    keyboard.row(vec![
        Cell::button("⌨️ Type a time", MANUAL_TIME),
        Cell::button("↩️ Back", BACK),
    ])
}

/// Yes/no keyboard for the attach-a-time confirmation.
pub fn confirmation_keyboard() -> Keyboard {
    Keyboard::new()
        .row(vec![
            Cell::button("✅ Yes", CONFIRM_YES),
            Cell::button("❌ No", CONFIRM_NO),
        ])
        .row(vec![Cell::button("↩️ Back", BACK)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_token_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(day_token(date), "day_2024-03-05");
        assert_eq!(parse_day_token("day_2024-03-05"), Some(date));
        assert!(parse_day_token("day_2024-13-05").is_none());
        assert!(parse_day_token("slot_14:30").is_none());
    }

    #[test]
    fn test_nav_token_round_trip() {
        assert_eq!(nav_token(2024, 2), "nav_2024_02");
        assert_eq!(parse_nav_token("nav_2024_02"), Some((2024, 2)));
        assert_eq!(parse_nav_token("nav_2024_12"), Some((2024, 12)));
        assert!(parse_nav_token("nav_2024_13").is_none());
        assert!(parse_nav_token("nav_2024").is_none());
    }

    #[test]
    fn test_slot_token_round_trip() {
        assert_eq!(slot_token(14, 30), "slot_14:30");
        assert_eq!(parse_slot_token("slot_14:30"), Some((14, 30)));
        assert_eq!(parse_slot_token("slot_00:00"), Some((0, 0)));
        assert!(parse_slot_token("slot_24:00").is_none());
        assert!(parse_slot_token("slot_12:60").is_none());
        assert!(parse_slot_token("slot_nope").is_none());
    }

    #[test]
    fn test_quick_token_round_trip() {
        assert_eq!(quick_token(3), "quick_3");
        assert_eq!(parse_quick_token("quick_3"), Some(3));
        assert_eq!(parse_quick_token("quick_0"), Some(0));
        assert!(parse_quick_token("quick_-1").is_none());
        assert!(parse_quick_token("quick_x").is_none());
    }

    #[test]
    fn test_time_slot_keyboard_has_48_slots() {
        let keyboard = time_slot_keyboard();
        let slots: Vec<&str> = keyboard
            .buttons()
            .filter_map(Cell::token)
            .filter(|token| token.starts_with(SLOT_PREFIX))
            .collect();
        assert_eq!(slots.len(), 48);
        assert_eq!(slots.first(), Some(&"slot_00:00"));
        assert_eq!(slots.last(), Some(&"slot_23:30"));

        let tokens: Vec<&str> = keyboard.buttons().filter_map(Cell::token).collect();
        assert!(tokens.contains(&MANUAL_TIME));
        assert!(tokens.contains(&BACK));
    }

    #[test]
    fn test_confirmation_keyboard() {
        let keyboard = confirmation_keyboard();
        let tokens: Vec<&str> = keyboard.buttons().filter_map(Cell::token).collect();
        assert_eq!(tokens, vec![CONFIRM_YES, CONFIRM_NO, BACK]);
    }

    #[test]
    fn test_start_keyboard_labels() {
        let keyboard = start_keyboard(&[0, 1, 3]);
        let labels: Vec<String> = keyboard
            .buttons()
            .map(|cell| match cell {
                Cell::Button { label, .. } => label.clone(),
                Cell::Label { text } => text.clone(),
            })
            .collect();
        assert_eq!(labels[0], "Today");
        assert_eq!(labels[1], "Tomorrow");
        assert_eq!(labels[2], "In 3 days");
        assert_eq!(keyboard.buttons().count(), 4);
    }

    #[test]
    fn test_keyboard_serde_round_trip() {
        let keyboard = confirmation_keyboard();
        let json = serde_json::to_string(&keyboard).unwrap();
        let back: Keyboard = serde_json::from_str(&json).unwrap();
        assert_eq!(keyboard, back);
    }
}
