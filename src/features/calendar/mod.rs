//! # Calendar Navigator
//!
//! Pure month-grid rendering for the date picker. `render(year, month)`
//! produces a fixed seven-column keyboard: a weekday header row, day-cell
//! rows padded with blanks, and a navigation row pointing at the adjacent
//! months. No state, no side effects.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use chrono::{Datelike, NaiveDate};

use crate::components::{self, Cell, Keyboard};

const WEEKDAY_LABELS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Normalize an arbitrary (year, month) pair so the month lands in 1-12,
/// carrying overflow into the year (month 13 becomes January of the next
/// year, month 0 becomes December of the previous one).
pub fn normalize(year: i32, month: i32) -> (i32, u32) {
    let zero_based = month - 1;
    let year = year + zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) + 1;
    (year, month as u32)
}

/// The month before the given one, wrapping across year boundaries.
pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    normalize(year, month as i32 - 1)
}

/// The month after the given one, wrapping across year boundaries.
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    normalize(year, month as i32 + 1)
}

/// Number of days in the month, computed by stepping back one day from the
/// first of the following month. Handles leap years for free.
pub fn last_day(year: i32, month: u32) -> u32 {
    let (next_year, next) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Render the month grid for `(year, month)`.
///
/// Rows, in order: weekday header labels, then day-cell rows (each day
/// button carries a `day_YYYY-MM-DD` token, blanks pad to seven columns),
/// then a navigation row with previous/next month buttons, the month title,
/// and a back button.
pub fn render(year: i32, month: u32) -> Keyboard {
    let (year, month) = normalize(year, month as i32);

    let mut keyboard = Keyboard::new().row(
        WEEKDAY_LABELS
            .iter()
            .map(|&label| Cell::label(label))
            .collect(),
    );

    let leading = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.weekday().num_days_from_monday() as usize)
        .unwrap_or(0);

    let mut row: Vec<Cell> = Vec::with_capacity(7);
    row.resize_with(leading, Cell::blank);

    for day in 1..=last_day(year, month) {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            row.push(Cell::button(day.to_string(), components::day_token(date)));
        }
        if row.len() == 7 {
            keyboard.rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        row.resize_with(7, Cell::blank);
        keyboard.rows.push(row);
    }

    let (prev_year, prev) = prev_month(year, month);
    let (next_year, next) = next_month(year, month);
    keyboard.row(vec![
        Cell::button("«", components::nav_token(prev_year, prev)),
        Cell::label(month_title(year, month)),
        Cell::button("»", components::nav_token(next_year, next)),
        Cell::button("↩️ Back", components::BACK),
    ])
}

fn month_title(year: i32, month: u32) -> String {
    let name = MONTH_NAMES
        .get(month as usize - 1)
        .copied()
        .unwrap_or("Unknown");
    format!("{name} {year}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_tokens(keyboard: &Keyboard) -> Vec<String> {
        keyboard
            .buttons()
            .filter_map(Cell::token)
            .filter(|token| token.starts_with(components::DAY_PREFIX))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_header_row_first() {
        let keyboard = render(2024, 1);
        let header: Vec<Cell> = WEEKDAY_LABELS.iter().map(|&l| Cell::label(l)).collect();
        assert_eq!(keyboard.rows[0], header);
    }

    #[test]
    fn test_january_has_31_unique_days() {
        let keyboard = render(2024, 1);
        let tokens = day_tokens(&keyboard);
        assert_eq!(tokens.len(), 31);

        let expected: Vec<String> = (1..=31).map(|d| format!("day_2024-01-{d:02}")).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_leap_year_february() {
        assert_eq!(day_tokens(&render(2024, 2)).len(), 29);
        assert_eq!(day_tokens(&render(2023, 2)).len(), 28);
        assert_eq!(day_tokens(&render(2000, 2)).len(), 29);
        assert_eq!(day_tokens(&render(1900, 2)).len(), 28);
    }

    #[test]
    fn test_weekday_alignment() {
        // 2024-01-01 was a Monday: the first day row starts with day 1.
        let keyboard = render(2024, 1);
        assert_eq!(
            keyboard.rows[1][0].token(),
            Some("day_2024-01-01"),
        );

        // 2023-01-01 was a Sunday: six leading blanks.
        let keyboard = render(2023, 1);
        assert_eq!(keyboard.rows[1][6].token(), Some("day_2023-01-01"));
        assert!(keyboard.rows[1][..6].iter().all(|c| c.token().is_none()));
    }

    #[test]
    fn test_rows_are_seven_wide() {
        for (year, month) in [(2024, 2), (2024, 12), (2023, 6)] {
            let keyboard = render(year, month);
            // Every row except the trailing navigation row is a full week.
            for row in &keyboard.rows[..keyboard.rows.len() - 1] {
                assert_eq!(row.len(), 7);
            }
        }
    }

    #[test]
    fn test_navigation_wraps_year_boundaries() {
        let keyboard = render(2024, 12);
        let tokens: Vec<&str> = keyboard.buttons().filter_map(Cell::token).collect();
        assert!(tokens.contains(&"nav_2024_11"));
        assert!(tokens.contains(&"nav_2025_01"));

        let keyboard = render(2024, 1);
        let tokens: Vec<&str> = keyboard.buttons().filter_map(Cell::token).collect();
        assert!(tokens.contains(&"nav_2023_12"));
        assert!(tokens.contains(&"nav_2024_02"));
        assert!(tokens.contains(&components::BACK));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(2024, 13), (2025, 1));
        assert_eq!(normalize(2024, 0), (2023, 12));
        assert_eq!(normalize(2024, -11), (2023, 1));
        assert_eq!(normalize(2024, 6), (2024, 6));
    }

    #[test]
    fn test_prev_next_month() {
        assert_eq!(prev_month(2024, 1), (2023, 12));
        assert_eq!(next_month(2023, 12), (2024, 1));
        assert_eq!(next_month(2024, 6), (2024, 7));
    }

    #[test]
    fn test_last_day() {
        assert_eq!(last_day(2024, 1), 31);
        assert_eq!(last_day(2024, 4), 30);
        assert_eq!(last_day(2024, 2), 29);
        assert_eq!(last_day(2024, 12), 31);
    }

    #[test]
    fn test_render_is_pure() {
        assert_eq!(render(2024, 5), render(2024, 5));
    }
}
