//! # Advance Reminders
//!
//! Derives the reminder schedule for a timer from its lead time and arranges
//! the timed tasks that deliver each one. Two tiers: timers more than
//! 180 days out get reminders at 120, 60, 7, 3 and 1 days before the target;
//! everything else gets 30, 7, 3 and 1 days. Offsets that don't fit inside
//! the lead time are dropped, so no reminder is ever scheduled in the past.
//!
//! Reminder tasks reference their timer by id and re-check its state when
//! they wake, so canceling the parent timer silences the whole group.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::features::timers::{duration_until, TimerId, TimerRegistry};

/// Lead times beyond this many days use the long-horizon reminder tier.
/// Also the threshold past which the selection flow asks whether to attach
/// a specific time of day.
pub const LONG_HORIZON_DAYS: i64 = 180;

const LONG_TIER_DAYS: [i64; 5] = [120, 60, 7, 3, 1];
const SHORT_TIER_DAYS: [i64; 4] = [30, 7, 3, 1];

/// Compute the reminder offsets for a timer with the given lead time, in
/// firing order (largest offset first, since it is furthest before the
/// target). Every retained offset is strictly less than `lead`.
pub fn derive_schedule(lead: Duration) -> Vec<Duration> {
    let tier: &[i64] = if lead > Duration::days(LONG_HORIZON_DAYS) {
        &LONG_TIER_DAYS
    } else {
        &SHORT_TIER_DAYS
    };
    tier.iter()
        .copied()
        .map(Duration::days)
        .filter(|&offset| offset < lead)
        .collect()
}

/// Spawns the timed task behind each reminder offset.
pub struct ReminderScheduler;

impl ReminderScheduler {
    /// Arrange one suspend-until-instant task per offset. Each task wakes at
    /// `target - offset` and calls back into the registry, which re-checks
    /// the timer's state before delivering anything.
    pub fn spawn_all(
        registry: TimerRegistry,
        id: TimerId,
        target: DateTime<Utc>,
        offsets: &[Duration],
        now: DateTime<Utc>,
    ) {
        for (index, &offset) in offsets.iter().enumerate() {
            let registry = registry.clone();
            let wait = duration_until(target - offset, now);
            debug!(
                "arming reminder {index} for timer {id} at {} before target",
                format_offset(offset)
            );
            tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                registry.run_reminder(id, index).await;
            });
        }
    }
}

/// Human-readable offset for logs and listings, e.g. `7d` or `36h`.
pub fn format_offset(offset: Duration) -> String {
    if offset.num_days() > 0 {
        format!("{}d", offset.num_days())
    } else {
        format!("{}h", offset.num_hours())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(schedule: &[Duration]) -> Vec<i64> {
        schedule.iter().map(Duration::num_days).collect()
    }

    #[test]
    fn test_short_tier_under_long_horizon() {
        assert_eq!(days(&derive_schedule(Duration::days(40))), vec![30, 7, 3, 1]);
        // Exactly 180 days is not "more than" the horizon.
        assert_eq!(
            days(&derive_schedule(Duration::days(180))),
            vec![30, 7, 3, 1]
        );
    }

    #[test]
    fn test_long_tier_beyond_horizon() {
        assert_eq!(
            days(&derive_schedule(Duration::days(181))),
            vec![120, 60, 7, 3, 1]
        );
        assert_eq!(
            days(&derive_schedule(Duration::days(200))),
            vec![120, 60, 7, 3, 1]
        );
    }

    #[test]
    fn test_offsets_strictly_inside_lead() {
        // A 30-day lead drops the 30-day offset itself.
        assert_eq!(days(&derive_schedule(Duration::days(30))), vec![7, 3, 1]);
        assert_eq!(days(&derive_schedule(Duration::days(5))), vec![3, 1]);
        assert_eq!(days(&derive_schedule(Duration::days(2))), vec![1]);
        assert_eq!(days(&derive_schedule(Duration::hours(25))), vec![1]);
    }

    #[test]
    fn test_short_leads_have_no_reminders() {
        assert!(derive_schedule(Duration::days(1)).is_empty());
        assert!(derive_schedule(Duration::hours(5)).is_empty());
        assert!(derive_schedule(Duration::minutes(1)).is_empty());
    }

    #[test]
    fn test_schedule_is_strictly_decreasing_and_unique() {
        for lead_days in [2, 10, 45, 180, 181, 365, 1000] {
            let schedule = derive_schedule(Duration::days(lead_days));
            for pair in schedule.windows(2) {
                assert!(
                    pair[0] > pair[1],
                    "offsets out of order for lead {lead_days}"
                );
            }
            for offset in &schedule {
                assert!(*offset < Duration::days(lead_days));
            }
        }
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(Duration::days(7)), "7d");
        assert_eq!(format_offset(Duration::hours(12)), "12h");
    }
}
