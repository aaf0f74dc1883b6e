//! # Configuration
//!
//! Runtime configuration loaded from environment variables (with `.env`
//! support via dotenvy in the binary). Everything has a sensible default so
//! the bot runs with an empty environment.

use std::env;

/// Bot configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name used in startup messages (`CHIME_BOT_NAME`).
    pub bot_name: String,
    /// Day offsets for the quick-pick buttons on the start keyboard
    /// (`CHIME_QUICK_PICKS`, comma-separated, e.g. `0,1,3`).
    pub quick_pick_days: Vec<i64>,
    /// Upper bound on concurrently scheduled timers
    /// (`CHIME_MAX_ACTIVE_TIMERS`).
    pub max_active_timers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot_name: "chime".to_string(),
            quick_pick_days: vec![0, 1, 3],
            max_active_timers: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let bot_name = env::var("CHIME_BOT_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.bot_name);

        let quick_pick_days = env::var("CHIME_QUICK_PICKS")
            .ok()
            .map(|raw| parse_quick_picks(&raw))
            .filter(|days| !days.is_empty())
            .unwrap_or(defaults.quick_pick_days);

        let max_active_timers = env::var("CHIME_MAX_ACTIVE_TIMERS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|&max| max > 0)
            .unwrap_or(defaults.max_active_timers);

        Config {
            bot_name,
            quick_pick_days,
            max_active_timers,
        }
    }
}

/// Parse a comma-separated list of non-negative day offsets.
fn parse_quick_picks(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .filter(|&days| days >= 0)
        .collect()
}
