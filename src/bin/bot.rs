use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use dotenvy::dotenv;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

use chime::components::Cell;
use chime::{
    decode_action, Config, ConversationId, LogSink, Reply, SelectionEvent, SelectionFlow,
    SelectionState, TimerId, TimerRegistry,
};

/// The console transport drives a single conversation.
const CONSOLE_CONVERSATION: ConversationId = 1;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let registry = TimerRegistry::with_capacity(Arc::new(LogSink::new()), config.max_active_timers);
    let flow = SelectionFlow::new(registry.clone());

    info!("{} is ready", config.bot_name);
    println!("Commands: /start, /timers, /cancel <id>, /quit.");
    println!("Tap a button by typing its token, e.g. `day_2024-06-01` or `slot_14:30`.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_message_id: u64 = 1;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let now = Utc::now();
        match input {
            "/quit" | "/exit" => break,
            "/start" => {
                render_reply(&flow.start(CONSOLE_CONVERSATION, now, &config.quick_pick_days));
            }
            "/timers" => list_timers(&registry),
            _ if input.starts_with("/cancel") => cancel_timer(&registry, input),
            _ => {
                let Some(event) = decode_action(input, now.date_naive())
                    .or_else(|| free_text_event(&flow, input))
                else {
                    println!("Type /start to schedule a timer.");
                    continue;
                };
                match flow.handle_event(CONSOLE_CONVERSATION, event, now) {
                    Ok(reply) => {
                        render_reply(&reply);
                        // The completion notification updates the "timer set"
                        // message in place, so tie the two together.
                        if let Reply::TimerSet { id, .. } = reply {
                            registry.attach_message(id, next_message_id);
                            next_message_id += 1;
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
        }
    }

    Ok(())
}

/// Interpret free text according to where the conversation currently is:
/// a confirmation answer, a typed time, or a typed `YYYY-MM-DD` date.
fn free_text_event(flow: &SelectionFlow, input: &str) -> Option<SelectionEvent> {
    match flow.state_of(CONSOLE_CONVERSATION).map(|conv| conv.state) {
        Some(SelectionState::AwaitingConfirmation { .. }) => {
            Some(SelectionEvent::ConfirmationAnswered(input.to_string()))
        }
        Some(SelectionState::ChoosingTime { .. })
        | Some(SelectionState::AwaitingManualEntry { .. }) => {
            Some(SelectionEvent::ManualTimeEntered(input.to_string()))
        }
        _ => NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .map(SelectionEvent::DaySelected),
    }
}

fn cancel_timer(registry: &TimerRegistry, input: &str) {
    let id = input
        .split_whitespace()
        .nth(1)
        .and_then(|raw| TimerId::from_str(raw).ok());
    match id {
        Some(id) if registry.cancel(id) => println!("✅ Canceled timer {id}."),
        Some(id) => println!("❌ Timer {id} not found (already fired or canceled?)."),
        None => println!("Usage: /cancel <timer-id> (see /timers for ids)."),
    }
}

fn list_timers(registry: &TimerRegistry) {
    let timers = registry.active();
    if timers.is_empty() {
        println!("📋 No active timers. Use /start to create one.");
        return;
    }
    println!("📋 Active timers:");
    for info in timers {
        let pending = info.reminders.iter().filter(|r| !r.fired).count();
        println!(
            "  {} — {} ({} reminder(s) pending)",
            info.id,
            info.target.format("%Y-%m-%d %H:%M UTC"),
            pending
        );
    }
}

fn render_reply(reply: &Reply) {
    println!("{}", reply.text());
    let Some(keyboard) = reply.keyboard() else {
        return;
    };
    for row in &keyboard.rows {
        let line: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Cell::Label { text } => text.clone(),
                Cell::Button { label, token } => format!("[{label}]({token})"),
            })
            .collect();
        println!("  {}", line.join(" "));
    }
}
