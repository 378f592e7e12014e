//! Text formatting for dashboard widgets.

use crate::model::{Bot, BASELINE_RATING};

/// `"1h 5m"` from one hour up, `"4m 7s"` below.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else {
        format!("{minutes}m {}s", seconds % 60)
    }
}

/// Chess-clock style `m:ss`.
pub fn format_clock(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingTrend {
    Up,
    Down,
    Flat,
}

fn rating_change(bot: &Bot) -> i64 {
    (bot.rating - BASELINE_RATING).round() as i64
}

/// Signed change from the starting rating, e.g. `"+12"` or `"-8"`.
pub fn format_rating_change(bot: &Bot) -> String {
    let change = rating_change(bot);
    if change >= 0 {
        format!("+{change}")
    } else {
        change.to_string()
    }
}

pub fn rating_trend(bot: &Bot) -> RatingTrend {
    match rating_change(bot) {
        c if c > 0 => RatingTrend::Up,
        c if c < 0 => RatingTrend::Down,
        _ => RatingTrend::Flat,
    }
}
