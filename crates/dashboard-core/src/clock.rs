//! Local countdown between authoritative clock updates.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{Player, TournamentState};

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Charges the time elapsed since the last update to the side on move and
/// moves the update mark to `now`. Only runs while a match is live and the
/// tournament is running. Returns whether anything changed.
pub fn tick(state: &mut TournamentState, now: DateTime<Utc>) -> bool {
    if !state.is_clock_running() {
        return false;
    }
    let Some(live) = state.live_match.as_mut() else {
        return false;
    };

    let elapsed = u64::try_from((now - live.last_update).num_milliseconds()).unwrap_or(0);
    match live.side_to_move() {
        Player::Blue => {
            live.blue_time_remaining_ms = live.blue_time_remaining_ms.saturating_sub(elapsed)
        }
        _ => live.red_time_remaining_ms = live.red_time_remaining_ms.saturating_sub(elapsed),
    }
    live.last_update = now;
    true
}
