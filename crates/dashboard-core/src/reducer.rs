//! The single place where [`TournamentState`] changes.
//!
//! Push events, clock ticks and snapshots all arrive as an [`Action`] and go
//! through [`Reducer::apply`] together with the time they are applied at.
//! Given the same state, action and time the result is always the same.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock;
use crate::codes::TournamentStatus;
use crate::display::format_duration;
use crate::event::{MatchFinished, MovePlayed, PushEvent};
use crate::model::{
    sort_roster, BoardCell, Coord, LiveMatch, MatchResult, MatchSettings, Player, Progress,
    TournamentState, MATCH_HISTORY_LIMIT,
};
use crate::snapshot::{self, StateSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Event(PushEvent),
    ClockTick,
    Snapshot(Box<StateSnapshot>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reducer {
    settings: MatchSettings,
}

impl Reducer {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Returns whether the state changed.
    pub fn apply(&self, state: &mut TournamentState, action: Action, now: DateTime<Utc>) -> bool {
        match action {
            Action::Event(event) => self.apply_event(state, event, now),
            Action::ClockTick => clock::tick(state, now),
            Action::Snapshot(snap) => {
                snapshot::reconcile(state, *snap, &self.settings, now);
                true
            }
        }
    }

    fn apply_event(&self, state: &mut TournamentState, event: PushEvent, now: DateTime<Utc>) -> bool {
        match event {
            PushEvent::MatchStarted(started) => {
                state.live_match = Some(LiveMatch::new(
                    started.game_id,
                    (started.red_bot, started.red_difficulty),
                    (started.blue_bot, started.blue_difficulty),
                    &self.settings,
                    now,
                ));
                true
            }
            PushEvent::MovePlayed(played) => apply_move(state, played, now),
            PushEvent::MatchFinished(finished) => record_result(state, finished),
            PushEvent::ProgressUpdate(update) => {
                state.progress = update.progress;
                true
            }
            PushEvent::TournamentCompleted(done) => {
                state.status = TournamentStatus::Completed;
                state.bots = done.final_standings;
                sort_roster(&mut state.bots);
                state.progress = Progress {
                    completed: done.total_games,
                    total: done.total_games,
                    percent: 100.0,
                };
                state.end_time = Some(now);
                state.elapsed = format_duration(done.duration_ms);
                true
            }
            PushEvent::StatusChanged(changed) => {
                if let Some(detail) = changed.message.as_deref() {
                    debug!(status = %changed.status, detail, "Tournament status changed");
                }
                state.status = changed.status;
                if state.status == TournamentStatus::Running && state.start_time.is_none() {
                    state.start_time = Some(now);
                }
                true
            }
            PushEvent::RatingsUpdated(mut bots) => {
                sort_roster(&mut bots);
                state.bots = bots;
                true
            }
        }
    }
}

fn apply_move(state: &mut TournamentState, played: MovePlayed, now: DateTime<Utc>) -> bool {
    let Some(live) = state.live_match.as_mut() else {
        debug!(move_number = played.move_number, "Move without a live match, ignored");
        return false;
    };

    live.move_number = played.move_number;
    live.red_time_remaining_ms = played.red_time_remaining_ms;
    live.blue_time_remaining_ms = played.blue_time_remaining_ms;
    live.last_move = Some(Coord {
        x: played.x,
        y: played.y,
    });
    live.last_update = now;
    live.last_move_stats = Some(played.stats);
    live.place(BoardCell {
        x: played.x,
        y: played.y,
        player: played.player,
    });
    true
}

fn record_result(state: &mut TournamentState, finished: MatchFinished) -> bool {
    let Some(live) = state.live_match.as_ref() else {
        debug!("Match result without a live match, ignored");
        return false;
    };

    // Anything but an explicit red win credits blue, draws included.
    let winner_side = if finished.winner == Player::Red {
        Player::Red
    } else {
        Player::Blue
    };
    let (winner_name, winner_difficulty) = live.bot(winner_side).unwrap_or_default();
    let (loser_name, loser_difficulty) = live.bot(winner_side.opponent()).unwrap_or_default();

    let result = MatchResult {
        winner: finished.winner,
        loser: finished.loser,
        total_moves: finished.total_moves,
        duration_ms: finished.duration_ms,
        winner_difficulty,
        loser_difficulty,
        is_draw: finished.is_draw,
        ended_by_timeout: finished.ended_by_timeout,
        winner_bot_name: Some(winner_name.to_string()),
        loser_bot_name: Some(loser_name.to_string()),
    };

    state.match_history.truncate(MATCH_HISTORY_LIMIT - 1);
    state.match_history.insert(0, result);
    true
}
