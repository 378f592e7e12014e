//! Full-state snapshot from `GET /state` and how it replaces local state.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::codes::{Difficulty, TournamentStatus};
use crate::lenient::{millis, or_default, timestamp};
use crate::model::{
    sort_roster, Bot, BoardCell, Coord, LiveMatch, MatchResult, MatchSettings, Progress,
    TournamentState, RECENT_MATCHES_LIMIT,
};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateSnapshot {
    pub status: TournamentStatus,
    #[serde(deserialize_with = "or_default")]
    pub completed_games: u32,
    #[serde(deserialize_with = "or_default")]
    pub total_games: u32,
    #[serde(deserialize_with = "or_default")]
    pub progress_percent: f64,
    #[serde(deserialize_with = "or_default")]
    pub bots: Vec<Bot>,
    #[serde(deserialize_with = "or_default")]
    pub match_history: Vec<MatchResult>,
    pub current_match: Option<SnapshotMatch>,
    #[serde(deserialize_with = "timestamp")]
    pub start_time_utc: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp")]
    pub end_time_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotMatch {
    #[serde(deserialize_with = "or_default")]
    pub game_id: String,
    #[serde(deserialize_with = "or_default")]
    pub red_bot_name: String,
    #[serde(deserialize_with = "or_default")]
    pub blue_bot_name: String,
    pub red_difficulty: Difficulty,
    pub blue_difficulty: Difficulty,
    #[serde(deserialize_with = "or_default")]
    pub move_number: u32,
    #[serde(deserialize_with = "or_default")]
    pub board: Vec<BoardCell>,
    #[serde(deserialize_with = "millis")]
    pub red_time_remaining_ms: u64,
    #[serde(deserialize_with = "millis")]
    pub blue_time_remaining_ms: u64,
    pub initial_time_seconds: Option<u32>,
    pub increment_seconds: Option<u32>,
    pub last_move: Option<Coord>,
    #[serde(deserialize_with = "timestamp")]
    pub last_move_timestamp: Option<DateTime<Utc>>,
}

impl SnapshotMatch {
    fn into_live(self, settings: &MatchSettings, now: DateTime<Utc>) -> LiveMatch {
        let mut live = LiveMatch::new(
            self.game_id,
            (self.red_bot_name, self.red_difficulty),
            (self.blue_bot_name, self.blue_difficulty),
            settings,
            self.last_move_timestamp.unwrap_or(now),
        );
        live.move_number = self.move_number;
        live.red_time_remaining_ms = self.red_time_remaining_ms;
        live.blue_time_remaining_ms = self.blue_time_remaining_ms;
        live.initial_time_seconds = self.initial_time_seconds.unwrap_or(settings.initial_time_secs);
        live.increment_seconds = self.increment_seconds.unwrap_or(settings.increment_secs);
        live.last_move = self.last_move;
        for cell in self.board {
            live.place(cell);
        }
        live
    }
}

/// Overwrites everything the snapshot covers. Connection status, error
/// message and the elapsed string are left alone; last-move diagnostics are
/// dropped because snapshots carry none.
pub fn reconcile(
    state: &mut TournamentState,
    snapshot: StateSnapshot,
    settings: &MatchSettings,
    now: DateTime<Utc>,
) {
    state.status = snapshot.status;
    state.progress = Progress {
        completed: snapshot.completed_games,
        total: snapshot.total_games,
        percent: snapshot.progress_percent,
    };

    state.bots = snapshot.bots;
    sort_roster(&mut state.bots);

    state.match_history = snapshot.match_history;
    state.match_history.truncate(RECENT_MATCHES_LIMIT);

    state.live_match = snapshot
        .current_match
        .map(|m| m.into_live(settings, now));

    state.start_time = snapshot.start_time_utc;
    state.end_time = snapshot.end_time_utc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineStats, Player};

    const SNAPSHOT: &str = r#"{
        "status": 1,
        "completedGames": 12,
        "totalGames": 55,
        "progressPercent": 21.8,
        "bots": [
            {"name": "Rookie", "difficulty": 1, "elo": 540, "wins": 0, "losses": 4, "draws": 0, "gamesPlayed": 4, "winRate": 0},
            {"name": "Titan", "difficulty": "legend", "elo": 702, "wins": 4, "losses": 0, "draws": 0, "gamesPlayed": 4, "winRate": 100},
            {"name": "Middle", "difficulty": 5, "elo": 611, "wins": 2, "losses": 2, "draws": 0, "gamesPlayed": 4, "winRate": 50}
        ],
        "matchHistory": [
            {"winner": "red", "loser": "blue", "totalMoves": 41, "durationMs": 93000,
             "winnerDifficulty": 11, "loserDifficulty": 5, "isDraw": false, "endedByTimeout": false,
             "winnerBotName": "Titan", "loserBotName": "Middle"}
        ],
        "currentMatch": {
            "gameId": "g13",
            "redBotName": "Titan", "blueBotName": "Rookie",
            "redDifficulty": 11, "blueDifficulty": "Beginner",
            "moveNumber": 3,
            "board": [
                {"x": 7, "y": 7, "player": "red"},
                {"x": 7, "y": 8, "player": "blue"},
                {"x": 7, "y": 7, "player": "red"}
            ],
            "redTimeRemainingMs": 410000, "blueTimeRemainingMs": -20,
            "initialTimeSeconds": 300, "incrementSeconds": 3,
            "lastMove": {"x": 7, "y": 8},
            "lastMoveTimestamp": 1735689600000
        },
        "startTimeUtc": "2025-01-01T00:00:00Z",
        "endTimeUtc": null
    }"#;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_700, 0).unwrap()
    }

    #[test]
    fn test_reconcile_overwrites_state() {
        let snapshot: StateSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let mut state = TournamentState {
            error_message: Some("kept".into()),
            ..Default::default()
        };
        reconcile(&mut state, snapshot, &MatchSettings::STANDARD, now());

        assert_eq!(state.status, TournamentStatus::Running);
        assert_eq!(state.progress.completed, 12);
        assert_eq!(state.progress.total, 55);
        let names: Vec<&str> = state.bots.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Titan", "Middle", "Rookie"]);
        assert_eq!(state.match_history[0].winner_difficulty, Difficulty::Legend);
        assert_eq!(state.match_history[0].loser_difficulty, Difficulty::Hard);
        assert_eq!(state.error_message.as_deref(), Some("kept"));
        assert!(state.start_time.is_some());
        assert!(state.end_time.is_none());

        let live = state.live_match.unwrap();
        assert_eq!(live.blue_difficulty, Difficulty::Beginner);
        assert_eq!(live.board.len(), 2);
        assert_eq!(live.blue_time_remaining_ms, 0);
        assert_eq!(live.initial_time_seconds, 300);
        assert_eq!(live.last_update.timestamp_millis(), 1_735_689_600_000);
        assert_eq!(live.cell_at(7, 8).map(|c| c.player), Some(Player::Blue));
    }

    #[test]
    fn test_snapshot_clears_stats_and_missing_match() {
        let mut state = TournamentState::default();
        let mut live = LiveMatch::new(
            "old".into(),
            ("A".into(), Difficulty::Easy),
            ("B".into(), Difficulty::Easy),
            &MatchSettings::STANDARD,
            now(),
        );
        live.last_move_stats = Some(EngineStats::default());
        state.live_match = Some(live);

        let snapshot: StateSnapshot = serde_json::from_str(r#"{"status": "paused"}"#).unwrap();
        reconcile(&mut state, snapshot, &MatchSettings::STANDARD, now());
        assert!(state.live_match.is_none());
        assert_eq!(state.status, TournamentStatus::Paused);

        let snapshot: StateSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        reconcile(&mut state, snapshot, &MatchSettings::STANDARD, now());
        assert!(state.live_match.unwrap().last_move_stats.is_none());
    }

    #[test]
    fn test_snapshot_history_capped() {
        let snapshot = StateSnapshot {
            match_history: vec![MatchResult::default(); 80],
            ..Default::default()
        };
        let mut state = TournamentState::default();
        reconcile(&mut state, snapshot, &MatchSettings::STANDARD, now());
        assert_eq!(state.match_history.len(), RECENT_MATCHES_LIMIT);
    }
}
