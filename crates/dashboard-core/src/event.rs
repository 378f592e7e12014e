//! Push events, decoded from hub invocations at the boundary.
//!
//! Each hub target maps to exactly one [`PushEvent`] variant. Some targets
//! carry positional arguments, others a single object; both are validated
//! here so the reducer only ever sees typed payloads. Missing, `null` or
//! mistyped object fields take their default value instead of rejecting the
//! event. Positional arguments accept integral floats for integers but are
//! otherwise strict.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::codes::{Difficulty, TournamentStatus};
use crate::error::ProtocolError;
use crate::lenient::{clamp_millis, from_value, millis, or_default};
use crate::model::{Bot, EngineStats, Player, Progress};

pub const GAME_STARTED: &str = "OnGameStarted";
pub const MOVE_PLAYED: &str = "OnMovePlayed";
pub const GAME_FINISHED: &str = "OnGameFinished";
pub const TOURNAMENT_PROGRESS: &str = "OnTournamentProgress";
pub const TOURNAMENT_COMPLETED: &str = "OnTournamentCompleted";
pub const STATUS_CHANGED: &str = "OnTournamentStatusChanged";
pub const RATINGS_UPDATED: &str = "OnELOUpdated";

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    MatchStarted(MatchStarted),
    MovePlayed(MovePlayed),
    MatchFinished(MatchFinished),
    ProgressUpdate(ProgressUpdate),
    TournamentCompleted(TournamentCompleted),
    StatusChanged(StatusChanged),
    RatingsUpdated(Vec<Bot>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchStarted {
    pub game_id: String,
    pub red_bot: String,
    pub blue_bot: String,
    pub red_difficulty: Difficulty,
    pub blue_difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovePlayed {
    #[serde(deserialize_with = "or_default")]
    pub move_number: u32,
    #[serde(deserialize_with = "millis")]
    pub red_time_remaining_ms: u64,
    #[serde(deserialize_with = "millis")]
    pub blue_time_remaining_ms: u64,
    #[serde(deserialize_with = "or_default")]
    pub x: i32,
    #[serde(deserialize_with = "or_default")]
    pub y: i32,
    pub player: Player,
    #[serde(flatten)]
    pub stats: EngineStats,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchFinished {
    pub winner: Player,
    pub loser: Player,
    #[serde(deserialize_with = "or_default")]
    pub total_moves: u32,
    #[serde(deserialize_with = "millis")]
    pub duration_ms: u64,
    #[serde(deserialize_with = "or_default")]
    pub is_draw: bool,
    #[serde(deserialize_with = "or_default")]
    pub ended_by_timeout: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    pub progress: Progress,
    pub current_match_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TournamentCompleted {
    pub final_standings: Vec<Bot>,
    pub total_games: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusChanged {
    pub status: TournamentStatus,
    pub message: Option<String>,
}

/// Positional hub arguments for one event.
struct Arguments {
    event: &'static str,
    values: Vec<Value>,
}

impl Arguments {
    fn take<T: DeserializeOwned + Default>(&mut self, index: usize) -> Result<T, ProtocolError> {
        match self.values.get_mut(index).map(Value::take) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => from_value(value).map_err(|source| {
                ProtocolError::Argument {
                    event: self.event,
                    index,
                    source,
                }
            }),
        }
    }

    fn take_millis(&mut self, index: usize) -> Result<u64, ProtocolError> {
        self.take::<f64>(index).map(clamp_millis)
    }
}

impl PushEvent {
    pub fn from_invocation(target: &str, arguments: Vec<Value>) -> Result<Self, ProtocolError> {
        let event = match target {
            GAME_STARTED => GAME_STARTED,
            MOVE_PLAYED => MOVE_PLAYED,
            GAME_FINISHED => GAME_FINISHED,
            TOURNAMENT_PROGRESS => TOURNAMENT_PROGRESS,
            TOURNAMENT_COMPLETED => TOURNAMENT_COMPLETED,
            STATUS_CHANGED => STATUS_CHANGED,
            RATINGS_UPDATED => RATINGS_UPDATED,
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        let mut args = Arguments {
            event,
            values: arguments,
        };

        Ok(match event {
            GAME_STARTED => PushEvent::MatchStarted(MatchStarted {
                game_id: args.take(0)?,
                red_bot: args.take(1)?,
                blue_bot: args.take(2)?,
                red_difficulty: args.take(3)?,
                blue_difficulty: args.take(4)?,
            }),
            MOVE_PLAYED => PushEvent::MovePlayed(args.take(0)?),
            GAME_FINISHED => PushEvent::MatchFinished(args.take(0)?),
            TOURNAMENT_PROGRESS => PushEvent::ProgressUpdate(ProgressUpdate {
                progress: Progress {
                    completed: args.take(0)?,
                    total: args.take(1)?,
                    percent: args.take(2)?,
                },
                current_match_id: args.take(3)?,
            }),
            TOURNAMENT_COMPLETED => PushEvent::TournamentCompleted(TournamentCompleted {
                final_standings: args.take(0)?,
                total_games: args.take(1)?,
                duration_ms: args.take_millis(2)?,
            }),
            STATUS_CHANGED => PushEvent::StatusChanged(StatusChanged {
                status: args.take(0)?,
                message: args.take(1)?,
            }),
            _ => PushEvent::RatingsUpdated(args.take(0)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::MatchStarted(_) => GAME_STARTED,
            PushEvent::MovePlayed(_) => MOVE_PLAYED,
            PushEvent::MatchFinished(_) => GAME_FINISHED,
            PushEvent::ProgressUpdate(_) => TOURNAMENT_PROGRESS,
            PushEvent::TournamentCompleted(_) => TOURNAMENT_COMPLETED,
            PushEvent::StatusChanged(_) => STATUS_CHANGED,
            PushEvent::RatingsUpdated(_) => RATINGS_UPDATED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_game_started_positional() {
        let event = PushEvent::from_invocation(
            GAME_STARTED,
            vec![json!("g1"), json!("A"), json!("B"), json!(3), json!("harder")],
        )
        .unwrap();
        assert_eq!(
            event,
            PushEvent::MatchStarted(MatchStarted {
                game_id: "g1".into(),
                red_bot: "A".into(),
                blue_bot: "B".into(),
                red_difficulty: Difficulty::Normal,
                blue_difficulty: Difficulty::Harder,
            })
        );
    }

    #[test]
    fn test_move_played_defaults_missing_stats() {
        let event = PushEvent::from_invocation(
            MOVE_PLAYED,
            vec![json!({
                "moveNumber": 4,
                "redTimeRemainingMs": 401200,
                "blueTimeRemainingMs": 399800.4,
                "x": 7, "y": 8,
                "player": "red",
                "depthAchieved": 12,
                "nodesSearched": null
            })],
        )
        .unwrap();
        let PushEvent::MovePlayed(m) = event else {
            panic!("expected MovePlayed");
        };
        assert_eq!(m.move_number, 4);
        assert_eq!(m.blue_time_remaining_ms, 399800);
        assert_eq!(m.player, Player::Red);
        assert_eq!(m.stats.depth_achieved, 12);
        assert_eq!(m.stats.nodes_searched, 0);
        assert!(!m.stats.pondering_active);
        assert_eq!(m.stats.vcf_nodes_searched, 0);
    }

    #[test]
    fn test_move_played_full_stats() {
        let event = PushEvent::from_invocation(
            MOVE_PLAYED,
            vec![json!({
                "moveNumber": 1, "redTimeRemainingMs": 1, "blueTimeRemainingMs": 2,
                "x": 0, "y": 0, "player": "blue",
                "depthAchieved": 9, "nodesSearched": 120000, "nodesPerSecond": 850000.5,
                "tableHitRate": 43.5, "ponderingActive": true,
                "vcfDepthAchieved": 15, "vcfNodesSearched": 3000
            })],
        )
        .unwrap();
        let PushEvent::MovePlayed(m) = event else {
            panic!("expected MovePlayed");
        };
        assert_eq!(
            m.stats,
            EngineStats {
                depth_achieved: 9,
                nodes_searched: 120000,
                nodes_per_second: 850000.5,
                table_hit_rate: 43.5,
                pondering_active: true,
                vcf_depth_achieved: 15,
                vcf_nodes_searched: 3000,
            }
        );
    }

    #[test]
    fn test_move_played_survives_mistyped_fields() {
        let event = PushEvent::from_invocation(
            MOVE_PLAYED,
            vec![json!({
                "moveNumber": 2.0,
                "redTimeRemainingMs": 410000,
                "blueTimeRemainingMs": "n/a",
                "x": 5.0, "y": 6,
                "player": 2.0,
                "depthAchieved": "n/a",
                "nodesSearched": 4500.0,
                "nodesPerSecond": "fast",
                "ponderingActive": 1
            })],
        )
        .unwrap();
        let PushEvent::MovePlayed(m) = event else {
            panic!("expected MovePlayed");
        };
        assert_eq!(m.move_number, 2);
        assert_eq!(m.red_time_remaining_ms, 410000);
        assert_eq!(m.blue_time_remaining_ms, 0);
        assert_eq!((m.x, m.y), (5, 6));
        assert_eq!(m.player, Player::Blue);
        assert_eq!(m.stats.depth_achieved, 0);
        assert_eq!(m.stats.nodes_searched, 4500);
        assert_eq!(m.stats.nodes_per_second, 0.0);
        assert!(!m.stats.pondering_active);
    }

    #[test]
    fn test_positional_integral_floats() {
        let event = PushEvent::from_invocation(
            GAME_STARTED,
            vec![json!("g2"), json!("A"), json!("B"), json!(3.0), json!(10.0)],
        )
        .unwrap();
        let PushEvent::MatchStarted(started) = event else {
            panic!("expected MatchStarted");
        };
        assert_eq!(started.red_difficulty, Difficulty::Normal);
        assert_eq!(started.blue_difficulty, Difficulty::Grandmaster);

        let event = PushEvent::from_invocation(
            TOURNAMENT_PROGRESS,
            vec![json!(5.0), json!(20.0), json!(25), json!(null)],
        )
        .unwrap();
        assert_eq!(
            event,
            PushEvent::ProgressUpdate(ProgressUpdate {
                progress: Progress {
                    completed: 5,
                    total: 20,
                    percent: 25.0
                },
                current_match_id: None,
            })
        );
    }

    #[test]
    fn test_progress_and_status() {
        let event = PushEvent::from_invocation(
            TOURNAMENT_PROGRESS,
            vec![json!(5), json!(20), json!(25.0), json!("g6")],
        )
        .unwrap();
        assert_eq!(
            event,
            PushEvent::ProgressUpdate(ProgressUpdate {
                progress: Progress {
                    completed: 5,
                    total: 20,
                    percent: 25.0
                },
                current_match_id: Some("g6".into()),
            })
        );

        let event =
            PushEvent::from_invocation(STATUS_CHANGED, vec![json!(2), json!("Paused by admin")])
                .unwrap();
        assert_eq!(
            event,
            PushEvent::StatusChanged(StatusChanged {
                status: TournamentStatus::Paused,
                message: Some("Paused by admin".into()),
            })
        );
    }

    #[test]
    fn test_missing_positional_arguments_default() {
        let event = PushEvent::from_invocation(TOURNAMENT_COMPLETED, vec![json!([])]).unwrap();
        assert_eq!(
            event,
            PushEvent::TournamentCompleted(TournamentCompleted::default())
        );
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        assert!(matches!(
            PushEvent::from_invocation("OnGameStartd", vec![]),
            Err(ProtocolError::UnknownEvent(name)) if name == "OnGameStartd"
        ));
    }

    #[test]
    fn test_wrongly_typed_argument() {
        let err = PushEvent::from_invocation(RATINGS_UPDATED, vec![json!("not a list")]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Argument { event: RATINGS_UPDATED, index: 0, .. }
        ));
    }
}
