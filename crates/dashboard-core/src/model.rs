use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::codes::{lenient_code, Difficulty, TournamentStatus, WireCode};
use crate::lenient::{millis, or_default};

/// History entries kept when results arrive as push events.
pub const MATCH_HISTORY_LIMIT: usize = 20;

/// Entries exposed by [`TournamentState::recent_matches`].
pub const RECENT_MATCHES_LIMIT: usize = 50;

/// Rating every bot starts the tournament with.
pub const BASELINE_RATING: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
        })
    }
}

/// Side of a match. Red moves on even move numbers, blue on odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Player {
    #[default]
    None,
    Red,
    Blue,
}

impl Player {
    pub fn from_wire(code: &WireCode) -> Self {
        match code {
            WireCode::Code(1) => Player::Red,
            WireCode::Code(2) => Player::Blue,
            WireCode::Code(_) => Player::None,
            WireCode::Name(n) if n.trim().eq_ignore_ascii_case("red") => Player::Red,
            WireCode::Name(n) if n.trim().eq_ignore_ascii_case("blue") => Player::Blue,
            WireCode::Name(_) => Player::None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Player::Red => Player::Blue,
            Player::Blue => Player::Red,
            Player::None => Player::None,
        }
    }
}

impl<'de> Deserialize<'de> for Player {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = lenient_code(deserializer)?;
        Ok(code.map(|c| Self::from_wire(&c)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    #[serde(deserialize_with = "or_default")]
    pub completed: u32,
    #[serde(deserialize_with = "or_default")]
    pub total: u32,
    #[serde(deserialize_with = "or_default")]
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bot {
    #[serde(deserialize_with = "or_default")]
    pub name: String,
    pub difficulty: Difficulty,
    #[serde(rename = "elo", deserialize_with = "or_default")]
    pub rating: f64,
    #[serde(deserialize_with = "or_default")]
    pub wins: u32,
    #[serde(deserialize_with = "or_default")]
    pub losses: u32,
    #[serde(deserialize_with = "or_default")]
    pub draws: u32,
    #[serde(deserialize_with = "or_default")]
    pub games_played: u32,
    #[serde(deserialize_with = "or_default")]
    pub win_rate: f64,
}

/// Highest rating first. Stable, so equal ratings keep the server's order.
pub fn sort_roster(bots: &mut [Bot]) {
    bots.sort_by(|a, b| b.rating.total_cmp(&a.rating));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Coord {
    #[serde(deserialize_with = "or_default")]
    pub x: i32,
    #[serde(deserialize_with = "or_default")]
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardCell {
    #[serde(deserialize_with = "or_default")]
    pub x: i32,
    #[serde(deserialize_with = "or_default")]
    pub y: i32,
    pub player: Player,
}

/// Search diagnostics for the most recent move only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineStats {
    #[serde(deserialize_with = "or_default")]
    pub depth_achieved: u32,
    #[serde(deserialize_with = "or_default")]
    pub nodes_searched: u64,
    #[serde(deserialize_with = "or_default")]
    pub nodes_per_second: f64,
    /// Transposition-table hit rate, 0..=100.
    #[serde(deserialize_with = "or_default")]
    pub table_hit_rate: f64,
    #[serde(deserialize_with = "or_default")]
    pub pondering_active: bool,
    #[serde(deserialize_with = "or_default")]
    pub vcf_depth_achieved: u32,
    #[serde(deserialize_with = "or_default")]
    pub vcf_nodes_searched: u64,
}

/// Time control applied to every match the service starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    pub initial_time_secs: u32,
    pub increment_secs: u32,
}

impl MatchSettings {
    pub const STANDARD: MatchSettings = MatchSettings {
        initial_time_secs: 420,
        increment_secs: 5,
    };

    pub fn initial_budget_ms(&self) -> u64 {
        u64::from(self.initial_time_secs) * 1000
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// The one match currently being played.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMatch {
    pub game_id: String,
    pub red_bot_name: String,
    pub blue_bot_name: String,
    pub red_difficulty: Difficulty,
    pub blue_difficulty: Difficulty,
    pub move_number: u32,
    pub board: Vec<BoardCell>,
    pub red_time_remaining_ms: u64,
    pub blue_time_remaining_ms: u64,
    pub initial_time_seconds: u32,
    pub increment_seconds: u32,
    pub last_move: Option<Coord>,
    /// Wall-clock time of the last authoritative or simulated clock update.
    pub last_update: DateTime<Utc>,
    pub last_move_stats: Option<EngineStats>,
}

impl LiveMatch {
    pub fn new(
        game_id: String,
        red: (String, Difficulty),
        blue: (String, Difficulty),
        settings: &MatchSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id,
            red_bot_name: red.0,
            blue_bot_name: blue.0,
            red_difficulty: red.1,
            blue_difficulty: blue.1,
            move_number: 0,
            board: Vec::new(),
            red_time_remaining_ms: settings.initial_budget_ms(),
            blue_time_remaining_ms: settings.initial_budget_ms(),
            initial_time_seconds: settings.initial_time_secs,
            increment_seconds: settings.increment_secs,
            last_move: None,
            last_update: now,
            last_move_stats: None,
        }
    }

    pub fn side_to_move(&self) -> Player {
        if self.move_number % 2 == 0 {
            Player::Red
        } else {
            Player::Blue
        }
    }

    pub fn bot(&self, side: Player) -> Option<(&str, Difficulty)> {
        match side {
            Player::Red => Some((&self.red_bot_name, self.red_difficulty)),
            Player::Blue => Some((&self.blue_bot_name, self.blue_difficulty)),
            Player::None => None,
        }
    }

    /// Records a stone, replacing whatever occupied the coordinate before.
    pub fn place(&mut self, cell: BoardCell) {
        self.board.retain(|c| c.x != cell.x || c.y != cell.y);
        self.board.push(cell);
    }

    pub fn cell_at(&self, x: i32, y: i32) -> Option<&BoardCell> {
        self.board.iter().find(|c| c.x == x && c.y == y)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchResult {
    pub winner: Player,
    pub loser: Player,
    #[serde(deserialize_with = "or_default")]
    pub total_moves: u32,
    #[serde(deserialize_with = "millis")]
    pub duration_ms: u64,
    pub winner_difficulty: Difficulty,
    pub loser_difficulty: Difficulty,
    #[serde(deserialize_with = "or_default")]
    pub is_draw: bool,
    #[serde(deserialize_with = "or_default")]
    pub ended_by_timeout: bool,
    #[serde(deserialize_with = "or_default")]
    pub winner_bot_name: Option<String>,
    #[serde(deserialize_with = "or_default")]
    pub loser_bot_name: Option<String>,
}

/// Everything the dashboard shows, owned by a single session.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    pub connection: ConnectionStatus,
    pub status: TournamentStatus,
    pub progress: Progress,
    /// Sorted by descending rating at all times.
    pub bots: Vec<Bot>,
    /// Most recent first.
    pub match_history: Vec<MatchResult>,
    pub live_match: Option<LiveMatch>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Human-readable tournament duration, set on completion.
    pub elapsed: String,
    pub error_message: Option<String>,
}

impl TournamentState {
    pub fn recent_matches(&self) -> &[MatchResult] {
        let n = self.match_history.len().min(RECENT_MATCHES_LIMIT);
        &self.match_history[..n]
    }

    pub fn sorted_bots(&self) -> Vec<Bot> {
        let mut bots = self.bots.clone();
        sort_roster(&mut bots);
        bots
    }

    pub fn is_clock_running(&self) -> bool {
        self.live_match.is_some() && self.status == TournamentStatus::Running
    }
}
