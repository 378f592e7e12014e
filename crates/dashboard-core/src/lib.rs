//! Tournament dashboard state and the rules for changing it.
//!
//! No I/O lives here: decoding of hub frames and snapshots, the state model,
//! and the reducer that applies events, clock ticks and snapshots.

pub mod clock;
pub mod codes;
pub mod display;
pub mod error;
pub mod event;
pub mod hub;
mod lenient;
pub mod model;
pub mod reducer;
pub mod snapshot;

pub use codes::{Difficulty, TournamentStatus, WireCode};
pub use error::ProtocolError;
pub use event::PushEvent;
pub use lenient::parse_timestamp;
pub use model::{
    Bot, BoardCell, ConnectionStatus, Coord, EngineStats, LiveMatch, MatchResult, MatchSettings,
    Player, Progress, TournamentState,
};
pub use reducer::{Action, Reducer};
pub use snapshot::StateSnapshot;
