pub mod tournament_api;

pub use tournament_api::{ControlCommand, HttpTournamentService, TournamentService};
