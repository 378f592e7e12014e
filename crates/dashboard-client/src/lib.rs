//! Network side of the tournament dashboard: the HTTP service client, the
//! hub push channel, and the session loop that owns the dashboard state.

pub mod clients;
pub mod config;
pub mod error;
pub mod handle;
pub mod reconnect;
pub mod session;
pub mod time;
pub mod transport;

pub use clients::{ControlCommand, HttpTournamentService, TournamentService};
pub use config::ClientConfig;
pub use error::ClientError;
pub use handle::SessionHandle;
pub use reconnect::ReconnectPolicy;
pub use session::Session;
pub use time::{Clock, ManualClock, SystemClock};
pub use transport::{PushChannel, PushConnector, WebSocketConnector};
