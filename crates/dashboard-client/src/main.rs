//! Arena dashboard
//!
//! Follows a running bot tournament from the terminal: connects to the
//! tournament hub, optionally issues a control command, and logs every
//! state change until Ctrl-C.

use dashboard_client::{ClientConfig, ControlCommand, Session, SessionHandle};
use dashboard_core::display::{format_clock, format_rating_change};
use dashboard_core::{Player, TournamentState};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Parse the optional `start|pause|resume` argument.
fn parse_command() -> anyhow::Result<Option<ControlCommand>> {
    match std::env::args().nth(1) {
        None => Ok(None),
        Some(arg) => ControlCommand::parse(&arg)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Unknown command '{arg}', expected start, pause or resume")),
    }
}

/// What gets logged; clock countdowns alone are not worth a line.
#[derive(PartialEq)]
struct Summary {
    connection: String,
    status: String,
    completed: u32,
    total: u32,
    game_id: Option<String>,
    move_number: Option<u32>,
    leader: Option<String>,
    error: Option<String>,
    history: usize,
}

impl Summary {
    fn of(state: &TournamentState) -> Self {
        Self {
            connection: state.connection.to_string(),
            status: state.status.to_string(),
            completed: state.progress.completed,
            total: state.progress.total,
            game_id: state.live_match.as_ref().map(|m| m.game_id.clone()),
            move_number: state.live_match.as_ref().map(|m| m.move_number),
            leader: state
                .bots
                .first()
                .map(|b| format!("{} ({:.0}, {})", b.name, b.rating, format_rating_change(b))),
            error: state.error_message.clone(),
            history: state.match_history.len(),
        }
    }
}

fn log_state(state: &TournamentState) {
    info!(
        connection = %state.connection,
        status = %state.status,
        completed = state.progress.completed,
        total = state.progress.total,
        percent = %format!("{:.1}", state.progress.percent),
        "Tournament"
    );

    if let Some(live) = &state.live_match {
        let side = live.side_to_move();
        info!(
            game_id = %live.game_id,
            red = %live.red_bot_name,
            blue = %live.blue_bot_name,
            move_number = live.move_number,
            to_move = if side == Player::Red { "red" } else { "blue" },
            red_clock = %format_clock(live.red_time_remaining_ms),
            blue_clock = %format_clock(live.blue_time_remaining_ms),
            "Live match"
        );
    }

    if let Some(last) = state.match_history.first() {
        let result = if last.is_draw { "draw" } else { "win" };
        info!(
            winner = last.winner_bot_name.as_deref().unwrap_or("-"),
            loser = last.loser_bot_name.as_deref().unwrap_or("-"),
            result,
            moves = last.total_moves,
            "Last result"
        );
    }

    if let Some(message) = &state.error_message {
        warn!(error = %message, "Dashboard error");
    }
}

async fn follow(mut rx: watch::Receiver<TournamentState>) {
    let mut last: Option<Summary> = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        let summary = Summary::of(&state);
        if last.as_ref() != Some(&summary) {
            log_state(&state);
            last = Some(summary);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let _ = dotenvy::dotenv();

    let command = parse_command()?;
    let config = ClientConfig::from_env()?;
    info!(api = %config.api_base_url, hub = %config.hub_url, "Config loaded");

    let handle = SessionHandle::spawn(Session::from_config(&config)?);
    let follower = tokio::spawn(follow(handle.subscribe()));

    if let Err(e) = handle.connect().await {
        error!(error = %e, "Could not connect to tournament service");
        return Err(e.into());
    }

    if let Some(command) = command {
        if handle.command(command).await? {
            info!(%command, "Command sent");
        } else {
            let message = handle.state().error_message.unwrap_or_default();
            error!(%command, reason = %message, "Command rejected");
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.disconnect().await?;
    drop(handle);
    let _ = follower.await;

    Ok(())
}
