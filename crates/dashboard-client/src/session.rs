//! The session loop: sole owner of [`TournamentState`].
//!
//! Every input (push frame, clock tick, reconnect timer, user request,
//! finished network call) is taken one at a time from [`Session::run`] and
//! applied through the reducer. Network calls run on their own tasks and
//! report back as an [`Outcome`], so the loop keeps serving frames, ticks
//! and requests while they are in flight. Renderers observe the state
//! through a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use dashboard_core::hub::{self, HubMessage};
use dashboard_core::{Action, ConnectionStatus, PushEvent, Reducer, StateSnapshot, TournamentState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clients::{ControlCommand, HttpTournamentService, TournamentService};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::reconnect::ReconnectPolicy;
use crate::time::{Clock, SystemClock};
use crate::transport::{PushChannel, PushConnector, WebSocketConnector};

const CONNECTION_LOST: &str = "Connection lost. Reconnecting...";

/// Requests sent from a [`crate::SessionHandle`] to the loop.
pub(crate) enum Request {
    Connect(oneshot::Sender<Result<(), ClientError>>),
    Disconnect(oneshot::Sender<()>),
    FetchState(oneshot::Sender<()>),
    Command(ControlCommand, oneshot::Sender<bool>),
}

/// Caller to answer once a snapshot fetch has been applied (or failed).
enum Waiter {
    Fetch(oneshot::Sender<()>),
    Connect(oneshot::Sender<Result<(), ClientError>>),
    Command(oneshot::Sender<bool>),
}

impl Waiter {
    fn done(self) {
        match self {
            Waiter::Fetch(reply) => {
                let _ = reply.send(());
            }
            Waiter::Connect(reply) => {
                let _ = reply.send(Ok(()));
            }
            Waiter::Command(reply) => {
                let _ = reply.send(true);
            }
        }
    }
}

/// Result of a network call made off the loop.
enum Outcome {
    Connected {
        epoch: u64,
        /// `Some` for automatic reconnect attempts.
        attempt: Option<u32>,
        result: Result<Box<dyn PushChannel>, ClientError>,
        reply: Option<oneshot::Sender<Result<(), ClientError>>>,
    },
    Snapshot {
        result: Result<StateSnapshot, ClientError>,
        waiter: Option<Waiter>,
    },
    CommandSent {
        command: ControlCommand,
        result: Result<(), ClientError>,
        reply: oneshot::Sender<bool>,
    },
}

enum Link {
    Idle,
    Connecting,
    Open,
    Reconnecting { attempt: u32, retry_at: Instant },
}

enum Input {
    Frame(Option<Result<String, ClientError>>),
    Tick,
    Retry,
    Outcome(Outcome),
    Request(Option<Request>),
}

pub struct Session {
    state: TournamentState,
    reducer: Reducer,
    service: Arc<dyn TournamentService>,
    connector: Arc<dyn PushConnector>,
    clock: Arc<dyn Clock>,
    policy: ReconnectPolicy,
    channel: Option<Box<dyn PushChannel>>,
    link: Link,
    /// Bumped by every explicit connect and disconnect; connection
    /// outcomes from an older epoch are discarded.
    epoch: u64,
    ticker: Interval,
    ticking: bool,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    publisher: watch::Sender<TournamentState>,
}

impl Session {
    /// Must be called from within a Tokio runtime; the clock tick starts
    /// immediately.
    pub fn new(
        reducer: Reducer,
        service: Arc<dyn TournamentService>,
        connector: Arc<dyn PushConnector>,
        clock: Arc<dyn Clock>,
        policy: ReconnectPolicy,
        tick_period: Duration,
    ) -> Self {
        let (publisher, _) = watch::channel(TournamentState::default());
        let (outcomes_tx, outcomes) = mpsc::unbounded_channel();
        Self {
            state: TournamentState::default(),
            reducer,
            service,
            connector,
            clock,
            policy,
            channel: None,
            link: Link::Idle,
            epoch: 0,
            ticker: new_ticker(tick_period),
            ticking: true,
            outcomes_tx,
            outcomes,
            publisher,
        }
    }

    /// HTTP service, WebSocket hub and system clock as configured.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let service = HttpTournamentService::new(&config.api_base_url, config.http_timeout)?;
        let connector = WebSocketConnector::new(&config.hub_url, config.hub_keepalive);
        Ok(Self::new(
            Reducer::new(config.match_settings),
            Arc::new(service),
            Arc::new(connector),
            Arc::new(SystemClock),
            config.reconnect,
            config.clock_tick,
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<TournamentState> {
        self.publisher.subscribe()
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn apply(&mut self, action: Action) {
        let now = self.clock.now();
        if self.reducer.apply(&mut self.state, action, now) {
            self.publish();
        }
    }

    /// Serves inputs until every handle is dropped, then disconnects.
    pub(crate) async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        loop {
            match self.next_input(&mut requests).await {
                Input::Frame(frame) => self.handle_frame(frame).await,
                Input::Tick => self.apply(Action::ClockTick),
                Input::Retry => self.retry(),
                Input::Outcome(outcome) => self.handle_outcome(outcome).await,
                Input::Request(Some(request)) => self.handle_request(request).await,
                Input::Request(None) => break,
            }
        }
        self.disconnect().await;
        debug!("Session loop stopped");
    }

    async fn next_input(&mut self, requests: &mut mpsc::Receiver<Request>) -> Input {
        let retry_at = match &self.link {
            Link::Reconnecting { retry_at, .. } => Some(*retry_at),
            _ => None,
        };
        let ticking = self.ticking;
        let channel = &mut self.channel;
        let ticker = &mut self.ticker;
        let outcomes = &mut self.outcomes;

        tokio::select! {
            frame = recv_frame(channel) => Input::Frame(frame),
            _ = ticker.tick(), if ticking => Input::Tick,
            _ = sleep_until(retry_at) => Input::Retry,
            Some(outcome) = outcomes.recv() => Input::Outcome(outcome),
            request = requests.recv() => Input::Request(request),
        }
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::Connect(reply) => self.connect(reply),
            Request::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Request::FetchState(reply) => self.spawn_fetch(Some(Waiter::Fetch(reply))),
            Request::Command(command, reply) => self.spawn_command(command, reply),
        }
    }

    /// Opens the push channel, then loads a full snapshot before replying.
    /// A no-op while connected; supersedes a pending or in-flight attempt
    /// otherwise.
    fn connect(&mut self, reply: oneshot::Sender<Result<(), ClientError>>) {
        if matches!(self.link, Link::Open) {
            let _ = reply.send(Ok(()));
            return;
        }

        self.epoch += 1;
        self.link = Link::Connecting;
        if !self.ticking {
            self.ticking = true;
            self.ticker.reset();
        }
        self.state.connection = ConnectionStatus::Connecting;
        self.state.error_message = None;
        self.publish();

        self.spawn_connect(None, Some(reply));
    }

    /// Stops the clock, cancels any pending or in-flight reconnect and
    /// closes the channel. Outstanding fetches and commands still land.
    async fn disconnect(&mut self) {
        self.epoch += 1;
        self.ticking = false;
        self.link = Link::Idle;
        self.close_channel().await;
        if self.state.connection != ConnectionStatus::Disconnected {
            info!("Disconnected from tournament hub");
        }
        self.state.connection = ConnectionStatus::Disconnected;
        self.publish();
    }

    fn spawn_connect(
        &self,
        attempt: Option<u32>,
        reply: Option<oneshot::Sender<Result<(), ClientError>>>,
    ) {
        let connector = Arc::clone(&self.connector);
        let outcomes = self.outcomes_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = connector.connect().await;
            let _ = outcomes.send(Outcome::Connected {
                epoch,
                attempt,
                result,
                reply,
            });
        });
    }

    fn spawn_fetch(&self, waiter: Option<Waiter>) {
        let service = Arc::clone(&self.service);
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = service.fetch_state().await;
            let _ = outcomes.send(Outcome::Snapshot { result, waiter });
        });
    }

    fn spawn_command(&self, command: ControlCommand, reply: oneshot::Sender<bool>) {
        let service = Arc::clone(&self.service);
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = service.send_command(command).await;
            let _ = outcomes.send(Outcome::CommandSent {
                command,
                result,
                reply,
            });
        });
    }

    async fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Connected {
                epoch,
                attempt,
                result,
                reply,
            } => self.connected(epoch, attempt, result, reply).await,
            Outcome::Snapshot { result, waiter } => {
                // Fetches may overlap; whichever lands last wins.
                match result {
                    Ok(snapshot) => self.apply(Action::Snapshot(Box::new(snapshot))),
                    Err(e) => warn!(error = %e, "Failed to fetch tournament state"),
                }
                if let Some(waiter) = waiter {
                    waiter.done();
                }
            }
            Outcome::CommandSent {
                command,
                result,
                reply,
            } => match result {
                Ok(()) => {
                    info!(%command, "Tournament command accepted");
                    self.spawn_fetch(Some(Waiter::Command(reply)));
                }
                Err(e) => {
                    let message = match e {
                        ClientError::Status { message, .. } => message,
                        other => format!("Failed to {command}: {other}"),
                    };
                    warn!(%command, error = %message, "Tournament command failed");
                    self.state.error_message = Some(message);
                    self.publish();
                    let _ = reply.send(false);
                }
            },
        }
    }

    async fn connected(
        &mut self,
        epoch: u64,
        attempt: Option<u32>,
        result: Result<Box<dyn PushChannel>, ClientError>,
        reply: Option<oneshot::Sender<Result<(), ClientError>>>,
    ) {
        if epoch != self.epoch || !matches!(self.link, Link::Connecting) {
            debug!(epoch, current = self.epoch, "Discarding superseded connection attempt");
            if let Ok(mut channel) = result {
                channel.close().await;
            }
            if let Some(reply) = reply {
                let _ = reply.send(Err(ClientError::Transport(
                    "Connection attempt cancelled".to_string(),
                )));
            }
            return;
        }

        match result {
            Ok(channel) => {
                self.channel = Some(channel);
                self.link = Link::Open;
                self.state.connection = ConnectionStatus::Connected;
                if let Some(attempt) = attempt {
                    info!(attempt, "Reconnected to tournament hub");
                    self.state.error_message = None;
                } else {
                    info!("Connected to tournament hub");
                }
                self.publish();
                // A full resync is required after every (re)connect.
                self.spawn_fetch(reply.map(Waiter::Connect));
            }
            Err(e) => match attempt {
                Some(attempt) => {
                    warn!(attempt, error = %e, "Reconnect attempt failed");
                    self.schedule_retry(attempt + 1, e.to_string());
                }
                None => {
                    warn!(error = %e, "Failed to connect to tournament hub");
                    self.link = Link::Idle;
                    self.state.connection = ConnectionStatus::Disconnected;
                    self.state.error_message = Some(format!("Failed to connect: {e}"));
                    self.publish();
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(e));
                    }
                }
            },
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<String, ClientError>>) {
        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(e)) => return self.connection_lost(Some(e.to_string())).await,
            None => return self.connection_lost(None).await,
        };

        for record in hub::decode_frame(&text) {
            match record {
                Ok(HubMessage::Invocation { target, arguments }) => {
                    match PushEvent::from_invocation(&target, arguments) {
                        Ok(event) => {
                            debug!(event = event.name(), "Push event");
                            self.apply(Action::Event(event));
                        }
                        Err(e) => warn!(%target, error = %e, "Skipping push event"),
                    }
                }
                Ok(HubMessage::Ping) => {}
                Ok(HubMessage::Close {
                    error,
                    allow_reconnect,
                }) => {
                    if allow_reconnect {
                        self.connection_lost(error).await;
                    } else {
                        self.closed_by_server(error).await;
                    }
                    return;
                }
                Ok(HubMessage::Other(kind)) => debug!(kind, "Ignoring hub record"),
                Err(e) => warn!(error = %e, "Skipping undecodable hub record"),
            }
        }
    }

    async fn connection_lost(&mut self, cause: Option<String>) {
        self.close_channel().await;
        warn!(cause = cause.as_deref().unwrap_or("end of stream"), "Hub connection lost");

        self.state.connection = ConnectionStatus::Reconnecting;
        self.state.error_message = Some(cause.clone().unwrap_or_else(|| CONNECTION_LOST.to_string()));
        self.publish();

        self.schedule_retry(0, cause.unwrap_or_else(|| "Connection lost".to_string()));
    }

    async fn closed_by_server(&mut self, error: Option<String>) {
        self.close_channel().await;
        self.link = Link::Idle;
        let cause = error.unwrap_or_else(|| "Server closed the connection".to_string());
        warn!(%cause, "Hub closed the connection");
        self.state.connection = ConnectionStatus::Disconnected;
        self.state.error_message = Some(format!("Connection closed: {cause}"));
        self.publish();
    }

    fn schedule_retry(&mut self, attempt: u32, last_error: String) {
        match self.policy.delay(attempt) {
            Some(delay) => {
                info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
                self.link = Link::Reconnecting {
                    attempt,
                    retry_at: Instant::now() + delay,
                };
            }
            None => {
                warn!(attempts = attempt, error = %last_error, "Giving up on reconnect");
                self.link = Link::Idle;
                self.state.connection = ConnectionStatus::Disconnected;
                self.state.error_message = Some(format!("Connection closed: {last_error}"));
                self.publish();
            }
        }
    }

    fn retry(&mut self) {
        let Link::Reconnecting { attempt, .. } = self.link else {
            return;
        };
        debug!(attempt, "Reconnect attempt");
        self.link = Link::Connecting;
        self.spawn_connect(Some(attempt), None);
    }

    async fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn recv_frame(channel: &mut Option<Box<dyn PushChannel>>) -> Option<Result<String, ClientError>> {
    match channel {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
