use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use dashboard_core::TournamentState;

use crate::clients::ControlCommand;
use crate::error::ClientError;
use crate::session::{Request, Session};

/// Cheap, cloneable front for a [`Session`] running on its own task.
///
/// Every call is a request to the session loop; the loop stops and
/// disconnects once all handles are dropped.
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    state: watch::Receiver<TournamentState>,
}

impl SessionHandle {
    pub fn spawn(session: Session) -> Self {
        Self::spawn_with_task(session).0
    }

    pub fn spawn_with_task(session: Session) -> (Self, JoinHandle<()>) {
        let (requests, rx) = mpsc::channel(32);
        let state = session.subscribe();
        let task = tokio::spawn(session.run(rx));
        (Self { requests, state }, task)
    }

    pub fn subscribe(&self) -> watch::Receiver<TournamentState> {
        self.state.clone()
    }

    /// Latest published state.
    pub fn state(&self) -> TournamentState {
        self.state.borrow().clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(build(tx))
            .await
            .map_err(|_| ClientError::SessionClosed)?;
        rx.await.map_err(|_| ClientError::SessionClosed)
    }

    pub async fn connect(&self) -> Result<(), ClientError> {
        self.request(Request::Connect).await?
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.request(Request::Disconnect).await
    }

    pub async fn fetch_state(&self) -> Result<(), ClientError> {
        self.request(Request::FetchState).await
    }

    pub async fn start(&self) -> Result<bool, ClientError> {
        self.command(ControlCommand::Start).await
    }

    pub async fn pause(&self) -> Result<bool, ClientError> {
        self.command(ControlCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<bool, ClientError> {
        self.command(ControlCommand::Resume).await
    }

    pub async fn command(&self, command: ControlCommand) -> Result<bool, ClientError> {
        self.request(|reply| Request::Command(command, reply)).await
    }
}
