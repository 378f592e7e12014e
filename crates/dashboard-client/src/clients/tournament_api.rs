use std::time::Duration;

use async_trait::async_trait;
use dashboard_core::StateSnapshot;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

/// Control operations exposed by the tournament service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Pause,
    Resume,
}

impl ControlCommand {
    /// Endpoint path, also the verb in failure messages ("Failed to pause").
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Start => "start",
            ControlCommand::Pause => "pause",
            ControlCommand::Resume => "resume",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Some(ControlCommand::Start),
            "pause" => Some(ControlCommand::Pause),
            "resume" => Some(ControlCommand::Resume),
            _ => None,
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull side of the tournament service: the full snapshot and the control
/// commands.
#[async_trait]
pub trait TournamentService: Send + Sync {
    async fn fetch_state(&self) -> Result<StateSnapshot, ClientError>;

    async fn send_command(&self, command: ControlCommand) -> Result<(), ClientError>;
}

pub struct HttpTournamentService {
    client: Client,
    base_url: String,
}

impl HttpTournamentService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent("ArenaDashboard/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Turns a non-success response into `ClientError::Status`, preferring the
/// `message` field of a JSON error body.
async fn error_for_status(resp: Response, fallback: String) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback);

    debug!(%status, %message, "Tournament service returned an error");
    Err(ClientError::Status { status, message })
}

#[async_trait]
impl TournamentService for HttpTournamentService {
    async fn fetch_state(&self) -> Result<StateSnapshot, ClientError> {
        let resp = self.client.get(self.url("state")).send().await?;
        let resp = error_for_status(resp, "Failed to fetch state".to_string()).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_command(&self, command: ControlCommand) -> Result<(), ClientError> {
        let resp = self.client.post(self.url(command.as_str())).send().await?;
        error_for_status(resp, format!("Failed to {}", command)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(ControlCommand::Start.as_str(), "start");
        assert_eq!(ControlCommand::Pause.to_string(), "pause");
        assert_eq!(ControlCommand::parse(" Resume "), Some(ControlCommand::Resume));
        assert_eq!(ControlCommand::parse("stop"), None);
    }

    #[test]
    fn test_url_joins_base() {
        let service =
            HttpTournamentService::new("http://localhost:5207/api/tournament/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(service.url("state"), "http://localhost:5207/api/tournament/state");
    }
}
