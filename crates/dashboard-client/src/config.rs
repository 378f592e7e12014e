//! Client configuration from environment variables

use std::env;
use std::time::Duration;

use dashboard_core::MatchSettings;

use crate::error::ClientError;
use crate::reconnect::ReconnectPolicy;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the tournament REST API (`/state`, `/start`, ...)
    pub api_base_url: String,

    /// Hub endpoint for push events; http(s) is mapped to ws(s)
    pub hub_url: String,

    pub reconnect: ReconnectPolicy,

    /// Interval of the local countdown tick
    pub clock_tick: Duration,

    /// Time control the service uses for new matches
    pub match_settings: MatchSettings,

    pub http_timeout: Duration,

    /// How often a ping record is sent on an idle hub connection
    pub hub_keepalive: Duration,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn url_var(name: &str, default: &str, missing: &'static str) -> Result<String, ClientError> {
    let url = env::var(name).unwrap_or_else(|_| default.to_string());
    let url = url.trim().trim_end_matches('/').to_string();
    if url.is_empty() {
        return Err(ClientError::Config(missing));
    }
    Ok(url)
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to the
    /// local development service.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_base_url = url_var(
            "TOURNAMENT_API_URL",
            "http://localhost:5207/api/tournament",
            "TOURNAMENT_API_URL is empty",
        )?;
        let hub_url = url_var(
            "TOURNAMENT_HUB_URL",
            "http://localhost:5207/hubs/tournament",
            "TOURNAMENT_HUB_URL is empty",
        )?;

        let defaults = ReconnectPolicy::default();
        let reconnect = ReconnectPolicy {
            max_attempts: var_or("RECONNECT_MAX_ATTEMPTS", defaults.max_attempts),
            base_delay: Duration::from_millis(var_or(
                "RECONNECT_BASE_DELAY_MS",
                defaults.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(var_or(
                "RECONNECT_MAX_DELAY_MS",
                defaults.max_delay.as_millis() as u64,
            )),
        };

        let clock_tick = Duration::from_millis(var_or("CLOCK_TICK_MS", 100u64).max(1));

        let match_settings = MatchSettings {
            initial_time_secs: var_or("MATCH_INITIAL_TIME_SECS", MatchSettings::STANDARD.initial_time_secs),
            increment_secs: var_or("MATCH_INCREMENT_SECS", MatchSettings::STANDARD.increment_secs),
        };

        Ok(Self {
            api_base_url,
            hub_url,
            reconnect,
            clock_tick,
            match_settings,
            http_timeout: Duration::from_secs(var_or("HTTP_TIMEOUT_SECS", 30)),
            hub_keepalive: Duration::from_secs(var_or("HUB_KEEPALIVE_SECS", 15u64).max(1)),
        })
    }

    /// Defaults pointing at a service on `base` (e.g. `http://127.0.0.1:5207`).
    pub fn for_service(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base_url: format!("{base}/api/tournament"),
            hub_url: format!("{base}/hubs/tournament"),
            reconnect: ReconnectPolicy::default(),
            clock_tick: dashboard_core::clock::TICK_INTERVAL,
            match_settings: MatchSettings::STANDARD,
            http_timeout: Duration::from_secs(30),
            hub_keepalive: Duration::from_secs(15),
        }
    }
}
