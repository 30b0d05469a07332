use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use url::Url;

/// Runtime settings. Defaults mirror the backend contract (5 s poll, 3 s
/// reconnect delay, 500 ms event-triggered refresh, 500-entry log); the env
/// overrides exist for tests and odd deployments.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_base: Url,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub refresh_delay: Duration,
    pub log_capacity: usize,
}

impl Config {
    pub fn from_env(server_base: Url) -> Self {
        Self {
            server_base,
            poll_interval: env_ms("TPT_CONSOLE_POLL_MS", 5_000),
            reconnect_delay: env_ms("TPT_CONSOLE_RECONNECT_MS", 3_000),
            refresh_delay: env_ms("TPT_CONSOLE_REFRESH_MS", 500),
            log_capacity: env::var("TPT_CONSOLE_LOG_CAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
        }
    }

    /// Push-channel endpoint derived from the base URL: the scheme is
    /// upgraded to the matching WebSocket variant (http -> ws, https -> wss)
    /// and the path is fixed at `/ws`.
    pub fn push_url(&self) -> Result<Url> {
        let mut url = self.server_base.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => bail!("unsupported server URL scheme {other:?}"),
        };
        if url.set_scheme(scheme).is_err() {
            bail!("cannot derive a WebSocket URL from {}", self.server_base);
        }
        url.set_path("/ws");
        Ok(url)
    }
}

fn env_ms(var: &str, default: u64) -> Duration {
    let ms = env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> Config {
        Config::from_env(base.parse().unwrap())
    }

    #[test]
    fn push_url_matches_base_scheme() {
        assert_eq!(
            config("http://127.0.0.1:8080").push_url().unwrap().as_str(),
            "ws://127.0.0.1:8080/ws"
        );
        assert_eq!(
            config("https://mes.example.com").push_url().unwrap().as_str(),
            "wss://mes.example.com/ws"
        );
    }

    #[test]
    fn push_url_rejects_unknown_schemes() {
        assert!(config("ftp://mes.example.com").push_url().is_err());
    }

    #[test]
    fn default_timings() {
        let config = config("http://127.0.0.1:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.refresh_delay, Duration::from_millis(500));
        assert_eq!(config.log_capacity, 500);
    }
}
