//! Periodic pull of the two snapshot endpoints. This is the consistency
//! backstop: it runs on a fixed interval for the lifetime of the process,
//! regardless of push-channel health, and also serves the router's deferred
//! refresh triggers through the same fetch path.

use std::time::Duration;

use console_proto::{Channel, ConnectionStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use super::Redraw;
use crate::state::SharedStore;

#[derive(Debug, Error)]
enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
}

pub struct PollingScheduler {
    http: reqwest::Client,
    channels_url: Url,
    status_url: Url,
    store: SharedStore,
    redraw: Redraw,
    interval: Duration,
}

impl PollingScheduler {
    pub fn new(base: &Url, store: SharedStore, redraw: Redraw, interval: Duration) -> Self {
        let mut channels_url = base.clone();
        channels_url.set_path("/api/channels");
        let mut status_url = base.clone();
        status_url.set_path("/api/status");
        Self {
            http: reqwest::Client::new(),
            channels_url,
            status_url,
            store,
            redraw,
            interval,
        }
    }

    /// Runs forever. The first interval tick fires immediately, so the store
    /// is seeded at startup without waiting a full period. `trigger` carries
    /// the router's deferred refresh requests.
    pub async fn run(self, mut trigger: mpsc::UnboundedReceiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh().await,
                Some(()) = trigger.recv() => self.refresh().await,
            }
        }
    }

    /// Fetches both snapshots independently. Each success replaces its store
    /// slice wholesale; failures leave the previous snapshot in place and
    /// are invisible to the operator log, healed by the next attempt.
    pub async fn refresh(&self) {
        match self.fetch::<Vec<Channel>>(&self.channels_url).await {
            Ok(channels) => {
                self.store.lock().replace_channels(channels);
                self.redraw.notify_one();
            }
            Err(err) => debug!(%err, "channel snapshot fetch failed"),
        }
        match self.fetch::<ConnectionStatus>(&self.status_url).await {
            Ok(status) => {
                self.store.lock().replace_status(status);
                self.redraw.notify_one();
            }
            Err(err) => debug!(%err, "status snapshot fetch failed"),
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let response = self.http.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}
