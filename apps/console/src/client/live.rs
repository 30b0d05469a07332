//! Push-channel session lifecycle: a single logical WebSocket connection
//! that recovers from any failure with a fixed-delay reconnect.

use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::router::MessageRouter;
use crate::state::{Severity, SharedLog};

const LOG_SOURCE: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Open,
}

/// What the runner should do with its reconnect timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    None,
    CancelReconnect,
    ScheduleReconnect,
}

/// Explicit session state machine. Repeated closes collapse into a single
/// pending reconnect, and a successful open cancels whatever is pending, so
/// there is never more than one reconnect timer alive.
#[derive(Debug)]
pub struct LinkMachine {
    state: LinkState,
    reconnect_pending: bool,
}

impl LinkMachine {
    pub fn new() -> Self {
        Self {
            state: LinkState::Disconnected,
            reconnect_pending: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn connect_started(&mut self) {
        self.state = LinkState::Connecting;
    }

    pub fn opened(&mut self) -> LinkAction {
        self.state = LinkState::Open;
        if self.reconnect_pending {
            self.reconnect_pending = false;
            LinkAction::CancelReconnect
        } else {
            LinkAction::None
        }
    }

    pub fn closed(&mut self) -> LinkAction {
        self.state = LinkState::Disconnected;
        if self.reconnect_pending {
            LinkAction::None
        } else {
            self.reconnect_pending = true;
            LinkAction::ScheduleReconnect
        }
    }

    pub fn reconnect_fired(&mut self) {
        self.reconnect_pending = false;
    }
}

impl Default for LinkMachine {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LiveConnection {
    url: Url,
    reconnect_delay: Duration,
    router: MessageRouter,
    logs: SharedLog,
    machine: LinkMachine,
}

impl LiveConnection {
    pub fn new(url: Url, reconnect_delay: Duration, router: MessageRouter, logs: SharedLog) -> Self {
        Self {
            url,
            reconnect_delay,
            router,
            logs,
            machine: LinkMachine::new(),
        }
    }

    /// Runs the session for the lifetime of the process. Never returns under
    /// normal operation: every connect failure, transport error, or close
    /// ends in a fixed-delay reconnect.
    pub async fn run(mut self) {
        loop {
            self.machine.connect_started();
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    self.machine.opened();
                    info!(url = %self.url, "push channel connected");
                    self.log(Severity::Info, "push channel connected");
                    let (_write, mut read) = stream.split();
                    while let Some(frame) = read.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                self.router.route(&text);
                            }
                            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                                Ok(text) => {
                                    self.router.route(&text);
                                }
                                Err(_) => debug!("dropping non-utf8 push frame"),
                            },
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                self.log(Severity::Error, format!("push channel error: {err}"));
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    self.log(Severity::Error, format!("push channel connect failed: {err}"));
                }
            }

            if self.machine.closed() == LinkAction::ScheduleReconnect {
                warn!(
                    delay_ms = self.reconnect_delay.as_millis() as u64,
                    "push channel closed, reconnecting"
                );
                self.log(
                    Severity::Warning,
                    format!(
                        "push channel closed, reconnecting in {} ms",
                        self.reconnect_delay.as_millis()
                    ),
                );
                tokio::time::sleep(self.reconnect_delay).await;
                self.machine.reconnect_fired();
            }
        }
    }

    fn log(&self, severity: Severity, message: impl Into<String>) {
        self.logs.lock().push(LOG_SOURCE, message, severity);
    }
}
