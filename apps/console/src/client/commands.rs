//! Control-command issuance. Every command validates its fields before any
//! request leaves the process; backend rejections carry the server's error
//! string verbatim. Commands are never retried automatically.

use console_proto::{ChannelRequest, CustomRequest, ErrorBody, StartRequest};
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    base: Url,
}

impl CommandClient {
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    pub async fn start(
        &self,
        channel: &str,
        barcode: &str,
        process: &str,
        data_path: &str,
    ) -> Result<(), CommandError> {
        let channel = require_channel(channel)?;
        let (barcode, process, data_path) = (barcode.trim(), process.trim(), data_path.trim());
        if barcode.is_empty() || process.is_empty() || data_path.is_empty() {
            return Err(CommandError::Validation(
                "barcode, process and data path are all required",
            ));
        }
        self.post_json(
            "start",
            &StartRequest {
                channel: channel.to_owned(),
                barcode: barcode.to_owned(),
                process: process.to_owned(),
                data_path: data_path.to_owned(),
            },
        )
        .await
    }

    pub async fn stop(&self, channel: &str) -> Result<(), CommandError> {
        self.channel_command("stop", channel).await
    }

    pub async fn pause(&self, channel: &str) -> Result<(), CommandError> {
        self.channel_command("pause", channel).await
    }

    pub async fn resume(&self, channel: &str) -> Result<(), CommandError> {
        self.channel_command("resume", channel).await
    }

    /// Link-wide status request; carries no body.
    pub async fn request_status(&self) -> Result<(), CommandError> {
        self.post_empty("rsp_status").await
    }

    pub async fn custom(&self, kind: &str) -> Result<(), CommandError> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(CommandError::Validation("command type is required"));
        }
        self.post_json(
            "user_command",
            &CustomRequest {
                kind: kind.to_owned(),
            },
        )
        .await
    }

    async fn channel_command(&self, command: &str, channel: &str) -> Result<(), CommandError> {
        let channel = require_channel(channel)?;
        self.post_json(
            command,
            &ChannelRequest {
                channel: channel.to_owned(),
            },
        )
        .await
    }

    async fn post_json<B: Serialize>(&self, command: &str, body: &B) -> Result<(), CommandError> {
        let response = self
            .http
            .post(self.command_url(command))
            .json(body)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn post_empty(&self, command: &str) -> Result<(), CommandError> {
        let response = self.http.post(self.command_url(command)).send().await?;
        Self::check(response).await
    }

    fn command_url(&self, command: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("/api/cmd/{command}"));
        url
    }

    async fn check(response: reqwest::Response) -> Result<(), CommandError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) if !body.error.is_empty() => body.error,
            _ => format!("command rejected ({status})"),
        };
        Err(CommandError::Rejected(message))
    }
}

fn require_channel(channel: &str) -> Result<&str, CommandError> {
    let channel = channel.trim();
    if channel.is_empty() {
        return Err(CommandError::Validation("channel is required"));
    }
    Ok(channel)
}
