//! Clearinghouse transport.
//!
//! JSON request/response to the clearinghouse. Requests time out after 30 s
//! (10 s to connect); timeouts and protocol failures surface as plain
//! `ChannelError::Transport` and are retried by the session on the next trade
//! batch.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::adjudicator::ChannelState;
use super::allocation::AllocationSnapshot;
use super::ChannelError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct CreateChannelRequest {
    pub participants: Vec<String>,
    pub allocation: AllocationSnapshot,
    pub adjudicator: String,
    pub broker: String,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
struct CreateChannelResponse {
    channel_id: String,
}

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Open a channel; returns the clearinghouse-assigned channel id.
    async fn create_channel(&self, request: &CreateChannelRequest)
        -> Result<String, ChannelError>;

    /// Transmit a signed state update.
    async fn update_channel(&self, state: &ChannelState) -> Result<(), ChannelError>;

    /// Transmit a close request carrying the final state.
    async fn close_channel(&self, state: &ChannelState) -> Result<(), ChannelError>;
}

pub struct ClearinghouseClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClearinghouseClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ChannelError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "clearinghouse request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChannelError::Transport(format!(
                "clearinghouse returned {status}: {detail}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChannelTransport for ClearinghouseClient {
    async fn create_channel(
        &self,
        request: &CreateChannelRequest,
    ) -> Result<String, ChannelError> {
        let response = self.post("/channels", request).await?;
        let body: CreateChannelResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        Ok(body.channel_id)
    }

    async fn update_channel(&self, state: &ChannelState) -> Result<(), ChannelError> {
        self.post(&format!("/channels/{}/update", state.channel_id), state)
            .await?;
        Ok(())
    }

    async fn close_channel(&self, state: &ChannelState) -> Result<(), ChannelError> {
        self.post(&format!("/channels/{}/close", state.channel_id), state)
            .await?;
        Ok(())
    }
}
