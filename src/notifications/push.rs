// src/notifications/push.rs

//! Server-pushed notification events.
//!
//! The channel is a WebSocket authenticated with the session's bearer token.
//! After connecting the client announces its user id so the server can scope
//! pushes; from then on every text frame is either a `notification` or an
//! `unreadCount` message. Anything else is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Message,
    },
};

use crate::error::PushError;
use crate::notifications::{ConnectionState, Notification};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum PushEvent {
    Notification(Notification),
    UnreadCount(u64),
}

impl PushEvent {
    /// `None` for anything that is not one of the two known message kinds.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Receives what a push subscription delivers.
pub trait PushSink: Send + Sync {
    fn on_event(&self, event: PushEvent);

    fn on_connection(&self, state: ConnectionState);
}

/// Handle to a running subscription. Dropping it stops delivery.
#[derive(Debug)]
pub struct PushSubscription {
    task: Option<JoinHandle<()>>,
}

impl PushSubscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Completes once the handshake is done and the sink has been told it is
    /// connected; events then flow until the subscription is cancelled or the
    /// transport fails.
    async fn subscribe(&self, sink: Arc<dyn PushSink>) -> Result<PushSubscription, PushError>;
}

pub fn route_message(sink: &dyn PushSink, text: &str) {
    match PushEvent::parse(text) {
        Some(event) => sink.on_event(event),
        None => tracing::warn!(len = text.len(), "dropping unrecognised push message"),
    }
}

pub struct WsPushTransport {
    url: String,
    token: String,
    user_id: String,
    handshake_timeout: Duration,
}

impl WsPushTransport {
    /// `handshake_timeout` bounds the connect plus the join message.
    pub fn new(url: &str, token: &str, user_id: &str, handshake_timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            token: token.to_string(),
            user_id: user_id.to_string(),
            handshake_timeout,
        }
    }
}

#[async_trait]
impl PushTransport for WsPushTransport {
    async fn subscribe(&self, sink: Arc<dyn PushSink>) -> Result<PushSubscription, PushError> {
        let mut request = self.url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| PushError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let join = serde_json::to_string(&ClientMessage::Join {
            user_id: self.user_id.clone(),
        })?;

        let handshake = async {
            let (mut socket, _response) = connect_async(request).await?;
            socket.send(Message::Text(join)).await?;
            Ok::<_, PushError>(socket)
        };
        let mut socket = tokio::time::timeout(self.handshake_timeout, handshake)
            .await
            .map_err(|_| PushError::Timeout(self.handshake_timeout))??;

        tracing::info!(user_id = %self.user_id, "push channel connected");
        sink.on_connection(ConnectionState::Connected);

        let user_id = self.user_id.clone();
        let task = tokio::spawn(async move {
            while let Some(frame) = socket.next().await {
                match frame {
                    Ok(Message::Text(text)) => route_message(sink.as_ref(), &text),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(user_id = %user_id, error = %e, "push channel failed");
                        break;
                    }
                }
            }
            tracing::info!(user_id = %user_id, "push channel disconnected");
            sink.on_connection(ConnectionState::Disconnected);
        });

        Ok(PushSubscription::new(task))
    }
}
