//! Messaging with the page-side form collaborator.

use std::time::Duration;

use async_trait::async_trait;
use geofill_runtime::PageMessage;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Scripts the collaborator needs before it can answer messages.
pub const COLLABORATOR_SCRIPTS: [&str; 3] = [
    "scripts/selectors/common.js",
    "scripts/selectors/japan.js",
    "scripts/content.js",
];

/// Pause after injection so the scripts can initialise.
pub const INJECTION_SETTLE: Duration = Duration::from_millis(200);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("page connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid page reply: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("page closed the connection without replying")]
    NoReply,
    #[error("page did not reply within {0:?}")]
    Timeout(Duration),
    #[error("page reported: {0}")]
    Page(String),
    #[error("无法注入脚本，请刷新页面后重试")]
    Injection(#[source] Box<BridgeError>),
}

#[async_trait]
pub trait PageBridge: Send + Sync {
    async fn send(&self, message: &PageMessage) -> Result<Value, BridgeError>;
}

/// Send `message`; on failure inject the collaborator scripts, wait for
/// them to settle and retry once.
pub async fn send_with_injection(
    bridge: &dyn PageBridge,
    message: &PageMessage,
) -> Result<Value, BridgeError> {
    match bridge.send(message).await {
        Ok(reply) => Ok(reply),
        Err(err) => {
            tracing::info!(
                target: "geofill::bridge",
                action = message.action(),
                error = %err,
                "bridge.inject_and_retry"
            );
            let inject = PageMessage::InjectScripts {
                files: COLLABORATOR_SCRIPTS.iter().map(|file| file.to_string()).collect(),
            };
            bridge
                .send(&inject)
                .await
                .map_err(|err| BridgeError::Injection(Box::new(err)))?;
            tokio::time::sleep(INJECTION_SETTLE).await;
            bridge.send(message).await
        }
    }
}

/// Newline-delimited JSON over TCP: one request line, one reply line per
/// connection. A reply object with an `error` string is a page-side failure.
#[derive(Debug, Clone)]
pub struct TcpPageBridge {
    endpoint: String,
}

impl TcpPageBridge {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn exchange(&self, message: &PageMessage) -> Result<Value, BridgeError> {
        let stream = TcpStream::connect(&self.endpoint).await?;
        let (reader, mut writer) = stream.into_split();
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        let mut reply = String::new();
        let read = BufReader::new(reader).read_line(&mut reply).await?;
        if read == 0 {
            return Err(BridgeError::NoReply);
        }
        let value: Value = serde_json::from_str(reply.trim())?;
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(BridgeError::Page(message.to_string()));
        }
        Ok(value)
    }
}

#[async_trait]
impl PageBridge for TcpPageBridge {
    async fn send(&self, message: &PageMessage) -> Result<Value, BridgeError> {
        tracing::debug!(
            target: "geofill::bridge",
            endpoint = %self.endpoint,
            action = message.action(),
            "bridge.send"
        );
        match tokio::time::timeout(RESPONSE_TIMEOUT, self.exchange(message)).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout(RESPONSE_TIMEOUT)),
        }
    }
}
