// Common types for the streaming module

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur while talking to the sensor board
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Subscription to {channel} failed: {message}")]
    Subscription { channel: Channel, message: String },

    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    #[error("Not connected")]
    NotConnected,
}

/// Logical notification channel of the sensor board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Low-rate characteristic carrying 4 normalized distances
    Normalized,
    /// High-rate debug characteristic carrying 32 raw sensor readings
    Raw,
}

impl Channel {
    /// OSC address the decoded values of this channel are published on
    pub fn publish_address(self) -> &'static str {
        match self {
            Channel::Normalized => "/distances",
            Channel::Raw => "/debug",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Normalized => write!(f, "normalized"),
            Channel::Raw => write!(f, "raw"),
        }
    }
}

/// A single characteristic value notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub channel: Channel,
    pub payload: Vec<u8>,
    /// Unix timestamp (seconds) when the notification was received
    pub timestamp: f64,
}

impl Notification {
    pub fn new(channel: Channel, payload: Vec<u8>, timestamp: f64) -> Self {
        Self {
            channel,
            payload,
            timestamp,
        }
    }

    /// Create a notification stamped with the current wall-clock time
    pub fn now(channel: Channel, payload: Vec<u8>) -> Self {
        let now = chrono::Utc::now();
        let timestamp =
            now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1_000_000.0;
        Self::new(channel, payload, timestamp)
    }
}

/// Lifecycle state of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Connecting,
    Subscribed,
    Streaming,
    Unsubscribing,
    Terminated,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Connecting
    }
}
