// Capture replay transport
//
// Replays notifications from a JSON-lines capture file, one notification per
// line:
//
//   {"channel": "normalized", "payload": "0000803f...", "timestamp": 1700000000.25}
//
// `payload` is the hex-encoded characteristic value and `timestamp` is
// optional (the replay time is used when absent). Blank lines and lines
// starting with `#` are skipped. Reaching the end of the capture is reported
// as a peer disconnect by closing the notification channel.

use super::{Transport, NOTIFICATION_QUEUE_CAPACITY};
use crate::streaming::termination::Termination;
use crate::streaming::types::{Channel, Notification, StreamError, StreamResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One line of a capture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureLine {
    pub channel: Channel,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

#[derive(Debug)]
struct ReplayItem {
    channel: Channel,
    payload: Vec<u8>,
    timestamp: Option<f64>,
}

impl ReplayItem {
    fn into_notification(self) -> Notification {
        match self.timestamp {
            Some(timestamp) => Notification::new(self.channel, self.payload, timestamp),
            None => Notification::now(self.channel, self.payload),
        }
    }
}

fn parse_capture(path: &Path, contents: &str) -> StreamResult<Vec<ReplayItem>> {
    let mut items = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let location = || format!("{}:{}", path.display(), index + 1);
        let capture: CaptureLine = serde_json::from_str(line)
            .map_err(|e| StreamError::Parse(format!("{}: {}", location(), e)))?;
        let payload = hex::decode(capture.payload.trim())
            .map_err(|e| StreamError::Parse(format!("{}: invalid payload: {}", location(), e)))?;

        items.push(ReplayItem {
            channel: capture.channel,
            payload,
            timestamp: capture.timestamp,
        });
    }
    Ok(items)
}

pub struct ReplayTransport {
    path: PathBuf,
    interval: Option<Duration>,
    items: Vec<ReplayItem>,
    subscribed: Arc<RwLock<HashSet<Channel>>>,
    sender: Option<mpsc::Sender<Notification>>,
    termination: Option<Termination>,
    pump: Option<JoinHandle<()>>,
    is_connected: bool,
}

impl ReplayTransport {
    pub fn new(path: PathBuf, interval: Option<Duration>) -> Self {
        Self {
            path,
            interval,
            items: Vec::new(),
            subscribed: Arc::new(RwLock::new(HashSet::new())),
            sender: None,
            termination: None,
            pump: None,
            is_connected: false,
        }
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn connect(
        &mut self,
        termination: Termination,
    ) -> StreamResult<mpsc::Receiver<Notification>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            StreamError::Connection(format!("cannot open capture {}: {}", self.path.display(), e))
        })?;
        self.items = parse_capture(&self.path, &contents)?;

        let (tx, rx) = mpsc::channel(NOTIFICATION_QUEUE_CAPACITY);
        self.sender = Some(tx);
        self.termination = Some(termination);
        self.subscribed.write().clear();
        self.is_connected = true;

        log::info!(
            "Opened capture {} ({} notifications)",
            self.path.display(),
            self.items.len()
        );

        Ok(rx)
    }

    async fn subscribe(&mut self, channel: Channel) -> StreamResult<()> {
        if !self.is_connected {
            return Err(StreamError::NotConnected);
        }
        self.subscribed.write().insert(channel);
        Ok(())
    }

    async fn unsubscribe(&mut self, channel: Channel) -> StreamResult<()> {
        self.subscribed.write().remove(&channel);
        Ok(())
    }

    async fn start_streaming(&mut self) -> StreamResult<()> {
        let sender = self.sender.take().ok_or(StreamError::NotConnected)?;
        let termination = self.termination.clone().unwrap_or_default();
        let items = std::mem::take(&mut self.items);
        let subscribed = Arc::clone(&self.subscribed);
        let interval = self.interval;

        self.pump = Some(tokio::spawn(async move {
            for item in items {
                if let Some(delay) = interval {
                    tokio::select! {
                        _ = termination.triggered() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }

                if !subscribed.read().contains(&item.channel) {
                    continue;
                }

                tokio::select! {
                    _ = termination.triggered() => return,
                    sent = sender.send(item.into_notification()) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
            log::info!("Capture replay finished");
        }));

        Ok(())
    }

    async fn disconnect(&mut self) -> StreamResult<()> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.sender = None;
        self.is_connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.is_connected
    }

    fn describe(&self) -> String {
        format!("capture {}", self.path.display())
    }
}

impl Drop for ReplayTransport {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
