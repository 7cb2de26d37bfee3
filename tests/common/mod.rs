#![allow(dead_code)]

use async_trait::async_trait;
use bow_bridge::publish::{PublishResult, Publisher};
use bow_bridge::streaming::{
    Channel, Notification, StreamError, StreamResult, Termination, TerminationCause, Transport,
    Value,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Subscribe(Channel),
    Unsubscribe(Channel),
    StartStreaming,
    Disconnect,
}

/// What the mock does once its script has been delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    /// Keep the channel open until the session is terminated
    Idle,
    /// Close the notification channel
    Close,
    /// Report a peer disconnect through the termination handle
    Disconnect,
}

/// Transport that delivers a fixed script of notifications
pub struct MockTransport {
    script: Vec<Notification>,
    after_script: AfterScript,
    fail_subscribe: Option<Channel>,
    calls: Arc<Mutex<Vec<Call>>>,
    subscribed: HashSet<Channel>,
    sender: Option<mpsc::Sender<Notification>>,
    termination: Option<Termination>,
    connected: bool,
}

impl MockTransport {
    pub fn new(script: Vec<Notification>, after_script: AfterScript) -> Self {
        Self {
            script,
            after_script,
            fail_subscribe: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            subscribed: HashSet::new(),
            sender: None,
            termination: None,
            connected: false,
        }
    }

    pub fn failing_subscribe(mut self, channel: Channel) -> Self {
        self.fail_subscribe = Some(channel);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &mut self,
        termination: Termination,
    ) -> StreamResult<mpsc::Receiver<Notification>> {
        self.calls.lock().push(Call::Connect);
        let (tx, rx) = mpsc::channel(1024);
        self.sender = Some(tx);
        self.termination = Some(termination);
        self.connected = true;
        Ok(rx)
    }

    async fn subscribe(&mut self, channel: Channel) -> StreamResult<()> {
        self.calls.lock().push(Call::Subscribe(channel));
        if self.fail_subscribe == Some(channel) {
            return Err(StreamError::Subscription {
                channel,
                message: "characteristic not found".into(),
            });
        }
        self.subscribed.insert(channel);
        Ok(())
    }

    async fn unsubscribe(&mut self, channel: Channel) -> StreamResult<()> {
        self.calls.lock().push(Call::Unsubscribe(channel));
        self.subscribed.remove(&channel);
        Ok(())
    }

    async fn start_streaming(&mut self) -> StreamResult<()> {
        self.calls.lock().push(Call::StartStreaming);
        let sender = self.sender.clone().ok_or(StreamError::NotConnected)?;

        for notification in std::mem::take(&mut self.script) {
            if self.subscribed.contains(&notification.channel) {
                sender
                    .send(notification)
                    .await
                    .map_err(|_| StreamError::Connection("receiver closed".into()))?;
            }
        }

        match self.after_script {
            AfterScript::Idle => {}
            AfterScript::Close => self.sender = None,
            AfterScript::Disconnect => {
                if let Some(termination) = &self.termination {
                    termination.trigger(TerminationCause::PeerDisconnected);
                }
            }
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> StreamResult<()> {
        self.calls.lock().push(Call::Disconnect);
        self.sender = None;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        "mock transport".into()
    }
}

/// Publisher that keeps every message in memory
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<Value>)>>,
}

impl RecordingPublisher {
    pub fn messages_to(&self, address: &str) -> Vec<Vec<Value>> {
        self.messages
            .lock()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn count(&self, address: &str) -> usize {
        self.messages_to(address).len()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, address: &str, values: &[Value]) -> PublishResult<()> {
        self.messages
            .lock()
            .push((address.to_string(), values.to_vec()));
        Ok(())
    }
}

pub fn normalized(values: [f32; 4]) -> Notification {
    let payload = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    Notification::new(Channel::Normalized, payload, 0.0)
}

pub fn raw(value: u16) -> Notification {
    let payload = [value; 32].iter().flat_map(|v| v.to_le_bytes()).collect();
    Notification::new(Channel::Raw, payload, 0.0)
}
