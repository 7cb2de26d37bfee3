// Streaming session - drives one connect/stream/disconnect cycle
//
// The session manages:
// - Transport lifecycle (connect, subscribe, unsubscribe, disconnect)
// - Routing of notifications through the dispatcher
// - Termination on peer disconnect or operator cancellation
// - Session statistics and the final summary
// - Event emission for observers

use super::dispatch::Dispatcher;
use super::stats::SessionSummary;
use super::termination::{Termination, TerminationCause};
use super::transport::Transport;
use super::types::{Channel, Notification, SessionState, StreamResult};
use crate::config::ModeConfig;
use crate::inference::Predictor;
use crate::publish::Publisher;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events emitted by a session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged {
        session_id: String,
        state: SessionState,
    },
    Terminating {
        session_id: String,
        cause: TerminationCause,
    },
    Finished {
        session_id: String,
        summary: SessionSummary,
    },
}

type EventCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

pub struct StreamSession {
    pub id: String,
    mode: ModeConfig,
    transport: Box<dyn Transport>,
    dispatcher: Dispatcher,
    termination: Termination,
    state: SessionState,
    subscribed: Vec<Channel>,
    event_callback: Option<EventCallback>,
}

impl StreamSession {
    pub fn new(
        mode: ModeConfig,
        transport: Box<dyn Transport>,
        publisher: Arc<dyn Publisher>,
        predictor: Option<Arc<dyn Predictor>>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            transport,
            dispatcher: Dispatcher::new(mode, publisher, predictor),
            termination: Termination::new(),
            state: SessionState::Connecting,
            subscribed: Vec::new(),
            event_callback: None,
        }
    }

    /// Handle for ending the session from outside (signal handlers, tests)
    pub fn termination(&self) -> Termination {
        self.termination.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn set_event_callback<F>(&mut self, callback: F)
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
    }

    fn emit_event(&self, event: SessionEvent) {
        if let Some(callback) = self.event_callback.as_ref() {
            callback(event);
        }
    }

    fn set_state(&mut self, state: SessionState) {
        log::debug!("Session {}: {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
        self.emit_event(SessionEvent::StateChanged {
            session_id: self.id.clone(),
            state,
        });
    }

    /// Run the session until the peer disconnects or the operator cancels.
    ///
    /// Every subscription made is released before this returns, whether the
    /// session ended normally or failed while connecting or subscribing.
    pub async fn run(mut self) -> StreamResult<SessionSummary> {
        log::info!(
            "Starting session {} in {} mode ({})",
            self.id,
            self.mode.mode,
            self.transport.describe()
        );
        self.set_state(SessionState::Connecting);

        let mut notifications = match self.transport.connect(self.termination.clone()).await {
            Ok(rx) => rx,
            Err(e) => {
                log::error!("Connection failed: {}", e);
                self.release().await;
                self.set_state(SessionState::Terminated);
                return Err(e);
            }
        };
        log::info!("Connected: {}", self.transport.is_connected());

        let ready = match self.subscribe_all().await {
            Ok(()) => {
                self.set_state(SessionState::Subscribed);
                self.transport.start_streaming().await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = ready {
            log::error!("Failed to start streaming: {}", e);
            notifications.close();
            self.set_state(SessionState::Unsubscribing);
            self.release().await;
            self.set_state(SessionState::Terminated);
            return Err(e);
        }

        self.dispatcher.begin();
        self.set_state(SessionState::Streaming);
        log::info!("Subscribed to characteristic updates. Listening...");

        let cause = self.stream(&mut notifications).await;
        log::info!("Session {} ending: {}", self.id, cause);
        self.emit_event(SessionEvent::Terminating {
            session_id: self.id.clone(),
            cause,
        });

        self.set_state(SessionState::Unsubscribing);
        self.release().await;

        let summary = self.dispatcher.finish();
        self.set_state(SessionState::Terminated);
        log::info!("Unsubscribed and disconnected. {}", summary);

        self.emit_event(SessionEvent::Finished {
            session_id: self.id.clone(),
            summary: summary.clone(),
        });

        Ok(summary)
    }

    async fn subscribe_all(&mut self) -> StreamResult<()> {
        let mut channels = vec![Channel::Normalized];
        if self.mode.dataset_enabled {
            channels.push(Channel::Raw);
        }

        for channel in channels {
            self.transport.subscribe(channel).await?;
            self.subscribed.push(channel);
            log::debug!("Subscribed to {} channel", channel);
        }
        Ok(())
    }

    async fn stream(
        &mut self,
        notifications: &mut mpsc::Receiver<Notification>,
    ) -> TerminationCause {
        let termination = self.termination.clone();
        let cause = loop {
            tokio::select! {
                biased;

                cause = termination.triggered() => break cause,

                next = notifications.recv() => match next {
                    Some(notification) => self.dispatcher.dispatch(&notification),
                    None => {
                        log::debug!("Notification channel closed");
                        termination.trigger(TerminationCause::PeerDisconnected);
                        break termination
                            .cause()
                            .unwrap_or(TerminationCause::PeerDisconnected);
                    }
                },
            }
        };

        // Notifications delivered before termination are still handled
        notifications.close();
        let mut drained = 0usize;
        while let Ok(notification) = notifications.try_recv() {
            self.dispatcher.dispatch(&notification);
            drained += 1;
        }
        if drained > 0 {
            log::debug!("Handled {} queued notifications after termination", drained);
        }

        cause
    }

    async fn release(&mut self) {
        for channel in std::mem::take(&mut self.subscribed) {
            if let Err(e) = self.transport.unsubscribe(channel).await {
                log::warn!("Failed to unsubscribe from {} channel: {}", channel, e);
            }
        }
        if let Err(e) = self.transport.disconnect().await {
            log::warn!("Failed to disconnect: {}", e);
        }
    }
}
