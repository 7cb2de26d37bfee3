// Per-notification processing
//
// Each notification is handled as one step: decode, count, publish, infer
// (PROD) and merge (DATASET). Failures are local to the notification and
// never end the session. The dispatcher is owned by the session task, so no
// two steps can interleave.

use super::decoder::{decode_normalized, decode_raw};
use super::merger::{is_complete, RecordMerger};
use super::record::Value;
use super::stats::{SessionStats, SessionSummary};
use super::types::{Channel, Notification};
use crate::config::ModeConfig;
use crate::inference::Predictor;
use crate::publish::{Publisher, DATASET_EXAMPLE_ADDRESS, PRED_ADDRESS};
use std::sync::Arc;

pub struct Dispatcher {
    mode: ModeConfig,
    merger: RecordMerger,
    stats: SessionStats,
    publisher: Arc<dyn Publisher>,
    predictor: Option<Arc<dyn Predictor>>,
}

impl Dispatcher {
    pub fn new(
        mode: ModeConfig,
        publisher: Arc<dyn Publisher>,
        predictor: Option<Arc<dyn Predictor>>,
    ) -> Self {
        if mode.inference_enabled && predictor.is_none() {
            log::warn!(
                "Inference is enabled but no model is loaded; predictions will not be published"
            );
        }

        Self {
            mode,
            merger: RecordMerger::new(),
            stats: SessionStats::new(),
            publisher,
            predictor,
        }
    }

    /// Start the session clock
    pub fn begin(&mut self) {
        self.merger = RecordMerger::new();
        self.stats.start();
    }

    pub fn finish(&self) -> SessionSummary {
        self.stats.finish()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn dispatch(&mut self, notification: &Notification) {
        log::trace!(
            "{} notification at {:.6} ({} bytes)",
            notification.channel,
            notification.timestamp,
            notification.payload.len()
        );

        match notification.channel {
            Channel::Normalized => self.on_normalized(&notification.payload),
            Channel::Raw => self.on_raw(&notification.payload),
        }
    }

    fn on_normalized(&mut self, payload: &[u8]) {
        let record = match decode_normalized(payload) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Dropping notification: {}", e);
                return;
            }
        };

        self.stats.record_normalized();
        log::debug!("Received data: {:?}", record.values());
        self.publish(Channel::Normalized.publish_address(), &record.to_values());

        if self.mode.inference_enabled {
            if let Some(predictor) = &self.predictor {
                match predictor.predict(&record) {
                    Ok(prediction) => {
                        let values: Vec<Value> =
                            prediction.iter().copied().map(Value::from).collect();
                        self.publish(PRED_ADDRESS, &values);
                    }
                    Err(e) => log::warn!("Inference failed: {}", e),
                }
            }
        }

        if self.mode.dataset_enabled {
            self.merger.on_normalized(record);
        }
    }

    fn on_raw(&mut self, payload: &[u8]) {
        let record = match decode_raw(payload) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Dropping notification: {}", e);
                return;
            }
        };

        self.stats.record_raw();
        log::debug!("  DEBUG: {:?}", record.values());
        self.publish(Channel::Raw.publish_address(), &record.to_values());

        if self.mode.dataset_enabled {
            match self.merger.on_raw(&record) {
                Ok(merged) if is_complete(merged.values()) => {
                    self.publish(DATASET_EXAMPLE_ADDRESS, merged.values());
                }
                Ok(merged) => {
                    log::debug!(
                        "Skipping incomplete example of {} values",
                        merged.values().len()
                    );
                }
                Err(e) => {
                    log::debug!("Waiting for realignment: {}", e);
                }
            }
        }
    }

    fn publish(&self, address: &str, values: &[Value]) {
        if let Err(e) = self.publisher.publish(address, values) {
            log::warn!("Failed to publish {}: {}", address, e);
        }
    }
}
