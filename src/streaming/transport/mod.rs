// Pluggable notification transports
//
// A transport connects to the sensor board, subscribes to characteristics
// and forwards their value notifications through an mpsc channel. It
// reports a peer disconnect by triggering the session `Termination`.
//
// Current implementations:
// - BLE: the sensor board over Bluetooth LE (feature `ble`)
// - Replay: a JSON-lines capture of notifications, for running without hardware

#[cfg(feature = "ble")]
mod ble;
mod replay;

#[cfg(feature = "ble")]
pub use ble::BleTransport;
pub use replay::{CaptureLine, ReplayTransport};

use super::termination::Termination;
use super::types::{Channel, Notification, StreamResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bluetooth address of the SparkFun ESP32 Thing Plus C on the bow
pub const DEFAULT_DEVICE_ADDRESS: &str = "D4:8A:FC:C3:5F:16";

/// Capacity of the notification channel between transport and session
pub const NOTIFICATION_QUEUE_CAPACITY: usize = 256;

/// Transport selection, built from the command line
#[derive(Debug, Clone)]
pub enum TransportConfig {
    Ble {
        address: String,
        scan_timeout: Duration,
    },
    Replay {
        path: PathBuf,
        /// Delay between notifications (simulates the sensor rate)
        interval: Option<Duration>,
    },
}

/// Producer of sensor notifications
#[async_trait]
pub trait Transport: Send {
    /// Connect to the peer. The returned receiver yields notifications of
    /// subscribed channels; it closes when the peer goes away.
    async fn connect(&mut self, termination: Termination)
        -> StreamResult<mpsc::Receiver<Notification>>;

    async fn subscribe(&mut self, channel: Channel) -> StreamResult<()>;

    async fn unsubscribe(&mut self, channel: Channel) -> StreamResult<()>;

    /// Called once all subscriptions are in place
    async fn start_streaming(&mut self) -> StreamResult<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> StreamResult<()>;

    fn is_connected(&self) -> bool;

    /// Human readable peer description for logs
    fn describe(&self) -> String;
}

/// Factory function to create a transport from configuration
pub fn create_transport(config: TransportConfig) -> StreamResult<Box<dyn Transport>> {
    match config {
        TransportConfig::Ble {
            address,
            scan_timeout,
        } => ble_transport(address, scan_timeout),

        TransportConfig::Replay { path, interval } => {
            Ok(Box::new(ReplayTransport::new(path, interval)))
        }
    }
}

#[cfg(feature = "ble")]
fn ble_transport(address: String, scan_timeout: Duration) -> StreamResult<Box<dyn Transport>> {
    Ok(Box::new(BleTransport::new(&address, scan_timeout)?))
}

#[cfg(not(feature = "ble"))]
fn ble_transport(address: String, _scan_timeout: Duration) -> StreamResult<Box<dyn Transport>> {
    Err(super::types::StreamError::InvalidConfig(format!(
        "cannot connect to {}: built without Bluetooth support (enable the `ble` feature or use --replay)",
        address
    )))
}
