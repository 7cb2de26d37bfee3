// Bluetooth LE transport
//
// Connects to the bow sensor board (an ESP32 advertising the bow tracker
// GATT service) and forwards notifications of its two characteristics:
// - Readings: 4 normalized distances (16 bytes)
// - Debug: 32 raw sensor readings (64 bytes)
//
// A `DeviceDisconnected` central event for the board triggers the session
// termination. Reconnection is left to the operator.

use super::{Transport, NOTIFICATION_QUEUE_CAPACITY};
use crate::streaming::termination::{Termination, TerminationCause};
use crate::streaming::types::{Channel, Notification, StreamError, StreamResult};
use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    ValueNotification,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::{uuid, Uuid};

pub const SERVICE_UUID: Uuid = uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");
pub const READINGS_CHARACTERISTIC_UUID: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");
pub const DEBUG_CHARACTERISTIC_UUID: Uuid = uuid!("1e0c94ff-b7ce-4e72-8977-9a1f8ad4cc2a");

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn characteristic_uuid(channel: Channel) -> Uuid {
    match channel {
        Channel::Normalized => READINGS_CHARACTERISTIC_UUID,
        Channel::Raw => DEBUG_CHARACTERISTIC_UUID,
    }
}

fn channel_for(uuid: Uuid) -> Option<Channel> {
    if uuid == READINGS_CHARACTERISTIC_UUID {
        Some(Channel::Normalized)
    } else if uuid == DEBUG_CHARACTERISTIC_UUID {
        Some(Channel::Raw)
    } else {
        None
    }
}

fn ble_error(e: btleplug::Error) -> StreamError {
    StreamError::Bluetooth(e.to_string())
}

pub struct BleTransport {
    address: BDAddr,
    scan_timeout: Duration,
    adapter: Option<Adapter>,
    peripheral: Option<Peripheral>,
    characteristics: HashMap<Channel, Characteristic>,
    pump: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
    is_connected: bool,
}

impl BleTransport {
    pub fn new(address: &str, scan_timeout: Duration) -> StreamResult<Self> {
        let address = BDAddr::from_str(address).map_err(|e| {
            StreamError::InvalidConfig(format!("invalid Bluetooth address '{}': {}", address, e))
        })?;

        Ok(Self {
            address,
            scan_timeout,
            adapter: None,
            peripheral: None,
            characteristics: HashMap::new(),
            pump: None,
            watcher: None,
            is_connected: false,
        })
    }

    async fn find_peripheral(&self, adapter: &Adapter) -> StreamResult<Peripheral> {
        let deadline = tokio::time::Instant::now() + self.scan_timeout;
        loop {
            let peripherals = adapter.peripherals().await.map_err(ble_error)?;
            if let Some(peripheral) = peripherals
                .into_iter()
                .find(|p| p.address() == self.address)
            {
                return Ok(peripheral);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(StreamError::Connection(format!(
                    "device {} not found within {}s",
                    self.address,
                    self.scan_timeout.as_secs()
                )));
            }
            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    fn spawn_disconnect_watcher(
        &mut self,
        mut events: std::pin::Pin<Box<dyn futures_util::Stream<Item = CentralEvent> + Send>>,
        peripheral: &Peripheral,
        termination: Termination,
    ) {
        let id = peripheral.id();
        self.watcher = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(disconnected) = event {
                    if disconnected == id {
                        log::info!("Peer disconnected");
                        termination.trigger(TerminationCause::PeerDisconnected);
                        break;
                    }
                }
            }
        }));
    }

    fn spawn_notification_pump(
        &mut self,
        mut stream: std::pin::Pin<Box<dyn futures_util::Stream<Item = ValueNotification> + Send>>,
        sender: mpsc::Sender<Notification>,
    ) {
        self.pump = Some(tokio::spawn(async move {
            while let Some(ValueNotification { uuid, value, .. }) = stream.next().await {
                let Some(channel) = channel_for(uuid) else {
                    log::trace!("Ignoring notification from {}", uuid);
                    continue;
                };
                if sender.send(Notification::now(channel, value)).await.is_err() {
                    log::debug!("Notification receiver closed");
                    return;
                }
            }
            log::debug!("BLE notification stream ended");
        }));
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn connect(
        &mut self,
        termination: Termination,
    ) -> StreamResult<mpsc::Receiver<Notification>> {
        let manager = Manager::new().await.map_err(ble_error)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(ble_error)?
            .into_iter()
            .next()
            .ok_or_else(|| StreamError::Connection("no Bluetooth adapter available".into()))?;

        log::info!("Scanning for {}", self.address);
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(ble_error)?;
        let found = self.find_peripheral(&adapter).await;
        if let Err(e) = adapter.stop_scan().await {
            log::warn!("Failed to stop scan: {}", e);
        }
        let peripheral = found?;

        let events = adapter.events().await.map_err(ble_error)?;
        peripheral.connect().await.map_err(ble_error)?;
        self.peripheral = Some(peripheral.clone());
        self.is_connected = true;
        self.spawn_disconnect_watcher(events, &peripheral, termination);

        peripheral.discover_services().await.map_err(ble_error)?;
        self.characteristics = peripheral
            .characteristics()
            .into_iter()
            .filter(|c| c.service_uuid == SERVICE_UUID)
            .filter_map(|c| channel_for(c.uuid).map(|channel| (channel, c)))
            .collect();
        log::debug!(
            "Discovered {} bow tracker characteristics",
            self.characteristics.len()
        );

        let stream = peripheral.notifications().await.map_err(ble_error)?;
        let (tx, rx) = mpsc::channel(NOTIFICATION_QUEUE_CAPACITY);
        self.spawn_notification_pump(stream, tx);
        self.adapter = Some(adapter);

        Ok(rx)
    }

    async fn subscribe(&mut self, channel: Channel) -> StreamResult<()> {
        let peripheral = self.peripheral.as_ref().ok_or(StreamError::NotConnected)?;
        let characteristic =
            self.characteristics
                .get(&channel)
                .ok_or_else(|| StreamError::Subscription {
                    channel,
                    message: format!("characteristic {} not found", characteristic_uuid(channel)),
                })?;

        peripheral
            .subscribe(characteristic)
            .await
            .map_err(|e| StreamError::Subscription {
                channel,
                message: e.to_string(),
            })
    }

    async fn unsubscribe(&mut self, channel: Channel) -> StreamResult<()> {
        let peripheral = self.peripheral.as_ref().ok_or(StreamError::NotConnected)?;
        let Some(characteristic) = self.characteristics.get(&channel) else {
            return Ok(());
        };

        peripheral
            .unsubscribe(characteristic)
            .await
            .map_err(|e| StreamError::Subscription {
                channel,
                message: e.to_string(),
            })
    }

    async fn disconnect(&mut self) -> StreamResult<()> {
        // Our own disconnect must not look like a peer disconnect
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }

        let result = match self.peripheral.take() {
            Some(peripheral) if self.is_connected => {
                peripheral.disconnect().await.map_err(ble_error)
            }
            _ => Ok(()),
        };

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.characteristics.clear();
        self.adapter = None;
        self.is_connected = false;

        result
    }

    fn is_connected(&self) -> bool {
        self.is_connected
    }

    fn describe(&self) -> String {
        format!("BLE device {}", self.address)
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
