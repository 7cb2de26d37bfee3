// Outbound publishing of decoded and derived values
//
// Every message is an address plus a list of numeric arguments. The session
// only depends on the `Publisher` trait; `OscPublisher` sends the messages
// as OSC packets over UDP.

mod osc;

pub use osc::{encode_message, OscPublisher, DEFAULT_OSC_HOST, DEFAULT_OSC_PORT};

use crate::streaming::Value;
use thiserror::Error;

/// OSC address of model predictions
pub const PRED_ADDRESS: &str = "/pred";

/// OSC address of assembled dataset examples
pub const DATASET_EXAMPLE_ADDRESS: &str = "/dataset_example";

pub type PublishResult<T> = Result<T, PublishError>;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Invalid OSC address: {0}")]
    InvalidAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not resolve {0}")]
    Resolve(String),
}

/// Sink for (address, values) messages.
///
/// `publish` must not block: it is called from the notification handling
/// path for every decoded record.
pub trait Publisher: Send + Sync {
    fn publish(&self, address: &str, values: &[Value]) -> PublishResult<()>;
}
