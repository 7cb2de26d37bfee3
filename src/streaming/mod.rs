// Sensor notification streaming and dataset assembly
//
// This module receives notifications from the sensor board, decodes them,
// merges the two characteristic streams into training examples and drives
// the session lifecycle until the peer disconnects or the operator cancels.
//
// Architecture:
// - `transport`: Trait-based notification producers (BLE, capture replay)
// - `decoder`: Fixed binary layouts of the two characteristics
// - `merger`: Pairs the latest normalized record with each raw record
// - `stats`: Per-session sample counters and rate
// - `dispatch`: Per-notification decode, publish, infer and merge step
// - `session`: Connect/subscribe/stream/unsubscribe lifecycle
// - `termination`: One-shot termination signal shared by all shutdown paths

pub mod decoder;
pub mod dispatch;
pub mod merger;
pub mod record;
pub mod session;
pub mod stats;
pub mod termination;
pub mod transport;
pub mod types;

pub use decoder::{decode_normalized, decode_raw, DecodeError};
pub use dispatch::Dispatcher;
pub use merger::{is_complete, RecordMerger, SyncError};
pub use record::{MergedRecord, NormalizedRecord, RawRecord, Value};
pub use session::{SessionEvent, StreamSession};
pub use stats::{SessionStats, SessionSummary};
pub use termination::{Termination, TerminationCause};
pub use transport::{create_transport, Transport, TransportConfig};
pub use types::{Channel, Notification, SessionState, StreamError, StreamResult};
