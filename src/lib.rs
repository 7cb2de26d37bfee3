pub mod config;
pub mod inference;
pub mod publish;
pub mod streaming;

pub use config::{ConfigError, ConfigResult, Mode, ModeConfig};
pub use inference::{DenseModel, InferenceError, Predictor};
pub use publish::{OscPublisher, PublishError, Publisher};
pub use streaming::{
    Channel, Notification, SessionState, SessionSummary, StreamError, StreamResult, StreamSession,
    Termination, TerminationCause, Value,
};
