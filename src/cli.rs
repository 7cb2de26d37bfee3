use bow_bridge::publish::{DEFAULT_OSC_HOST, DEFAULT_OSC_PORT};
use bow_bridge::streaming::transport::DEFAULT_DEVICE_ADDRESS;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bow-bridge",
    version,
    about = "Bridge the bow tracker sensor to OSC",
    long_about = "Stream bow tracker sensor notifications over Bluetooth LE and republish them as OSC.\n\
                  In prod mode the trained model predicts from every reading (/pred);\n\
                  in dataset mode readings and raw sensor values are merged into training examples (/dataset_example)."
)]
pub struct Cli {
    /// Mode: prod or dataset (case-insensitive, defaults to prod)
    #[arg(value_name = "MODE")]
    pub modes: Vec<String>,

    /// Bluetooth address of the sensor board
    #[arg(long, env = "BOW_BRIDGE_ADDRESS", default_value = DEFAULT_DEVICE_ADDRESS)]
    pub address: String,

    /// Seconds to scan for the sensor board before giving up
    #[arg(long, env = "BOW_BRIDGE_SCAN_TIMEOUT", default_value_t = 10)]
    pub scan_timeout: u64,

    /// OSC target host
    #[arg(long, env = "BOW_BRIDGE_OSC_HOST", default_value = DEFAULT_OSC_HOST)]
    pub osc_host: String,

    /// OSC target port
    #[arg(long, env = "BOW_BRIDGE_OSC_PORT", default_value_t = DEFAULT_OSC_PORT)]
    pub osc_port: u16,

    /// Trained model weights (JSON), loaded in prod mode
    #[arg(
        long,
        env = "BOW_BRIDGE_MODEL",
        default_value = "trained_model/bow_tracker_model.json"
    )]
    pub model: PathBuf,

    /// Replay notifications from a JSON-lines capture instead of connecting over BLE
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Delay between replayed notifications in milliseconds
    #[arg(long, default_value_t = 0, requires = "replay")]
    pub replay_interval_ms: u64,

    /// Print the session summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress the startup banner
    #[arg(long, default_value_t = false)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
