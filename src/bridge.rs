use crate::cli::Cli;
use crate::exit_codes;
use crate::output;
use bow_bridge::config::{ConfigError, Mode, ModeConfig};
use bow_bridge::inference::{DenseModel, Predictor};
use bow_bridge::publish::OscPublisher;
use bow_bridge::streaming::{
    create_transport, SessionSummary, StreamSession, Termination, TerminationCause,
    TransportConfig,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const RULE: &str = "------------------------------";

#[derive(Serialize)]
struct SummaryOutput {
    mode: Mode,
    normalized_samples: u64,
    raw_samples: u64,
    elapsed_secs: f64,
    average_rate_hz: Option<f64>,
    termination: Option<TerminationCause>,
}

fn print_banner(mode: ModeConfig) {
    eprintln!("{}", RULE);
    eprintln!("--------- BOW-BRIDGE ---------");
    eprintln!("{}", RULE);
    eprintln!("---- Press ctrl+c to exit ----");
    eprintln!("{}", RULE);
    eprintln!("Mode: {}", mode.mode);
}

fn load_predictor(cli: &Cli, mode: ModeConfig) -> Result<Option<Arc<dyn Predictor>>, ConfigError> {
    if !mode.inference_enabled {
        return Ok(None);
    }
    let model: Arc<dyn Predictor> = Arc::new(DenseModel::load(&cli.model)?);
    Ok(Some(model))
}

fn transport_config(cli: &Cli) -> TransportConfig {
    match &cli.replay {
        Some(path) => TransportConfig::Replay {
            path: path.clone(),
            interval: (cli.replay_interval_ms > 0)
                .then(|| Duration::from_millis(cli.replay_interval_ms)),
        },
        None => TransportConfig::Ble {
            address: cli.address.clone(),
            scan_timeout: Duration::from_secs(cli.scan_timeout),
        },
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn spawn_signal_listener(termination: Termination) {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                if termination.trigger(TerminationCause::OperatorCancelled) {
                    log::info!("Interrupt received, shutting down");
                }
            }
            Err(e) => log::warn!("Failed to install signal handler: {}", e),
        }
    });
}

fn report(
    summary: &SessionSummary,
    mode: ModeConfig,
    termination: &Termination,
    json: bool,
) -> i32 {
    if !json {
        println!("{}", RULE);
        println!("Unsubscribed and disconnected.");
        println!("{}", summary);
        return exit_codes::SUCCESS;
    }

    let out = SummaryOutput {
        mode: mode.mode,
        normalized_samples: summary.normalized_samples,
        raw_samples: summary.raw_samples,
        elapsed_secs: summary.elapsed.as_secs_f64(),
        average_rate_hz: summary.average_rate_hz,
        termination: termination.cause(),
    };
    match output::to_json(&out).and_then(|json| output::write_output(&json)) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::SESSION_ERROR
        }
    }
}

pub async fn execute(cli: Cli) -> i32 {
    let mode = match ModeConfig::resolve(cli.modes.as_slice()) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    if !cli.quiet {
        print_banner(mode);
    }

    let predictor = match load_predictor(&cli, mode) {
        Ok(predictor) => predictor,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    let transport = match create_transport(transport_config(&cli)) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Error: {}", ConfigError::Transport(e.to_string()));
            return exit_codes::CONFIG_ERROR;
        }
    };

    let publisher = match OscPublisher::connect(&cli.osc_host, cli.osc_port).await {
        Ok(publisher) => Arc::new(publisher),
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    let session = StreamSession::new(mode, transport, publisher, predictor);
    let termination = session.termination();
    spawn_signal_listener(termination.clone());

    match session.run().await {
        Ok(summary) => report(&summary, mode, &termination, cli.json),
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::SESSION_ERROR
        }
    }
}
