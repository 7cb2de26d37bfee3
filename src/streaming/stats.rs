// Per-session sample counters

use std::fmt;
use std::time::{Duration, Instant};

/// Counters and clock for a single streaming session
#[derive(Debug, Default)]
pub struct SessionStats {
    started_at: Option<Instant>,
    normalized_samples: u64,
    raw_samples: u64,
}

/// Final statistics of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub normalized_samples: u64,
    pub raw_samples: u64,
    pub elapsed: Duration,
    /// Average normalized notification rate in Hz, `None` when no time elapsed
    pub average_rate_hz: Option<f64>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the session clock and zero both counters
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, instant: Instant) {
        self.started_at = Some(instant);
        self.normalized_samples = 0;
        self.raw_samples = 0;
    }

    pub fn record_normalized(&mut self) {
        self.normalized_samples += 1;
    }

    pub fn record_raw(&mut self) {
        self.raw_samples += 1;
    }

    pub fn normalized_samples(&self) -> u64 {
        self.normalized_samples
    }

    pub fn raw_samples(&self) -> u64 {
        self.raw_samples
    }

    pub fn finish(&self) -> SessionSummary {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(&self, end: Instant) -> SessionSummary {
        let elapsed = match self.started_at {
            Some(start) => end.saturating_duration_since(start),
            None => {
                log::warn!("Session finished before it was started");
                Duration::ZERO
            }
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let average_rate_hz = if elapsed_secs > 0.0 {
            Some(self.normalized_samples as f64 / elapsed_secs)
        } else {
            log::warn!("Session elapsed time is zero, average rate is undefined");
            None
        };

        SessionSummary {
            normalized_samples: self.normalized_samples,
            raw_samples: self.raw_samples,
            elapsed,
            average_rate_hz,
        }
    }
}

/// Format a duration as `H:MM:SS.ffffff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:06}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        elapsed.subsec_micros()
    )
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received {} samples in {} ",
            self.normalized_samples,
            format_elapsed(self.elapsed)
        )?;
        match self.average_rate_hz {
            Some(rate) => write!(f, "(avg {:.3} Hz)", rate)?,
            None => write!(f, "(avg undefined)")?,
        }
        if self.raw_samples > 0 {
            write!(f, ", {} raw samples", self.raw_samples)?;
        }
        Ok(())
    }
}
