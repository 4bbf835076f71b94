//! Progress reporting for long-running maintenance passes

use std::time::{Duration, Instant};

/// Receives progress of a long operation
pub trait ProgressSink {
    /// `fraction` is in `[0, 1]` of the whole operation
    fn report(&mut self, fraction: f32, message: &str);

    /// Polled between phases; returning true stops the operation there
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&mut self, _fraction: f32, _message: &str) {}
}

/// Maps progress of one phase onto the `[lo, hi]` part of an outer sink
pub struct SubProgress<'a> {
    sink: &'a mut dyn ProgressSink,
    lo: f32,
    hi: f32,
}

impl<'a> SubProgress<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, lo: f32, hi: f32) -> Self {
        Self { sink, lo, hi }
    }

    /// Overall fraction for phase progress `p`
    pub fn map(&self, p: f32) -> f32 {
        self.lo + p.clamp(0.0, 1.0) * (self.hi - self.lo)
    }
}

impl ProgressSink for SubProgress<'_> {
    fn report(&mut self, fraction: f32, message: &str) {
        let overall = self.map(fraction);
        self.sink.report(overall, message);
    }

    fn is_cancelled(&self) -> bool {
        self.sink.is_cancelled()
    }
}

/// Adds elapsed time and a remaining-time estimate to every message
pub struct Progressor<'a> {
    sink: &'a mut dyn ProgressSink,
    start: Instant,
}

impl<'a> Progressor<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Linear extrapolation from the progress made so far
    pub fn remaining(&self, fraction: f32) -> Option<Duration> {
        if fraction <= 0.0 || fraction >= 1.0 {
            return None;
        }
        let elapsed = self.elapsed().as_secs_f64();
        let fraction = fraction as f64;
        Some(Duration::from_secs_f64(elapsed * (1.0 - fraction) / fraction))
    }
}

impl ProgressSink for Progressor<'_> {
    fn report(&mut self, fraction: f32, message: &str) {
        let elapsed = self.elapsed().as_secs_f64();
        let message = match self.remaining(fraction) {
            Some(eta) => format!("{} [{:.1}s, ~{:.0}s remaining]", message, elapsed, eta.as_secs_f64()),
            None => format!("{} [{:.1}s]", message, elapsed),
        };
        self.sink.report(fraction, &message);
    }

    fn is_cancelled(&self) -> bool {
        self.sink.is_cancelled()
    }
}

/// Logs progress at `info` level, at most once per `min_step` of progress
pub struct LogProgress {
    label: String,
    min_step: f32,
    last: Option<f32>,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_step(label, 0.05)
    }

    pub fn with_step(label: impl Into<String>, min_step: f32) -> Self {
        Self {
            label: label.into(),
            min_step,
            last: None,
        }
    }

    /// Fraction of the last logged report
    pub fn last_logged(&self) -> Option<f32> {
        self.last
    }

    fn should_log(&self, fraction: f32) -> bool {
        match self.last {
            None => true,
            Some(last) => fraction >= 1.0 || fraction - last >= self.min_step,
        }
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, fraction: f32, message: &str) {
        if !self.should_log(fraction) {
            return;
        }
        self.last = Some(fraction);
        log::info!("{}: {:>3.0}% {}", self.label, fraction * 100.0, message);
    }
}
