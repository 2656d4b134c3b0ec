//! Timed invocation harness
//!
//! Runs a black-box unit of work a fixed number of times, records a wall-clock
//! duration per trial, and reports min, max, and the trimmed mean (sum minus
//! min minus max, divided by N − 2). Discarding the two extremes damps cold
//! caches and scheduler noise without needing a warmup phase.
//!
//! Each trial blocks until the callable returns; trials never overlap. If the
//! callable fails, the remaining trials are abandoned and the error propagates
//! to the caller untouched.
//!
//! ```
//! use rayo_db::bench::Harness;
//!
//! # fn main() -> rayo_db::Result<()> {
//! let harness = Harness::new(5);
//! let report = harness.run("noop", || Ok(()))?;
//! assert_eq!(report.trials().len(), 5);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::info;

/// One measured execution of the wrapped callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration: Duration,
}

impl Trial {
    /// Build a trial from explicit observations.
    ///
    /// The harness builds trials itself; this constructor exists so tests
    /// can assemble synthetic trial sets with known durations.
    #[must_use]
    pub const fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            started_at,
            finished_at,
            duration,
        }
    }

    /// Wall-clock start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock end timestamp.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Measured duration (monotonic clock).
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Duration in float seconds.
    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Ordered, append-only collection of trials.
///
/// Fixed length after collection; the harness never drops or reorders
/// entries, so trial k in the set is the k-th invocation.
#[derive(Debug, Clone, Default)]
pub struct TrialSet {
    trials: Vec<Trial>,
}

impl TrialSet {
    /// Create an empty trial set.
    #[must_use]
    pub const fn new() -> Self {
        Self { trials: Vec::new() }
    }

    /// Append one trial. The only mutation the set supports.
    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    /// Number of collected trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Collected trials in invocation order.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Compute the summary over the collected trials.
    ///
    /// # Errors
    /// Returns [`Error::Degenerate`] for fewer than 3 trials; the trimmed
    /// mean divides by N − 2.
    pub fn summary(&self) -> Result<Summary> {
        let n = self.trials.len();
        if n < 3 {
            return Err(Error::Degenerate(n));
        }

        let secs: Vec<f64> = self.trials.iter().map(Trial::seconds).collect();
        let min = secs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = secs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = secs.iter().sum();

        #[allow(clippy::cast_precision_loss)]
        let trimmed_mean = (sum - min - max) / (n - 2) as f64;

        Ok(Summary {
            min,
            max,
            trimmed_mean,
        })
    }
}

/// Derived timing summary: never stored, always recomputed from the set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Fastest trial in seconds (discarded from the mean).
    pub min: f64,
    /// Slowest trial in seconds (discarded from the mean).
    pub max: f64,
    /// Mean of the remaining N − 2 trials, in seconds.
    pub trimmed_mean: f64,
}

/// Completed benchmark: the label, every trial, and the summary.
#[derive(Debug, Clone)]
pub struct Report {
    label: String,
    trials: TrialSet,
    summary: Summary,
}

impl Report {
    /// Benchmark label, echoed in the summary line.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// All collected trials.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        self.trials.trials()
    }

    /// Timing summary.
    #[must_use]
    pub const fn summary(&self) -> Summary {
        self.summary
    }
}

/// Timed invocation harness.
///
/// Single-threaded and synchronous throughout: a slow callable blocks the
/// whole run, and there is no timeout or cancellation.
#[derive(Debug, Clone, Copy)]
pub struct Harness {
    trials: usize,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TRIALS)
    }
}

impl Harness {
    /// Default trial count used by the original measurement scripts.
    pub const DEFAULT_TRIALS: usize = 5;

    /// Create a harness that runs `trials` timed invocations.
    #[must_use]
    pub const fn new(trials: usize) -> Self {
        Self { trials }
    }

    /// Configured trial count.
    #[must_use]
    pub const fn trials(&self) -> usize {
        self.trials
    }

    /// Run the callable exactly N times and report min / max / trimmed mean.
    ///
    /// Each per-trial duration is emitted as soon as it is measured. The
    /// callable's return value is discarded; only its success matters.
    ///
    /// # Errors
    /// - [`Error::Degenerate`] if the configured trial count is below 3,
    ///   before any invocation happens.
    /// - Any error from the callable, verbatim. Trials after the failing one
    ///   do not execute, and no summary is produced.
    pub fn run<T, F>(&self, label: &str, mut f: F) -> Result<Report>
    where
        F: FnMut() -> Result<T>,
    {
        if self.trials < 3 {
            return Err(Error::Degenerate(self.trials));
        }

        let mut set = TrialSet::new();
        for i in 0..self.trials {
            let started_at = Utc::now();
            let clock = Instant::now();
            f()?;
            let duration = clock.elapsed();
            let finished_at = Utc::now();

            info!(
                label,
                trial = i + 1,
                of = self.trials,
                seconds = duration.as_secs_f64(),
                "trial complete"
            );
            set.push(Trial {
                started_at,
                finished_at,
                duration,
            });
        }

        let summary = set.summary()?;
        info!(
            label,
            min = summary.min,
            max = summary.max,
            trimmed_mean = summary.trimmed_mean,
            "benchmark complete"
        );

        Ok(Report {
            label: label.to_string(),
            trials: set,
            summary,
        })
    }
}
