//! Pipeline-wide statistics helpers.
//!
//! `PipelineStats` summarizes the inference stage of a run; `StatsManager`
//! collects it from the worker threads.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Statistics for the inference stage of one run.
///
/// Tracks how many windows were inferred and performance metrics such as
/// average inference time and success ratios.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStats {
    /// The total number of windows processed.
    pub total_windows: usize,
    /// The number of windows whose inference eventually succeeded.
    pub successful_windows: usize,
    /// The number of windows skipped after exhausting retries.
    pub failed_windows: usize,
    /// The number of extra attempts spent on retries.
    pub retries: usize,
    /// The average wall time per window (all attempts) in milliseconds.
    pub average_inference_time_ms: f64,
}

impl PipelineStats {
    /// Creates a new PipelineStats instance with default values.
    pub fn new() -> Self {
        Self {
            total_windows: 0,
            successful_windows: 0,
            failed_windows: 0,
            retries: 0,
            average_inference_time_ms: 0.0,
        }
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_windows == 0 {
            0.0
        } else {
            (self.successful_windows as f64 / self.total_windows as f64) * 100.0
        }
    }

    /// Returns the failure rate as a percentage (0.0 to 100.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_windows == 0 {
            0.0
        } else {
            (self.failed_windows as f64 / self.total_windows as f64) * 100.0
        }
    }

    /// Returns the average processing speed in windows per second per worker.
    pub fn windows_per_second(&self) -> f64 {
        if self.average_inference_time_ms == 0.0 {
            0.0
        } else {
            1000.0 / self.average_inference_time_ms
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inference Statistics:")?;
        writeln!(f, "  Windows: {}", self.total_windows)?;
        writeln!(
            f,
            "  Successful: {} ({:.1}%)",
            self.successful_windows,
            self.success_rate()
        )?;
        writeln!(
            f,
            "  Skipped: {} ({:.1}%)",
            self.failed_windows,
            self.failure_rate()
        )?;
        writeln!(f, "  Retries: {}", self.retries)?;
        writeln!(
            f,
            "  Average inference time: {:.2} ms",
            self.average_inference_time_ms
        )?;
        writeln!(
            f,
            "  Processing speed: {:.2} windows/sec",
            self.windows_per_second()
        )?;
        Ok(())
    }
}

/// Thread-safe accumulator fed by the inference workers.
#[derive(Debug, Default)]
pub struct StatsManager {
    stats: Mutex<PipelineStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the statistics recorded so far.
    pub fn snapshot(&self) -> PipelineStats {
        // counters stay meaningful even if a worker panicked mid-update
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records one finished window.
    ///
    /// `attempts` counts every inference call for the window and `elapsed`
    /// covers all of them, including backoff pauses.
    pub fn record_window(&self, succeeded: bool, attempts: u32, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);

        stats.total_windows += 1;
        if succeeded {
            stats.successful_windows += 1;
        } else {
            stats.failed_windows += 1;
        }
        stats.retries += attempts.saturating_sub(1) as usize;

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let n = stats.total_windows as f64;
        stats.average_inference_time_ms += (elapsed_ms - stats.average_inference_time_ms) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineStats, StatsManager};
    use std::time::Duration;

    #[test]
    fn test_rates_handle_zero_windows() {
        let stats = PipelineStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.failure_rate(), 0.0);
        assert_eq!(stats.windows_per_second(), 0.0);
    }

    #[test]
    fn test_rates_compute_percentages() {
        let stats = PipelineStats {
            total_windows: 8,
            successful_windows: 6,
            failed_windows: 2,
            retries: 3,
            average_inference_time_ms: 100.0,
        };
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(stats.failure_rate(), 25.0);
        assert_eq!(stats.windows_per_second(), 10.0);
    }

    #[test]
    fn test_display_formats_metrics() {
        let stats = PipelineStats {
            total_windows: 10,
            successful_windows: 9,
            failed_windows: 1,
            retries: 2,
            average_inference_time_ms: 125.0,
        };

        let display = stats.to_string();
        assert!(display.contains("Windows: 10"));
        assert!(display.contains("Successful: 9 (90.0%)"));
        assert!(display.contains("Skipped: 1 (10.0%)"));
        assert!(display.contains("Retries: 2"));
        assert!(display.contains("Average inference time: 125.00 ms"));
        assert!(display.contains("Processing speed: 8.00 windows/sec"));
    }

    #[test]
    fn test_records_windows_with_running_average() {
        let manager = StatsManager::new();

        manager.record_window(true, 1, Duration::from_millis(100));
        let stats = manager.snapshot();
        assert_eq!(stats.total_windows, 1);
        assert_eq!(stats.successful_windows, 1);
        assert_eq!(stats.retries, 0);
        assert!((stats.average_inference_time_ms - 100.0).abs() < 1e-9);

        manager.record_window(false, 3, Duration::from_millis(200));
        let stats = manager.snapshot();
        assert_eq!(stats.total_windows, 2);
        assert_eq!(stats.failed_windows, 1);
        assert_eq!(stats.retries, 2);
        assert!((stats.average_inference_time_ms - 150.0).abs() < 1e-9);
    }
}
