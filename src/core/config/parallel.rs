//! Shared parallel processing configuration types.

use serde::{Deserialize, Serialize};

/// Parallelism settings for the inference stage.
///
/// Only window inference runs in parallel; mask building, vectorization and
/// post-processing are single-pass over complete inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of worker threads for window inference.
    /// If None, rayon's global pool is used (typically one thread per core).
    /// Default: None
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Number of windows at or below which inference runs sequentially.
    /// Default: 1 (a single window never pays the thread-pool overhead)
    #[serde(default = "ParallelPolicy::default_window_threshold")]
    pub window_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the sequential window threshold.
    pub fn with_window_threshold(mut self, threshold: usize) -> Self {
        self.window_threshold = threshold;
        self
    }

    /// Forces sequential processing regardless of window count.
    pub fn sequential() -> Self {
        Self::default().with_window_threshold(usize::MAX)
    }

    /// Returns the processing strategy implied by this policy.
    pub fn strategy(&self) -> ProcessingStrategy {
        match self.window_threshold {
            usize::MAX => ProcessingStrategy::Sequential,
            0 => ProcessingStrategy::Parallel,
            threshold => ProcessingStrategy::Auto(threshold),
        }
    }

    fn default_window_threshold() -> usize {
        1
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            window_threshold: Self::default_window_threshold(),
        }
    }
}

/// Strategy for processing multiple windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStrategy {
    /// Always process sequentially
    Sequential,
    /// Always process in parallel
    Parallel,
    /// Automatically decide based on threshold
    Auto(usize),
}

impl ProcessingStrategy {
    /// Determine if parallel processing should be used for the given item count
    pub fn should_use_parallel(&self, item_count: usize) -> bool {
        match self {
            ProcessingStrategy::Sequential => false,
            ProcessingStrategy::Parallel => true,
            ProcessingStrategy::Auto(threshold) => item_count > *threshold,
        }
    }
}
