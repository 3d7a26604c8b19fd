//! Per-window inference with output checks, timeouts and retries.

use crate::core::config::PipelineConfig;
use crate::core::errors::{FootprintError, ProcessingStage};
use crate::core::traits::InferenceAdapter;
use crate::core::validation::{validate_grid_shape, validate_probabilities};
use crate::domain::window::Window;
use ndarray::{Array2, Array3, ArrayView3, Axis, Zip};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// A window whose inference succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredWindow {
    pub probabilities: Array2<f32>,
    /// Calls made, including the successful one.
    pub attempts: u32,
}

/// A window whose inference failed on every attempt.
#[derive(Debug)]
pub struct InferenceFailure {
    /// Error of the last attempt.
    pub error: FootprintError,
    pub attempts: u32,
}

/// Wraps an [`InferenceAdapter`] with the run's retry and timeout policy.
///
/// Every adapter error and every output that is not a `rows x cols` grid of
/// finite values in `[0, 1]` counts as a failed attempt. Attempt `n` (from
/// zero) that fails is followed by a pause of `backoff * 2^n`, capped at
/// [`MAX_BACKOFF`].
#[derive(Debug, Clone)]
pub struct WindowInference {
    adapter: Arc<dyn InferenceAdapter>,
    retries: u32,
    timeout: Option<Duration>,
    backoff: Duration,
}

impl WindowInference {
    pub fn new(
        adapter: Arc<dyn InferenceAdapter>,
        retries: u32,
        timeout: Option<Duration>,
        backoff: Duration,
    ) -> Self {
        Self {
            adapter,
            retries,
            timeout,
            backoff,
        }
    }

    pub fn from_config(adapter: Arc<dyn InferenceAdapter>, config: &PipelineConfig) -> Self {
        Self::new(
            adapter,
            config.inference_retries,
            config.inference_timeout,
            config.retry_backoff,
        )
    }

    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Delay after the failed attempt `attempt` (zero-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(1u32 << attempt.min(16))
            .min(MAX_BACKOFF)
    }

    /// Runs inference for one window, retrying failed attempts.
    ///
    /// The tile is shared with the timeout thread, which may outlive the
    /// call when the adapter does not answer in time.
    pub fn infer(
        &self,
        window: &Window,
        tile: Arc<Array3<f32>>,
    ) -> Result<InferredWindow, InferenceFailure> {
        let mut attempts = 0;

        loop {
            let result = self
                .call_once(&tile)
                .and_then(|probs| self.check_output(window, probs));
            attempts += 1;

            match result {
                Ok(probabilities) => {
                    if attempts > 1 {
                        debug!("window {} succeeded after {} attempts", window, attempts);
                    }
                    return Ok(InferredWindow {
                        probabilities,
                        attempts,
                    });
                }
                Err(error) if attempts <= self.retries && error.is_retryable() => {
                    let delay = self.backoff_for(attempts - 1);
                    warn!(
                        "window {} attempt {}/{} failed: {}; retrying in {:?}",
                        window,
                        attempts,
                        self.retries + 1,
                        error,
                        delay
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(error) => return Err(InferenceFailure { error, attempts }),
            }
        }
    }

    fn call_once(&self, tile: &Arc<Array3<f32>>) -> Result<Array2<f32>, FootprintError> {
        let name = self.adapter.name();
        let result = match self.timeout {
            None => self.adapter.predict(tile.view()),
            Some(timeout) => {
                let (tx, rx) = mpsc::channel();
                let adapter = Arc::clone(&self.adapter);
                let tile = Arc::clone(tile);
                thread::Builder::new()
                    .name("rooftrace-inference".to_string())
                    .spawn(move || {
                        // the receiver is gone once the call has timed out
                        let _ = tx.send(adapter.predict(tile.view()));
                    })
                    .map_err(|e| {
                        FootprintError::processing_error(
                            ProcessingStage::Inference,
                            "spawning inference thread",
                            e,
                        )
                    })?;

                match rx.recv_timeout(timeout) {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(FootprintError::inference_timeout(name, timeout));
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(FootprintError::inference_message(
                            name,
                            "inference thread exited without a result",
                        ));
                    }
                }
            }
        };

        result.map_err(|e| match e {
            FootprintError::Inference { .. } | FootprintError::InferenceTimeout { .. } => e,
            other => FootprintError::inference_error(name, "predict failed", other),
        })
    }

    fn check_output(
        &self,
        window: &Window,
        probs: Array2<f32>,
    ) -> Result<Array2<f32>, FootprintError> {
        validate_grid_shape(probs.view(), window.shape(), "adapter output")
            .and_then(|()| validate_probabilities(probs.view(), "adapter output"))
            .map_err(|e| FootprintError::inference_message(self.adapter.name(), e.to_string()))?;
        Ok(probs)
    }
}

/// Sets the probability of nodata pixels to zero.
///
/// A pixel is nodata when every band equals `nodata` (or every band is NaN
/// for a NaN nodata value).
pub fn zero_nodata(probs: &mut Array2<f32>, tile: ArrayView3<'_, f32>, nodata: f32) {
    let is_nodata = |v: &f32| {
        if nodata.is_nan() {
            v.is_nan()
        } else {
            *v == nodata
        }
    };
    Zip::from(probs)
        .and(tile.lanes(Axis(2)))
        .for_each(|p, bands| {
            if bands.iter().all(is_nodata) {
                *p = 0.0;
            }
        });
}
