//! Stage progress reporting.

use std::fmt;

/// Stages of a footprint extraction run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Planning,
    Inference,
    Masking,
    Vectorizing,
    PostProcessing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Planning => "planning windows",
            PipelineStage::Inference => "running inference",
            PipelineStage::Masking => "building mask",
            PipelineStage::Vectorizing => "vectorizing",
            PipelineStage::PostProcessing => "post-processing",
        };
        f.write_str(name)
    }
}

/// A progress notification: `completed` of `total` units done in `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,
    pub completed: usize,
    pub total: usize,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, completed: usize, total: usize) -> Self {
        Self {
            stage,
            completed,
            total,
        }
    }

    /// Completion of the stage in percent; an empty stage counts as done.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} ({:.0}%)",
            self.stage,
            self.completed,
            self.total,
            self.percent()
        )
    }
}

/// Receives progress updates.
///
/// Inference updates arrive from worker threads, in completion order.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: ProgressUpdate) {
        self(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percent_and_display() {
        let update = ProgressUpdate::new(PipelineStage::Inference, 3, 4);
        assert_eq!(update.percent(), 75.0);
        assert_eq!(update.to_string(), "running inference: 3/4 (75%)");
        assert_eq!(ProgressUpdate::new(PipelineStage::Masking, 0, 0).percent(), 100.0);
    }

    #[test]
    fn test_closures_are_observers() {
        let seen = Mutex::new(Vec::new());
        let observer = |update: ProgressUpdate| seen.lock().unwrap().push(update.stage);
        observer.on_progress(ProgressUpdate::new(PipelineStage::Planning, 1, 1));
        assert_eq!(*seen.lock().unwrap(), vec![PipelineStage::Planning]);
    }
}
