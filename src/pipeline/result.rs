//! Result types for a footprint extraction run.

use super::stats::PipelineStats;
use crate::core::errors::{ErrorKind, FootprintError};
use crate::domain::feature::FeatureCollection;
use crate::domain::window::Window;
use crate::processors::mask::BinaryMask;
use std::fmt;

/// A window whose inference failed on every attempt.
///
/// Its footprint is absent from the mosaic; pixels covered by no other
/// window stay unclassified.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedWindow {
    pub window: Window,
    /// Inference calls made before giving up.
    pub attempts: u32,
    /// Kind of the last error.
    pub kind: ErrorKind,
    /// Message of the last error.
    pub reason: String,
}

impl fmt::Display for SkippedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window {} skipped after {} attempt(s): {}: {}",
            self.window, self.attempts, self.kind, self.reason
        )
    }
}

/// A connected component that produced no feature because its polygon was
/// invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedComponent {
    /// Discovery index of the component.
    pub component_id: usize,
    pub kind: ErrorKind,
    pub reason: String,
}

impl SkippedComponent {
    pub(crate) fn from_error(component_id: usize, error: &FootprintError) -> Self {
        Self {
            component_id,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for SkippedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component {} skipped: {}: {}",
            self.component_id, self.kind, self.reason
        )
    }
}

/// Everything a caller needs to audit a degraded result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub skipped_windows: Vec<SkippedWindow>,
    pub skipped_components: Vec<SkippedComponent>,
    /// Components below `min_component_pixels`.
    pub dropped_small_components: usize,
    /// Polygons below `min_polygon_area`.
    pub filtered_small_polygons: usize,
    /// Pixels covered by no successful window.
    pub unclassified_pixels: usize,
    /// Features that kept traced rings because simplification broke them.
    pub simplification_fallbacks: usize,
    pub stats: PipelineStats,
}

impl RunReport {
    /// Returns true if any window or component was skipped.
    pub fn is_degraded(&self) -> bool {
        !self.skipped_windows.is_empty()
            || !self.skipped_components.is_empty()
            || self.unclassified_pixels > 0
    }

    /// Human-readable lines describing every degradation of the run.
    ///
    /// Returns an empty list for a clean run.
    pub fn warnings(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .skipped_windows
            .iter()
            .map(ToString::to_string)
            .chain(self.skipped_components.iter().map(ToString::to_string))
            .collect();

        if self.unclassified_pixels > 0 {
            lines.push(format!(
                "{} pixel(s) unclassified (not covered by any successful window)",
                self.unclassified_pixels
            ));
        }
        if self.dropped_small_components > 0 {
            lines.push(format!(
                "{} component(s) dropped below the minimum pixel count",
                self.dropped_small_components
            ));
        }
        if self.filtered_small_polygons > 0 {
            lines.push(format!(
                "{} polygon(s) filtered below the minimum area",
                self.filtered_small_polygons
            ));
        }
        if self.simplification_fallbacks > 0 {
            lines.push(format!(
                "{} polygon(s) kept unsimplified rings",
                self.simplification_fallbacks
            ));
        }
        lines
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stats)?;
        for line in self.warnings() {
            writeln!(f, "  warning: {}", line)?;
        }
        Ok(())
    }
}

/// Features of a completed run together with its report.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub collection: FeatureCollection,
    /// The cleaned mask the features were traced from. Pixels of skipped
    /// windows are background.
    pub mask: BinaryMask,
    pub report: RunReport,
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run completed, possibly with skipped windows or components.
    Success(Extraction),
    /// The cancellation token was triggered; partial results are discarded.
    Cancelled,
    /// A fatal error stopped the run.
    Failed(FootprintError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }

    /// Kind of the terminal failure, if the run did not succeed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Cancelled => Some(ErrorKind::Cancelled),
            RunOutcome::Failed(err) => Some(err.kind()),
        }
    }

    /// Converts the outcome into a `Result`, mapping cancellation to
    /// [`FootprintError::Cancelled`].
    pub fn into_result(self) -> Result<Extraction, FootprintError> {
        match self {
            RunOutcome::Success(extraction) => Ok(extraction),
            RunOutcome::Cancelled => Err(FootprintError::Cancelled),
            RunOutcome::Failed(err) => Err(err),
        }
    }
}

impl From<Result<Extraction, FootprintError>> for RunOutcome {
    fn from(result: Result<Extraction, FootprintError>) -> Self {
        match result {
            Ok(extraction) => RunOutcome::Success(extraction),
            Err(FootprintError::Cancelled) => RunOutcome::Cancelled,
            Err(err) => RunOutcome::Failed(err),
        }
    }
}
