//! Per-request stage machine.

use std::fmt;

use tracing::debug;

use crate::error::{ErrorKind, Result, TransformError};

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    GeometryComputed,
    Composited,
    Encoded,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    /// The only stage this one may advance to.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Received => Some(Stage::Validated),
            Stage::Validated => Some(Stage::GeometryComputed),
            Stage::GeometryComputed => Some(Stage::Composited),
            Stage::Composited => Some(Stage::Encoded),
            Stage::Encoded => Some(Stage::Done),
            Stage::Done | Stage::Failed(_) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Received => f.write_str("received"),
            Stage::Validated => f.write_str("validated"),
            Stage::GeometryComputed => f.write_str("geometry_computed"),
            Stage::Composited => f.write_str("composited"),
            Stage::Encoded => f.write_str("encoded"),
            Stage::Done => f.write_str("done"),
            Stage::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Tracks one request through [`Stage`]s, logging each transition.
#[derive(Debug)]
pub struct StageTracker {
    stage: Stage,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            stage: Stage::Received,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `to`, which must be the direct successor of the current stage.
    pub fn advance(&mut self, to: Stage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(TransformError::invalid(format!(
                "invalid stage transition {} -> {}",
                self.stage, to
            )));
        }
        debug!(from = %self.stage, to = %to, "stage transition");
        self.stage = to;
        Ok(())
    }

    /// Enter the failed state. Allowed from any non-terminal stage.
    pub fn fail(&mut self, kind: ErrorKind) {
        if self.stage.is_terminal() {
            return;
        }
        debug!(from = %self.stage, kind = %kind, "stage failed");
        self.stage = Stage::Failed(kind);
    }
}
