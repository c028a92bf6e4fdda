//! Background removal adapter.
//!
//! The segmentation model itself is an external collaborator behind
//! [`BackgroundRemover`]. This module owns the lifecycle around it:
//!
//! - progress is reported as a non-decreasing percentage over a channel
//! - a failure is surfaced once as `BackgroundRemovalFailed`, never retried
//! - only the most recently started run of a session may deliver a result
//!
//! # Example
//!
//! ```ignore
//! let (session, mut progress) = BackgroundRemovalSession::new(Arc::new(remover));
//! tokio::spawn(async move {
//!     while let Some(event) = progress.recv().await {
//!         println!("{}: {}%", event.key, event.percent);
//!     }
//! });
//! match session.run(&raster).await? {
//!     RemovalOutcome::Completed(cutout) => { /* encode as PNG */ }
//!     RemovalOutcome::Superseded => { /* a newer run owns the session */ }
//! }
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Result, TransformError};
use crate::raster::Raster;

/// Error type returned by remover implementations.
pub type RemovalError = Box<dyn std::error::Error + Send + Sync>;

/// An image to alpha-masked image segmentation backend.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Return `image` with its background made transparent.
    ///
    /// Implementations may call [`ProgressReporter::report`] any number of
    /// times while working.
    async fn remove_background(
        &self,
        image: &Raster,
        progress: &ProgressReporter,
    ) -> std::result::Result<Raster, RemovalError>;
}

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Run that produced this update.
    pub generation: u64,
    /// Backend-defined phase label, e.g. a model download or inference step.
    pub key: String,
    /// Overall completion, 0-100.
    pub percent: u8,
}

/// Forwards a single run's progress to the session channel.
///
/// Updates are dropped once the run has been superseded, and any update
/// lower than one already sent is dropped too.
#[derive(Debug)]
pub struct ProgressReporter {
    generation: u64,
    current: Arc<AtomicU64>,
    last: AtomicU8,
    sender: mpsc::UnboundedSender<Progress>,
}

impl ProgressReporter {
    /// Report `current` of `total` units done for phase `key`.
    pub fn report(&self, key: &str, current: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = ((current.min(total) as f64 / total as f64) * 100.0).round() as u8;
        self.send(key, percent);
    }

    /// Whether this run is still the session's current one.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    fn send(&self, key: &str, percent: u8) {
        if !self.is_current() {
            return;
        }
        if self.last.fetch_max(percent, Ordering::SeqCst) > percent {
            return;
        }
        // A closed receiver only means nobody is watching
        let _ = self.sender.send(Progress {
            generation: self.generation,
            key: key.to_string(),
            percent,
        });
    }

    fn finish(&self, key: &str) {
        if self.last.load(Ordering::SeqCst) < 100 {
            self.send(key, 100);
        }
    }
}

/// Result of a session run.
#[derive(Debug)]
pub enum RemovalOutcome {
    /// RGBA raster with the background removed.
    Completed(Raster),
    /// A newer run started before this one finished; its result was discarded.
    Superseded,
}

/// One image's background-removal state.
///
/// Each [`run`](Self::run) takes a new generation number. Results and
/// progress of older generations are discarded.
pub struct BackgroundRemovalSession {
    remover: Arc<dyn BackgroundRemover>,
    current: Arc<AtomicU64>,
    sender: mpsc::UnboundedSender<Progress>,
}

impl BackgroundRemovalSession {
    /// Create a session and the receiving end of its progress channel.
    pub fn new(remover: Arc<dyn BackgroundRemover>) -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session = Self {
            remover,
            current: Arc::new(AtomicU64::new(0)),
            sender,
        };
        (session, receiver)
    }

    /// Generation of the most recently started run (0 before any run).
    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Invalidate any in-flight run, e.g. when a new image is loaded.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    /// Remove the background of `image`.
    ///
    /// # Errors
    ///
    /// Returns `BackgroundRemovalFailed` if the remover rejects the image
    /// while this run is still current.
    pub async fn run(&self, image: &Raster) -> Result<RemovalOutcome> {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let reporter = ProgressReporter {
            generation,
            current: Arc::clone(&self.current),
            last: AtomicU8::new(0),
            sender: self.sender.clone(),
        };
        debug!(generation, width = image.width, height = image.height, "background removal started");

        let result = self.remover.remove_background(image, &reporter).await;

        if !reporter.is_current() {
            debug!(generation, "background removal superseded");
            return Ok(RemovalOutcome::Superseded);
        }

        match result {
            Ok(cutout) => {
                reporter.finish("complete");
                debug!(generation, "background removal complete");
                Ok(RemovalOutcome::Completed(cutout.into_rgba()))
            }
            Err(err) => {
                warn!(generation, error = %err, "background removal failed");
                Err(TransformError::BackgroundRemovalFailed(err.to_string()))
            }
        }
    }
}
