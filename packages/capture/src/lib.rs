//! # Domshot Capture
//!
//! Turns a live on-page selection into a standalone SVG image.
//!
//! ## Pipeline
//!
//! 1. **Extraction** - mark the lineage between `body` and the selection's
//!    common ancestor, clone `body`, prune everything unmarked.
//! 2. **Sanitization** - strip identifying attributes, neutralize links.
//! 3. **Styling** - snapshot each marked node's computed style into a rule
//!    scoped to its marker class.
//! 4. **Reconciliation** - fold the marked nodes' boxes into one container
//!    size, plus a shift for negative top margins.
//! 5. **Composition** - build the container, mount it in a hidden staging
//!    root, wait one frame, measure, emit the SVG document.
//!
//! Everything that touches a real page goes through the traits in [`host`],
//! so the same pipeline runs in the browser and offline against a recorded
//! [`snapshot::PageSnapshot`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use domshot_capture::{CaptureConfig, Capturer, Rect};
//! use domshot_capture::snapshot::SnapshotHost;
//!
//! # async fn run(json: &str) -> domshot_capture::Result<()> {
//! let mut host = SnapshotHost::from_json(json).unwrap();
//! let mut capturer = Capturer::new(CaptureConfig::default());
//! let output = capturer
//!     .capture(&mut host, Rect::new(0.0, 0.0, 320.0, 120.0))
//!     .await?;
//! println!("{} ({} bytes)", output.file_name, output.document.len());
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod config;
pub mod extract;
pub mod geometry;
pub mod host;
pub mod orchestrator;
pub mod preview;
pub mod reconcile;
pub mod sanitize;
pub mod session;
pub mod snapshot;
pub mod style;

pub use config::CaptureConfig;
pub use extract::{Extraction, MarkedNode, MarkerTag};
pub use geometry::{Margins, Rect, Size};
pub use host::{CropOverlay, LiveDocument, PreviewSink, StagedFragment, StagingArea};
pub use orchestrator::{CapturePhase, CaptureOutput, Capturer, StagedCapture};
pub use session::{CropFrame, CropSession, Key, PageEvent, SessionCommand};
pub use style::{ComputedStyle, StyleRule};

use std::fmt;
use thiserror::Error;

/// Pipeline stage a [`CaptureError::Failure`] happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Styling,
    Reconciliation,
    Composition,
    Measurement,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Styling => "styling",
            Stage::Reconciliation => "reconciliation",
            Stage::Composition => "composition",
            Stage::Measurement => "measurement",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Selection is empty")]
    EmptySelection,

    #[error("Capture failed during {stage}: {message}")]
    Failure { stage: Stage, message: String },

    #[error("Host error: {0}")]
    Host(String),
}

impl CaptureError {
    pub fn failure(stage: Stage, message: impl fmt::Display) -> Self {
        CaptureError::Failure {
            stage,
            message: message.to_string(),
        }
    }

    /// Stage tag for internal failures, `None` for the other kinds
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CaptureError::Failure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
