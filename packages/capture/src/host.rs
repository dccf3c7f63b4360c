//! Seams between the pipeline and the page it runs against.

use crate::geometry::Rect;
use crate::orchestrator::CaptureOutput;
use crate::session::CropFrame;
use crate::style::ComputedStyle;
use crate::Result;
use domshot_dom::{Document, NodeId, SelectionRange};
use std::future::Future;

/// Read access to the live page: structure, selection, computed styles and
/// geometry.
pub trait LiveDocument {
    fn document(&self) -> &Document;

    /// Current selection, if the page has one
    fn selection(&self) -> Option<SelectionRange>;

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle>;

    /// Border box in viewport coordinates
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    fn range_rect(&self, range: &SelectionRange) -> Option<Rect>;

    /// Address of the page, used to absolutize links and as the `<base>`
    fn page_url(&self) -> Option<String> {
        None
    }
}

/// Composed markup handed to the staging root
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFragment {
    pub markup: String,
    /// Marker class of the node the viewport is measured from
    pub root_marker: String,
    /// Where the root is expected to land inside the staging container when
    /// the host cannot lay the fragment out itself
    pub expected_root: Rect,
}

/// Hidden, zero-footprint area where a composed fragment is laid out before
/// it is measured.
pub trait StagingArea {
    /// Mounts `fragment`, replacing whatever a previous capture left behind
    fn mount(&mut self, fragment: &StagedFragment) -> Result<()>;

    /// Resolves once the host has run a layout pass over the mounted
    /// fragment. This is the only suspension point of a capture.
    fn next_frame(&mut self) -> impl Future<Output = ()>;

    /// Box of the staged element carrying `marker`
    fn staged_rect(&self, marker: &str) -> Option<Rect>;

    /// Box of the staging container itself
    fn staging_rect(&self) -> Option<Rect>;

    fn unmount(&mut self);
}

/// Receives finished captures (preview window, download, file on disk)
pub trait PreviewSink {
    fn present(&mut self, output: &CaptureOutput) -> Result<()>;
}

/// Draws and removes the on-screen crop frame
pub trait CropOverlay {
    fn show(&mut self, frame: &CropFrame);
    fn clear(&mut self);
}
