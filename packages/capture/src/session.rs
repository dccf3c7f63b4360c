//! Crop overlay controller.
//!
//! Follows the page selection, draws a frame around it and decides when a
//! capture should start. Events come in through [`CropSession::handle`];
//! the host owns the actual listeners.

use crate::config::CaptureConfig;
use crate::geometry::Rect;
use crate::host::CropOverlay;
use tracing::debug;

/// Class the browser overlay gives its border strips
pub const BORDER_CLASS: &str = "svgss2-cropper-border";
pub const BORDER_COLOR: &str = "#aaa";

/// Four fixed-position strips drawn around a selection, so the frame never
/// covers the selected content itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFrame {
    pub top: Rect,
    pub bottom: Rect,
    pub left: Rect,
    pub right: Rect,
    /// The selection box the frame surrounds
    pub crop: Rect,
}

impl CropFrame {
    /// Frame around `rect` at `padding + 1` px distance
    pub fn around(rect: Rect, padding: f64) -> Self {
        let p = padding + 1.0;
        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
        Self {
            top: Rect::new(x - p, y - p, w + 2.0 * p, 1.0),
            bottom: Rect::new(x - p, y + h + p, w + 2.0 * p, 1.0),
            left: Rect::new(x - p, y - p, 1.0, h + 2.0 * p),
            right: Rect::new(x + w + p, y - p, 1.0, h + 2.0 * p),
            crop: rect,
        }
    }

    pub fn strips(&self) -> [Rect; 4] {
        [self.top, self.bottom, self.left, self.right]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// Page events the session reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    /// Selection moved; `None` when the page has no selection range
    SelectionChanged(Option<Rect>),
    PointerUp,
    KeyUp(Key),
}

/// What the host should do in response to an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    /// Capture this crop rectangle, then clear the page selection
    Capture(Rect),
    ClearSelection,
}

pub struct CropSession<O: CropOverlay> {
    overlay: O,
    padding: f64,
    min_crop_size: f64,
    listening: bool,
    frame: Option<CropFrame>,
}

impl<O: CropOverlay> CropSession<O> {
    pub fn new(overlay: O, config: &CaptureConfig) -> Self {
        Self {
            overlay,
            padding: config.padding,
            min_crop_size: config.min_crop_size,
            listening: false,
            frame: None,
        }
    }

    pub fn start(&mut self) {
        debug!("Crop session started");
        self.listening = true;
    }

    pub fn stop(&mut self) {
        debug!("Crop session stopped");
        self.listening = false;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Frame currently on screen
    pub fn frame(&self) -> Option<&CropFrame> {
        self.frame.as_ref()
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut O {
        &mut self.overlay
    }

    pub fn handle(&mut self, event: PageEvent) -> Option<SessionCommand> {
        if !self.listening {
            return None;
        }

        match event {
            PageEvent::SelectionChanged(None) => {
                self.clear();
                None
            }
            PageEvent::SelectionChanged(Some(rect)) => {
                self.clear();
                if rect.width > self.min_crop_size && rect.height > self.min_crop_size {
                    let frame = CropFrame::around(rect, self.padding);
                    self.overlay.show(&frame);
                    self.frame = Some(frame);
                }
                None
            }
            PageEvent::PointerUp => {
                let frame = self.frame?;
                self.clear();
                self.stop();
                Some(SessionCommand::Capture(frame.crop))
            }
            PageEvent::KeyUp(Key::Escape) => {
                self.clear();
                self.stop();
                Some(SessionCommand::ClearSelection)
            }
            PageEvent::KeyUp(Key::Other) => None,
        }
    }

    fn clear(&mut self) {
        self.overlay.clear();
        self.frame = None;
    }
}
