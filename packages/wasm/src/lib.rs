//! Browser entry points.
//!
//! `Screenshotter` watches the page selection, frames it, and on pointer
//! release captures the framed region and opens it in a preview window.
//! `captureSelection` captures the current selection directly and
//! resolves with the SVG document.

mod console;
mod host;
mod overlay;
mod preview;

pub use host::WebHost;
pub use overlay::DomOverlay;
pub use preview::WindowPreview;

use domshot_capture::{
    CaptureConfig, Capturer, CropOverlay, CropSession, Key, PageEvent, Rect, SessionCommand,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Event, KeyboardEvent, Window};

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console::init_tracing();
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("window unavailable"))
}

fn parse_config(json: Option<String>) -> Result<CaptureConfig, JsValue> {
    match json {
        Some(json) => CaptureConfig::from_json(&json)
            .map_err(|e| JsValue::from_str(&format!("Config error: {}", e))),
        None => Ok(CaptureConfig::default()),
    }
}

/// Captures `crop` from the live page and opens the preview window
async fn capture_to_preview(window: Window, config: CaptureConfig, crop: Rect) -> Result<String, JsValue> {
    let mut host = WebHost::snapshot(window.clone(), &config.prefix)?;
    let mut sink = WindowPreview::new(window, config.clone());
    let output = Capturer::new(config)
        .run(&mut host, &mut sink, crop)
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(output.document)
}

type Listener = Closure<dyn FnMut(Event)>;

struct Shared {
    window: Window,
    config: CaptureConfig,
    session: CropSession<DomOverlay>,
}

#[wasm_bindgen]
pub struct Screenshotter {
    shared: Rc<RefCell<Shared>>,
    listeners: Vec<(&'static str, Listener)>,
}

#[wasm_bindgen]
impl Screenshotter {
    /// `config` is an optional JSON `CaptureConfig`
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<Screenshotter, JsValue> {
        let config = parse_config(config)?;
        let window = window()?;
        let page = window
            .document()
            .ok_or_else(|| JsValue::from_str("document unavailable"))?;
        let session = CropSession::new(DomOverlay::new(page), &config);

        Ok(Screenshotter {
            shared: Rc::new(RefCell::new(Shared {
                window,
                config,
                session,
            })),
            listeners: Vec::new(),
        })
    }

    /// Starts following the selection
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.stop()?;
        let page = self.page()?;

        for name in ["selectionchange", "mouseup", "keyup"] {
            let shared = Rc::clone(&self.shared);
            let listener = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let window = shared.borrow().window.clone();
                if let Some(event) = page_event(&window, name, &event) {
                    dispatch(&shared, event);
                }
            });
            page.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())?;
            self.listeners.push((name, listener));
        }

        self.shared.borrow_mut().session.start();
        Ok(())
    }

    /// Stops following the selection and removes the frame
    pub fn stop(&mut self) -> Result<(), JsValue> {
        let page = self.page()?;
        for (name, listener) in self.listeners.drain(..) {
            page.remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref())?;
        }

        let mut shared = self.shared.borrow_mut();
        shared.session.stop();
        shared.session.overlay_mut().clear();
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn listening(&self) -> bool {
        self.shared.borrow().session.is_listening()
    }
}

impl Screenshotter {
    fn page(&self) -> Result<web_sys::Document, JsValue> {
        self.shared
            .borrow()
            .window
            .document()
            .ok_or_else(|| JsValue::from_str("document unavailable"))
    }
}

impl Drop for Screenshotter {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn page_event(window: &Window, name: &str, event: &Event) -> Option<PageEvent> {
    match name {
        "selectionchange" => Some(PageEvent::SelectionChanged(
            host::current_range(window).map(|range| host::dom_rect(&range.get_bounding_client_rect())),
        )),
        "mouseup" => Some(PageEvent::PointerUp),
        "keyup" => {
            let key = match event.dyn_ref::<KeyboardEvent>() {
                Some(event) if event.key() == "Escape" => Key::Escape,
                _ => Key::Other,
            };
            Some(PageEvent::KeyUp(key))
        }
        _ => None,
    }
}

fn dispatch(shared: &Rc<RefCell<Shared>>, event: PageEvent) {
    let command = shared.borrow_mut().session.handle(event);
    let Some(command) = command else {
        return;
    };

    let (window, config) = {
        let shared = shared.borrow();
        (shared.window.clone(), shared.config.clone())
    };

    match command {
        SessionCommand::Capture(crop) => spawn_local(async move {
            if let Err(e) = capture_to_preview(window.clone(), config, crop).await {
                error!(error = ?e, "Capture failed");
            }
            host::clear_selection(&window);
        }),
        SessionCommand::ClearSelection => host::clear_selection(&window),
    }
}

/// Captures the current selection, framed by its own box, opens the
/// preview and resolves with the SVG document.
#[wasm_bindgen(js_name = captureSelection)]
pub fn capture_selection(config: Option<String>) -> Result<js_sys::Promise, JsValue> {
    let config = parse_config(config)?;
    let window = window()?;
    let crop = host::current_range(&window)
        .map(|range| host::dom_rect(&range.get_bounding_client_rect()))
        .ok_or_else(|| JsValue::from_str("Selection is empty"))?;

    Ok(future_to_promise(async move {
        capture_to_preview(window, config, crop)
            .await
            .map(|document| JsValue::from_str(&document))
    }))
}
