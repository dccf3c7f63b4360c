use domshot_capture::session::{BORDER_CLASS, BORDER_COLOR};
use domshot_capture::{CropFrame, CropOverlay, Rect};
use domshot_capture::geometry::format_px;
use tracing::warn;
use wasm_bindgen::JsValue;

/// Crop frame drawn as four fixed-position divs on the page body
pub struct DomOverlay {
    page: web_sys::Document,
}

impl DomOverlay {
    pub fn new(page: web_sys::Document) -> Self {
        Self { page }
    }

    fn draw_strip(&self, strip: &Rect) -> Result<(), JsValue> {
        let body = self
            .page
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        let div = self.page.create_element("div")?;
        div.set_class_name(BORDER_CLASS);
        div.set_attribute("style", &strip_style(strip))?;
        body.append_child(&div)?;
        Ok(())
    }
}

pub fn strip_style(strip: &Rect) -> String {
    format!(
        "position: fixed; left: {}px; top: {}px; width: {}px; height: {}px; background-color: {}; user-select: none;",
        format_px(strip.x),
        format_px(strip.y),
        format_px(strip.width),
        format_px(strip.height),
        BORDER_COLOR
    )
}

impl CropOverlay for DomOverlay {
    fn show(&mut self, frame: &CropFrame) {
        for strip in frame.strips() {
            if let Err(e) = self.draw_strip(&strip) {
                warn!(error = ?e, "Could not draw crop frame");
                return;
            }
        }
    }

    fn clear(&mut self) {
        let Ok(strips) = self
            .page
            .query_selector_all(&format!("div.{}", BORDER_CLASS))
        else {
            return;
        };
        for index in 0..strips.length() {
            if let Some(strip) = strips.item(index) {
                if let Some(parent) = strip.parent_node() {
                    let _ = parent.remove_child(&strip);
                }
            }
        }
    }
}
