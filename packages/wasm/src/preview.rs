use domshot_capture::preview::{body_style, render_preview_body, DOWNLOAD_CONTENT_TYPE};
use domshot_capture::{CaptureConfig, CaptureError, CaptureOutput, PreviewSink};
use tracing::info;
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, Url, Window};

/// Opens each capture in a new window with a download link
pub struct WindowPreview {
    window: Window,
    config: CaptureConfig,
}

impl WindowPreview {
    pub fn new(window: Window, config: CaptureConfig) -> Self {
        Self { window, config }
    }

    fn open(&self, output: &CaptureOutput) -> Result<(), JsValue> {
        let download_href = blob_url(&output.document)?;

        let preview = self
            .window
            .open()?
            .ok_or_else(|| JsValue::from_str("preview window was blocked"))?;
        let body = preview
            .document()
            .and_then(|document| document.body())
            .ok_or_else(|| JsValue::from_str("preview window has no body"))?;

        body.set_attribute("style", &body_style(&self.config))?;
        body.set_inner_html(&render_preview_body(output, &download_href));
        Ok(())
    }
}

/// Object URL for the saved document, typed as SVG
pub fn blob_url(document: &str) -> Result<String, JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(document));
    let options = BlobPropertyBag::new();
    options.set_type(DOWNLOAD_CONTENT_TYPE);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

impl PreviewSink for WindowPreview {
    fn present(&mut self, output: &CaptureOutput) -> domshot_capture::Result<()> {
        self.open(output)
            .map_err(|e| CaptureError::Host(format!("{:?}", e)))?;
        info!(file = %output.file_name, "Opened capture preview");
        Ok(())
    }
}
