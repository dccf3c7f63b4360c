//! Inspection page shown after a capture

use crate::config::CaptureConfig;
use crate::orchestrator::CaptureOutput;
use domshot_dom::{escape_attribute, escape_text};

/// Content type of the downloadable document
pub const DOWNLOAD_CONTENT_TYPE: &str = "image/svg+xml; charset=\"utf-8\"";

const BACKGROUND: &str = "#444";
const FOREGROUND: &str = "#fafafa";

/// Body content: the SVG inline, a download link pointing at
/// `download_href`, and the escaped source.
pub fn render_preview_body(output: &CaptureOutput, download_href: &str) -> String {
    // The inline copy gets the shadow; the downloaded document stays untouched
    let inline = output
        .markup
        .replacen("<svg ", r#"<svg style="box-shadow: 0 0 4px rgb(0 0 0 / 40%);" "#, 1);

    format!(
        concat!(
            "{svg}\n",
            r#"<div style="display: block;">"#,
            r#"<a style="display: inline-block; color: {fg};" href="{href}" download="{name}">Download as SVG</a>"#,
            "</div>\n",
            r#"<pre style="display: block; color: {fg};">{source}</pre>"#,
        ),
        svg = inline,
        fg = FOREGROUND,
        href = escape_attribute(download_href),
        name = escape_attribute(&output.file_name),
        source = escape_text(&output.markup),
    )
}

/// Standalone HTML page around [`render_preview_body`]
pub fn render_preview_page(
    output: &CaptureOutput,
    download_href: &str,
    config: &CaptureConfig,
) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<title>{title}</title>\n",
            "</head>\n",
            r#"<body style="{style}">"#,
            "\n{body}\n",
            "</body>\n",
            "</html>\n",
        ),
        title = escape_text(&output.file_name),
        style = body_style(config),
        body = render_preview_body(output, download_href),
    )
}

pub fn body_style(config: &CaptureConfig) -> String {
    format!(
        "margin: {}px !important; padding: {}px !important; background-color: {};",
        config.preview_margin, config.preview_padding, BACKGROUND
    )
}
