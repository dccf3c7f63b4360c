//! Output assembly: the staged container and the final SVG document.

use crate::config::CaptureConfig;
use crate::extract::MarkerTag;
use crate::geometry::{format_px, Rect};
use crate::reconcile::Reconciliation;
use crate::style::StyleRule;
use crate::{CaptureError, Result, Stage};
use domshot_dom::{escape_attribute, Document, NodeId};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Entities the serializer may emit, declared up front so the document stays
/// valid XML.
const ENTITIES: &[(&str, &str)] = &[("nbsp", "&#x00A0;")];

pub fn entity_preamble() -> String {
    let defs: Vec<String> = ENTITIES
        .iter()
        .map(|(name, value)| format!("<!ENTITY {} \"{}\" >", name, value))
        .collect();
    format!("<!DOCTYPE svg [\n{}\n]>", defs.join("\n"))
}

pub fn container_class(prefix: &str) -> String {
    format!("{}container", prefix)
}

/// Builds `<div class="<prefix>container">` around the extracted wrapper:
/// a sizing rule, one style block per captured rule, the root's top-margin
/// correction, then the content. Returns the container's id.
pub fn build_container(
    doc: &mut Document,
    wrapper: NodeId,
    rules: &[StyleRule],
    root: &MarkerTag,
    reconciliation: &Reconciliation,
    config: &CaptureConfig,
) -> Result<NodeId> {
    let class = container_class(&config.prefix);
    let padding = config.padding;
    let size = reconciliation.container;

    let container = doc.create_element("div");
    doc.element_mut(container)
        .map_err(|e| CaptureError::failure(Stage::Composition, e))?
        .set_attribute("class", class.as_str());

    let sizing = format!(
        ".{} {{ width: {}px; height: {}px; border: 1px solid cyan; padding: {}px; overflow: hidden; box-sizing: border-box; }}",
        class,
        format_px(size.width + 2.0 * padding),
        format_px(size.height + 2.0 * padding),
        format_px(padding),
    );
    append_style(doc, container, &sizing)?;

    for rule in rules.iter().filter(|rule| !rule.is_empty()) {
        append_style(doc, container, &rule.to_css())?;
    }

    let correction = format!(
        ".{} {{ margin-top: {}px; }}",
        root.name(),
        format_px(reconciliation.margin_shift)
    );
    append_style(doc, container, &correction)?;

    // Cloning drops the namespace inline SVG got from the HTML parser
    for node in doc.descendants(wrapper) {
        if doc.tag_name(node) == Some("svg") {
            doc.element_mut(node)
                .map_err(|e| CaptureError::failure(Stage::Composition, e))?
                .set_attribute("xmlns", SVG_NAMESPACE);
        }
    }

    doc.append_child(container, wrapper)
        .map_err(|e| CaptureError::failure(Stage::Composition, e))?;

    Ok(container)
}

fn append_style(doc: &mut Document, parent: NodeId, css: &str) -> Result<()> {
    let style = doc.create_element("style");
    let text = doc.create_text(css);
    doc.append_child(style, text)
        .and_then(|_| doc.append_child(parent, style))
        .map_err(|e| CaptureError::failure(Stage::Composition, e))
}

/// Geometry read back after the staged fragment was laid out, plus the
/// live measurements taken while staging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportInputs {
    pub staged_root: Rect,
    pub staging: Rect,
    pub selection: Rect,
    pub common_ancestor: Rect,
    pub crop: Rect,
}

/// Places the crop rectangle over the staged content.
///
/// The staged root's offset inside the staging container is shifted by how
/// far the selection started from its common ancestor in the live page.
/// Width and height come from the crop rectangle, grown by the padding.
pub fn viewport_for(inputs: &ViewportInputs, config: &CaptureConfig) -> Result<Rect> {
    let padding = config.padding;
    let preview_padding = config.preview_padding;
    let diff_x = inputs.selection.left() - inputs.common_ancestor.left();
    let diff_y = inputs.selection.top() - inputs.common_ancestor.top();

    let x = padding.max(
        inputs.staged_root.left() - inputs.staging.left() - padding + preview_padding + diff_x,
    );
    let y = padding.max(
        inputs.staged_root.top() - inputs.staging.top() - padding + preview_padding + diff_y,
    );
    let viewport = Rect::new(
        x,
        y,
        inputs.crop.width + 2.0 * padding,
        inputs.crop.height + 2.0 * padding,
    );

    if !viewport.has_area() {
        return Err(CaptureError::failure(
            Stage::Measurement,
            format!(
                "viewport {}x{} has no area",
                format_px(viewport.width),
                format_px(viewport.height)
            ),
        ));
    }
    Ok(viewport)
}

/// Wraps the container markup in an SVG document whose view box is
/// `viewport`. The result carries no DTD; see [`entity_preamble`].
pub fn render_svg(
    container_markup: &str,
    viewport: &Rect,
    config: &CaptureConfig,
    base_url: Option<&str>,
) -> String {
    let w = format_px(viewport.width);
    let h = format_px(viewport.height);
    let view_box = format!("{} {} {} {}", format_px(viewport.x), format_px(viewport.y), w, h);
    let object_width = format_px(viewport.width + config.preview_padding + viewport.x);
    let object_height = format_px(viewport.height + config.preview_padding + viewport.y);

    let mut lines = vec![
        format!(
            r#"<svg width="{}" height="{}" viewBox="{}" xmlns="{}" xmlns:xlink="{}">"#,
            w, h, view_box, SVG_NAMESPACE, XLINK_NAMESPACE
        ),
        format!(
            r#"  <foreignObject x="0" y="0" width="{}" height="{}">"#,
            object_width, object_height
        ),
        format!(r#"  <html xmlns="{}">"#, XHTML_NAMESPACE),
        "  <head>".to_string(),
    ];
    if let Some(url) = base_url {
        lines.push(format!(r#"    <base href="{}" />"#, escape_attribute(url)));
    }
    lines.extend([
        "  </head>".to_string(),
        r#"  <div class="body">"#.to_string(),
        "    <style>".to_string(),
        format!(
            "    foreignObject {{ margin: 0; padding: 0; background-color: {}; }}",
            config.background
        ),
        format!(
            "    .body {{ margin: {}px !important; padding: {}px !important; }}",
            format_px(config.preview_margin),
            format_px(config.preview_padding)
        ),
        "    </style>".to_string(),
        container_markup.to_string(),
        "  </div>".to_string(),
        "  </html>".to_string(),
        "  </foreignObject>".to_string(),
        "</svg>".to_string(),
    ]);
    lines.join("\n")
}
