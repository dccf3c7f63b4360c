//! Attribute scrubbing for extracted content.
//!
//! Runs on the clone only. Removes attributes that identify or load things
//! (`id`, `srcset`, `sizes`, `data-*`), drops every class that is not a
//! marker, and rewrites anchors so a captured link can neither run script
//! nor leak a referrer.

use crate::extract::MarkerTag;
use domshot_dom::{Document, NodeId};
use tracing::debug;
use url::Url;

const STRIPPED_ATTRIBUTES: &[&str] = &["id", "srcset", "sizes"];

/// Scrubs `top` and every element under it. Returns the marker classes
/// found, in document order and without duplicates.
///
/// Running it twice over the same tree changes nothing the second time.
pub fn sanitize(doc: &mut Document, top: NodeId, prefix: &str, base: Option<&Url>) -> Vec<MarkerTag> {
    let mut nodes = vec![top];
    nodes.extend(doc.descendants(top));

    let mut markers: Vec<MarkerTag> = Vec::new();
    let mut rewritten_links = 0;

    for node in nodes {
        let Ok(element) = doc.element_mut(node) else {
            continue;
        };

        element.retain_attributes(|attr| {
            !STRIPPED_ATTRIBUTES.contains(&attr.name.as_str()) && !attr.name.starts_with("data-")
        });
        element.retain_classes(|class| class.starts_with(prefix));

        for class in element.classes() {
            if let Some(marker) = MarkerTag::parse(prefix, class) {
                if !markers.contains(&marker) {
                    markers.push(marker);
                }
            }
        }

        if element.tag == "a" && correct_anchor(element, base) {
            rewritten_links += 1;
        }
    }

    debug!(markers = markers.len(), links = rewritten_links, "Sanitized subtree");
    markers
}

/// Returns whether the anchor's `href` was rewritten to an absolute link
fn correct_anchor(anchor: &mut domshot_dom::ElementData, base: Option<&Url>) -> bool {
    let Some(href) = anchor.get_attribute("href").map(str::to_string) else {
        return false;
    };

    if is_script_url(&href) {
        anchor.set_attribute("href", "#");
        return false;
    }
    if href == "#" {
        return false;
    }

    let resolved = match base {
        Some(base) => base.join(&href).ok(),
        None => Url::parse(&href).ok(),
    };
    if let Some(absolute) = resolved {
        anchor.set_attribute("href", absolute.to_string());
    }
    anchor.set_attribute("target", "_blank");
    anchor.set_attribute("rel", "noreferrer noopener");
    true
}

fn is_script_url(href: &str) -> bool {
    href.trim_start()
        .get(..11)
        .map(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
        .unwrap_or(false)
}
