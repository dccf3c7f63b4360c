//! XML-compatible markup emission.
//!
//! Output is meant to be embedded inside an SVG `foreignObject`, so it has
//! to survive a strict XML parser: void elements are self-closed and the
//! only named entity emitted is `&nbsp;` (callers declare it in a DTD).
//! Attributes XML cannot name (`@click`, `x-on:click`) are skipped and
//! characters outside the XML `Char` range are dropped.

use crate::{Document, NodeId, NodeKind};

/// HTML elements that never have content
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input",
    "isindex", "link", "meta", "param", "source", "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Namespace prefixes that are bound wherever captured markup ends up
const BOUND_PREFIXES: &[&str] = &["xml", "xmlns", "xlink"];

/// `Char` production of XML 1.0. Rust `char`s never hold surrogates.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{fffe}' && c != '\u{ffff}')
}

fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || c.is_ascii_digit()
        || matches!(c, '-' | '.' | '\u{b7}')
        || (!c.is_ascii() && c.is_alphanumeric())
}

fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

/// Whether an attribute can be written as-is into namespaced XML: a valid
/// name whose prefix, if any, is one the output document declares.
pub fn is_serializable_attribute(name: &str) -> bool {
    match name.split_once(':') {
        None => is_ncname(name),
        Some((prefix, local)) => {
            BOUND_PREFIXES.contains(&prefix) && is_ncname(prefix) && is_ncname(local)
        }
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Serializes `id` and its subtree
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut buffer = String::new();
    write_node(doc, id, &mut buffer);
    buffer
}

fn write_node(doc: &Document, id: NodeId, buffer: &mut String) {
    let Some(node) = doc.get(id) else {
        return;
    };

    match node {
        NodeKind::Text(text) => buffer.push_str(&escape_text(text)),
        NodeKind::Comment(text) => {
            // "--" is not allowed inside XML comments, nor a trailing "-"
            let body: String = text.chars().filter(|&c| is_xml_char(c)).collect();
            buffer.push_str("<!--");
            buffer.push_str(&body.replace("--", "- -"));
            if body.ends_with('-') {
                buffer.push(' ');
            }
            buffer.push_str("-->");
        }
        NodeKind::Element(element) => {
            buffer.push('<');
            buffer.push_str(&element.tag);
            for attr in element
                .attributes
                .iter()
                .filter(|attr| is_serializable_attribute(&attr.name))
            {
                buffer.push(' ');
                buffer.push_str(&attr.name);
                buffer.push_str("=\"");
                buffer.push_str(&escape_attribute(&attr.value));
                buffer.push('"');
            }

            if is_void_element(&element.tag) {
                buffer.push_str(" />");
                return;
            }

            buffer.push('>');
            for child in doc.children(id) {
                write_node(doc, child, buffer);
            }
            buffer.push_str("</");
            buffer.push_str(&element.tag);
            buffer.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements_self_close() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let br = doc.create_element("br");
        let img = doc.create_element("img");
        doc.element_mut(img).unwrap().set_attribute("src", "a.png");
        doc.append_child(p, br).unwrap();
        doc.append_child(p, img).unwrap();

        assert_eq!(outer_html(&doc, p), r#"<p><br /><img src="a.png" /></p>"#);
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        doc.element_mut(a)
            .unwrap()
            .set_attribute("title", "say \"hi\" & <go>");
        let text = doc.create_text("1 < 2 &\u{a0}3");
        doc.append_child(a, text).unwrap();

        assert_eq!(
            outer_html(&doc, a),
            r#"<a title="say &quot;hi&quot; &amp; &lt;go&gt;">1 &lt; 2 &amp;&nbsp;3</a>"#
        );
    }

    #[test]
    fn test_output_parses_as_xml() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.element_mut(div)
            .unwrap()
            .set_attribute("xmlns", "http://www.w3.org/1999/xhtml");
        for tag in ["hr", "input", "meta", "link"] {
            let child = doc.create_element(tag);
            doc.append_child(div, child).unwrap();
        }
        let comment = doc.create_comment("a -- b");
        doc.append_child(div, comment).unwrap();

        let markup = outer_html(&doc, div);
        assert!(roxmltree::Document::parse(&markup).is_ok(), "{}", markup);
    }

    #[test]
    fn test_attribute_name_filter() {
        assert!(is_serializable_attribute("data-id"));
        assert!(is_serializable_attribute("xlink:href"));
        assert!(is_serializable_attribute("xml:lang"));
        assert!(is_serializable_attribute("xmlns:svg"));
        assert!(!is_serializable_attribute("@click"));
        assert!(!is_serializable_attribute("x-on:click"));
        assert!(!is_serializable_attribute(":class"));
        assert!(!is_serializable_attribute("1st"));
        assert!(!is_serializable_attribute("a:b:c"));
    }

    #[test]
    fn test_framework_attributes_and_control_chars_stay_well_formed() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.element_mut(div)
            .unwrap()
            .set_attribute("xmlns", "http://www.w3.org/1999/xhtml");
        let button = doc.create_element("button");
        {
            let element = doc.element_mut(button).unwrap();
            element.set_attribute("@click", "open()");
            element.set_attribute("x-on:click", "open()");
            element.set_attribute("title", "form\u{c}feed");
            element.set_attribute("type", "button");
        }
        let text = doc.create_text("page\u{c}break\u{0}");
        let comment = doc.create_comment("ends with -");
        doc.append_child(div, button).unwrap();
        doc.append_child(button, text).unwrap();
        doc.append_child(div, comment).unwrap();

        let markup = outer_html(&doc, div);
        assert_eq!(
            markup,
            concat!(
                r#"<div xmlns="http://www.w3.org/1999/xhtml">"#,
                r#"<button title="formfeed" type="button">pagebreak</button>"#,
                "<!--ends with - -->",
                "</div>"
            )
        );
        let parsed = roxmltree::Document::parse(&markup).unwrap();
        let button = parsed
            .descendants()
            .find(|node| node.has_tag_name("button"))
            .unwrap();
        assert_eq!(button.attributes().count(), 2);
    }
}
