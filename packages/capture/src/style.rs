//! Computed-style snapshots and their re-serialization as scoped rules

use crate::extract::MarkerTag;
use crate::geometry::{parse_px, Margins};
use tracing::debug;

/// A computed style declaration as the host exposes it: property keys in
/// enumeration order, either hyphenated (`margin-top`) or camel-cased
/// (`marginTop`), possibly mixed with index-like keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    entries: Vec<(String, String)>,
}

impl ComputedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks a property up by its hyphenated name, whichever key form the
    /// host used.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == property || camel_to_kebab(key) == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn margins(&self) -> Margins {
        let px = |property: &str| self.get(property).and_then(parse_px).unwrap_or(0.0);
        Margins {
            top: px("margin-top"),
            right: px("margin-right"),
            bottom: px("margin-bottom"),
            left: px("margin-left"),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ComputedStyle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Style rule scoped to one marker class
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub marker: MarkerTag,
    pub declarations: Vec<(String, String)>,
}

impl StyleRule {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// `.<marker> { prop: value; ... }`, or an empty string for an empty rule
    pub fn to_css(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut css = format!(".{} {{ ", self.marker.name());
        for (property, value) in &self.declarations {
            css.push_str(property);
            css.push_str(": ");
            css.push_str(value);
            css.push_str("; ");
        }
        css.push('}');
        css
    }
}

/// Builds the scoped rule for one element.
///
/// `html` and `body` yield an empty rule. Keys that do not start with a
/// letter are dropped (index-like keys, `-webkit-*`), as are `webkit*`
/// properties and `visibility` unless it is `hidden`.
pub fn snapshot_style(tag: &str, marker: &MarkerTag, style: &ComputedStyle) -> StyleRule {
    let mut rule = StyleRule {
        marker: marker.clone(),
        declarations: Vec::new(),
    };

    if tag.eq_ignore_ascii_case("html") || tag.eq_ignore_ascii_case("body") {
        return rule;
    }

    for (key, value) in style.entries() {
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            continue;
        }
        let property = camel_to_kebab(key);
        if property.starts_with("webkit") {
            continue;
        }
        if property == "visibility" && value != "hidden" {
            continue;
        }
        rule.declarations.push((property, value.clone()));
    }

    debug!(
        marker = %marker.name(),
        declarations = rule.declarations.len(),
        "Captured style rule"
    );
    rule
}

/// `borderTopWidth` -> `border-top-width`; hyphenated input passes through
pub fn camel_to_kebab(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
