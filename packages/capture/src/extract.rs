//! Selection-to-subtree extraction.
//!
//! Two breadth-first walks: the first decides which live nodes lie on the
//! lineage between `body` and the selection's common ancestor (ancestors,
//! the ancestor itself, and everything under it) and assigns each a marker;
//! the second prunes a deep clone of `body` down to those nodes. The live
//! document is only read. Markers travel as an explicit id mapping and are
//! written as classes on the clone alone.

use crate::{CaptureError, Result, Stage};
use domshot_dom::{Document, NodeId};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument};

/// Elements never carried into a capture
pub const DISALLOWED_TAGS: &[&str] = &["embed", "script", "style", "link", "meta", "source"];

pub fn is_disallowed(doc: &Document, id: NodeId) -> bool {
    doc.tag_name(id)
        .map(|tag| DISALLOWED_TAGS.contains(&tag))
        .unwrap_or(false)
}

/// `<prefix><index>` marker identifying one extracted node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerTag {
    index: usize,
    name: String,
}

impl MarkerTag {
    pub fn new(prefix: &str, index: usize) -> Self {
        Self {
            index,
            name: format!("{}{}", prefix, index),
        }
    }

    /// Recognizes a marker class; other prefixed classes (`<prefix>wrapper`)
    /// are rejected.
    pub fn parse(prefix: &str, class: &str) -> Option<Self> {
        let digits = class.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = digits.parse().ok()?;
        Some(Self::new(prefix, index))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MarkerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Result of the marking walk over the live document
#[derive(Debug, Clone)]
pub struct Marking {
    /// Marked live nodes in visit order
    pub order: Vec<(NodeId, MarkerTag)>,
    /// Counter value the common ancestor received
    pub root_index: usize,
}

impl Marking {
    pub fn marker_of(&self, node: NodeId) -> Option<&MarkerTag> {
        self.order
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, marker)| marker)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A marked node and its copy in the extracted clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedNode {
    pub marker: MarkerTag,
    pub live: NodeId,
    pub clone: NodeId,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    /// Arena holding the pruned copy; only `wrapper` and its subtree matter
    pub clone: Document,
    /// `<div class="<prefix>wrapper">` holding the kept top-level nodes
    pub wrapper: NodeId,
    pub root_index: usize,
    pub root: MarkedNode,
    /// All marked nodes in visit order, the root included
    pub marked: Vec<MarkedNode>,
}

impl Extraction {
    pub fn root_marker(&self) -> &MarkerTag {
        &self.root.marker
    }

    pub fn find(&self, marker: &MarkerTag) -> Option<&MarkedNode> {
        self.marked.iter().find(|node| &node.marker == marker)
    }
}

/// First walk: breadth-first from `body`'s children, marking every element
/// that contains `common` or is contained by it.
///
/// When `common` is `body` itself, `body` takes marker 0 and the walk
/// numbers its descendants from 1.
pub fn mark_lineage(doc: &Document, common: NodeId, prefix: &str) -> Result<Marking> {
    let body = doc.body();
    if !doc.contains(body, common) {
        return Err(CaptureError::failure(
            Stage::Extraction,
            format!("common ancestor {} is outside the body", common),
        ));
    }

    let mut order = Vec::new();
    let mut counter = 0;
    let mut root_index = None;

    if common == body {
        order.push((body, MarkerTag::new(prefix, counter)));
        root_index = Some(counter);
        counter += 1;
    }

    let mut level: Vec<NodeId> = doc.children(body).collect();
    while !level.is_empty() {
        let mut next = Vec::new();
        for node in level {
            if is_disallowed(doc, node) {
                continue;
            }
            if node == common {
                root_index = Some(counter);
            }
            let on_lineage = doc.contains(node, common) || doc.contains(common, node);
            if !on_lineage || !doc.is_element(node) {
                continue;
            }
            order.push((node, MarkerTag::new(prefix, counter)));
            counter += 1;
            next.push(node);
        }

        level = next
            .iter()
            .flat_map(|&node| doc.children(node))
            .collect();
    }

    let root_index = root_index.ok_or_else(|| {
        CaptureError::failure(Stage::Extraction, "common ancestor was never visited")
    })?;

    Ok(Marking { order, root_index })
}

/// Runs both walks and collects the kept top-level nodes into a wrapper.
#[instrument(skip(live, common), fields(common = %common))]
pub fn extract_subtree(live: &Document, common: NodeId, prefix: &str) -> Result<Extraction> {
    let marking = mark_lineage(live, common, prefix)?;

    let mut clone = Document::new();
    let (clone_body, mapping) = clone
        .import_subtree(live, live.body())
        .map_err(|e| CaptureError::failure(Stage::Extraction, e))?;

    let clone_markers: HashMap<NodeId, &MarkerTag> = marking
        .order
        .iter()
        .filter_map(|(live_id, marker)| mapping.get(live_id).map(|&id| (id, marker)))
        .collect();

    // Second walk. Text directly inside a kept element survives, unmarked or
    // disallowed elements and comments go.
    let mut level: Vec<NodeId> = clone.children(clone_body).collect();
    while !level.is_empty() {
        let mut next = Vec::new();
        for node in level {
            if clone.text(node).is_some() {
                continue;
            }
            let keep = clone.is_element(node)
                && !is_disallowed(&clone, node)
                && clone_markers.contains_key(&node);
            if keep {
                next.push(node);
            } else {
                clone.detach(node);
            }
        }

        level = next
            .iter()
            .flat_map(|&node| clone.children(node))
            .collect();
    }

    let wrapper = clone.create_element("div");
    clone
        .element_mut(wrapper)
        .map_err(|e| CaptureError::failure(Stage::Extraction, e))?
        .set_attribute("class", format!("{}wrapper", prefix));

    let top_level: Vec<NodeId> = clone.children(clone_body).collect();
    for node in top_level {
        if clone_markers.contains_key(&node) {
            clone
                .append_child(wrapper, node)
                .map_err(|e| CaptureError::failure(Stage::Extraction, e))?;
        }
    }

    let mut marked = Vec::with_capacity(marking.len());
    for (live_id, marker) in &marking.order {
        // body has no copy of its own under the wrapper; the wrapper stands in
        let clone_id = if *live_id == live.body() {
            wrapper
        } else {
            mapping.get(live_id).copied().ok_or_else(|| {
                CaptureError::failure(Stage::Extraction, format!("{} was not cloned", live_id))
            })?
        };
        clone
            .element_mut(clone_id)
            .map_err(|e| CaptureError::failure(Stage::Extraction, e))?
            .add_class(marker.name());
        marked.push(MarkedNode {
            marker: marker.clone(),
            live: *live_id,
            clone: clone_id,
        });
    }

    let root = marked
        .iter()
        .find(|node| node.marker.index() == marking.root_index)
        .cloned()
        .ok_or_else(|| CaptureError::failure(Stage::Extraction, "root marker missing"))?;

    debug!(
        marked = marked.len(),
        root_index = marking.root_index,
        "Extracted subtree"
    );

    Ok(Extraction {
        clone,
        wrapper,
        root_index: marking.root_index,
        root,
        marked,
    })
}
