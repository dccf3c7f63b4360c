//! Offline host backed by a recorded page.
//!
//! A [`PageSnapshot`] holds what the pipeline would otherwise query from a
//! browser: the body tree with computed styles and boxes, the selection,
//! and optionally the geometry the staged fragment got when it was laid
//! out. [`SnapshotHost`] serves those answers through the host traits.

use crate::geometry::Rect;
use crate::host::{LiveDocument, StagedFragment, StagingArea};
use crate::style::ComputedStyle;
use domshot_dom::{Boundary, Document, DomError, NodeId, SelectionRange};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Selection path {0:?} does not point at a node")]
    InvalidPath(Vec<usize>),

    #[error(transparent)]
    Dom(#[from] DomError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub body: SnapshotElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SnapshotSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging: Option<StagingGeometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Text { text: String },
    Element(SnapshotElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Computed style, hyphenated or camel-cased keys
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

/// Child-index path from `body` plus an offset into the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBoundary {
    pub path: Vec<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSelection {
    pub start: SnapshotBoundary,
    pub end: SnapshotBoundary,
    pub rect: Rect,
}

/// Boxes recorded after a real layout of the staged fragment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagingGeometry {
    pub container: Rect,
    pub root: Rect,
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct SnapshotHost {
    document: Document,
    styles: HashMap<NodeId, ComputedStyle>,
    rects: HashMap<NodeId, Rect>,
    selection: Option<SelectionRange>,
    selection_rect: Option<Rect>,
    url: Option<String>,
    staging: Option<StagingGeometry>,
    mounted: Option<StagedFragment>,
    frames: usize,
}

impl SnapshotHost {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Self::new(PageSnapshot::from_json(json)?)
    }

    pub fn new(snapshot: PageSnapshot) -> Result<Self, SnapshotError> {
        let mut host = Self {
            document: Document::new(),
            styles: HashMap::new(),
            rects: HashMap::new(),
            selection: None,
            selection_rect: None,
            url: snapshot.url,
            staging: snapshot.staging,
            mounted: None,
            frames: 0,
        };

        let body = host.document.body();
        host.load_element(body, &snapshot.body)?;

        if let Some(selection) = snapshot.selection {
            let start = host.boundary(&selection.start)?;
            let end = host.boundary(&selection.end)?;
            host.selection = Some(SelectionRange::new(start, end));
            host.selection_rect = Some(selection.rect);
        }

        debug!(nodes = host.document.len(), "Loaded page snapshot");
        Ok(host)
    }

    /// Fragment currently mounted in the staging area
    pub fn mounted(&self) -> Option<&StagedFragment> {
        self.mounted.as_ref()
    }

    /// Layout passes requested so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn load_element(&mut self, id: NodeId, element: &SnapshotElement) -> Result<(), SnapshotError> {
        {
            let data = self.document.element_mut(id)?;
            for (name, value) in &element.attributes {
                data.set_attribute(name.as_str(), value.as_str());
            }
        }
        self.styles.insert(id, element.style.iter().collect());
        if let Some(rect) = element.rect {
            self.rects.insert(id, rect);
        }

        for child in &element.children {
            let child_id = match child {
                SnapshotNode::Text { text } => self.document.create_text(text.as_str()),
                SnapshotNode::Element(child) => {
                    let child_id = self.document.create_element(child.tag.as_str());
                    self.load_element(child_id, child)?;
                    child_id
                }
            };
            self.document.append_child(id, child_id)?;
        }
        Ok(())
    }

    fn boundary(&self, boundary: &SnapshotBoundary) -> Result<Boundary, SnapshotError> {
        let mut node = self.document.body();
        for &index in &boundary.path {
            node = self
                .document
                .child_at(node, index)
                .ok_or_else(|| SnapshotError::InvalidPath(boundary.path.clone()))?;
        }
        Ok(Boundary::new(node, boundary.offset))
    }
}

impl LiveDocument for SnapshotHost {
    fn document(&self) -> &Document {
        &self.document
    }

    fn selection(&self) -> Option<SelectionRange> {
        self.selection
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        self.styles.get(&node).cloned()
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.rects.get(&node).copied()
    }

    fn range_rect(&self, range: &SelectionRange) -> Option<Rect> {
        if self.selection.as_ref() == Some(range) {
            self.selection_rect
        } else {
            None
        }
    }

    fn page_url(&self) -> Option<String> {
        self.url.clone()
    }
}

impl StagingArea for SnapshotHost {
    fn mount(&mut self, fragment: &StagedFragment) -> crate::Result<()> {
        self.mounted = Some(fragment.clone());
        Ok(())
    }

    fn next_frame(&mut self) -> impl Future<Output = ()> {
        self.frames += 1;
        std::future::ready(())
    }

    fn staged_rect(&self, marker: &str) -> Option<Rect> {
        let fragment = self.mounted.as_ref()?;
        if fragment.root_marker != marker {
            return None;
        }
        Some(
            self.staging
                .map(|geometry| geometry.root)
                .unwrap_or(fragment.expected_root),
        )
    }

    fn staging_rect(&self) -> Option<Rect> {
        self.mounted.as_ref()?;
        Some(
            self.staging
                .map(|geometry| geometry.container)
                .unwrap_or_default(),
        )
    }

    fn unmount(&mut self) {
        self.mounted = None;
    }
}
