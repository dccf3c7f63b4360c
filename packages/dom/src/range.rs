use crate::{Document, NodeId};

/// One end of a selection: a node plus an offset into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A start/end position pair within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl SelectionRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Lowest node containing both endpoints
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        doc.common_ancestor(self.start.node, self.end.node)
    }

    /// The common ancestor if it is an element, otherwise its parent element
    pub fn common_ancestor_element(&self, doc: &Document) -> Option<NodeId> {
        self.common_ancestor(doc)
            .and_then(|node| doc.closest_element(node))
    }
}
