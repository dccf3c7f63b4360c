use crate::{DomError, Result};
use indextree::Arena;
use std::collections::HashMap;

pub use indextree::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element payload: tag name plus attributes in source order.
///
/// All-uppercase names (HTML `tagName` style) are lowercased; mixed-case
/// names such as SVG's `foreignObject` keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<Attribute>,
}

fn normalize_tag(tag: String) -> String {
    if tag.bytes().any(|b| b.is_ascii_lowercase()) {
        tag
    } else {
        tag.to_ascii_lowercase()
    }
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: normalize_tag(tag.into()),
            attributes: Vec::new(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name == name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|attr| attr.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    pub fn retain_attributes(&mut self, mut keep: impl FnMut(&Attribute) -> bool) {
        self.attributes.retain(|attr| keep(attr));
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut classes: Vec<&str> = self.classes().collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attribute("class", joined);
    }

    /// Keeps only the classes accepted by `keep`. Drops the attribute once
    /// no class survives.
    pub fn retain_classes(&mut self, mut keep: impl FnMut(&str) -> bool) {
        if !self.has_attribute("class") {
            return;
        }
        let kept: Vec<String> = self
            .classes()
            .filter(|c| keep(c))
            .map(str::to_string)
            .collect();
        if kept.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_attribute("class", kept.join(" "));
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.retain_classes(|c| c != class);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Arena-backed document. A fresh document holds `html > (head, body)`.
///
/// Detached nodes stay in the arena; only nodes reachable from a root are
/// visited by traversals and serialization.
#[derive(Debug, Clone)]
pub struct Document {
    arena: Arena<NodeKind>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeKind::Element(ElementData::new("html")));
        let head = arena.new_node(NodeKind::Element(ElementData::new("head")));
        let body = arena.new_node(NodeKind::Element(ElementData::new("body")));
        root.append(head, &mut arena);
        root.append(body, &mut arena);
        Self {
            arena,
            root,
            head,
            body,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of nodes in the arena, attached or not
    pub fn len(&self) -> usize {
        self.arena.count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeKind> {
        self.arena
            .get(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get())
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeKind> {
        self.get(id).ok_or(DomError::UnknownNode(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(NodeKind::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        let node = self
            .arena
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .ok_or(DomError::UnknownNode(id))?;
        match node.get_mut() {
            NodeKind::Element(element) => Ok(element),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(NodeKind::as_text)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|node| node.parent())
    }

    /// Direct children in order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(move |_| id.children(&self.arena))
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).nth(index)
    }

    /// Nearest element: the node itself if it is one, else its parent element
    pub fn closest_element(&self, id: NodeId) -> Option<NodeId> {
        if self.is_element(id) {
            return Some(id);
        }
        self.ancestors(id).find(|&ancestor| self.is_element(ancestor))
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeKind::Comment(text.into()))
    }

    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(child)?;
        if !self.node(parent)?.is_element() {
            return Err(DomError::NotAnElement(parent));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        child.detach(&mut self.arena);
        parent
            .checked_append(child, &mut self.arena)
            .map_err(|_| DomError::HierarchyRequest { parent, child })
    }

    pub fn detach(&mut self, id: NodeId) {
        if self.get(id).is_some() {
            id.detach(&mut self.arena);
        }
    }

    /// Inclusive containment, matching DOM `Node.contains`
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if self.get(node).is_none() {
            return false;
        }
        node.ancestors(&self.arena).any(|a| a == ancestor)
    }

    /// Parents from nearest to farthest, excluding `id`
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(move |_| id.ancestors(&self.arena).skip(1))
    }

    /// All descendants in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id) {
            Some(_) => id.descendants(&self.arena).skip(1).collect(),
            None => Vec::new(),
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = self.text(id).unwrap_or_default().to_string();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Lowest node containing both `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        self.get(a)?;
        a.ancestors(&self.arena)
            .find(|&candidate| self.contains(candidate, b))
    }

    /// Deep-copies `node` (from `source`) into this arena as a detached
    /// subtree. Returns the copy's id and the source-to-copy id mapping.
    pub fn import_subtree(
        &mut self,
        source: &Document,
        node: NodeId,
    ) -> Result<(NodeId, HashMap<NodeId, NodeId>)> {
        let top = self.arena.new_node(source.node(node)?.clone());
        let mut mapping = HashMap::new();
        mapping.insert(node, top);

        let mut stack = vec![(node, top)];
        while let Some((src_id, dst_id)) = stack.pop() {
            for child in source.children(src_id) {
                let copy = self.arena.new_node(source.node(child)?.clone());
                dst_id.append(copy, &mut self.arena);
                mapping.insert(child, copy);
                stack.push((child, copy));
            }
        }

        Ok((top, mapping))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
