//! # Domshot DOM
//!
//! A small arena document model used to carry page fragments through the
//! capture pipeline. Nodes live in an `indextree` arena and are addressed
//! by its stable ids, so the pipeline can associate data with nodes
//! (markers, styles, geometry) through plain maps instead of mutating the
//! nodes themselves.

mod document;
mod range;
mod serialize;

pub use document::{Attribute, Document, ElementData, NodeId, NodeKind};
pub use range::{Boundary, SelectionRange};
pub use serialize::{
    escape_attribute, escape_text, is_serializable_attribute, is_void_element, is_xml_char,
    outer_html, VOID_ELEMENTS,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {child} cannot be inserted under {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),
}

pub type Result<T> = std::result::Result<T, DomError>;
