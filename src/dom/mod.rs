//! XML tree adapter.
//!
//! An owned, arena-backed element tree with the small set of primitives the
//! news item accessors need: path queries with typed predicates, element
//! creation that inherits namespaces, attribute and text access, append and
//! detach. Parsing and serialization go through quick-xml.

mod arena;
mod query;
mod tree_sink;
mod writer;

pub use arena::{Attribute, ChildrenIter, Node, NodeData, NodeId, QName, XmlDom};
pub use query::{any_element, attr_contains, attr_eq, attr_in};
