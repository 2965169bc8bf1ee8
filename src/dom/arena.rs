//! Arena-based XML tree.
//!
//! All nodes live in one vector and reference each other through
//! [`NodeId`] indices, so handles stay valid while the tree is edited.
//! Detached nodes keep their slot until [`XmlDom::compact`]; they are simply
//! unreachable from the document root.

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Qualified element name with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    /// Namespace URI the name resolves to, if any.
    pub ns: Option<String>,
}

impl QName {
    pub fn new(ns: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            ns: ns.map(str::to_string),
        }
    }

    /// The name as written in markup (`prefix:local` or `local`).
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

/// Element attribute, keyed by its name as written (`type`, `xml:lang`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Node type in the arena.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element { name: QName, attrs: Vec<Attribute> },
    /// Text content.
    Text(String),
    /// Comment, kept so serialization does not drop it.
    Comment(String),
    /// Processing instruction (target and content as one string).
    ProcessingInstruction(String),
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-backed XML document.
///
/// The host owns this value; news item accessors only borrow it.
///
/// Detached nodes are never freed, so every rebuilt `data` element or
/// replaced object grows the arena. Hosts keeping a document open across many
/// edits should call [`compact`](Self::compact) between edits.
#[derive(Debug)]
pub struct XmlDom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl XmlDom {
    /// Create a new empty tree with only a document node.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document node ID.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Get the root element (first element child of the document node).
    pub fn document_element(&self) -> Option<NodeId> {
        self.child_elements(self.document).next()
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a detached element with an explicit name.
    pub fn create_element_ns(&mut self, name: QName) -> NodeId {
        self.alloc(Node::new(NodeData::Element {
            name,
            attrs: Vec::new(),
        }))
    }

    /// Create a detached element that inherits the namespace (and prefix)
    /// of `context`.
    ///
    /// Returns `None` when `context` is not an element; namespaces are never
    /// invented.
    pub fn create_element(&mut self, context: NodeId, local: &str) -> Option<NodeId> {
        let name = match &self.get(context)?.data {
            NodeData::Element { name, .. } => QName {
                prefix: name.prefix.clone(),
                local: local.to_string(),
                ns: name.ns.clone(),
            },
            _ => return None,
        };
        Some(self.create_element_ns(name))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    pub(crate) fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub(crate) fn create_pi(&mut self, content: String) -> NodeId {
        self.alloc(Node::new(NodeData::ProcessingInstruction(content)))
    }

    /// Append a child as the last child of `parent`.
    ///
    /// The child is detached from any previous position first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if last_child.is_some()
            && let Some(last_node) = self.get_mut(last_child)
        {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Unlink a node from its parent and siblings.
    ///
    /// The subtree stays intact and can be re-appended or decoded.
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(NodeId::is_some)
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Iterate over element children only.
    pub fn child_elements(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent).filter(|&id| self.is_element(id))
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (only has the document node).
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Drop every node unreachable from the document node and renumber the
    /// rest in document order.
    ///
    /// All [`NodeId`]s handed out before the call are invalidated.
    pub fn compact(&mut self) {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.document];
        while let Some(id) = stack.pop() {
            order.push(id);
            // Pushed last to first so the first child is visited next
            let mut child = self.get(id).map_or(NodeId::NONE, |n| n.last_child);
            while let Some(node) = self.get(child) {
                stack.push(child);
                child = node.prev_sibling;
            }
        }

        let mut remap = vec![NodeId::NONE; self.nodes.len()];
        for (new, old) in order.iter().enumerate() {
            remap[old.0 as usize] = NodeId(new as u32);
        }
        let renumber = |id: NodeId| {
            remap
                .get(id.0 as usize)
                .copied()
                .unwrap_or(NodeId::NONE)
        };

        let dropped = self.nodes.len() - order.len();
        let mut old: Vec<Option<Node>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = order
            .iter()
            .filter_map(|id| old.get_mut(id.0 as usize).and_then(Option::take))
            .map(|mut node| {
                node.parent = renumber(node.parent);
                node.first_child = renumber(node.first_child);
                node.last_child = renumber(node.last_child);
                node.prev_sibling = renumber(node.prev_sibling);
                node.next_sibling = renumber(node.next_sibling);
                node
            })
            .collect();
        self.document = renumber(self.document);
        tracing::debug!(dropped, live = self.nodes.len(), "arena compacted");
    }
}

impl Default for XmlDom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    dom: &'a XmlDom,
    current: NodeId,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Convenience methods for element nodes.
impl XmlDom {
    /// Get an element's qualified name.
    pub fn qname(&self, id: NodeId) -> Option<&QName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        })
    }

    /// Get an element's local name (tag).
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.qname(id).map(|name| name.local.as_str())
    }

    /// Get an element's namespace URI.
    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.qname(id).and_then(|name| name.ns.as_deref())
    }

    /// Get all attributes of an element, in document order.
    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        static EMPTY: &[Attribute] = &[];
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(EMPTY)
    }

    /// Get an attribute value.
    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name == attr_name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(id)
        {
            match attrs.iter_mut().find(|a| a.name == attr_name) {
                Some(existing) => existing.value = value,
                None => attrs.push(Attribute {
                    name: attr_name.to_string(),
                    value,
                }),
            }
        }
    }

    /// Remove an attribute. Returns the removed value, if any.
    pub fn remove_attr(&mut self, id: NodeId, attr_name: &str) -> Option<String> {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(id)
        {
            let pos = attrs.iter().position(|a| a.name == attr_name)?;
            return Some(attrs.remove(pos).value);
        }
        None
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Check if node is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(s)) => out.push_str(s),
            Some(NodeData::Element { .. }) | Some(NodeData::Document) => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// Replace all children of an element with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let children: Vec<_> = self.children(id).collect();
        for child in children {
            self.detach(child);
        }
        let text = text.into();
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append(id, node);
        }
    }

    /// Append text to the last text child, or add a new text node.
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(ref mut existing) = last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://iptc.org/std/nar/2006-10-01/";

    fn root(dom: &mut XmlDom) -> NodeId {
        let root = dom.create_element_ns(QName::new(Some(NS), "newsItem"));
        dom.append(dom.document(), root);
        root
    }

    #[test]
    fn test_create_element_inherits_namespace() {
        let mut dom = XmlDom::new();
        let root = root(&mut dom);

        let child = dom.create_element(root, "itemMeta").unwrap();
        assert_eq!(dom.namespace(child), Some(NS));
        assert_eq!(dom.local_name(child), Some("itemMeta"));

        // Text nodes cannot source a namespace
        let text = dom.create_text("x");
        assert!(dom.create_element(text, "links").is_none());
    }

    #[test]
    fn test_append_children() {
        let mut dom = XmlDom::new();
        let parent = root(&mut dom);
        let child1 = dom.create_element(parent, "a").unwrap();
        let child2 = dom.create_element(parent, "b").unwrap();

        dom.append(parent, child1);
        dom.append(parent, child2);

        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
        assert_eq!(dom.parent(child2), Some(parent));
    }

    #[test]
    fn test_detach_middle_first_and_last() {
        let mut dom = XmlDom::new();
        let parent = root(&mut dom);
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| {
                let id = dom.create_element(parent, name).unwrap();
                dom.append(parent, id);
                id
            })
            .collect();

        dom.detach(ids[1]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![ids[0], ids[2], ids[3]]);

        dom.detach(ids[0]);
        dom.detach(ids[3]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![ids[2]]);
        assert_eq!(dom.parent(ids[0]), None);

        // Re-appending a detached node puts it last
        dom.append(parent, ids[0]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![ids[2], ids[0]]);
    }

    #[test]
    fn test_compact_drops_detached_nodes() {
        let mut dom = XmlDom::new();
        let parent = root(&mut dom);
        for name in ["a", "b", "c"] {
            let id = dom.create_element(parent, name).unwrap();
            let text = dom.create_text(name.to_uppercase());
            dom.append(id, text);
            dom.append(parent, id);
        }
        let b = dom.children(parent).nth(1).unwrap();
        dom.detach(b);
        dom.create_text("never attached");
        let before = dom.to_xml().unwrap();
        assert_eq!(dom.len(), 9);

        dom.compact();
        assert_eq!(dom.len(), 6);
        assert_eq!(dom.to_xml().unwrap(), before);

        let root = dom.document_element().unwrap();
        let names: Vec<_> = dom
            .child_elements(root)
            .filter_map(|id| dom.local_name(id).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        let last = dom.children(root).last().unwrap();
        assert_eq!(dom.parent(last), Some(root));
        assert_eq!(dom.text(last), "C");
    }

    #[test]
    fn test_attributes() {
        let mut dom = XmlDom::new();
        let el = root(&mut dom);

        dom.set_attr(el, "type", "x-im/author");
        dom.set_attr(el, "title", "Jane");
        dom.set_attr(el, "type", "x-im/story");

        assert_eq!(dom.attr(el, "type"), Some("x-im/story"));
        assert_eq!(dom.attrs(el).len(), 2);
        assert_eq!(dom.remove_attr(el, "title"), Some("Jane".to_string()));
        assert_eq!(dom.remove_attr(el, "title"), None);
        assert_eq!(dom.attr(el, "title"), None);
    }

    #[test]
    fn test_text_replace_and_merge() {
        let mut dom = XmlDom::new();
        let el = root(&mut dom);

        dom.append_text(el, "Hello, ");
        dom.append_text(el, "World!");
        assert_eq!(dom.children(el).count(), 1);
        assert_eq!(dom.text(el), "Hello, World!");

        dom.set_text(el, "Bye");
        assert_eq!(dom.text(el), "Bye");

        dom.set_text(el, "");
        assert_eq!(dom.children(el).count(), 0);
    }
}
