//! quick-xml event loop that builds an [`XmlDom`].

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use super::arena::{Attribute, NodeId, QName, XmlDom};
use crate::error::{Error, Result};
use crate::util::{decode_text, local_name, resolve_entity, strip_bom};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace bindings introduced by one open element.
#[derive(Default)]
struct Scope {
    default_ns: Option<Option<String>>,
    prefixes: HashMap<String, String>,
}

/// Builds the arena while tracking open elements and namespace scopes.
struct TreeSink {
    dom: XmlDom,
    open: Vec<NodeId>,
    scopes: Vec<Scope>,
}

impl TreeSink {
    fn new() -> Self {
        let dom = XmlDom::new();
        let document = dom.document();
        Self {
            dom,
            open: vec![document],
            scopes: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.dom.document())
    }

    fn resolve_prefix(&self, prefix: Option<&str>) -> Option<String> {
        match prefix {
            Some("xml") => Some(XML_NS.to_string()),
            Some(prefix) => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.prefixes.get(prefix).cloned()),
            None => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.default_ns.clone())
                .flatten(),
        }
    }

    /// Create and attach an element for a start (or empty) tag.
    fn start_element(&mut self, e: &BytesStart<'_>) -> Result<NodeId> {
        let raw_name = String::from_utf8(e.name().as_ref().to_vec())?;
        let mut attrs = Vec::new();
        let mut scope = Scope::default();

        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8(attr.key.as_ref().to_vec())?;
            let raw_value = String::from_utf8(attr.value.to_vec())?;
            let value = unescape(&raw_value)?.into_owned();

            if key == "xmlns" {
                scope.default_ns = Some((!value.is_empty()).then(|| value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.prefixes.insert(prefix.to_string(), value.clone());
            }
            attrs.push(Attribute { name: key, value });
        }

        self.scopes.push(scope);

        let (prefix, local) = match raw_name.split_once(':') {
            Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
            None => (None, raw_name.clone()),
        };
        let ns = self.resolve_prefix(prefix.as_deref());

        let id = self.dom.create_element_ns(QName { prefix, local, ns });
        for attr in attrs {
            self.dom.set_attr(id, &attr.name, attr.value);
        }

        let parent = self.current();
        self.dom.append(parent, id);
        Ok(id)
    }

    fn end_element(&mut self, name: &[u8]) -> Result<()> {
        let open = self.current();
        let matches = self
            .dom
            .qname(open)
            .is_some_and(|q| q.qualified().as_bytes() == name);
        if !matches {
            return Err(Error::InvalidDocument(format!(
                "unexpected closing tag </{}>",
                String::from_utf8_lossy(local_name(name))
            )));
        }
        self.open.pop();
        self.scopes.pop();
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.open.len() <= 1 || text.is_empty() {
            return;
        }
        let parent = self.current();
        // Whitespace-only runs count only when they continue a text node
        // (e.g. between two entity references); otherwise they are indentation.
        let continues_text = self
            .dom
            .get(parent)
            .is_some_and(|n| self.dom.is_text(n.last_child));
        if continues_text || !text.trim().is_empty() {
            self.dom.append_text(parent, text);
        }
    }
}

impl XmlDom {
    /// Parse XML text into a tree.
    ///
    /// Whitespace-only text between elements is dropped; other text is kept
    /// verbatim.
    pub fn parse(content: &str) -> Result<XmlDom> {
        let mut reader = Reader::from_str(content);

        let mut sink = TreeSink::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = sink.start_element(&e)?;
                    sink.open.push(id);
                }
                Event::Empty(e) => {
                    sink.start_element(&e)?;
                    sink.scopes.pop();
                }
                Event::End(e) => sink.end_element(e.name().as_ref())?,
                Event::Text(e) => {
                    let raw = e.decode().map_err(quick_xml::Error::from)?;
                    sink.text(&raw);
                }
                Event::CData(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    sink.text(&raw);
                }
                Event::GeneralRef(e) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        sink.text(&resolved);
                    }
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    let node = sink.dom.create_comment(text);
                    let parent = sink.current();
                    sink.dom.append(parent, node);
                }
                Event::PI(e) => {
                    let content = String::from_utf8_lossy(&e).into_owned();
                    let node = sink.dom.create_pi(content);
                    let parent = sink.current();
                    sink.dom.append(parent, node);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if sink.open.len() > 1 {
            return Err(Error::InvalidDocument("unclosed element at end of input".into()));
        }
        if sink.dom.document_element().is_none() {
            return Err(Error::MissingElement("document root".into()));
        }

        Ok(sink.dom)
    }

    /// Parse raw bytes, stripping a UTF-8 BOM and falling back to legacy
    /// encodings when the bytes are not valid UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDom> {
        let content = decode_text(strip_bom(bytes), None);
        XmlDom::parse(&content)
    }
}
