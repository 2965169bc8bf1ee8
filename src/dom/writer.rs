//! Serialize an [`XmlDom`] back to XML text.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use super::arena::{NodeData, NodeId, XmlDom};
use crate::error::Result;

impl XmlDom {
    /// Serialize the whole document, with an XML declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        for child in self.children(self.document()) {
            self.write_node(&mut writer, child, None)?;
        }
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Serialize a single subtree (no declaration).
    ///
    /// `in_scope_ns` is the default namespace the fragment will be embedded in.
    pub fn subtree_to_xml(&self, id: NodeId, in_scope_ns: Option<&str>) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_node(&mut writer, id, in_scope_ns)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_node(
        &self,
        writer: &mut Writer<Vec<u8>>,
        id: NodeId,
        default_ns: Option<&str>,
    ) -> Result<()> {
        let Some(node) = self.get(id) else {
            return Ok(());
        };

        match &node.data {
            NodeData::Element { name, attrs } => {
                let qualified = name.qualified();
                let mut start = BytesStart::new(qualified.as_str());
                let mut scope_ns = default_ns;

                let declares_default = attrs.iter().find(|a| a.name == "xmlns");
                if let Some(decl) = declares_default {
                    scope_ns = (!decl.value.is_empty()).then_some(decl.value.as_str());
                } else if name.prefix.is_none() && name.ns.as_deref() != default_ns {
                    // Elements created in code carry a namespace but no declaration
                    start.push_attribute(("xmlns", name.ns.as_deref().unwrap_or("")));
                    scope_ns = name.ns.as_deref();
                }

                for attr in attrs {
                    start.push_attribute((attr.name.as_str(), attr.value.as_str()));
                }

                if node.first_child.is_none() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for child in self.children(id) {
                        self.write_node(writer, child, scope_ns)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(qualified.as_str())))?;
                }
            }
            NodeData::Text(text) => {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            NodeData::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            NodeData::ProcessingInstruction(content) => {
                writer.write_event(Event::PI(BytesPI::new(content.as_str())))?;
            }
            NodeData::Document => {
                for child in self.children(id) {
                    self.write_node(writer, child, default_ns)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::arena::QName;
    use super::*;

    #[test]
    fn test_roundtrip_keeps_structure() {
        let source = r#"<newsItem xmlns="urn:g2" guid="g1"><itemMeta><edNote>a &amp; b</edNote><links xmlns="urn:im"><link title="x &quot;y&quot;" uuid="u1"/></links></itemMeta></newsItem>"#;
        let dom = XmlDom::parse(source).unwrap();
        let xml = dom.to_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        let reparsed = XmlDom::parse(&xml).unwrap();
        let root = reparsed.document_element().unwrap();
        let item_meta = reparsed.child_elements(root).next().unwrap();
        let children: Vec<_> = reparsed.child_elements(item_meta).collect();
        assert_eq!(reparsed.text(children[0]), "a & b");
        let link = reparsed.child_elements(children[1]).next().unwrap();
        assert_eq!(reparsed.namespace(link), Some("urn:im"));
        assert_eq!(reparsed.attr(link, "title"), Some("x \"y\""));
    }

    #[test]
    fn test_created_element_gets_namespace_declaration() {
        let mut dom = XmlDom::parse(r#"<newsItem xmlns="urn:g2"><itemMeta/></newsItem>"#).unwrap();
        let root = dom.document_element().unwrap();

        // Same namespace as the parent: no declaration needed
        let same = dom.create_element(root, "contentMeta").unwrap();
        dom.append(root, same);
        // Foreign namespace: must be declared
        let other = dom.create_element_ns(QName::new(Some("urn:im"), "links"));
        dom.append(same, other);

        let xml = dom.subtree_to_xml(root, None).unwrap();
        assert_eq!(
            xml,
            r#"<newsItem xmlns="urn:g2"><itemMeta/><contentMeta><links xmlns="urn:im"/></contentMeta></newsItem>"#
        );
    }
}
