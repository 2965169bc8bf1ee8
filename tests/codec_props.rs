//! Property tests for the element/object codec.

use newsitem::{XmlDom, codec};
use proptest::prelude::*;
use serde_json::{Map, Value};

const LINK_ATTRS: [&str; 5] = ["title", "uuid", "uri", "rel", "type"];

/// Flat, attribute-only link shapes.
fn link_object() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map(
        proptest::sample::select(LINK_ATTRS.to_vec()),
        "[a-zA-Z0-9 åäö&<>\"':/._-]{0,24}",
        0..=LINK_ATTRS.len(),
    )
    .prop_map(|attrs| {
        attrs
            .into_iter()
            .map(|(name, value)| (format!("@{name}"), Value::String(value)))
            .collect()
    })
}

/// `data` payloads: text-only children with distinct names.
fn data_object() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-z][a-zA-Z]{0,8}", "[a-zA-Z0-9åäö&<>:/._-]{1,20}", 1..6).prop_map(
        |fields| {
            fields
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect()
        },
    )
}

fn encode_into_document(object: &Map<String, Value>, root: &str) -> XmlDom {
    let mut dom = XmlDom::new();
    let node = codec::encode(
        &mut dom,
        &Value::Object(object.clone()),
        Some("http://www.infomaker.se/newsml/1.0"),
        root,
    )
    .unwrap();
    let document = dom.document();
    dom.append(document, node);
    dom
}

proptest! {
    #[test]
    fn decode_inverts_encode_for_flat_links(object in link_object()) {
        let dom = encode_into_document(&object, "link");
        let root = dom.document_element().unwrap();
        prop_assert_eq!(codec::decode(&dom, root), object);
    }

    #[test]
    fn flat_links_survive_serialization(object in link_object()) {
        let xml = encode_into_document(&object, "link").to_xml().unwrap();
        let reparsed = XmlDom::parse(&xml).unwrap();
        let root = reparsed.document_element().unwrap();
        prop_assert_eq!(codec::decode(&reparsed, root), object);
    }

    #[test]
    fn data_payloads_survive_serialization(data in data_object()) {
        let mut link = Map::new();
        link.insert("@uuid".to_string(), Value::String("u1".to_string()));
        link.insert("data".to_string(), Value::Object(data));

        let xml = encode_into_document(&link, "link").to_xml().unwrap();
        let reparsed = XmlDom::parse(&xml).unwrap();
        let root = reparsed.document_element().unwrap();
        prop_assert_eq!(codec::decode(&reparsed, root), link);
    }
}
