//! Element ⇄ object codec.
//!
//! Maps an element subtree to a JSON object and back:
//!
//! - attributes become keys prefixed with `@`
//! - child elements holding only text become string values
//! - child elements with attributes or children become nested objects
//! - repeated sibling names collapse into an array
//! - text mixed with attributes or children is kept under `keyValue`
//!
//! ```
//! use newsitem::{codec, XmlDom};
//!
//! let dom = XmlDom::parse(r#"<link uuid="u1" rel="author"><data><email>a@b.se</email></data></link>"#).unwrap();
//! let link = codec::decode(&dom, dom.document_element().unwrap());
//! assert_eq!(link["@uuid"], "u1");
//! assert_eq!(link["data"]["email"], "a@b.se");
//! ```

use serde_json::{Map, Value};

use crate::dom::{NodeId, QName, XmlDom};
use crate::error::{Error, Result};

/// Key prefix marking an attribute.
pub const ATTR_PREFIX: char = '@';

/// Key holding element text when the element also has structure.
pub const TEXT_KEY: &str = "keyValue";

/// Decode an element into an object.
///
/// The result is always an object, even for a text-only element (its text is
/// then stored under [`TEXT_KEY`]).
pub fn decode(dom: &XmlDom, element: NodeId) -> Map<String, Value> {
    match decode_value(dom, element) {
        Value::Object(map) => map,
        Value::String(text) if text.is_empty() => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert(TEXT_KEY.to_string(), other);
            map
        }
    }
}

fn decode_value(dom: &XmlDom, element: NodeId) -> Value {
    let attrs = dom.attrs(element);
    let has_children = dom.child_elements(element).next().is_some();

    if attrs.is_empty() && !has_children {
        return Value::String(dom.text(element));
    }

    let mut map = Map::new();
    for attr in attrs {
        // Namespace declarations are markup, not data
        if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
            continue;
        }
        map.insert(
            format!("{ATTR_PREFIX}{}", attr.name),
            Value::String(attr.value.clone()),
        );
    }

    let mut text = String::new();
    for child in dom.children(element) {
        if dom.is_text(child) {
            text.push_str(&dom.text(child));
            continue;
        }
        let Some(name) = dom.local_name(child) else {
            continue;
        };
        let value = decode_value(dom, child);
        match map.get_mut(name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name.to_string(), value);
            }
        }
    }

    if !text.trim().is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text));
    }

    Value::Object(map)
}

/// Build a detached element named `root_name` in namespace `ns` from an
/// object.
///
/// `null` members are skipped; arrays become repeated sibling elements.
pub fn encode(dom: &mut XmlDom, value: &Value, ns: Option<&str>, root_name: &str) -> Result<NodeId> {
    let Value::Object(map) = value else {
        return Err(Error::Validation(format!(
            "cannot encode {} as <{root_name}>, expected an object",
            kind_of(value)
        )));
    };
    let element = dom.create_element_ns(QName::new(ns, root_name));
    fill(dom, element, map, ns)?;
    Ok(element)
}

fn fill(dom: &mut XmlDom, element: NodeId, map: &Map<String, Value>, ns: Option<&str>) -> Result<()> {
    for (key, value) in map {
        if let Some(attr) = key.strip_prefix(ATTR_PREFIX) {
            if let Some(text) = scalar(value, key)? {
                dom.set_attr(element, attr, text);
            }
        } else if key == TEXT_KEY {
            if let Some(text) = scalar(value, key)? {
                let node = dom.create_text(text);
                dom.append(element, node);
            }
        } else if let Value::Array(items) = value {
            for item in items {
                if matches!(item, Value::Array(_)) {
                    return Err(Error::Validation(format!("nested array under `{key}`")));
                }
                encode_child(dom, element, key, item, ns)?;
            }
        } else {
            encode_child(dom, element, key, value, ns)?;
        }
    }
    Ok(())
}

fn encode_child(
    dom: &mut XmlDom,
    parent: NodeId,
    name: &str,
    value: &Value,
    ns: Option<&str>,
) -> Result<()> {
    let child = match value {
        Value::Null => return Ok(()),
        Value::Object(map) => {
            let child = dom.create_element_ns(QName::new(ns, name));
            fill(dom, child, map, ns)?;
            child
        }
        other => {
            let child = dom.create_element_ns(QName::new(ns, name));
            if let Some(text) = scalar(other, name)? {
                dom.set_text(child, text);
            }
            child
        }
    };
    dom.append(parent, child);
    Ok(())
}

/// Text form of a scalar; `None` for null.
fn scalar(value: &Value, key: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(Error::Validation(format!(
            "`{key}` must be a scalar, got {}",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
