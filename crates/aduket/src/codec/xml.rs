//! XML ⇄ generic mapping conversion.
//!
//! Documents map onto the same `serde_json` shape JSON bodies decode into:
//!
//! - the root element becomes a single key holding its content
//! - an element with only text becomes a string
//! - attributes become `-name` keys, text next to children or attributes becomes `#text`
//! - repeated sibling elements become an array
//!
//! All leaf values are strings; XML carries no type information.

use bytes::Bytes;
use serde_json::{Map, Value};
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element};
use sxd_document::{parser, writer, Package};

const ATTRIBUTE_PREFIX: char = '-';
const TEXT_KEY: &str = "#text";

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("invalid XML element or attribute name '{0}'")]
    InvalidName(String),
    #[error("cannot encode {0} as XML")]
    Unsupported(&'static str),
    #[error("body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed XML: {0}")]
    Parse(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("failed to write XML: {0}")]
    Write(#[from] std::io::Error),
}

/// Root element name used for a Rust type: the last path segment of its type name.
pub fn type_root_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Encode `value` as a document whose root element is `root`.
pub fn encode(root: &str, value: &Value) -> Result<Bytes, XmlError> {
    ensure_name(root)?;
    if value.is_array() {
        return Err(XmlError::Unsupported("an array at the document root"));
    }

    let package = Package::new();
    let doc = package.as_document();
    let element = doc.create_element(root);
    doc.root().append_child(element);
    fill_element(&doc, element, value)?;

    let mut out = Vec::new();
    writer::format_document(&doc, &mut out)?;
    Ok(Bytes::from(out))
}

/// Decode a document into `{root_name: content}`.
pub fn decode(body: &[u8]) -> Result<Map<String, Value>, XmlError> {
    let text = std::str::from_utf8(body)?;
    let package = parser::parse(text).map_err(|e| XmlError::Parse(format!("{e:?}")))?;
    let doc = package.as_document();

    let root = doc
        .root()
        .children()
        .into_iter()
        .find_map(|child| match child {
            ChildOfRoot::Element(element) => Some(element),
            _ => None,
        })
        .ok_or(XmlError::NoRoot)?;

    let mut body = Map::new();
    body.insert(
        root.name().local_part().to_string(),
        element_to_value(root),
    );
    Ok(body)
}

fn element_to_value(element: Element<'_>) -> Value {
    let mut map = Map::new();
    for attribute in element.attributes() {
        map.insert(
            format!("{ATTRIBUTE_PREFIX}{}", attribute.name().local_part()),
            Value::String(attribute.value().to_string()),
        );
    }

    let mut text = String::new();
    for child in element.children() {
        match child {
            ChildOfElement::Element(child) => {
                insert_child(
                    &mut map,
                    child.name().local_part(),
                    element_to_value(child),
                );
            }
            ChildOfElement::Text(t) => text.push_str(t.text()),
            _ => {}
        }
    }

    let text = text.trim();
    if map.is_empty() {
        return Value::String(text.to_string());
    }
    if !text.is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
    }
    Value::Object(map)
}

fn insert_child(map: &mut Map<String, Value>, name: &str, value: Value) {
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

fn fill_element<'d>(
    doc: &Document<'d>,
    element: Element<'d>,
    value: &Value,
) -> Result<(), XmlError> {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    ensure_name(attribute)?;
                    element.set_attribute_value(attribute, &scalar_text(value)?);
                } else if key == TEXT_KEY {
                    element.append_child(doc.create_text(&scalar_text(value)?));
                } else if let Value::Array(items) = value {
                    for item in items {
                        append_child_element(doc, element, key, item)?;
                    }
                } else {
                    append_child_element(doc, element, key, value)?;
                }
            }
            Ok(())
        }
        Value::Array(_) => Err(XmlError::Unsupported("a nested array")),
        scalar => {
            let text = scalar_text(scalar)?;
            if !text.is_empty() {
                element.append_child(doc.create_text(&text));
            }
            Ok(())
        }
    }
}

fn append_child_element<'d>(
    doc: &Document<'d>,
    parent: Element<'d>,
    name: &str,
    value: &Value,
) -> Result<(), XmlError> {
    ensure_name(name)?;
    let child = doc.create_element(name);
    parent.append_child(child);
    fill_element(doc, child, value)
}

fn scalar_text(value: &Value) -> Result<String, XmlError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => Err(XmlError::Unsupported("a structured attribute")),
    }
}

fn ensure_name(name: &str) -> Result<(), XmlError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(XmlError::InvalidName(name.to_string()))
    }
}
