//! Generic XML to mapping conversion.
//!
//! Documents are converted into a [`serde_json::Value`] tree using the familiar
//! "xmltodict" layout:
//!
//! - the root element becomes a single-key object `{name: content}`
//! - attributes are stored as `@name` keys
//! - an element with only text becomes a string, an empty element becomes `null`
//! - text next to attributes or children is stored under `#text`
//! - repeated sibling elements collapse into an array
//!
//! Whitespace around text is trimmed and whitespace-only text is dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons an XML document cannot be converted
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("invalid attribute: {0}")]
    Attribute(String),

    #[error("no element found")]
    NoRoot,

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("text outside of the document element")]
    TextOutsideRoot,

    #[error("junk after document element")]
    TrailingContent,
}

struct Element {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Attribute(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(format!("@{}", key), Value::String(value));
        }

        Ok(Self {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();

        if self.attributes.is_empty() && self.children.is_empty() {
            let value = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
            return (self.name, value);
        }

        let mut map = self.attributes;
        for (key, value) in self.children {
            insert_child(&mut map, key, value);
        }
        if !text.is_empty() {
            map.insert("#text".to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(map))
    }
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Convert an XML document to a mapping tree
pub fn to_value(input: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                stack.push(Element::open(&start)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                let (name, value) = Element::open(&start)?.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::End(_) => {
                let element = stack.pop().ok_or(XmlError::TrailingContent)?;
                let (name, value) = element.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                push_text(&mut stack, &root, &text)?;
            }
            Event::CData(data) => {
                let data = data.into_inner();
                push_text(&mut stack, &root, &String::from_utf8_lossy(&data))?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }

    let (name, value) = root.ok_or(XmlError::NoRoot)?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) {
    match stack.last_mut() {
        Some(parent) => insert_child(&mut parent.children, name, value),
        None => *root = Some((name, value)),
    }
}

fn push_text(
    stack: &mut [Element],
    root: &Option<(String, Value)>,
    text: &str,
) -> Result<(), XmlError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None if root.is_some() => Err(XmlError::TrailingContent),
        None => Err(XmlError::TextOutsideRoot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_esearch_result() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult>
    <Count>1</Count>
    <RetMax>1</RetMax>
    <RetStart>0</RetStart>
    <IdList>
        <Id>37035178</Id>
    </IdList>
    <TranslationSet/>
    <QueryTranslation>10.1038/s41586-023-05898-0[DOI]</QueryTranslation>
</eSearchResult>"#;

        let value = to_value(xml).unwrap();
        assert_eq!(value["eSearchResult"]["Count"], json!("1"));
        assert_eq!(value["eSearchResult"]["IdList"]["Id"], json!("37035178"));
        assert_eq!(value["eSearchResult"]["TranslationSet"], Value::Null);
    }

    #[test]
    fn test_attributes_and_text() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><link href="http://arxiv.org/abs/1" rel="alternate"/><title type="html">Paper &amp; co</title></feed>"#;

        let value = to_value(xml).unwrap();
        assert_eq!(
            value,
            json!({
                "feed": {
                    "@xmlns": "http://www.w3.org/2005/Atom",
                    "link": {"@href": "http://arxiv.org/abs/1", "@rel": "alternate"},
                    "title": {"@type": "html", "#text": "Paper & co"}
                }
            })
        );
    }

    #[test]
    fn test_repeated_siblings_become_array() {
        let value = to_value("<IdList><Id>1</Id><Id>2</Id><Id>3</Id></IdList>").unwrap();
        assert_eq!(value, json!({"IdList": {"Id": ["1", "2", "3"]}}));
    }

    #[test]
    fn test_cdata() {
        let value = to_value("<summary><![CDATA[a < b]]></summary>").unwrap();
        assert_eq!(value, json!({"summary": "a < b"}));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(to_value(""), Err(XmlError::NoRoot)));
        assert!(matches!(to_value("not xml at all"), Err(XmlError::TextOutsideRoot)));
        assert!(matches!(to_value("<a><b></b>"), Err(XmlError::Unclosed(name)) if name == "a"));
        assert!(matches!(to_value("<a/><b/>"), Err(XmlError::TrailingContent)));
        assert!(to_value("<a><b></a>").is_err());
        assert!(to_value("<a>&bogus;</a>").is_err());
    }
}
