//! Minimal XML element tree on top of quick-xml
//!
//! XML-RPC responses and the RSS feed are small, so both are read into a
//! tree first and interpreted afterwards.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, YolkError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of a child element, trimmed; empty when the child is missing
    pub fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default()
    }
}

fn malformed(what: &str, err: impl std::fmt::Display) -> YolkError {
    YolkError::registry(format!("malformed {what}: {err}"))
}

/// Parse a document and return its root element
pub(crate) fn parse(xml: &str, what: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = vec![Element::new("#document")];

    loop {
        match reader.read_event().map_err(|e| malformed(what, e))? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
                stack.push(Element::new(name));
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.local_name().as_ref()).to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Element::new(name));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(what, "unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Err(malformed(what, "unbalanced end tag")),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| malformed(what, e))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(malformed(what, "unexpected end of document"));
    }

    stack
        .pop()
        .and_then(|document| document.children.into_iter().next())
        .ok_or_else(|| malformed(what, "empty document"))
}
