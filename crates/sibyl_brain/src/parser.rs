//! Category file parser.
//!
//! Reads `<aiml>` documents (or bare `<category>` fragments, as produced by
//! `<learn>`) into [`Category`] values. Markup is first read into a small
//! generic tree, then categories are picked out of it.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sibyl_core::{Category, Node, PatternKey, Text};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed markup at byte {position}: {message}")]
    Markup { position: u64, message: String },

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("<category> without a <{0}> element")]
    MissingElement(&'static str),

    #[error("<topic> without a 'name' attribute")]
    UnnamedTopic,

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Generic markup tree
// ============================================================================

#[derive(Debug, Clone)]
enum Markup {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default)]
struct Element {
    name: String,
    attributes: BTreeMap<String, String>,
    children: Vec<Markup>,
}

impl Element {
    fn push_text(&mut self, text: &str) {
        if let Some(Markup::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Markup::Text(text.to_string()));
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|c| match c {
            Markup::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }
}

fn markup_error(reader: &Reader<&[u8]>, message: impl ToString) -> ParseError {
    ParseError::Markup {
        position: reader.error_position(),
        message: message.to_string(),
    }
}

fn open_element(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| markup_error(reader, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| markup_error(reader, e))?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn read_markup(source: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(source);
    let mut stack = vec![Element::default()];

    loop {
        let event = reader.read_event().map_err(|e| markup_error(&reader, e))?;
        match event {
            Event::Start(start) => {
                let element = open_element(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Markup::Element(element));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(markup_error(&reader, "unexpected closing tag"));
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Markup::Element(element));
                    }
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| markup_error(&reader, e))?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&text);
                }
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.pop().map(|e| e.name).unwrap_or_default();
        return Err(ParseError::Unclosed(open));
    }
    Ok(stack.pop().unwrap_or_default())
}

// ============================================================================
// Categories
// ============================================================================

/// Parse a document or fragment into categories.
///
/// Categories may appear at the top level, inside `<aiml>`, or inside
/// `<topic name="...">` (which sets their topic pattern). Any malformed
/// category fails the whole parse.
pub fn parse(source: &str) -> Result<Vec<Category>, ParseError> {
    let root = read_markup(source)?;
    let mut categories = Vec::new();
    collect(&root.children, "", &mut categories)?;
    Ok(categories)
}

pub fn parse_file(path: &Path) -> Result<Vec<Category>, ParseError> {
    let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&source)
}

fn collect(items: &[Markup], topic: &str, out: &mut Vec<Category>) -> Result<(), ParseError> {
    for item in items {
        let Markup::Element(element) = item else {
            continue;
        };
        match element.name.as_str() {
            "aiml" => collect(&element.children, topic, out)?,
            "topic" => {
                let name = element
                    .attributes
                    .get("name")
                    .ok_or(ParseError::UnnamedTopic)?;
                collect(&element.children, name, out)?;
            }
            "category" => out.push(category(element, topic)?),
            other => tracing::debug!("Ignoring <{}> outside of a category", other),
        }
    }
    Ok(())
}

fn category(element: &Element, topic: &str) -> Result<Category, ParseError> {
    let pattern = element
        .child("pattern")
        .ok_or(ParseError::MissingElement("pattern"))?;
    let template = element
        .child("template")
        .ok_or(ParseError::MissingElement("template"))?;
    let that = element.child("that").map(pattern_text).unwrap_or_default();

    Ok(Category {
        key: PatternKey::new(pattern_text(pattern), that, topic.trim()),
        template: Node::Template(nodes(&template.children, preserves(template, false))),
    })
}

/// Text of a pattern, with `<bot name="name"/>` standing for the bot's name.
fn pattern_text(element: &Element) -> String {
    let mut out = String::new();
    for child in &element.children {
        match child {
            Markup::Text(t) => out.push_str(t),
            Markup::Element(e) if e.name == "bot" => out.push_str(" BOT_NAME "),
            Markup::Element(e) => out.push_str(&pattern_text(e)),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn preserves(element: &Element, inherited: bool) -> bool {
    match element.attributes.get("xml:space").map(String::as_str) {
        Some("preserve") => true,
        Some("default") => false,
        _ => inherited,
    }
}

fn nodes(items: &[Markup], preserve: bool) -> Vec<Node> {
    items
        .iter()
        .map(|item| match item {
            Markup::Text(t) if preserve => Node::Text(Text::preserved(t.as_str())),
            Markup::Text(t) => Node::Text(Text::new(t.as_str())),
            Markup::Element(e) if e.name == "category" => verbatim(e),
            Markup::Element(e) => {
                let preserve = preserves(e, preserve);
                Node::element(&e.name, e.attributes.clone(), nodes(&e.children, preserve))
            }
        })
        .collect()
}

/// A category nested in a template (the payload of `<learn>`) is kept as
/// plain markup so it can be written back out. Only `<eval>` inside it is
/// interpreted.
fn verbatim(element: &Element) -> Node {
    let children = element
        .children
        .iter()
        .map(|item| match item {
            Markup::Text(t) => Node::Text(Text::preserved(t.as_str())),
            Markup::Element(e) if e.name == "eval" => {
                Node::Eval(nodes(&e.children, preserves(e, false)))
            }
            Markup::Element(e) => verbatim(e),
        })
        .collect();
    Node::Unknown {
        tag: element.name.clone(),
        attributes: element.attributes.clone(),
        children,
    }
}
