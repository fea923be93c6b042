//! Template node tree.
//!
//! Parsers build templates through [`Node::element`], which maps a tag name
//! and its attribute map onto a typed variant. Tags the interpreter does not
//! know become [`Node::Unknown`] and keep their raw attributes and children.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::text::collapse_whitespace;

// ============================================================================
// Text
// ============================================================================

/// Literal text inside a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Text {
    raw: String,
    preserve: bool,
    #[serde(skip)]
    collapsed: OnceLock<String>,
}

impl Text {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            preserve: false,
            collapsed: OnceLock::new(),
        }
    }

    /// Text whose whitespace is emitted verbatim.
    pub fn preserved(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            preserve: true,
            collapsed: OnceLock::new(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True when the text is emitted verbatim, either because it was parsed
    /// that way or because its collapsed form has already been computed.
    pub fn is_preserved(&self) -> bool {
        self.preserve || self.collapsed.get().is_some()
    }

    /// The literal as the interpreter emits it. Whitespace runs are collapsed
    /// the first time this is called; later calls reuse that result.
    pub fn render(&self) -> &str {
        if self.preserve {
            return &self.raw;
        }
        self.collapsed.get_or_init(|| collapse_whitespace(&self.raw))
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.preserve == other.preserve
    }
}

// ============================================================================
// Attribute-carrying parts
// ============================================================================

/// `<li>` inside `<condition>` or `<random>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub name: Option<String>,
    pub value: Option<String>,
    pub children: Vec<Node>,
}

impl ListItem {
    /// An item with neither `name` nor `value` is a default branch.
    pub fn is_default(&self) -> bool {
        self.name.is_none() && self.value.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: Option<String>,
    pub value: Option<String>,
    pub children: Vec<Node>,
}

impl Condition {
    /// The `<li>` children, in order. Other children are ignored.
    pub fn items(&self) -> Vec<&ListItem> {
        self.children
            .iter()
            .filter_map(|c| match c {
                Node::Li(item) => Some(item),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Node
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Text(Text),
    Template(Vec<Node>),
    Eval(Vec<Node>),

    Bot { name: String },
    Get { name: String },
    Set { name: String, children: Vec<Node> },

    Condition(Condition),
    Li(ListItem),
    Random(Vec<Node>),

    Input { index: usize },
    That { index: usize },
    Star { index: usize },
    ThatStar { index: usize },
    TopicStar { index: usize },

    Srai(Vec<Node>),
    Sr,

    Formal(Vec<Node>),
    Sentence(Vec<Node>),
    Lowercase(Vec<Node>),
    Uppercase(Vec<Node>),
    Person(Vec<Node>),
    Person2(Vec<Node>),
    Gender(Vec<Node>),

    Think(Vec<Node>),
    Gossip(Vec<Node>),
    Javascript(Vec<Node>),

    Id,
    Size,
    Version,
    Date,

    Learn(Vec<Node>),
    System(Vec<Node>),
    Br,

    Unknown {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text(raw: impl Into<String>) -> Self {
        Node::Text(Text::new(raw))
    }

    pub fn star(index: usize) -> Self {
        Node::Star { index }
    }

    /// Build a node from a tag name, its attributes and its parsed children.
    pub fn element(tag: &str, attributes: BTreeMap<String, String>, children: Vec<Node>) -> Self {
        let attr = |key: &str| attributes.get(key).cloned();
        let required = |key: &str| match attributes.get(key) {
            Some(v) => v.clone(),
            None => {
                tracing::warn!("<{}> element is missing its '{}' attribute", tag, key);
                String::new()
            }
        };
        let index = || parse_index(tag, attributes.get("index").map(String::as_str));

        match tag {
            "template" => Node::Template(children),
            "eval" => Node::Eval(children),
            "bot" => Node::Bot { name: required("name") },
            "get" => Node::Get { name: required("name") },
            "set" => Node::Set {
                name: required("name"),
                children,
            },
            "condition" => Node::Condition(Condition {
                name: attr("name"),
                value: attr("value"),
                children,
            }),
            "li" => Node::Li(ListItem {
                name: attr("name"),
                value: attr("value"),
                children,
            }),
            "random" => Node::Random(children),
            "input" => Node::Input { index: index() },
            "that" => Node::That { index: index() },
            "star" => Node::Star { index: index() },
            "thatstar" => Node::ThatStar { index: index() },
            "topicstar" => Node::TopicStar { index: index() },
            "srai" => Node::Srai(children),
            "sr" => Node::Sr,
            "formal" => Node::Formal(children),
            "sentence" => Node::Sentence(children),
            "lowercase" => Node::Lowercase(children),
            "uppercase" => Node::Uppercase(children),
            "person" => Node::Person(children),
            "person2" => Node::Person2(children),
            "gender" => Node::Gender(children),
            "think" => Node::Think(children),
            "gossip" => Node::Gossip(children),
            "javascript" => Node::Javascript(children),
            "id" => Node::Id,
            "size" => Node::Size,
            "version" => Node::Version,
            "date" => Node::Date,
            "learn" => Node::Learn(children),
            "system" => Node::System(children),
            "html:br" => Node::Br,
            _ => Node::Unknown {
                tag: tag.to_string(),
                attributes,
                children,
            },
        }
    }

    /// The tag name this node was parsed from (`text` for literals).
    pub fn kind(&self) -> &str {
        match self {
            Node::Text(_) => "text",
            Node::Template(_) => "template",
            Node::Eval(_) => "eval",
            Node::Bot { .. } => "bot",
            Node::Get { .. } => "get",
            Node::Set { .. } => "set",
            Node::Condition(_) => "condition",
            Node::Li(_) => "li",
            Node::Random(_) => "random",
            Node::Input { .. } => "input",
            Node::That { .. } => "that",
            Node::Star { .. } => "star",
            Node::ThatStar { .. } => "thatstar",
            Node::TopicStar { .. } => "topicstar",
            Node::Srai(_) => "srai",
            Node::Sr => "sr",
            Node::Formal(_) => "formal",
            Node::Sentence(_) => "sentence",
            Node::Lowercase(_) => "lowercase",
            Node::Uppercase(_) => "uppercase",
            Node::Person(_) => "person",
            Node::Person2(_) => "person2",
            Node::Gender(_) => "gender",
            Node::Think(_) => "think",
            Node::Gossip(_) => "gossip",
            Node::Javascript(_) => "javascript",
            Node::Id => "id",
            Node::Size => "size",
            Node::Version => "version",
            Node::Date => "date",
            Node::Learn(_) => "learn",
            Node::System(_) => "system",
            Node::Br => "html:br",
            Node::Unknown { tag, .. } => tag,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Template(c)
            | Node::Eval(c)
            | Node::Random(c)
            | Node::Srai(c)
            | Node::Formal(c)
            | Node::Sentence(c)
            | Node::Lowercase(c)
            | Node::Uppercase(c)
            | Node::Person(c)
            | Node::Person2(c)
            | Node::Gender(c)
            | Node::Think(c)
            | Node::Gossip(c)
            | Node::Javascript(c)
            | Node::Learn(c)
            | Node::System(c) => c,
            Node::Set { children, .. } | Node::Unknown { children, .. } => children,
            Node::Condition(c) => &c.children,
            Node::Li(item) => &item.children,
            _ => &[],
        }
    }

    /// The attribute map as it would appear in markup.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        let mut put = |k: &str, v: Option<&String>| {
            if let Some(v) = v {
                attrs.insert(k.to_string(), v.clone());
            }
        };
        match self {
            Node::Bot { name } | Node::Get { name } | Node::Set { name, .. } => {
                put("name", Some(name))
            }
            Node::Condition(c) => {
                put("name", c.name.as_ref());
                put("value", c.value.as_ref());
            }
            Node::Li(item) => {
                put("name", item.name.as_ref());
                put("value", item.value.as_ref());
            }
            Node::Input { index }
            | Node::That { index }
            | Node::Star { index }
            | Node::ThatStar { index }
            | Node::TopicStar { index } => put("index", Some(&index.to_string())),
            Node::Unknown { attributes, .. } => return attributes.clone(),
            _ => {}
        }
        attrs
    }
}

/// Parse a 1-based `index` attribute. `that` allows an `x,y` form of which
/// only `x` is used. Missing or unusable values fall back to 1.
fn parse_index(tag: &str, raw: Option<&str>) -> usize {
    let Some(raw) = raw else { return 1 };
    let first = raw.split(',').next().unwrap_or(raw).trim();
    match first.parse::<usize>() {
        Ok(n) if n >= 1 => n,
        _ => {
            tracing::warn!("Invalid index '{}' on <{}>, using 1", raw, tag);
            1
        }
    }
}

/// Escape the five markup-significant characters.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
