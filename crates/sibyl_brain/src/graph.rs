//! Word-graph matcher.
//!
//! Each learned key is stored as a path through three sections: the input
//! pattern, the `that` pattern and the topic pattern. An empty `that` or
//! topic is stored as `*`, so such categories match any context.
//!
//! At every branch the matcher tries, in order: `_`, the literal word,
//! the bot name, then `*`. Wildcards consume one or more words and are
//! recorded as captures for [`Matcher::star`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sibyl_core::{Matcher, Node, PatternKey, StarKind};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

/// Stands in for an empty `that` or topic so that only wildcards match it.
const EMPTY_CONTEXT: &str = "\u{0}EMPTY";
const BOT_NAME_TOKEN: &str = "BOT_NAME";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Segment {
    Word(String),
    Underscore,
    Star,
    BotName,
}

impl Segment {
    fn parse(word: &str) -> Self {
        match word {
            "_" => Segment::Underscore,
            "*" => Segment::Star,
            BOT_NAME_TOKEN => Segment::BotName,
            w => Segment::Word(w.to_uppercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Input = 0,
    That = 1,
    Topic = 2,
}

impl Section {
    fn next(self) -> Option<Section> {
        match self {
            Section::Input => Some(Section::That),
            Section::That => Some(Section::Topic),
            Section::Topic => None,
        }
    }
}

impl From<StarKind> for Section {
    fn from(kind: StarKind) -> Self {
        match kind {
            StarKind::Input => Section::Input,
            StarKind::That => Section::That,
            StarKind::Topic => Section::Topic,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Branch {
    children: HashMap<Segment, Branch>,
    /// Root of the following section, reached once this section's words run out.
    next_section: Option<Box<Branch>>,
    template: Option<Arc<Node>>,
}

#[derive(Debug, Clone, Copy)]
struct Capture {
    section: Section,
    start: usize,
    end: usize,
}

/// Words of one section: upper-cased for matching, original case for captures.
struct Words {
    upper: Vec<String>,
    original: Vec<String>,
}

impl Words {
    fn from_input(text: &str) -> Self {
        let cleaned: String = text
            .chars()
            .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
            .collect();
        let original: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
        let upper = original.iter().map(|w| w.to_uppercase()).collect();
        Self { upper, original }
    }

    fn from_context(text: &str) -> Self {
        let words = Self::from_input(text);
        if words.upper.is_empty() {
            Self {
                upper: vec![EMPTY_CONTEXT.to_string()],
                original: vec![String::new()],
            }
        } else {
            words
        }
    }
}

// ============================================================================
// PatternGraph
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PatternGraph {
    root: Branch,
    count: usize,
    bot_name: String,
}

impl PatternGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn section_branch<'b>(branch: &'b mut Branch, pattern: &str) -> &'b mut Branch {
        let words: Vec<&str> = pattern.split_whitespace().collect();
        let words = if words.is_empty() { vec!["*"] } else { words };
        let mut node = branch;
        for word in words {
            node = node.children.entry(Segment::parse(word)).or_default();
        }
        node
    }

    fn walk<'g>(
        &'g self,
        branch: &'g Branch,
        sections: &[Words; 3],
        section: Section,
        pos: usize,
        captures: &mut Vec<Capture>,
    ) -> Option<&'g Arc<Node>> {
        let words = &sections[section as usize].upper;
        if pos == words.len() {
            return match section.next() {
                Some(next) => {
                    let root = branch.next_section.as_deref()?;
                    self.walk(root, sections, next, 0, captures)
                }
                None => branch.template.as_ref(),
            };
        }

        if let Some(child) = branch.children.get(&Segment::Underscore) {
            if let Some(t) = self.wildcard(child, sections, section, pos, captures) {
                return Some(t);
            }
        }
        if let Some(child) = branch.children.get(&Segment::Word(words[pos].clone())) {
            if let Some(t) = self.walk(child, sections, section, pos + 1, captures) {
                return Some(t);
            }
        }
        if !self.bot_name.is_empty() && words[pos] == self.bot_name {
            if let Some(child) = branch.children.get(&Segment::BotName) {
                if let Some(t) = self.walk(child, sections, section, pos + 1, captures) {
                    return Some(t);
                }
            }
        }
        if let Some(child) = branch.children.get(&Segment::Star) {
            if let Some(t) = self.wildcard(child, sections, section, pos, captures) {
                return Some(t);
            }
        }
        None
    }

    /// Try every possible span (one word or more) for a wildcard at `pos`.
    fn wildcard<'g>(
        &'g self,
        child: &'g Branch,
        sections: &[Words; 3],
        section: Section,
        pos: usize,
        captures: &mut Vec<Capture>,
    ) -> Option<&'g Arc<Node>> {
        let len = sections[section as usize].upper.len();
        for end in pos + 1..=len {
            captures.push(Capture {
                section,
                start: pos,
                end,
            });
            if let Some(t) = self.walk(child, sections, section, end, captures) {
                return Some(t);
            }
            captures.pop();
        }
        None
    }

    fn resolve(&self, input: &str, that: &str, topic: &str) -> Option<(Arc<Node>, Vec<Capture>, [Words; 3])> {
        let sections = [
            Words::from_input(input),
            Words::from_context(that),
            Words::from_context(topic),
        ];
        if sections[0].upper.is_empty() {
            return None;
        }
        let mut captures = Vec::new();
        let template = self
            .walk(&self.root, &sections, Section::Input, 0, &mut captures)?
            .clone();
        Some((template, captures, sections))
    }
}

impl Matcher for PatternGraph {
    fn add(&mut self, key: PatternKey, template: Arc<Node>) {
        let mut node = Self::section_branch(&mut self.root, &key.pattern);
        for pattern in [&key.that, &key.topic] {
            let next = node.next_section.get_or_insert_with(Box::default);
            node = Self::section_branch(next, pattern);
        }
        if node.template.replace(template).is_none() {
            self.count += 1;
        }
    }

    fn find(&self, input: &str, that: &str, topic: &str) -> Option<Arc<Node>> {
        self.resolve(input, that, topic).map(|(template, _, _)| template)
    }

    fn star(&self, kind: StarKind, input: &str, that: &str, topic: &str, index: usize) -> String {
        let Some((_, captures, sections)) = self.resolve(input, that, topic) else {
            return String::new();
        };
        let section = Section::from(kind);
        let Some(capture) = captures
            .iter()
            .filter(|c| c.section == section)
            .nth(index.saturating_sub(1))
        else {
            return String::new();
        };
        sections[section as usize].original[capture.start..capture.end].join(" ")
    }

    fn count(&self) -> usize {
        self.count
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create brain file: {}", path.display()))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write brain to {}", path.display()))?;
        Ok(())
    }

    fn restore(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open brain file: {}", path.display()))?;
        let restored: PatternGraph = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("Failed to read brain from {}", path.display()))?;
        *self = restored;
        Ok(())
    }

    fn set_bot_name(&mut self, name: &str) {
        self.bot_name = name.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    }
}
