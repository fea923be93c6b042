//! Word-level substitution tables.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::text::capwords;
use crate::Substituter;

/// Replaces whole words or phrases in a single left-to-right pass.
///
/// Every inserted pair is registered in lower-case, capitalized and
/// upper-case form. Because all keys are compiled into one alternation,
/// a replacement is never itself substituted again, so swapping tables
/// such as `he -> she, she -> he` work.
#[derive(Debug, Default, Clone)]
pub struct WordSub {
    table: HashMap<String, String>,
    regex: OnceLock<Option<Regex>>,
}

impl WordSub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sub = Self::new();
        for (from, to) in pairs {
            sub.insert(from, to);
        }
        sub
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        self.table.insert(from.to_lowercase(), to.to_lowercase());
        self.table.insert(capwords(from), capwords(to));
        self.table.insert(from.to_uppercase(), to.to_uppercase());
        self.regex = OnceLock::new();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn compiled(&self) -> Option<&Regex> {
        self.regex
            .get_or_init(|| {
                if self.table.is_empty() {
                    return None;
                }
                // Longest keys first so multi-word phrases beat their prefixes.
                let mut keys: Vec<&String> = self.table.keys().collect();
                keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
                let alternation = keys
                    .iter()
                    .map(|k| word_pattern(k))
                    .collect::<Vec<_>>()
                    .join("|");
                match Regex::new(&alternation) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!("Failed to compile substitution table: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }
}

fn word_pattern(word: &str) -> String {
    let escaped = regex::escape(word);
    let starts_word = word.chars().next().is_some_and(is_word_char);
    let ends_word = word.chars().last().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Substituter for WordSub {
    fn sub(&self, text: &str) -> String {
        match self.compiled() {
            Some(re) => re
                .replace_all(text, |caps: &Captures| {
                    let found = &caps[0];
                    self.table
                        .get(found)
                        .cloned()
                        .unwrap_or_else(|| found.to_string())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }
}
