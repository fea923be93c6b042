pub mod config;
pub mod error;
pub mod node;
pub mod session;
pub mod subs;
pub mod text;
pub mod wordsub;

pub use config::{LockPolicy, SibylConfig};
pub use error::KernelError;
pub use node::{Condition, ListItem, Node, Text};
pub use session::{
    BotPredicates, RecursionFrame, SessionSnapshot, SessionStore, GLOBAL_SESSION_ID,
};
pub use wordsub::WordSub;

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// The (input, that, topic) patterns a category is learned under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternKey {
    pub pattern: String,
    pub that: String,
    pub topic: String,
}

impl PatternKey {
    pub fn new(pattern: impl Into<String>, that: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            that: that.into(),
            topic: topic.into(),
        }
    }

    /// A key with only an input pattern.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::new(pattern, "", "")
    }
}

/// A learned key and the template it answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub key: PatternKey,
    pub template: Node,
}

/// Which pattern of the matched category a wildcard capture comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StarKind {
    Input,
    That,
    Topic,
}

/// Indexes learned categories and resolves input to a template.
pub trait Matcher: Send + Sync {
    /// Learn a category. Adding an existing key replaces its template.
    fn add(&mut self, key: PatternKey, template: Arc<Node>);

    /// The template for this (input, that, topic) triple, if any.
    fn find(&self, input: &str, that: &str, topic: &str) -> Option<Arc<Node>>;

    /// The `index`-th (1-based) wildcard capture of the `kind` pattern of the
    /// category that `find` would return for the same triple. `""` if none.
    fn star(&self, kind: StarKind, input: &str, that: &str, topic: &str, index: usize) -> String;

    /// Number of learned categories.
    fn count(&self) -> usize;

    fn save(&self, path: &Path) -> anyhow::Result<()>;

    /// Replace the current contents with a saved brain.
    fn restore(&mut self, path: &Path) -> anyhow::Result<()>;

    fn set_bot_name(&mut self, name: &str);
}

/// Word or phrase replacement applied to free text.
pub trait Substituter: Send + Sync + Debug {
    fn sub(&self, text: &str) -> String;
}
