//! Per-session predicates and histories, plus the bot-wide predicate table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Id of the session that always exists.
pub const GLOBAL_SESSION_ID: &str = "_global";

#[derive(Debug, Clone, Default)]
pub struct Session {
    predicates: HashMap<String, String>,
    input_history: VecDeque<String>,
    output_history: VecDeque<String>,
    recursion_stack: Vec<String>,
}

/// Deep copy of one session for inspection by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub predicates: BTreeMap<String, String>,
    pub input_history: Vec<String>,
    pub output_history: Vec<String>,
    pub recursion_stack: Vec<String>,
}

impl From<&Session> for SessionSnapshot {
    fn from(s: &Session) -> Self {
        Self {
            predicates: s
                .predicates
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            input_history: s.input_history.iter().cloned().collect(),
            output_history: s.output_history.iter().cloned().collect(),
            recursion_stack: s.recursion_stack.clone(),
        }
    }
}

fn push_bounded(history: &mut VecDeque<String>, entry: &str, max: usize) {
    history.push_back(entry.to_string());
    while history.len() > max {
        history.pop_front();
    }
}

/// `index` counts back from the newest entry, starting at 1.
fn nth_newest(history: &VecDeque<String>, index: usize) -> Option<String> {
    if index == 0 || index > history.len() {
        return None;
    }
    history.get(history.len() - index).cloned()
}

// ============================================================================
// SessionStore
// ============================================================================

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(GLOBAL_SESSION_ID.to_string(), Session::default());
        Self {
            sessions: RwLock::new(sessions),
            max_history,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.write();
        f(sessions.entry(id.to_string()).or_default())
    }

    /// Create the session if it does not exist yet.
    pub fn add_session(&self, id: &str) {
        self.write().entry(id.to_string()).or_default();
    }

    /// Remove a session. The global session cannot be removed.
    pub fn delete_session(&self, id: &str) -> bool {
        if id == GLOBAL_SESSION_ID {
            return false;
        }
        self.write().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// `None` when the session or the predicate is missing.
    pub fn predicate(&self, name: &str, id: &str) -> Option<String> {
        self.read()
            .get(id)
            .and_then(|s| s.predicates.get(name))
            .cloned()
    }

    pub fn get_predicate(&self, name: &str, id: &str) -> String {
        self.predicate(name, id).unwrap_or_default()
    }

    pub fn set_predicate(&self, name: &str, value: &str, id: &str) {
        self.with_session(id, |s| {
            s.predicates.insert(name.to_string(), value.to_string());
        });
    }

    pub fn push_input(&self, id: &str, input: &str) {
        let max = self.max_history;
        self.with_session(id, |s| push_bounded(&mut s.input_history, input, max));
    }

    pub fn push_output(&self, id: &str, output: &str) {
        let max = self.max_history;
        self.with_session(id, |s| push_bounded(&mut s.output_history, output, max));
    }

    pub fn input(&self, id: &str, index: usize) -> Option<String> {
        self.read()
            .get(id)
            .and_then(|s| nth_newest(&s.input_history, index))
    }

    pub fn output(&self, id: &str, index: usize) -> Option<String> {
        self.read()
            .get(id)
            .and_then(|s| nth_newest(&s.output_history, index))
    }

    /// The most recent bot output, or `""` before the first one.
    pub fn last_output(&self, id: &str) -> String {
        self.output(id, 1).unwrap_or_default()
    }

    /// Push `input` onto the recursion stack and return a frame that pops it
    /// when dropped, including when the evaluating future is cancelled or
    /// unwinds.
    pub fn enter<'a>(&'a self, id: &'a str, input: &str) -> RecursionFrame<'a> {
        self.push_recursion(id, input);
        RecursionFrame { store: self, id }
    }

    pub fn push_recursion(&self, id: &str, input: &str) {
        self.with_session(id, |s| s.recursion_stack.push(input.to_string()));
    }

    pub fn pop_recursion(&self, id: &str) -> Option<String> {
        self.with_session(id, |s| s.recursion_stack.pop())
    }

    pub fn recursion_depth(&self, id: &str) -> usize {
        self.read()
            .get(id)
            .map(|s| s.recursion_stack.len())
            .unwrap_or(0)
    }

    /// The innermost input currently being evaluated.
    pub fn current_input(&self, id: &str) -> Option<String> {
        self.read()
            .get(id)
            .and_then(|s| s.recursion_stack.last().cloned())
    }

    pub fn clear_recursion(&self, id: &str) {
        if let Some(s) = self.write().get_mut(id) {
            s.recursion_stack.clear();
        }
    }

    /// Deep copy of one session (`Some(id)`) or all sessions (`None`).
    /// A missing session yields an empty map.
    pub fn snapshot(&self, id: Option<&str>) -> BTreeMap<String, SessionSnapshot> {
        let sessions = self.read();
        match id {
            Some(id) => sessions
                .get(id)
                .map(|s| (id.to_string(), SessionSnapshot::from(s)))
                .into_iter()
                .collect(),
            None => sessions
                .iter()
                .map(|(k, s)| (k.clone(), SessionSnapshot::from(s)))
                .collect(),
        }
    }
}

/// One entry on a session's recursion stack; see [`SessionStore::enter`].
#[must_use = "the entry is popped as soon as the frame is dropped"]
pub struct RecursionFrame<'a> {
    store: &'a SessionStore,
    id: &'a str,
}

impl Drop for RecursionFrame<'_> {
    fn drop(&mut self) {
        self.store.pop_recursion(self.id);
    }
}

// ============================================================================
// BotPredicates
// ============================================================================

/// Process-wide facts about the bot. Only the host writes these.
#[derive(Default)]
pub struct BotPredicates {
    values: RwLock<HashMap<String, String>>,
}

impl BotPredicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> String {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&self, name: &str, value: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }
}
