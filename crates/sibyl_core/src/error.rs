use thiserror::Error;

/// Everything that can go wrong while producing a response.
///
/// Only [`KernelError::is_fatal`] variants reach the caller of `respond`.
/// The rest are logged where they happen and replaced by text.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("no match found for input: {0}")]
    NoMatch(String),

    #[error("maximum recursion depth {limit} exceeded (input='{input}')")]
    RecursionLimitExceeded { limit: usize, input: String },

    #[error("no handler found for <{0}> element")]
    UnknownTag(String),

    #[error("no such index {index} while processing <{tag}> element")]
    HistoryIndexOutOfRange { tag: &'static str, index: usize },

    #[error("predicate '{0}' is not set")]
    MissingPredicate(String),

    #[error("skipping <li> in <condition>: {0}")]
    MalformedConditionAttributes(String),

    #[error("failed to load knowledge from {origin}: {reason}")]
    KnowledgeParseFailure { origin: String, reason: String },

    #[error("command '{command}' failed: {reason}")]
    CommandExecutionFailure { command: String, reason: String },

    #[error("input is not valid UTF-8, decoded lossily")]
    EncodingFailure,

    #[error("recursion stack for session '{session}' holds {depth} entries outside of a response")]
    RecursionStackImbalance { session: String, depth: usize },
}

impl KernelError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, KernelError::RecursionStackImbalance { .. })
    }
}
