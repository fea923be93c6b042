use crate::{Kernel, Request};
use anyhow::Result;
use sibyl_core::Node;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// CommandHandler trait
// ============================================================================

/// A host-provided command reachable from `<system>` by a dotted name.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Produce the text that replaces the `<system>` element.
    async fn parse(&self, kernel: &Kernel, request: &Request, node: &Node) -> Result<String>;

    /// Called after a successful `parse`.
    fn complete(&self) {}
}

// ============================================================================
// CommandRegistry
// ============================================================================

#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Overwrites any existing handler with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        let name = name.into();
        tracing::debug!("Registered command: {}", name);
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dotted identifiers name registered commands; anything with a path
    /// separator is a shell command line.
    pub fn is_namespaced(command: &str) -> bool {
        command.contains('.') && !command.contains('/')
    }
}
