use crate::command::{CommandHandler, CommandRegistry};
use crate::events::{EventSink, KernelEvent};
use crate::gate::RespondGate;
use crate::Request;
use anyhow::{Context, Result};
use sibyl_brain::{read_categories, ParseError, PatternGraph};
use sibyl_core::config::{KernelConfig, SystemConfig};
use sibyl_core::subs::{self, default_substituter};
use sibyl_core::text::sentences;
use sibyl_core::{
    BotPredicates, KernelError, Matcher, PatternKey, SessionSnapshot, SessionStore, SibylConfig,
    Substituter, WordSub,
};
use sibyl_os::{Executor, LocalExecutor};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// What a call to [`Kernel::learn`] did.
#[derive(Debug, Default)]
pub struct Learned {
    pub files: Vec<PathBuf>,
    pub categories: usize,
    pub failures: Vec<(PathBuf, String)>,
}

fn fresh_matcher<M: Matcher + Default + 'static>() -> Box<dyn Matcher> {
    Box::new(M::default())
}

/// The response generator: knowledge, sessions, bot facts and the
/// interpreter that ties them together.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) system: SystemConfig,
    pub(crate) sessions: SessionStore,
    pub(crate) bot: BotPredicates,
    brain: RwLock<Box<dyn Matcher>>,
    new_brain: fn() -> Box<dyn Matcher>,
    subbers: RwLock<HashMap<String, Arc<dyn Substituter>>>,
    pub(crate) commands: CommandRegistry,
    pub(crate) executor: Arc<dyn Executor>,
    gate: RespondGate,
    events: EventSink,
}

impl Kernel {
    pub fn new(config: &SibylConfig) -> Self {
        let mut subbers: HashMap<String, Arc<dyn Substituter>> = HashMap::new();
        for name in [subs::NORMAL, subs::GENDER, subs::PERSON, subs::PERSON2] {
            if let Some(sub) = default_substituter(name) {
                subbers.insert(name.to_string(), Arc::new(sub));
            }
        }

        let kernel = Self {
            config: config.kernel.clone(),
            system: config.system.clone(),
            sessions: SessionStore::new(config.kernel.max_history),
            bot: BotPredicates::new(),
            brain: RwLock::new(fresh_matcher::<PatternGraph>()),
            new_brain: fresh_matcher::<PatternGraph>,
            subbers: RwLock::new(subbers),
            commands: CommandRegistry::new(),
            executor: Arc::new(LocalExecutor::with_timeout(Duration::from_secs(
                config.system.timeout_secs,
            ))),
            gate: RespondGate::new(config.kernel.session_lock),
            events: EventSink::default(),
        };

        kernel.set_bot_predicate("name", "Nameless");
        for (name, value) in &config.kernel.bot {
            kernel.set_bot_predicate(name, value);
        }
        kernel
    }

    /// Swap in a different matcher. Any learned categories are discarded.
    pub fn with_matcher<M: Matcher + Default + 'static>(mut self) -> Self {
        self.new_brain = fresh_matcher::<M>;
        self.reset_brain();
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Start publishing [`KernelEvent`]s for every `respond` call. A second
    /// call replaces the previous receiver.
    pub fn subscribe(&mut self) -> tokio::sync::mpsc::Receiver<KernelEvent> {
        self.events.subscribe()
    }

    pub fn register_command(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.commands.register(name, handler);
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Restore a saved brain, learn files, then answer each command in the
    /// global session.
    pub async fn bootstrap(
        &self,
        brain_file: Option<&Path>,
        learn: &[String],
        commands: &[String],
    ) -> Result<()> {
        let start = Instant::now();
        if let Some(path) = brain_file {
            self.load_brain(path)?;
        }
        for pattern in learn {
            self.learn(pattern);
        }
        let request = Request::global();
        for command in commands {
            let response = self.respond(&request, command).await?;
            tracing::info!("{} -> {}", command, response);
        }
        if !self.commands.is_empty() {
            tracing::info!("{} <system> commands registered", self.commands.len());
        }
        tracing::info!(
            "Kernel bootstrap completed in {:.2?} ({} categories)",
            start.elapsed(),
            self.num_categories()
        );
        Ok(())
    }

    // ========================================================================
    // Knowledge
    // ========================================================================

    fn brain(&self) -> RwLockReadGuard<'_, Box<dyn Matcher>> {
        self.brain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn brain_mut(&self) -> RwLockWriteGuard<'_, Box<dyn Matcher>> {
        self.brain.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn find(&self, input: &str, that: &str, topic: &str) -> Option<Arc<sibyl_core::Node>> {
        self.brain().find(input, that, topic)
    }

    pub(crate) fn star(
        &self,
        kind: sibyl_core::StarKind,
        input: &str,
        that: &str,
        topic: &str,
        index: usize,
    ) -> String {
        self.brain().star(kind, input, that, topic, index)
    }

    /// Learn every file matching `pattern`. Files that fail to parse are
    /// logged and skipped.
    pub fn learn(&self, pattern: &str) -> Learned {
        let start = Instant::now();
        let report = read_categories(pattern);
        if report.files.is_empty() {
            tracing::warn!("No knowledge files match {}", pattern);
        }

        let categories = report.categories.len();
        {
            let mut brain = self.brain_mut();
            for category in report.categories {
                brain.add(category.key, Arc::new(category.template));
            }
        }

        let failures = report
            .failures
            .into_iter()
            .map(|(path, e)| {
                let err = KernelError::KnowledgeParseFailure {
                    origin: path.display().to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!("{}", err);
                (path, e.to_string())
            })
            .collect();

        tracing::info!(
            "Learned {} categories from {} in {:.2?}",
            categories,
            pattern,
            start.elapsed()
        );
        Learned {
            files: report.files,
            categories,
            failures,
        }
    }

    /// Learn categories from markup held in memory.
    pub fn learn_str(&self, payload: &str) -> Result<usize, ParseError> {
        let categories = sibyl_brain::parse(payload)?;
        let count = categories.len();
        let mut brain = self.brain_mut();
        for category in categories {
            brain.add(category.key, Arc::new(category.template));
        }
        Ok(count)
    }

    /// Learn a single category directly.
    pub fn add_category(&self, key: PatternKey, template: sibyl_core::Node) {
        self.brain_mut().add(key, Arc::new(template));
    }

    pub fn num_categories(&self) -> usize {
        self.brain().count()
    }

    pub fn save_brain(&self, path: &Path) -> Result<()> {
        let start = Instant::now();
        self.brain()
            .save(path)
            .with_context(|| format!("Failed to save brain to {}", path.display()))?;
        tracing::info!("Saved brain to {} in {:.2?}", path.display(), start.elapsed());
        Ok(())
    }

    /// Replace the current knowledge with a saved brain.
    pub fn load_brain(&self, path: &Path) -> Result<()> {
        let start = Instant::now();
        let name = self.bot.get("name");
        let mut brain = self.brain_mut();
        brain
            .restore(path)
            .with_context(|| format!("Failed to load brain from {}", path.display()))?;
        brain.set_bot_name(&name);
        tracing::info!(
            "Loaded brain from {} ({} categories) in {:.2?}",
            path.display(),
            brain.count(),
            start.elapsed()
        );
        Ok(())
    }

    /// Forget every learned category.
    pub fn reset_brain(&self) {
        let mut fresh = (self.new_brain)();
        fresh.set_bot_name(&self.bot.get("name"));
        *self.brain_mut() = fresh;
    }

    // ========================================================================
    // Substitutions
    // ========================================================================

    pub fn set_substituter(&self, name: &str, sub: Arc<dyn Substituter>) {
        self.subbers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), sub);
    }

    /// Load substitution tables from a TOML file. Each table replaces the
    /// substituter of the same name:
    ///
    /// ```toml
    /// [gender]
    /// he = "she"
    /// she = "he"
    /// ```
    pub fn load_subs(&self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read substitutions file: {}", path.display()))?;
        let tables: BTreeMap<String, BTreeMap<String, String>> = toml::from_str(&content)
            .with_context(|| format!("Failed to parse substitutions file: {}", path.display()))?;
        for (name, table) in tables {
            let sub = WordSub::from_pairs(table.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            tracing::debug!("Loaded {} substitutions for '{}'", sub.len(), name);
            self.set_substituter(&name, Arc::new(sub));
        }
        Ok(())
    }

    pub(crate) fn substitute(&self, name: &str, text: &str) -> String {
        let sub = self
            .subbers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        match sub {
            Some(sub) => sub.sub(text),
            None => {
                tracing::warn!("No '{}' substituter registered", name);
                text.to_string()
            }
        }
    }

    // ========================================================================
    // Predicates and sessions
    // ========================================================================

    pub fn get_predicate(&self, name: &str, session_id: &str) -> String {
        self.sessions.get_predicate(name, session_id)
    }

    pub fn set_predicate(&self, name: &str, value: &str, session_id: &str) {
        self.sessions.set_predicate(name, value, session_id);
    }

    pub fn get_bot_predicate(&self, name: &str) -> String {
        self.bot.get(name)
    }

    /// Set a bot predicate. Setting `name` also teaches the matcher the
    /// bot's name.
    pub fn set_bot_predicate(&self, name: &str, value: &str) {
        self.bot.set(name, value);
        if name == "name" {
            self.brain_mut().set_bot_name(value);
        }
    }

    pub fn add_session(&self, session_id: &str) {
        if !self.sessions.contains(session_id) {
            tracing::debug!("Opening session {}", session_id);
        }
        self.sessions.add_session(session_id);
    }

    /// Remove a session and its respond lock. The global session stays.
    pub fn delete_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.delete_session(session_id);
        if removed {
            self.gate.forget(session_id);
            tracing::debug!(
                "Deleted session {} ({} session locks left)",
                session_id,
                self.gate.tracked_sessions()
            );
        }
        removed
    }

    /// Deep copy of one session's state, or of all sessions.
    pub fn session_data(&self, session_id: Option<&str>) -> BTreeMap<String, SessionSnapshot> {
        self.sessions.snapshot(session_id)
    }

    // ========================================================================
    // Responding
    // ========================================================================

    /// Answer `input` in the request's session.
    ///
    /// The input is split into sentences, each answered in turn and recorded
    /// in the session history. Only a broken recursion invariant is returned
    /// as an error; everything else degrades to text.
    pub async fn respond(&self, request: &Request, input: &str) -> Result<String> {
        if input.is_empty() {
            return Ok(String::new());
        }
        let session = request.session_id();
        self.events.emit(KernelEvent::PersonSpeaks {
            session_id: session.to_string(),
            input: input.to_string(),
        });
        let guard = self.gate.acquire(session).await;
        self.add_session(session);

        let mut responses = Vec::new();
        for sentence in sentences(input) {
            self.sessions.push_input(session, &sentence);
            let response = self.evaluate_sentence(&sentence, request).await;
            self.sessions.push_output(session, &response);
            responses.push(response);
        }

        let depth = self.sessions.recursion_depth(session);
        if depth != 0 {
            self.sessions.clear_recursion(session);
            return Err(KernelError::RecursionStackImbalance {
                session: session.to_string(),
                depth,
            }
            .into());
        }
        drop(guard);

        let response = responses.join(" ").trim().to_string();
        self.events.emit(KernelEvent::BotResponds {
            session_id: session.to_string(),
            response: response.clone(),
        });
        Ok(response)
    }

    /// Like [`Kernel::respond`], for input of unknown encoding. Invalid
    /// UTF-8 is replaced rather than rejected.
    pub async fn respond_bytes(&self, request: &Request, input: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(input);
        if let Cow::Owned(_) = text {
            tracing::warn!("{}", KernelError::EncodingFailure);
        }
        self.respond(request, &text).await
    }
}
