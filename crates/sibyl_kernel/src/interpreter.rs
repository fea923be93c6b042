//! Template evaluation.
//!
//! Children are always evaluated one after another, in document order, and
//! their results concatenated. Side effects (predicate writes, learning)
//! are visible to later siblings.

use crate::command::CommandRegistry;
use crate::{Kernel, Request};
use futures::future::{BoxFuture, FutureExt};
use rand::Rng;
use sibyl_core::node::escape_markup;
use sibyl_core::subs::{GENDER, NORMAL, PERSON, PERSON2};
use sibyl_core::text::{capitalize_first_word, capwords, single_line};
use sibyl_core::{Condition, KernelError, Node, StarKind};

const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

impl Kernel {
    /// Answer one sentence without touching the input/output history.
    ///
    /// `<srai>` and `<sr>` come back through here, so this is also where the
    /// recursion limit is enforced.
    pub async fn evaluate_sentence(&self, sentence: &str, request: &Request) -> String {
        if sentence.is_empty() {
            return String::new();
        }
        let session = request.session_id();
        if self.sessions.recursion_depth(session) > self.config.max_recursion_depth {
            let err = KernelError::RecursionLimitExceeded {
                limit: self.config.max_recursion_depth,
                input: sentence.to_string(),
            };
            tracing::warn!("{}", err);
            return String::new();
        }

        let _frame = self.sessions.enter(session, sentence);
        self.match_and_evaluate(sentence, request).await
    }

    async fn match_and_evaluate(&self, sentence: &str, request: &Request) -> String {
        let (input, that, topic) = self.context(sentence, request);
        let template = self.find(&input, &that, &topic);
        let Some(template) = template else {
            tracing::warn!("{}", KernelError::NoMatch(sentence.to_string()));
            return String::new();
        };
        tracing::debug!("Matched '{}' (that='{}', topic='{}')", input, that, topic);
        self.evaluate(&template, request).await.trim().to_string()
    }

    /// The normalised (input, that, topic) triple used for matching.
    fn context(&self, input: &str, request: &Request) -> (String, String, String) {
        let session = request.session_id();
        let that = self.sessions.last_output(session);
        let topic = self.sessions.get_predicate("topic", session);
        (
            self.substitute(NORMAL, input),
            self.substitute(NORMAL, &that),
            self.substitute(NORMAL, &topic),
        )
    }

    /// Evaluate a template node to text.
    pub fn evaluate<'a>(&'a self, node: &'a Node, request: &'a Request) -> BoxFuture<'a, String> {
        async move {
            let session = request.session_id();
            match node {
                Node::Text(text) => text.render().to_string(),
                Node::Template(children) | Node::Eval(children) => {
                    self.evaluate_all(children, request).await
                }
                Node::Li(item) => self.evaluate_all(&item.children, request).await,

                Node::Bot { name } => self.bot.get(name),
                Node::Get { name } => match self.sessions.predicate(name, session) {
                    Some(value) => value,
                    None => {
                        tracing::warn!("{}", KernelError::MissingPredicate(name.clone()));
                        String::new()
                    }
                },
                Node::Set { name, children } => {
                    let value = self.evaluate_all(children, request).await;
                    self.sessions.set_predicate(name, &value, session);
                    value
                }

                Node::Condition(cond) => self.condition(cond, request).await,
                Node::Random(children) => {
                    let items: Vec<&Node> =
                        children.iter().filter(|c| matches!(c, Node::Li(_))).collect();
                    if items.is_empty() {
                        return String::new();
                    }
                    let pick = rand::thread_rng().gen_range(0..items.len());
                    self.evaluate(items[pick], request).await
                }

                Node::Input { index } => self.sessions.input(session, *index).unwrap_or_else(|| {
                    out_of_range("input", *index);
                    String::new()
                }),
                Node::That { index } => self.sessions.output(session, *index).unwrap_or_else(|| {
                    out_of_range("that", *index);
                    String::new()
                }),
                Node::Star { index } => self.capture(StarKind::Input, *index, request),
                Node::ThatStar { index } => self.capture(StarKind::That, *index, request),
                Node::TopicStar { index } => self.capture(StarKind::Topic, *index, request),

                Node::Srai(children) => {
                    let input = self.evaluate_all(children, request).await;
                    self.evaluate_sentence(&input, request).await
                }
                Node::Sr => {
                    let input = self.capture(StarKind::Input, 1, request);
                    self.evaluate_sentence(&input, request).await
                }

                Node::Formal(children) => capwords(&self.evaluate_all(children, request).await),
                Node::Sentence(children) => {
                    capitalize_first_word(&self.evaluate_all(children, request).await)
                }
                Node::Lowercase(children) => {
                    self.evaluate_all(children, request).await.to_lowercase()
                }
                Node::Uppercase(children) => {
                    self.evaluate_all(children, request).await.to_uppercase()
                }
                Node::Person(children) => {
                    let text = self.evaluate_or_star(children, request).await;
                    self.substitute(PERSON, &text)
                }
                Node::Person2(children) => {
                    let text = self.evaluate_or_star(children, request).await;
                    self.substitute(PERSON2, &text)
                }
                Node::Gender(children) => {
                    let text = self.evaluate_all(children, request).await;
                    self.substitute(GENDER, &text)
                }

                Node::Think(children) | Node::Gossip(children) | Node::Javascript(children) => {
                    self.evaluate_all(children, request).await;
                    String::new()
                }

                Node::Id => session.to_string(),
                Node::Size => self.num_categories().to_string(),
                Node::Version => self.version().to_string(),
                Node::Date => chrono::Local::now().format(DATE_FORMAT).to_string(),

                Node::Learn(children) => {
                    self.learn_element(children, request).await;
                    String::new()
                }
                Node::System(children) => self.system(node, children, request).await,
                Node::Br => "\n".to_string(),

                Node::Unknown { tag, .. } => {
                    tracing::warn!("{}", KernelError::UnknownTag(tag.clone()));
                    String::new()
                }
            }
        }
        .boxed()
    }

    async fn evaluate_all(&self, children: &[Node], request: &Request) -> String {
        let mut out = String::new();
        for child in children {
            out.push_str(&self.evaluate(child, request).await);
        }
        out
    }

    /// A childless `<person/>` stands for `<person><star/></person>`.
    async fn evaluate_or_star(&self, children: &[Node], request: &Request) -> String {
        if children.is_empty() {
            self.capture(StarKind::Input, 1, request)
        } else {
            self.evaluate_all(children, request).await
        }
    }

    fn capture(&self, kind: StarKind, index: usize, request: &Request) -> String {
        let session = request.session_id();
        let current = self.sessions.current_input(session).unwrap_or_default();
        let (input, that, topic) = self.context(&current, request);
        self.star(kind, &input, &that, &topic, index)
    }

    // ========================================================================
    // <condition>
    // ========================================================================

    async fn condition(&self, cond: &Condition, request: &Request) -> String {
        let session = request.session_id();

        if let (Some(name), Some(value)) = (&cond.name, &cond.value) {
            if self.sessions.get_predicate(name, session) == *value {
                return self.evaluate_all(&cond.children, request).await;
            }
            return String::new();
        }

        let items = cond.items();
        let Some(last) = items.last().copied() else {
            return String::new();
        };
        for (i, item) in items.iter().enumerate() {
            let is_last = i + 1 == items.len();
            if item.is_default() {
                if !is_last {
                    malformed("an <li> without attributes may only come last");
                }
                continue;
            }
            let Some(name) = cond.name.as_ref().or(item.name.as_ref()) else {
                malformed("<li> has no 'name' to test");
                continue;
            };
            let Some(value) = item.value.as_ref() else {
                malformed("<li> has no 'value' to test against");
                continue;
            };
            if self.sessions.get_predicate(name, session) == *value {
                return self.evaluate_all(&item.children, request).await;
            }
        }

        if last.is_default() {
            self.evaluate_all(&last.children, request).await
        } else {
            String::new()
        }
    }

    // ========================================================================
    // <learn>
    // ========================================================================

    async fn learn_element(&self, children: &[Node], request: &Request) {
        let mut payload = String::new();
        for child in children {
            let part = match child {
                Node::Unknown { tag, .. } if tag == "category" => {
                    self.render_markup(child, request).await
                }
                other => self.evaluate(other, request).await,
            };
            payload.push_str(&part);
        }

        let payload = payload.trim();
        if payload.ends_with(self.config.learn_suffix.as_str()) {
            self.learn(payload);
            return;
        }
        match self.learn_str(payload) {
            Ok(count) => tracing::debug!("Learned {} categories from <learn>", count),
            Err(e) => tracing::warn!(
                "{}",
                KernelError::KnowledgeParseFailure {
                    origin: "<learn>".to_string(),
                    reason: e.to_string(),
                }
            ),
        }
    }

    /// Write a kept-verbatim subtree back out as markup, replacing each
    /// `<eval>` with its escaped result.
    fn render_markup<'a>(&'a self, node: &'a Node, request: &'a Request) -> BoxFuture<'a, String> {
        async move {
            match node {
                Node::Text(text) => escape_markup(text.raw()),
                Node::Eval(_) => escape_markup(&self.evaluate(node, request).await),
                other => {
                    let tag = other.kind();
                    let mut out = format!("<{}", tag);
                    for (key, value) in other.attributes() {
                        out.push_str(&format!(" {}=\"{}\"", key, escape_markup(&value)));
                    }
                    let children = other.children();
                    if children.is_empty() {
                        out.push_str("/>");
                        return out;
                    }
                    out.push('>');
                    for child in children {
                        out.push_str(&self.render_markup(child, request).await);
                    }
                    out.push_str(&format!("</{}>", tag));
                    out
                }
            }
        }
        .boxed()
    }

    // ========================================================================
    // <system>
    // ========================================================================

    async fn system(&self, node: &Node, children: &[Node], request: &Request) -> String {
        let command = self.evaluate_all(children, request).await;
        let command = command.trim();

        if CommandRegistry::is_namespaced(command) {
            let Some(handler) = self.commands.get(command) else {
                return self.apologize(command, "no command registered under this name");
            };
            tracing::debug!("Dispatching <system> to command {}", command);
            return match handler.parse(self, request, node).await {
                Ok(out) => {
                    handler.complete();
                    out
                }
                Err(e) => self.apologize(command, &e.to_string()),
            };
        }

        if !self.system.shell {
            return self.apologize(command, "shell execution is disabled");
        }
        tracing::debug!("Running <system> command via {}", self.executor.name());
        match self.executor.execute(command).await {
            Ok(out) => single_line(&out),
            Err(e) => self.apologize(command, &e.to_string()),
        }
    }

    fn apologize(&self, command: &str, reason: &str) -> String {
        let err = KernelError::CommandExecutionFailure {
            command: command.to_string(),
            reason: reason.to_string(),
        };
        tracing::warn!("{}", err);
        self.system.apology.clone()
    }
}

fn out_of_range(tag: &'static str, index: usize) {
    tracing::warn!("{}", KernelError::HistoryIndexOutOfRange { tag, index });
}

fn malformed(reason: &str) {
    tracing::warn!(
        "{}",
        KernelError::MalformedConditionAttributes(reason.to_string())
    );
}
