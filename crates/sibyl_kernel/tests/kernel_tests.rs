//! Integration tests for the Kernel.
//!
//! The kernel learns `fixtures/self-test.aiml` and is driven through
//! `respond`. Shell commands go to a MockExecutor so that no process is
//! spawned; `<system>` commands use small in-test handlers.

use anyhow::Result;
use async_trait::async_trait;
use sibyl_core::config::LockPolicy;
use sibyl_core::{Node, PatternKey, SibylConfig, GLOBAL_SESSION_ID};
use sibyl_kernel::{CommandHandler, Kernel, KernelEvent, Request};
use sibyl_os::Executor;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const APOLOGY: &str =
    "There was an error while computing my response. Please inform my botmaster.";

// ============================================================================
// Mocks
// ============================================================================

/// Records every command and answers with a fixed output.
struct MockExecutor {
    output: String,
    commands: Mutex<Vec<String>>,
}

impl MockExecutor {
    fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            commands: Mutex::new(Vec::new()),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, command: &str) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "MockExecutor"
    }
}

struct FailingExecutor;

#[async_trait]
impl Executor for FailingExecutor {
    async fn execute(&self, _command: &str) -> Result<String> {
        anyhow::bail!("Command execution timed out after 30 seconds")
    }

    fn name(&self) -> &str {
        "FailingExecutor"
    }
}

/// Greets the user by the `name` predicate of the requesting session.
#[derive(Default)]
struct Greet {
    completed: AtomicUsize,
}

#[async_trait]
impl CommandHandler for Greet {
    async fn parse(&self, kernel: &Kernel, request: &Request, node: &Node) -> Result<String> {
        assert_eq!(node.kind(), "system");
        let name = kernel.get_predicate("name", request.session_id());
        Ok(format!("Greetings, {}", name))
    }

    fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Explode {
    completed: AtomicUsize,
}

#[async_trait]
impl CommandHandler for Explode {
    async fn parse(&self, _: &Kernel, _: &Request, _: &Node) -> Result<String> {
        anyhow::bail!("resolver blew up")
    }

    fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Never finishes within a test's patience.
struct Stall;

#[async_trait]
impl CommandHandler for Stall {
    async fn parse(&self, _: &Kernel, _: &Request, _: &Node) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".into())
    }
}

/// Collects formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn fixture() -> String {
    format!("{}/tests/fixtures/self-test.aiml", env!("CARGO_MANIFEST_DIR"))
}

fn kernel_with(config: SibylConfig) -> Kernel {
    let kernel = Kernel::new(&config).with_executor(Arc::new(MockExecutor::new("")));
    let learned = kernel.learn(&fixture());
    assert!(learned.failures.is_empty(), "{:?}", learned.failures);
    assert!(learned.categories > 0);
    kernel
}

fn kernel() -> Kernel {
    kernel_with(SibylConfig::default())
}

async fn ask(kernel: &Kernel, input: &str) -> String {
    kernel.respond(&Request::global(), input).await.unwrap()
}

async fn ask_as(kernel: &Kernel, session: &str, input: &str) -> String {
    kernel.respond(&Request::new(session), input).await.unwrap()
}

// ============================================================================
// Orchestration
// ============================================================================

#[tokio::test]
async fn test_hello_scenario() {
    let kernel = Kernel::new(&SibylConfig::default());
    kernel
        .learn_str("<aiml><category><pattern>HELLO</pattern><template>Hi there</template></category></aiml>")
        .unwrap();
    assert_eq!(ask(&kernel, "Hello").await, "Hi there");
}

#[tokio::test]
async fn test_events_bracket_each_response() {
    let mut kernel = kernel();
    let mut events = kernel.subscribe();
    assert_eq!(ask_as(&kernel, "s", "Hello").await, "Hi there");

    assert_eq!(
        events.try_recv().unwrap(),
        KernelEvent::PersonSpeaks {
            session_id: "s".into(),
            input: "Hello".into(),
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        KernelEvent::BotResponds {
            session_id: "s".into(),
            response: "Hi there".into(),
        }
    );
    assert!(events.try_recv().is_err());

    assert_eq!(ask(&kernel, "").await, "");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_cancelled_respond_leaves_stack_empty() {
    let mut kernel = kernel();
    kernel.register_command("tests.stall", Arc::new(Stall));
    kernel
        .learn_str("<category><pattern>STALL</pattern><template><system>tests.stall</system></template></category>")
        .unwrap();

    let request = Request::new("s");
    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), kernel.respond(&request, "stall")).await;
    assert!(cancelled.is_err());
    assert!(kernel.session_data(Some("s"))["s"].recursion_stack.is_empty());

    assert_eq!(ask_as(&kernel, "s", "hello").await, "Hi there");
}

#[tokio::test]
async fn test_delete_session() {
    let mut config = SibylConfig::default();
    config.kernel.session_lock = LockPolicy::PerSession;
    let kernel = kernel_with(config);
    kernel.set_predicate("name", "Ada", "ada");
    assert_eq!(ask_as(&kernel, "ada", "Hello").await, "Hi there");

    assert!(kernel.delete_session("ada"));
    assert!(kernel.session_data(Some("ada")).is_empty());
    assert!(!kernel.delete_session("ada"));
    assert!(!kernel.delete_session(GLOBAL_SESSION_ID));

    assert_eq!(ask_as(&kernel, "ada", "Hello").await, "Hi there");
    assert_eq!(kernel.get_predicate("name", "ada"), "");
}

#[tokio::test]
async fn test_empty_input_mutates_nothing() {
    let kernel = kernel();
    let before = kernel.session_data(None);
    assert_eq!(ask_as(&kernel, "fresh", "").await, "");
    assert_eq!(kernel.session_data(None), before);
    assert!(kernel.session_data(Some("fresh")).is_empty());
}

#[tokio::test]
async fn test_two_sentences_grow_history_by_two() {
    let kernel = kernel();
    let response = ask_as(&kernel, "s", "Hello. Hello.").await;
    assert_eq!(response, "Hi there Hi there");

    let data = kernel.session_data(Some("s"));
    let session = &data["s"];
    assert_eq!(session.input_history, vec!["Hello", "Hello"]);
    assert_eq!(session.output_history, vec!["Hi there", "Hi there"]);
    assert!(session.recursion_stack.is_empty());
}

#[tokio::test]
async fn test_history_is_bounded_fifo() {
    let kernel = kernel();
    for i in 0..15 {
        ask_as(&kernel, "s", &format!("unknown input {}", i)).await;
    }
    let data = kernel.session_data(Some("s"));
    let session = &data["s"];
    assert_eq!(session.input_history.len(), 10);
    assert_eq!(session.output_history.len(), 10);
    assert_eq!(session.input_history[0], "unknown input 5");
    assert_eq!(session.input_history[9], "unknown input 14");
}

#[tokio::test]
async fn test_no_match_returns_empty() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "this matches nothing at all").await, "");
}

#[tokio::test]
async fn test_respond_bytes_tolerates_bad_utf8() {
    let kernel = kernel();
    let response = kernel
        .respond_bytes(&Request::new("bytes"), b"caf\xe9 au lait")
        .await
        .unwrap();
    assert_eq!(response, "");
    let data = kernel.session_data(Some("bytes"));
    assert_eq!(data["bytes"].input_history, vec!["caf\u{fffd} au lait"]);

    let response = kernel.respond_bytes(&Request::global(), b"Hello").await.unwrap();
    assert_eq!(response, "Hi there");
}

// ============================================================================
// Predicates and bot facts
// ============================================================================

#[tokio::test]
async fn test_get_and_set() {
    let kernel = kernel();
    assert_eq!(
        ask(&kernel, "test get and set").await,
        "I like cheese and my favorite food is cheese"
    );
    assert_eq!(kernel.get_predicate("food", GLOBAL_SESSION_ID), "cheese");
    assert_eq!(ask(&kernel, "test get unset").await, "[]");
}

#[tokio::test]
async fn test_unset_predicate_is_logged_as_warning() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let kernel = kernel();
    assert_eq!(ask(&kernel, "test get unset").await, "[]");
    let contents = logs.contents();
    assert!(
        contents
            .lines()
            .any(|l| l.contains("WARN") && l.contains("predicate 'nothing' is not set")),
        "{}",
        contents
    );
}

#[tokio::test]
async fn test_predicates_are_per_session() {
    let kernel = kernel();
    ask_as(&kernel, "alice", "test get and set").await;
    assert_eq!(kernel.get_predicate("food", "alice"), "cheese");
    assert_eq!(kernel.get_predicate("food", "bob"), "");
}

#[tokio::test]
async fn test_bot_predicates() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test bot").await, "My name is Nameless");
    kernel.set_bot_predicate("name", "Sibyl");
    assert_eq!(ask(&kernel, "test bot").await, "My name is Sibyl");
    assert_eq!(ask(&kernel, "Hello Sibyl").await, "You know my name");
}

#[tokio::test]
async fn test_bot_predicates_from_config() {
    let mut config = SibylConfig::default();
    config.kernel.bot.insert("name".into(), "Pythia".into());
    let kernel = kernel_with(config);
    assert_eq!(kernel.get_bot_predicate("name"), "Pythia");
    assert_eq!(ask(&kernel, "hello pythia").await, "You know my name");
}

// ============================================================================
// Conditions and random
// ============================================================================

#[tokio::test]
async fn test_condition_name_value() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test condition name value").await, "");
    kernel.set_predicate("gender", "male", GLOBAL_SESSION_ID);
    assert_eq!(
        ask(&kernel, "test condition name value").await,
        "You are handsome"
    );
    kernel.set_predicate("gender", "Male", GLOBAL_SESSION_ID);
    assert_eq!(ask(&kernel, "test condition name value").await, "");
}

#[tokio::test]
async fn test_condition_list_forms() {
    let kernel = kernel();
    for input in ["test condition name", "test condition"] {
        kernel.set_predicate("gender", "female", GLOBAL_SESSION_ID);
        assert_eq!(ask(&kernel, input).await, "You are beautiful");
        kernel.set_predicate("gender", "male", GLOBAL_SESSION_ID);
        assert_eq!(ask(&kernel, input).await, "You are handsome");
        kernel.set_predicate("gender", "robot", GLOBAL_SESSION_ID);
        assert_eq!(ask(&kernel, input).await, "You are genderless");
    }
}

#[tokio::test]
async fn test_condition_misplaced_default_does_not_short_circuit() {
    let kernel = kernel();
    kernel.set_predicate("gender", "male", GLOBAL_SESSION_ID);
    assert_eq!(ask(&kernel, "test misplaced default").await, "You are handsome");
    kernel.set_predicate("gender", "robot", GLOBAL_SESSION_ID);
    assert_eq!(ask(&kernel, "test misplaced default").await, "You are genderless");
}

#[tokio::test]
async fn test_random_picks_one_item() {
    let kernel = kernel();
    let allowed = ["response ONE", "response two", "response three"];
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let response = ask(&kernel, "test random").await;
        assert!(allowed.contains(&response.as_str()), "{}", response);
        seen.insert(response);
    }
    assert!(seen.len() > 1);
    assert_eq!(ask(&kernel, "test random empty").await, "Nothing here!");
}

// ============================================================================
// History and wildcards
// ============================================================================

#[tokio::test]
async fn test_input_and_that() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test input").await, "You just said: test input");
    ask(&kernel, "hello").await;
    assert_eq!(ask(&kernel, "test that").await, "I just said: Hi there");
}

#[tokio::test]
async fn test_that_index_two() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test that two").await, "Before that I said:");
    ask(&kernel, "hello").await;
    ask(&kernel, "test formal").await;
    assert_eq!(
        ask(&kernel, "test that two").await,
        "Before that I said: Hi there"
    );
}

#[tokio::test]
async fn test_star_positions() {
    let kernel = kernel();
    assert_eq!(
        ask(&kernel, "You should test star begin").await,
        "Begin star matched: You should test star"
    );
    assert_eq!(
        ask(&kernel, "test star creamy goodness middle").await,
        "Middle star matched: creamy goodness"
    );
    assert_eq!(
        ask(
            &kernel,
            "test star having multiple stars in a pattern makes me extremely happy"
        )
        .await,
        "Multiple stars matched: having, stars in a pattern, extremely happy"
    );
}

#[tokio::test]
async fn test_thatstar() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test thatstar").await, "I say beans");
    assert_eq!(ask(&kernel, "test thatstar").await, "I just said \"beans\"");
}

#[tokio::test]
async fn test_topic_and_topicstar() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test topicstar").await, "I have no topic");
    kernel.set_predicate("topic", "Soylent Green", GLOBAL_SESSION_ID);
    assert_eq!(
        ask(&kernel, "test topicstar").await,
        "Solyent Green is made of people!"
    );
    assert_eq!(
        ask(&kernel, "test topic").await,
        "We were discussing Soylent Green"
    );
}

// ============================================================================
// Recursion
// ============================================================================

#[tokio::test]
async fn test_srai_and_sr() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test srai").await, "Hi there");
    assert_eq!(ask(&kernel, "test sr hello").await, "srai results: Hi there");
}

#[tokio::test]
async fn test_infinite_srai_is_cut_off() {
    let kernel = kernel();
    assert_eq!(ask_as(&kernel, "loop", "test srai infinite").await, "");
    let data = kernel.session_data(Some("loop"));
    assert!(data["loop"].recursion_stack.is_empty());
    // The session stays usable.
    assert_eq!(ask_as(&kernel, "loop", "hello").await, "Hi there");
}

#[tokio::test]
async fn test_recursion_limit_is_configurable() {
    let mut config = SibylConfig::default();
    config.kernel.max_recursion_depth = 3;
    let kernel = kernel_with(config);
    for depth in 0..10 {
        kernel.add_category(
            PatternKey::pattern(format!("LEVEL {}", depth)),
            Node::Template(vec![Node::Srai(vec![Node::text(format!("level {}", depth + 1))])]),
        );
    }
    kernel.add_category(
        PatternKey::pattern("LEVEL 10"),
        Node::Template(vec![Node::text("bottom")]),
    );
    assert_eq!(ask(&kernel, "level 8").await, "bottom");
    assert_eq!(ask(&kernel, "level 0").await, "");
}

// ============================================================================
// Text transforms
// ============================================================================

#[tokio::test]
async fn test_case_transforms() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test formal").await, "Formal Test Passed");
    assert_eq!(
        ask(&kernel, "test lowercase").await,
        "the last word should be lowercase"
    );
    assert_eq!(
        ask(&kernel, "test uppercase").await,
        "THE LAST WORD SHOULD BE UPPERCASE"
    );
    assert_eq!(
        ask(&kernel, "test sentence").await,
        "My first letter should be capitalized."
    );
}

#[tokio::test]
async fn test_substituting_transforms() {
    let kernel = kernel();
    assert_eq!(
        ask(&kernel, "test gender").await,
        "She'd told him she heard that him hernia is history"
    );
    assert_eq!(
        ask(&kernel, "test person my dog ate him").await,
        "his dog ate me"
    );
    assert_eq!(
        ask(&kernel, "test person2 your mother likes me").await,
        "my mother likes you"
    );
}

#[tokio::test]
async fn test_load_subs_replaces_table() {
    let kernel = kernel();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subs.toml");
    std::fs::write(&path, "[gender]\nhistory = \"mystery\"\n").unwrap();
    kernel.load_subs(&path).unwrap();
    assert_eq!(
        ask(&kernel, "test gender").await,
        "He'd told her he heard that her hernia is mystery"
    );
}

#[tokio::test]
async fn test_whitespace_handling() {
    let kernel = kernel();
    assert_eq!(
        ask(&kernel, "test whitespace").await,
        "Extra Spaces Rule! (but not in here!) But Here They Do!"
    );
    // Collapsing happens once and is remembered; a second run agrees.
    assert_eq!(
        ask(&kernel, "test whitespace").await,
        "Extra Spaces Rule! (but not in here!) But Here They Do!"
    );
    assert_eq!(ask(&kernel, "test preserve").await, "Keep   these");
}

#[tokio::test]
async fn test_meta_tags() {
    let kernel = kernel();
    assert_eq!(ask(&kernel, "test think").await, "");
    assert_eq!(ask_as(&kernel, "alice", "test id").await, "Your id is alice");
    assert_eq!(
        ask(&kernel, "test size").await,
        format!("I have {} categories", kernel.num_categories())
    );
    assert_eq!(
        ask(&kernel, "test version").await,
        format!("Running {}", kernel.version())
    );
    assert_eq!(ask(&kernel, "test br").await, "one\ntwo");
    assert_eq!(ask(&kernel, "test unknown").await, "beforeafter");

    let date = ask(&kernel, "test date").await;
    assert!(date.starts_with("The date is "));
    assert!(date.len() > "The date is ".len());
}

// ============================================================================
// <learn>
// ============================================================================

#[tokio::test]
async fn test_learn_inline_category() {
    let kernel = kernel();
    let before = kernel.num_categories();
    assert_eq!(ask(&kernel, "teach pizza").await, "Learned it");
    assert_eq!(kernel.num_categories(), before + 1);
    assert_eq!(ask(&kernel, "what did you learn").await, "I learned pizza");
}

#[tokio::test]
async fn test_learn_file_from_template() {
    let kernel = kernel();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("extra.aiml");
    std::fs::write(
        &file,
        "<aiml><category><pattern>EXTRA</pattern><template>extra knowledge</template></category></aiml>",
    )
    .unwrap();
    kernel.add_category(
        PatternKey::pattern("LOAD EXTRA"),
        Node::Template(vec![Node::Learn(vec![Node::text(file.to_str().unwrap())])]),
    );
    assert_eq!(ask(&kernel, "load extra").await, "");
    assert_eq!(ask(&kernel, "extra").await, "extra knowledge");
}

#[tokio::test]
async fn test_learn_skips_bad_files() {
    let kernel = Kernel::new(&SibylConfig::default());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.aiml"),
        "<aiml><category><pattern>A</pattern><template>a</template></category></aiml>",
    )
    .unwrap();
    std::fs::write(dir.path().join("b.aiml"), "<aiml><category>").unwrap();

    let learned = kernel.learn(dir.path().join("*.aiml").to_str().unwrap());
    assert_eq!(learned.files.len(), 2);
    assert_eq!(learned.categories, 1);
    assert_eq!(learned.failures.len(), 1);
    assert_eq!(ask(&kernel, "a").await, "a");
}

// ============================================================================
// <system>
// ============================================================================

#[tokio::test]
async fn test_system_shell_output_is_one_line() {
    let executor = Arc::new(MockExecutor::new("hello\nthere\n"));
    let kernel = kernel().with_executor(executor.clone());
    assert_eq!(ask(&kernel, "test system").await, "hello there");
    assert_eq!(executor.commands(), vec!["echo hello there"]);
}

#[tokio::test]
async fn test_system_runs_local_shell() {
    let kernel = Kernel::new(&SibylConfig::default());
    kernel
        .learn_str(
            "<aiml>\
             <category><pattern>SHELL BOTH</pattern>\
             <template><system>echo out; echo err 1&gt;&amp;2</system></template></category>\
             <category><pattern>SHELL PARTIAL</pattern>\
             <template><system>echo partial; exit 1</system></template></category>\
             <category><pattern>SHELL PATH</pattern>\
             <template><system>echo ./notes//today/../draft.txt</system></template></category>\
             </aiml>",
        )
        .unwrap();
    assert_eq!(ask(&kernel, "shell both").await, "out err");
    assert_eq!(ask(&kernel, "shell partial").await, "partial");
    assert_eq!(ask(&kernel, "shell path").await, "./notes/draft.txt");
}

#[tokio::test]
async fn test_system_shell_failure_apologizes() {
    let kernel = kernel().with_executor(Arc::new(FailingExecutor));
    assert_eq!(ask(&kernel, "test system").await, APOLOGY);
}

#[tokio::test]
async fn test_system_shell_disabled() {
    let mut config = SibylConfig::default();
    config.system.shell = false;
    config.system.apology = "Sorry.".into();
    let executor = Arc::new(MockExecutor::new("should not run"));
    let kernel = kernel_with(config).with_executor(executor.clone());
    assert_eq!(ask(&kernel, "test system").await, "Sorry.");
    assert!(executor.commands().is_empty());
}

#[tokio::test]
async fn test_system_command_handlers() {
    let greet = Arc::new(Greet::default());
    let explode = Arc::new(Explode::default());
    let mut kernel = kernel();
    kernel.register_command("tests.greet", greet.clone());
    kernel.register_command("tests.explode", explode.clone());
    kernel.set_predicate("name", "Ada", "ada");

    assert_eq!(ask_as(&kernel, "ada", "test command").await, "Greetings, Ada");
    assert_eq!(greet.completed.load(Ordering::SeqCst), 1);

    assert_eq!(ask(&kernel, "test command failing").await, APOLOGY);
    assert_eq!(explode.completed.load(Ordering::SeqCst), 0);

    assert_eq!(ask(&kernel, "test command missing").await, APOLOGY);
}

// ============================================================================
// Brain persistence
// ============================================================================

#[tokio::test]
async fn test_save_load_and_reset_brain() {
    let kernel = kernel();
    let count = kernel.num_categories();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.bin");
    kernel.save_brain(&path).unwrap();

    kernel.reset_brain();
    assert_eq!(kernel.num_categories(), 0);
    assert_eq!(ask(&kernel, "hello").await, "");

    kernel.load_brain(&path).unwrap();
    assert_eq!(kernel.num_categories(), count);
    assert_eq!(ask(&kernel, "hello").await, "Hi there");
    assert_eq!(
        ask(&kernel, "test star creamy goodness middle").await,
        "Middle star matched: creamy goodness"
    );
}

#[tokio::test]
async fn test_bootstrap() {
    let kernel = Kernel::new(&SibylConfig::default());
    kernel
        .bootstrap(None, &[fixture()], &["test get and set".to_string()])
        .await
        .unwrap();
    assert!(kernel.num_categories() > 0);
    assert_eq!(kernel.get_predicate("food", GLOBAL_SESSION_ID), "cheese");
}

#[tokio::test]
async fn test_bootstrap_missing_brain_fails() {
    let kernel = Kernel::new(&SibylConfig::default());
    let result = kernel
        .bootstrap(Some(std::path::Path::new("/nonexistent/brain.bin")), &[], &[])
        .await;
    assert!(result.is_err());
}

// ============================================================================
// Concurrency
// ============================================================================

async fn concurrent_sessions(policy: LockPolicy) {
    let mut config = SibylConfig::default();
    config.kernel.session_lock = policy;
    let kernel = Arc::new(kernel_with(config));

    let mut handles = Vec::new();
    for i in 0..8 {
        let kernel = kernel.clone();
        handles.push(tokio::spawn(async move {
            let session = format!("user{}", i);
            for _ in 0..5 {
                let response = ask_as(&kernel, &session, "test get and set. test id").await;
                assert_eq!(
                    response,
                    format!(
                        "I like cheese and my favorite food is cheese Your id is {}",
                        session
                    )
                );
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for i in 0..8 {
        let id = format!("user{}", i);
        let data = kernel.session_data(Some(&id));
        assert_eq!(data[&id].output_history.len(), 10);
        assert!(data[&id].recursion_stack.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_global_lock() {
    concurrent_sessions(LockPolicy::Global).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_per_session_lock() {
    concurrent_sessions(LockPolicy::PerSession).await;
}
