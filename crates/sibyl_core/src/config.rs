use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SibylConfig {
    pub kernel: KernelConfig,
    pub system: SystemConfig,
    pub brain: BrainConfig,
}

impl SibylConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: SibylConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SIBYL_SESSION_LOCK") {
            match v.as_str() {
                "global" => self.kernel.session_lock = LockPolicy::Global,
                "per_session" => self.kernel.session_lock = LockPolicy::PerSession,
                other => tracing::warn!("Ignoring unknown SIBYL_SESSION_LOCK '{}'", other),
            }
        }
        if let Ok(v) = std::env::var("SIBYL_MAX_RECURSION") {
            if let Ok(n) = v.parse() {
                self.kernel.max_recursion_depth = n;
            }
        }
        if let Ok(v) = std::env::var("SIBYL_MAX_HISTORY") {
            if let Ok(n) = v.parse() {
                self.kernel.max_history = n;
            }
        }
        if let Ok(v) = std::env::var("SIBYL_SHELL") {
            self.system.shell = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Returned by `<version/>`.
    pub version: String,
    pub max_history: usize,
    /// Nested `<srai>` depth after which a sentence evaluates to "".
    pub max_recursion_depth: usize,
    pub session_lock: LockPolicy,
    /// `<learn>` content ending with this suffix is treated as a file pattern.
    pub learn_suffix: String,
    /// Bot predicates set at startup, on top of `name = "Nameless"`.
    pub bot: BTreeMap<String, String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            version: format!("Sibyl {}", env!("CARGO_PKG_VERSION")),
            max_history: 10,
            max_recursion_depth: 100,
            session_lock: LockPolicy::Global,
            learn_suffix: ".aiml".to_string(),
            bot: BTreeMap::new(),
        }
    }
}

/// How concurrent `respond` calls are serialised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// One response at a time for the whole process.
    #[default]
    Global,
    /// One response at a time per session.
    PerSession,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Run non-namespaced `<system>` content as a shell command.
    pub shell: bool,
    pub timeout_secs: u64,
    /// Returned whenever a `<system>` command fails.
    pub apology: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            shell: true,
            timeout_secs: 30,
            apology: "There was an error while computing my response. Please inform my botmaster."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Previously saved brain to restore at bootstrap.
    pub brain_file: Option<PathBuf>,
    /// File patterns to learn at bootstrap.
    pub learn: Vec<String>,
    /// Inputs answered once at bootstrap, in the global session.
    pub commands: Vec<String>,
    /// TOML file of substitution tables, one table per substituter.
    pub subs_file: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================
