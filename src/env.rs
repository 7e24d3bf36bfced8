//! Environment variable table shared by the bootstrap phase and the echo tool.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;

pub const PWD: &str = "PWD";
pub const WORKSPACE_SLUG: &str = "WORKSPACE_SLUG";
pub const LOG_LEVEL: &str = "MCP_ECHO_ENV_LOG_LEVEL";

/// Names echoed when a request does not list any.
pub const DEFAULT_KEYS: [&str; 2] = [PWD, WORKSPACE_SLUG];

/// Name to value mapping the server reads variables from.
///
/// Writes only happen while bootstrapping, before the transport is opened.
pub trait EnvTable: Debug + Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvTable for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        // Non-unicode values are reported lossily rather than as missing
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

/// In-memory table, isolated from the process environment.
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            vars: RwLock::new(vars),
        }
    }
}

impl EnvTable for MemoryEnv {
    fn get(&self, name: &str) -> Option<String> {
        let vars = self.vars.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        vars.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        let mut vars = self.vars.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        vars.insert(name.to_string(), value.to_string());
    }
}
