//! Environment capability and its process/in-memory implementations.
//!
//! The executor never calls `std::env` directly outside [`OsEnvironment`].
//! Everything else reads and writes variables through the [`Environment`]
//! trait, which keeps precedence logic free of process-global state.

use std::collections::BTreeMap;

use crate::key::{ConfigKey, Scope};
use crate::store::ConfigStore;

/// Abstraction over a set of environment variables.
pub trait Environment {
    /// Current value of a variable.
    fn get(&self, name: &str) -> Option<String>;

    /// Set a variable, replacing any existing value.
    fn set(&mut self, name: &str, value: &str);

    /// Remove a variable. Removing an unknown variable is a no-op.
    fn unset(&mut self, name: &str);

    /// All variables, sorted by name.
    fn vars(&self) -> Vec<(String, String)>;

    /// Whether a variable holds a truthy switch value (`YES`, `ON`, `TRUE`, `1`).
    fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_uppercase().as_str(),
                "YES" | "ON" | "TRUE" | "1"
            )
        })
    }

    /// Home directory used by file-name mapping.
    fn home(&self) -> Option<String> {
        self.get("HOME").or_else(|| self.get("USERPROFILE"))
    }
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEnvironment;

impl OsEnvironment {
    pub fn new() -> Self {
        Self
    }
}

impl Environment for OsEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set(&mut self, name: &str, value: &str) {
        // SAFETY: the executor is single-threaded; no other thread reads or
        // writes the environment while a run is in progress.
        unsafe { std::env::set_var(name, value) }
    }

    fn unset(&mut self, name: &str) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(name) }
    }

    fn vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = std::env::vars().collect();
        vars.sort();
        vars
    }
}

/// Environment held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryEnvironment {
    vars: BTreeMap<String, String>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

impl Environment for MemoryEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    fn unset(&mut self, name: &str) {
        self.vars.remove(name);
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Copy every `envar` entry of `scope` from the store into `env`.
///
/// For a scope without command this covers `owner.program.envar.<name>`;
/// with a command it covers `owner.program.command.envar.<name>`.
/// Returns the number of variables set.
pub fn materialize_envars(store: &ConfigStore, scope: &Scope, env: &mut dyn Environment) -> usize {
    let prefix = ConfigKey::envar_prefix(scope);
    let mut count = 0;
    for (key, value) in store.keys_with_prefix(&prefix) {
        let name = &key[prefix.len()..];
        if name.is_empty() {
            continue;
        }
        log::debug!("Materializing environment variable {name}={value} from {key}");
        env.set(name, value);
        count += 1;
    }
    count
}
