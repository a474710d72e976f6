//! Ordered, file-backed key/value store.
//!
//! The persisted format is one `key=value` per line. A `#` starts a comment
//! that runs to the end of the line; blank and comment-only lines are
//! ignored. Keys and values are trimmed, and lines without a value are
//! discarded. Insertion order is preserved and each key appears once.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cle_types::error::{CleError, Result};

/// In-memory view of one configuration file.
#[derive(Debug)]
pub struct ConfigStore {
    entries: Vec<(String, String)>,
    path: Option<PathBuf>,
    program: String,
    case_sensitive: bool,
    changed: bool,
    cleared: bool,
}

impl ConfigStore {
    /// Load the store backed by `path`.
    ///
    /// A missing file yields an empty store. Any other read error is
    /// returned. An empty path gives a store without backing file.
    pub fn open(path: impl AsRef<Path>, case_sensitive: bool, program: &str) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(Self::in_memory(case_sensitive, program));
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Config file {} not found, starting empty", path.display());
                String::new()
            },
            Err(e) => return Err(e.into()),
        };
        let mut store = Self::in_memory(case_sensitive, program);
        store.path = Some(path.to_path_buf());
        store.load_text(&text);
        log::debug!(
            "Loaded {} config entries from {}",
            store.entries.len(),
            path.display()
        );
        Ok(store)
    }

    /// A store that is never persisted.
    pub fn in_memory(case_sensitive: bool, program: &str) -> Self {
        Self {
            entries: Vec::new(),
            path: None,
            program: program.to_string(),
            case_sensitive,
            changed: false,
            cleared: false,
        }
    }

    fn load_text(&mut self, text: &str) {
        for line in text.lines() {
            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let Some((key, value)) = content.split_once('=') else {
                log::debug!("Ignoring config line without '=': {content}");
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            match self.position(key) {
                Some(i) => self.entries[i].1 = value.to_string(),
                None => self.entries.push((key.to_string(), value.to_string())),
            }
        }
    }

    fn key_eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| self.key_eq(k, key))
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    /// Set, replace or (with an empty value) delete an entry.
    ///
    /// With `overwrite == false` an existing different value is kept and a
    /// [`CleError::Conflict`] is returned. Deleting an absent key succeeds.
    pub fn set(&mut self, key: &str, value: &str, overwrite: bool) -> Result<()> {
        validate_key(key)?;
        validate_value(key, value)?;
        let existing = self.position(key);

        if let Some(i) = existing {
            let current = &self.entries[i].1;
            if current == value {
                return Ok(());
            }
            if !overwrite {
                return Err(CleError::Conflict {
                    key: key.to_string(),
                    existing: current.clone(),
                });
            }
        }

        match (existing, value.is_empty()) {
            (Some(i), true) => {
                self.entries.remove(i);
                log::debug!("Removed config entry {key}");
            },
            (Some(i), false) => {
                self.entries[i].1 = value.to_string();
                log::debug!("Updated config entry {key}={value}");
            },
            (None, true) => return Ok(()),
            (None, false) => {
                self.entries.push((key.to_string(), value.to_string()));
                log::debug!("Added config entry {key}={value}");
            },
        }
        self.changed = true;
        Ok(())
    }

    /// Remove every entry and return how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.cleared = true;
        count
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key starts with `prefix` (compared with the store's case rule).
    pub fn keys_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries().filter(move |(k, _)| {
            k.len() >= prefix.len()
                && k.is_char_boundary(prefix.len())
                && self.key_eq(&k[..prefix.len()], prefix)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether `close` will rewrite the backing file.
    pub fn is_changed(&self) -> bool {
        self.changed || self.cleared
    }

    /// File content reflecting the current entries.
    pub fn render(&self) -> String {
        let mut out = format!(
            "# Configuration of program '{}'\n\
             # Generated file, rewritten whenever the program updates its configuration.\n",
            self.program
        );
        for (k, v) in &self.entries {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push('\n');
        }
        out
    }

    /// Persist (if needed) and release the store.
    pub fn close(self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !self.is_changed() {
            return Ok(());
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        log::info!(
            "Wrote {} config entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CleError::Config("config key must not be empty".into()));
    }
    if key.trim() != key {
        return Err(CleError::Config(format!(
            "config key '{key}' has surrounding whitespace"
        )));
    }
    if key.contains(['=', '#', '\n', '\r']) {
        return Err(CleError::Config(format!(
            "config key '{key}' contains '=', '#' or a line break"
        )));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.trim() != value {
        return Err(CleError::Config(format!(
            "value for '{key}' has surrounding whitespace"
        )));
    }
    if value.contains(['#', '\n', '\r']) {
        return Err(CleError::Config(format!(
            "value for '{key}' contains '#' or a line break"
        )));
    }
    Ok(())
}
