//! Generate, activate, change, remove and display property files.
//!
//! Store writes happen in memory only; the owner of the store flushes it
//! with [`ConfigStore::close`] when the run ends.

use std::fs;
use std::path::Path;

use cle_types::error::{CleError, Result};

use crate::env::Environment;
use crate::key::{ConfigKey, Scope};
use crate::path::{FileReader, map_file_name};
use crate::resolver::{PropertyResolver, PropertyScope};
use crate::store::ConfigStore;
use crate::table::PropertyTable;

/// Result of a CHGPROP style update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    /// Number of property values that actually changed.
    pub changed: usize,
    /// File that was written.
    pub path: String,
    /// Whether the command-level key was set to `path` as a side effect.
    pub promoted: bool,
}

pub struct PropertyLifecycle<'a> {
    store: &'a mut ConfigStore,
    reader: &'a dyn FileReader,
    env: &'a dyn Environment,
}

impl<'a> PropertyLifecycle<'a> {
    pub fn new(
        store: &'a mut ConfigStore,
        reader: &'a dyn FileReader,
        env: &'a dyn Environment,
    ) -> Self {
        Self { store, reader, env }
    }

    fn resolve(&self, scope: &Scope) -> Result<PropertyScope> {
        PropertyResolver::new(&*self.store, self.reader, self.env).resolve(scope)
    }

    /// Write the current defaults of every `(command, table)` into `target`.
    pub fn generate(
        &self,
        target: &str,
        scope: &Scope,
        tables: &[(&str, &dyn PropertyTable)],
    ) -> Result<String> {
        let target = map_file_name(target, self.env);
        let mut text = header(scope);
        for (command, table) in tables {
            let root = scope.with_command(command).root();
            text.push_str(&format!("\n# Properties of command {command}\n"));
            text.push_str(&table.render_properties(&root, None)?);
        }
        write_file(&target, &text)?;
        log::info!("Generated property file {target} for {} command(s)", tables.len());
        Ok(target)
    }

    /// Point the scope's property-file key at `path`.
    pub fn activate(&mut self, scope: &Scope, path: &str) -> Result<ConfigKey> {
        let path = path.trim();
        if path.is_empty() {
            return Err(CleError::Syntax(
                "property file name is empty, use DELPROP to remove an activation".into(),
            ));
        }
        let key = ConfigKey::property_file(scope);
        self.store.set(&key.to_string(), path, true)?;
        log::info!("Activated property file {path} as {key}");
        Ok(key)
    }

    /// Remove the scope's property-file key. Returns whether it existed.
    pub fn remove(&mut self, scope: &Scope) -> Result<bool> {
        let key = ConfigKey::property_file(scope).to_string();
        let existed = self.store.get(&key).is_some();
        self.store.set(&key, "", true)?;
        if existed {
            log::info!("Removed property file activation {key}");
        }
        Ok(existed)
    }

    /// Render the active properties of a command without touching the store.
    pub fn get(
        &self,
        scope: &Scope,
        table: &mut dyn PropertyTable,
        path: Option<&str>,
    ) -> Result<String> {
        let resolved = self.resolve(scope)?;
        let root = scope.root();
        if let Some(content) = &resolved.content {
            table.apply_properties(content, &root)?;
        }
        table.render_properties(&root, path)
    }

    /// Update properties of a command from `path=value` / `path` assignments.
    ///
    /// A file found at command level is rewritten in place. Otherwise the
    /// command's default file in the home directory is written and activated
    /// at command level so later runs keep using it.
    pub fn change(
        &mut self,
        scope: &Scope,
        table: &mut dyn PropertyTable,
        assignments: &[String],
    ) -> Result<ChangeReport> {
        let Some(command) = scope.command.as_deref() else {
            return Err(CleError::Command("no command given for property change".into()));
        };
        let resolved = self.resolve(scope)?;
        let root = scope.root();
        if let Some(content) = &resolved.content {
            table.apply_properties(content, &root)?;
        }

        let update = synthesize(&root, assignments);
        let changed = table.update_properties(&update, &root)?;

        let (target, promoted) = match (&resolved.path, resolved.is_pinned()) {
            (Some(path), true) => (path.clone(), false),
            _ => (self.default_file(scope, command)?, true),
        };
        let mut text = header(scope);
        text.push('\n');
        text.push_str(&table.render_properties(&root, None)?);
        write_file(&target, &text)?;

        if promoted {
            self.activate(scope, &target)?;
        }
        log::info!("Changed {changed} value(s) of {root} in {target}");
        Ok(ChangeReport {
            changed,
            path: target,
            promoted,
        })
    }

    fn default_file(&self, scope: &Scope, command: &str) -> Result<String> {
        let home = self.env.home().ok_or_else(|| {
            CleError::Config("home directory unknown, cannot place property file".into())
        })?;
        Ok(format!(
            "{}/.{}.{}.{}.properties",
            home.trim_end_matches(['/', '\\']),
            scope.owner,
            scope.program,
            command
        ))
    }
}

/// Build `root.path="value" root.path2 ...` from change assignments.
fn synthesize(root: &str, assignments: &[String]) -> String {
    assignments
        .iter()
        .map(|a| match a.split_once('=') {
            Some((path, value)) => {
                format!("{root}.{}=\"{}\"", path.trim(), escape(value.trim()))
            },
            None => format!("{root}.{}", a.trim()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn header(scope: &Scope) -> String {
    format!(
        "# Property file of program '{}' for owner '{}'\n\
         # Remove the leading '#' of a line to activate that property.\n",
        scope.program, scope.owner
    )
}

fn write_file(path: &str, text: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}
