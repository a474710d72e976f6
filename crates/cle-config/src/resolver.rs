//! Property-file precedence chain.
//!
//! For a scope the store is probed at command, program and owner level;
//! the first key present wins. The resolver only reads from the store.

use cle_types::error::Result;

use crate::env::Environment;
use crate::key::{ConfigKey, PropertyLevel, Scope};
use crate::path::{FileReader, map_file_name};
use crate::store::ConfigStore;

/// A resolved property file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyScope {
    /// Mapped path of the property file, if any level matched.
    pub path: Option<String>,
    /// File content; `None` when no file was found at `path`.
    pub content: Option<String>,
    pub level: PropertyLevel,
}

impl PropertyScope {
    fn none() -> Self {
        Self {
            path: None,
            content: None,
            level: PropertyLevel::None,
        }
    }

    /// Whether the file is pinned at command level.
    pub fn is_pinned(&self) -> bool {
        self.level == PropertyLevel::Command
    }
}

/// Borrowing view that resolves property files for a run.
pub struct PropertyResolver<'a> {
    store: &'a ConfigStore,
    reader: &'a dyn FileReader,
    env: &'a dyn Environment,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(
        store: &'a ConfigStore,
        reader: &'a dyn FileReader,
        env: &'a dyn Environment,
    ) -> Self {
        Self { store, reader, env }
    }

    /// First matching level with its key and raw (unmapped) path.
    pub fn locate(&self, scope: &Scope) -> Option<(PropertyLevel, ConfigKey, String)> {
        scope
            .property_candidates()
            .into_iter()
            .find_map(|(level, key)| {
                self.store
                    .get(&key.to_string())
                    .map(|value| (level, key, value.to_string()))
            })
    }

    /// Locate and load the active property file of `scope`.
    pub fn resolve(&self, scope: &Scope) -> Result<PropertyScope> {
        let Some((level, key, raw)) = self.locate(scope) else {
            log::debug!("No property file for {}", scope.root());
            return Ok(PropertyScope::none());
        };
        let path = map_file_name(&raw, self.env);
        let content = self.reader.read(&path)?;
        match &content {
            Some(text) => log::debug!(
                "Resolved property file {path} ({} bytes) at {level} level via {key}",
                text.len()
            ),
            None => log::warn!(
                "Property file {path} named by {key} does not exist, using defaults"
            ),
        }
        Ok(PropertyScope {
            path: Some(path),
            content,
            level,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::env::MemoryEnvironment;

    #[derive(Default)]
    struct FakeReader {
        files: HashMap<String, String>,
    }

    impl FakeReader {
        fn with(mut self, path: &str, text: &str) -> Self {
            self.files.insert(path.to_string(), text.to_string());
            self
        }
    }

    impl FileReader for FakeReader {
        fn read(&self, path: &str) -> Result<Option<String>> {
            Ok(self.files.get(path).cloned())
        }
    }

    fn store(pairs: &[(&str, &str)]) -> ConfigStore {
        let mut store = ConfigStore::in_memory(true, "b");
        for (k, v) in pairs {
            store.set(k, v, true).unwrap();
        }
        store
    }

    #[test]
    fn command_level_match_and_fallthrough_to_none() {
        let store = store(&[("a.b.c.property.file", "/tmp/x.props")]);
        let reader = FakeReader::default().with("/tmp/x.props", "a.b.c.n=\"1\"");
        let env = MemoryEnvironment::new();
        let resolver = PropertyResolver::new(&store, &reader, &env);

        let hit = resolver.resolve(&Scope::new("a", "b").with_command("c")).unwrap();
        assert_eq!(hit.path.as_deref(), Some("/tmp/x.props"));
        assert_eq!(hit.level, PropertyLevel::Command);
        assert!(hit.is_pinned());
        assert_eq!(hit.content.as_deref(), Some("a.b.c.n=\"1\""));

        let miss = resolver.resolve(&Scope::new("a", "b").with_command("d")).unwrap();
        assert_eq!(miss.level, PropertyLevel::None);
        assert!(miss.path.is_none());
    }

    #[test]
    fn command_level_beats_program_level() {
        let store = store(&[
            ("o.p.property.file", "/prog.props"),
            ("o.p.c.property.file", "/cmd.props"),
            ("o.property.file", "/owner.props"),
        ]);
        let reader = FakeReader::default();
        let env = MemoryEnvironment::new();
        let resolver = PropertyResolver::new(&store, &reader, &env);
        let (level, key, path) = resolver
            .locate(&Scope::new("o", "p").with_command("c"))
            .unwrap();
        assert_eq!(level, PropertyLevel::Command);
        assert_eq!(key.to_string(), "o.p.c.property.file");
        assert_eq!(path, "/cmd.props");
    }

    #[test]
    fn program_then_owner_level() {
        let store = store(&[("o.property.file", "/owner.props")]);
        let reader = FakeReader::default();
        let env = MemoryEnvironment::new();
        let resolver = PropertyResolver::new(&store, &reader, &env);
        let scope = Scope::new("o", "p").with_command("c");
        assert_eq!(resolver.locate(&scope).unwrap().0, PropertyLevel::Owner);

        let store = self::store(&[
            ("o.property.file", "/owner.props"),
            ("o.p.property.file", "/prog.props"),
        ]);
        let resolver = PropertyResolver::new(&store, &reader, &env);
        assert_eq!(resolver.locate(&scope).unwrap().0, PropertyLevel::Program);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let store = store(&[("o.p.property.file", "/gone.props")]);
        let reader = FakeReader::default();
        let env = MemoryEnvironment::new();
        let resolved = PropertyResolver::new(&store, &reader, &env)
            .resolve(&Scope::new("o", "p"))
            .unwrap();
        assert_eq!(resolved.level, PropertyLevel::Program);
        assert_eq!(resolved.path.as_deref(), Some("/gone.props"));
        assert!(resolved.content.is_none());
    }

    #[test]
    fn stored_path_is_mapped() {
        let store = store(&[("o.p.property.file", "~/p.props")]);
        let reader = FakeReader::default().with("/home/o/p.props", "x");
        let env = MemoryEnvironment::new().with("HOME", "/home/o");
        let resolved = PropertyResolver::new(&store, &reader, &env)
            .resolve(&Scope::new("o", "p"))
            .unwrap();
        assert_eq!(resolved.path.as_deref(), Some("/home/o/p.props"));
        assert_eq!(resolved.content.as_deref(), Some("x"));
    }
}
