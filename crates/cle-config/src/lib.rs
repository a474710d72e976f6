//! Configuration and property-file resolution for the command line executor.
//!
//! A run owns exactly one [`ConfigStore`]. The [`PropertyResolver`] walks the
//! command/program/owner precedence chain over that store to find the active
//! property file, and [`PropertyLifecycle`] generates, activates, changes and
//! removes property files. Access to the process environment goes through
//! the [`Environment`] capability so precedence logic stays testable.

pub mod env;
pub mod key;
pub mod lifecycle;
pub mod path;
pub mod resolver;
pub mod store;
pub mod table;

/// Process environment capability (get/set/unset).
pub use env::{Environment, MemoryEnvironment, OsEnvironment};
/// Typed configuration keys.
pub use key::{ConfigKey, PropertyLevel, Scope};
/// Property file operations: generate, activate, change, remove, get.
pub use lifecycle::{ChangeReport, PropertyLifecycle};
/// File-name mapping and the injectable file reader.
pub use path::{FileReader, LocalFileReader, map_file_name};
/// Precedence walk over the config store.
pub use resolver::{PropertyResolver, PropertyScope};
/// Ordered, file-backed key/value store.
pub use store::ConfigStore;
/// Seam to the property grammar parser.
pub use table::PropertyTable;
