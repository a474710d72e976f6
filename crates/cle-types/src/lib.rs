//! Foundation types for the command line executor.
//!
//! This crate holds the types shared by every other crate of the workspace:
//! the error enum with its `Result` alias, and the condition-code taxonomy
//! together with the policy that clamps raw outcomes onto it.

pub mod code;
pub mod error;

pub use code::{CEILING, CcPolicy, ConditionCode};
pub use error::{CleError, Result};
