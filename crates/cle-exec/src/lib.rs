//! Command line executor.
//!
//! A host program describes itself with a [`ProgramInfo`], registers its
//! commands with a [`Dispatcher`] and hands it the argument vector. The
//! dispatcher resolves owner and properties, drives the command through its
//! phases or runs one of the built-in functions, and returns the condition
//! code to publish as exit status.

mod builtin;
mod command;
mod console;
mod dispatcher;
mod docs;
mod options;
mod program;
mod table;

/// Keywords of the built-in functions.
pub use builtin::{Builtin, strip_dashes};
/// The user command trait and what it exchanges with the dispatcher.
pub use command::{Command, Outcome, PhaseGuard, RunContext};
/// Output channels and the trace sink.
pub use console::{Console, TraceSink};
/// One run from argument vector to condition code.
pub use dispatcher::{Dispatcher, Phase, ReasonLookup};
/// Documentation model and renderers.
pub use docs::{AsciiDocRenderer, DocRenderer, DocSection, Document};
/// QUIET/SILENT/MAXCC/OWNER= run options.
pub use options::{ENV_MAX_CC, ENV_MIN_CC, ENV_QUIET, ENV_SILENT, RunOptions, ScanError};
/// Program metadata.
pub use program::{ProgramInfo, SpecialCode};
/// Argument tables and the command-line tokenizer.
pub use table::{ArgKind, ArgTable, GRAMMAR, LEXEMES, tokenize};
