//! Command trait and the four-phase protocol around it.
//!
//! A user command is driven through `init` (declare arguments and their
//! hard-coded defaults), parse (property file, then command line), `map`
//! (copy parsed values into the command), `run` and `finish`. The
//! [`PhaseGuard`] makes sure `finish` runs exactly once after `map` was
//! entered, whichever way the dispatcher leaves.

use std::io::Write;

use cle_config::Environment;
use cle_types::code::ConditionCode;
use cle_types::error::Result;

use crate::table::ArgTable;

/// A user-defined command.
pub trait Command {
    /// Keyword typed on the command line (matched exactly).
    fn keyword(&self) -> &str;

    /// One-line description for `HELP`.
    fn description(&self) -> &str;

    /// Manual page text for `HELP ... MAN`, `MANPAGE` and generated docs.
    fn manpage(&self) -> &str {
        ""
    }

    /// Hidden commands are dispatched but not listed in help output.
    fn hidden(&self) -> bool {
        false
    }

    /// Declare arguments and their hard-coded defaults.
    fn init(&mut self, table: &mut ArgTable) -> Result<()>;

    /// Copy parsed values into the command.
    fn map(&mut self, table: &ArgTable) -> Result<()>;

    /// Execute the command.
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Result<Outcome>;

    /// Release anything acquired in `map` or `run`.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What a command hands to the dispatcher after `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Raw condition code before clamping.
    pub code: i32,
    /// Command-specific reason, resolved to text by the host's lookup.
    pub reason: Option<i32>,
    pub warning: bool,
}

impl Outcome {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            reason: None,
            warning: false,
        }
    }

    pub fn ok() -> Self {
        Self::new(ConditionCode::Ok.code())
    }

    /// Successful, with an informational message written.
    pub fn info() -> Self {
        Self::new(ConditionCode::Info.code())
    }

    pub fn warning(reason: i32) -> Self {
        Self {
            code: ConditionCode::Warning.code(),
            reason: Some(reason),
            warning: true,
        }
    }

    pub fn failed(reason: i32) -> Self {
        Self {
            code: ConditionCode::RunFailed.code(),
            reason: Some(reason),
            warning: false,
        }
    }

    /// A command-defined code above the standard ceiling.
    pub fn special(code: i32, reason: Option<i32>) -> Self {
        Self {
            code,
            reason,
            warning: false,
        }
    }
}

/// Run-time view a command gets of the executor.
pub struct RunContext<'a> {
    pub owner: &'a str,
    pub program: &'a str,
    pub command: &'a str,
    /// Normal output; a sink when QUIET is active.
    pub out: &'a mut dyn Write,
    pub env: &'a mut dyn Environment,
}

/// Calls `finish` on the wrapped command exactly once.
///
/// Use [`PhaseGuard::finish`] on the success path to observe its result;
/// on any other path the guard finishes the command when dropped.
pub struct PhaseGuard<'c> {
    command: Option<&'c mut dyn Command>,
    keyword: String,
}

impl<'c> PhaseGuard<'c> {
    pub fn new(command: &'c mut dyn Command) -> Self {
        let keyword = command.keyword().to_string();
        Self {
            command: Some(command),
            keyword,
        }
    }

    /// Map parsed arguments into the guarded command.
    pub fn map(&mut self, table: &ArgTable) -> Result<()> {
        match self.command.as_deref_mut() {
            Some(command) => command.map(table),
            None => Ok(()),
        }
    }

    /// Run the guarded command.
    pub fn run(&mut self, ctx: &mut RunContext<'_>) -> Result<Outcome> {
        match self.command.as_deref_mut() {
            Some(command) => command.run(ctx),
            None => Ok(Outcome::ok()),
        }
    }

    /// Finish the command and return its result.
    pub fn finish(mut self) -> Result<()> {
        match self.command.take() {
            Some(command) => {
                log::debug!("Finishing command {}", self.keyword);
                command.finish()
            },
            None => Ok(()),
        }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(command) = self.command.take() {
            log::debug!("Finishing command {} after early exit", self.keyword);
            if let Err(e) = command.finish() {
                log::warn!("Finish of command {} failed: {e}", self.keyword);
            }
        }
    }
}
