//! The dispatcher: one run from argument vector to condition code.
//!
//! A run scans the run options, opens the configuration store, resolves the
//! owner, then matches the first argument against the built-in functions and
//! the registered commands, falling back to the default command once. Every
//! path ends in [`Dispatcher::terminate`], which flushes the store, closes
//! the trace and applies the condition-code policy exactly once.

mod functions;
#[cfg(test)]
mod tests;

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use cle_config::env::materialize_envars;
use cle_config::{
    ConfigKey, ConfigStore, Environment, FileReader, LocalFileReader, OsEnvironment,
    PropertyResolver, PropertyTable, Scope, map_file_name,
};
use cle_types::code::{CcPolicy, ConditionCode, classify, is_special};
use cle_types::error::{CleError, Result};

use crate::builtin::{Builtin, strip_dashes};
use crate::command::{Command, PhaseGuard, RunContext};
use crate::console::{Console, TraceSink};
use crate::docs::DocRenderer;
use crate::options::{ENV_QUIET, ENV_SILENT, RunOptions, owner_id};
use crate::program::ProgramInfo;
use crate::table::ArgTable;

/// Host-supplied reason code to message lookup.
pub type ReasonLookup = Box<dyn Fn(i32) -> Option<String>>;

/// Where in a run a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Init,
    Parse,
    Map,
    Run,
    Finish,
    Builtin,
    Terminate,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Init => "init",
            Self::Parse => "parse",
            Self::Map => "map",
            Self::Run => "run",
            Self::Finish => "finish",
            Self::Builtin => "built-in",
            Self::Terminate => "terminate",
        }
    }

    /// Code reported for any failure of a user command in this phase.
    fn code(self) -> Option<ConditionCode> {
        match self {
            Self::Init => Some(ConditionCode::InitFailed),
            Self::Parse => Some(ConditionCode::SyntaxError),
            Self::Map => Some(ConditionCode::MapFailed),
            Self::Run => Some(ConditionCode::RunFailed),
            Self::Finish => Some(ConditionCode::FinishFailed),
            Self::Resolve | Self::Builtin | Self::Terminate => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Failure {
    phase: Phase,
    command: Option<String>,
    error: CleError,
}

impl Failure {
    fn resolve(error: CleError) -> Self {
        Self {
            phase: Phase::Resolve,
            command: None,
            error,
        }
    }

    fn at(phase: Phase, command: &str) -> impl FnOnce(CleError) -> Failure + use<> {
        let command = command.to_string();
        move |error| Failure {
            phase,
            command: Some(command),
            error,
        }
    }

    fn code(&self) -> i32 {
        self.phase
            .code()
            .unwrap_or_else(|| self.error.condition_code())
            .code()
    }
}

/// Resources owned by one run and released by `terminate`.
struct RunState {
    store: ConfigStore,
    scope: Scope,
    trace: TraceSink,
    policy: CcPolicy,
}

/// Executes commands of one program.
pub struct Dispatcher {
    info: ProgramInfo,
    commands: Vec<Box<dyn Command>>,
    env: Box<dyn Environment>,
    reader: Box<dyn FileReader>,
    reasons: Option<ReasonLookup>,
    html: Option<Box<dyn DocRenderer>>,
    config_path: Option<PathBuf>,
    console: Console,
}

impl Dispatcher {
    /// Dispatcher on the process environment, local files and stdio.
    pub fn new(info: ProgramInfo) -> Self {
        Self {
            info,
            commands: Vec::new(),
            env: Box::new(OsEnvironment::new()),
            reader: Box::new(LocalFileReader),
            reasons: None,
            html: None,
            config_path: None,
            console: Console::stdio(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    #[must_use]
    pub fn with_reader(mut self, reader: impl FileReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Enables ERRORS and reason texts in failure reports.
    #[must_use]
    pub fn with_reason_lookup(mut self, lookup: impl Fn(i32) -> Option<String> + 'static) -> Self {
        self.reasons = Some(Box::new(lookup));
        self
    }

    /// Enables HTMLDOC.
    #[must_use]
    pub fn with_html_renderer(mut self, renderer: impl DocRenderer + 'static) -> Self {
        self.html = Some(Box::new(renderer));
        self
    }

    /// Config file used when `<PROGRAM>_CONFIG_FILE` is not set.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, out: impl Write + 'static, err: impl Write + 'static) -> Self {
        self.console = Console::new(Box::new(out), Box::new(err));
        self
    }

    /// Register a command. Replaces any command with the same keyword.
    pub fn register(&mut self, command: Box<dyn Command>) {
        if Builtin::from_keyword(command.keyword(), self.info.case_sensitive)
            .is_some_and(|b| self.is_available(b))
        {
            log::warn!(
                "Command {} is shadowed by the built-in function of the same name",
                command.keyword()
            );
        }
        match self.command_position(command.keyword()) {
            Some(i) => self.commands[i] = command,
            None => self.commands.push(command),
        }
    }

    pub fn info(&self) -> &ProgramInfo {
        &self.info
    }

    pub fn environment(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    /// Whether a built-in function has what it needs from the host.
    pub fn is_available(&self, builtin: Builtin) -> bool {
        match builtin {
            Builtin::License => self.info.license.is_some(),
            Builtin::Version => self.info.version.is_some(),
            Builtin::About => self.info.about.is_some(),
            Builtin::Errors => self.reasons.is_some(),
            Builtin::Htmldoc => self.html.is_some(),
            _ => true,
        }
    }

    /// Run one command line and return the condition code for the process.
    pub fn execute(&mut self, argv: &[String]) -> i32 {
        self.console
            .set_mode(self.env.is_enabled(ENV_QUIET), self.env.is_enabled(ENV_SILENT));
        let mut state = RunState {
            store: ConfigStore::in_memory(self.info.case_sensitive, &self.info.program),
            scope: Scope::new(&self.info.default_owner, &self.info.program),
            trace: TraceSink::Off,
            policy: CcPolicy::default(),
        };

        let raw = match self.dispatch(argv, &mut state) {
            Ok(code) => code,
            Err(failure) => {
                let code = failure.code();
                state.trace.line(failure.phase.as_str(), &failure.error.to_string());
                self.report(
                    failure.phase,
                    failure.command.as_deref(),
                    code,
                    &failure.error.to_string(),
                    None,
                );
                code
            },
        };
        self.terminate(state, raw)
    }

    /// The single exit of a run.
    fn terminate(&mut self, state: RunState, raw: i32) -> i32 {
        let RunState {
            store,
            mut trace,
            policy,
            ..
        } = state;
        let mut raw = raw;
        if let Err(e) = store.close() {
            let code = e.condition_code().code();
            trace.line(Phase::Terminate.as_str(), &e.to_string());
            self.report(Phase::Terminate, None, code, &e.to_string(), None);
            if !is_special(raw) {
                raw = raw.max(code);
            }
        }
        trace.line("end", &format!("raw condition code {raw}"));
        trace.close();
        self.console.flush();

        let code = policy.apply(raw);
        log::info!(
            "{} finished with condition code {code} (raw {raw})",
            self.info.program
        );
        code
    }

    fn dispatch(&mut self, argv: &[String], state: &mut RunState) -> std::result::Result<i32, Failure> {
        let options = match RunOptions::scan(argv, self.env.as_ref()) {
            Ok(options) => options,
            Err(e) => {
                self.console.set_mode(e.quiet, e.silent);
                return Err(Failure::resolve(e.error));
            },
        };
        state.policy = options.policy;
        self.console.set_mode(options.quiet, options.silent);

        let path = self.config_file().map_err(Failure::resolve)?;
        state.store = ConfigStore::open(&path, self.info.case_sensitive, &self.info.program)
            .map_err(Failure::resolve)?;

        let owner = self
            .resolve_owner(options.owner.as_deref(), &state.store)
            .map_err(Failure::resolve)?;
        self.env.set("OWNERID", &owner);
        state.scope = Scope::new(&owner, &self.info.program);
        state.trace = TraceSink::open(&state.store, &state.scope, self.env.as_ref());
        state.trace.line(
            "start",
            &format!("owner {owner}, configuration {}", path.display()),
        );
        let count = materialize_envars(&state.store, &state.scope, self.env.as_mut());
        log::debug!(
            "Run of {} for owner {owner} with {count} stored environment variable(s)",
            self.info.program
        );

        let mut args = options.args;
        let mut fallback_used = false;
        loop {
            if let Some(first) = args.get(1) {
                let word = strip_dashes(first);
                if let Some(builtin) = self.match_builtin(word) {
                    log::debug!("Running built-in function {}", builtin.keyword());
                    state.trace.line("builtin", builtin.keyword());
                    return self
                        .run_builtin(builtin, &args[2..], state)
                        .map_err(Failure::at(Phase::Builtin, builtin.keyword()));
                }
                if let Some(index) = self.command_position(word) {
                    return self.run_command(index, &args[2..], state);
                }
            }

            let default = match (&self.info.default_command, fallback_used) {
                (Some(default), false) => default.clone(),
                _ => {
                    let message = match args.get(1) {
                        Some(word) => format!("unknown command or built-in function '{word}'"),
                        None => "no command given".to_string(),
                    };
                    return Err(Failure::resolve(CleError::Command(message)));
                },
            };
            log::debug!("Falling back to default command {default}");
            fallback_used = true;
            if args.len() < 2 {
                args.push(default);
            } else {
                args.insert(1, default);
            }
        }
    }

    fn config_file(&self) -> Result<PathBuf> {
        let var = self.info.config_env_var();
        if let Some(path) = self.env.get(&var).filter(|p| !p.trim().is_empty()) {
            return Ok(PathBuf::from(map_file_name(&path, self.env.as_ref())));
        }
        if let Some(path) = &self.config_path {
            return Ok(path.clone());
        }
        let home = self.env.home().ok_or_else(|| {
            CleError::Config(format!(
                "home directory unknown, set {var} to locate the configuration"
            ))
        })?;
        Ok(PathBuf::from(format!(
            "{}/.{}.config",
            home.trim_end_matches(['/', '\\']),
            self.info.program.to_lowercase()
        )))
    }

    /// First present of token, environment, stored owner id and default.
    fn resolve_owner(&self, token: Option<&str>, store: &ConfigStore) -> Result<String> {
        let owner = token
            .map(str::to_string)
            .or_else(|| {
                self.env
                    .get(&self.info.owner_env_var())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
            .or_else(|| {
                store
                    .get(&ConfigKey::owner_id(&self.info.program).to_string())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.info.default_owner.clone());
        Ok(owner_id(&owner)?.to_string())
    }

    fn match_builtin(&self, word: &str) -> Option<Builtin> {
        Builtin::from_keyword(word, self.info.case_sensitive).filter(|b| self.is_available(*b))
    }

    fn command_position(&self, word: &str) -> Option<usize> {
        self.commands.iter().position(|c| {
            if self.info.case_sensitive {
                c.keyword() == word
            } else {
                c.keyword().eq_ignore_ascii_case(word)
            }
        })
    }

    /// Init, parse, map, run and finish one user command.
    fn run_command(
        &mut self,
        index: usize,
        args: &[String],
        state: &mut RunState,
    ) -> std::result::Result<i32, Failure> {
        let keyword = self.commands[index].keyword().to_string();
        let scope = state.scope.with_command(&keyword);
        materialize_envars(&state.store, &scope, self.env.as_mut());

        let command = &mut self.commands[index];
        let mut table = ArgTable::new(self.info.case_sensitive);
        command
            .init(&mut table)
            .map_err(Failure::at(Phase::Init, &keyword))?;
        state.trace.line("init", &format!("{keyword}: {} argument(s)", table.len()));

        let resolved = PropertyResolver::new(&state.store, self.reader.as_ref(), self.env.as_ref())
            .resolve(&scope)
            .map_err(Failure::at(Phase::Resolve, &keyword))?;
        if let Some(content) = &resolved.content {
            table
                .apply_properties(content, &scope.root())
                .map_err(Failure::at(Phase::Parse, &keyword))?;
        }
        table
            .parse_args(args)
            .map_err(Failure::at(Phase::Parse, &keyword))?;
        state.trace.line(
            "parse",
            &format!(
                "{keyword}: property file {} ({})",
                resolved.path.as_deref().unwrap_or("-"),
                resolved.level
            ),
        );

        let mut guard = PhaseGuard::new(command.as_mut());
        guard
            .map(&table)
            .map_err(Failure::at(Phase::Map, &keyword))?;
        state.trace.line("map", &keyword);

        let outcome = {
            let mut ctx = RunContext {
                owner: &state.scope.owner,
                program: &self.info.program,
                command: &keyword,
                out: self.console.out(),
                env: self.env.as_mut(),
            };
            guard.run(&mut ctx)
        }
        .map_err(Failure::at(Phase::Run, &keyword))?;
        state.trace.line(
            "run",
            &format!("{keyword}: condition code {}", outcome.code),
        );

        if let Err(e) = guard.finish() {
            if !is_special(outcome.code) && outcome.code < ConditionCode::FinishFailed.code() {
                return Err(Failure::at(Phase::Finish, &keyword)(e));
            }
            log::warn!(
                "Finish of {keyword} failed after condition code {}: {e}",
                outcome.code
            );
        }

        if outcome.code >= ConditionCode::Warning.code() {
            let message = if outcome.warning || outcome.code == ConditionCode::Warning.code() {
                "command completed with a warning"
            } else {
                "command did not complete successfully"
            };
            self.report(Phase::Run, Some(&keyword), outcome.code, message, outcome.reason);
        }
        Ok(outcome.code)
    }

    /// Fresh argument table of a command, with its active properties if asked.
    fn command_table(
        &mut self,
        index: usize,
        state: &RunState,
        with_properties: bool,
    ) -> Result<ArgTable> {
        let keyword = self.commands[index].keyword().to_string();
        let mut table = ArgTable::new(self.info.case_sensitive);
        self.commands[index].init(&mut table)?;
        if with_properties {
            let scope = state.scope.with_command(&keyword);
            let resolved =
                PropertyResolver::new(&state.store, self.reader.as_ref(), self.env.as_ref())
                    .resolve(&scope)?;
            if let Some(content) = &resolved.content {
                table.apply_properties(content, &scope.root())?;
            }
        }
        Ok(table)
    }

    /// Write a failure report to the error console and the log.
    fn report(
        &mut self,
        phase: Phase,
        command: Option<&str>,
        code: i32,
        message: &str,
        reason: Option<i32>,
    ) {
        let classification = match self.info.special_code(code) {
            Some(special) => format!("{code}: {}", special.description),
            None => classify(code),
        };
        let reason_line = reason.map(|r| {
            let text = self
                .reasons
                .as_ref()
                .and_then(|lookup| lookup(r))
                .unwrap_or_else(|| "no message available".to_string());
            format!("reason {r}: {text}")
        });
        let subject = command.unwrap_or(&self.info.program);

        if code >= ConditionCode::RunFailed.code() {
            log::error!("{phase} of {subject} failed: {message} ({classification})");
        } else {
            log::warn!("{phase} of {subject}: {message} ({classification})");
        }

        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let program = self.info.program.clone();
        let err = self.console.err();
        let _ = writeln!(err, "{stamp} {program}: {phase} of {subject} failed: {message}");
        let _ = writeln!(err, "  condition code {classification}");
        if let Some(line) = reason_line {
            let _ = writeln!(err, "  {line}");
        }
    }
}
