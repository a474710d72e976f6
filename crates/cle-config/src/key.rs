//! Typed builder for dotted configuration keys.
//!
//! Keys are built from `{owner, program, command?, suffix}` in one place so
//! the precedence chain is expressed once instead of being re-spelled at
//! every call site.

use std::fmt;

/// The owner/program/command triple a run or built-in operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub owner: String,
    pub program: String,
    pub command: Option<String>,
}

impl Scope {
    /// Program-wide scope (no command).
    pub fn new(owner: &str, program: &str) -> Self {
        Self {
            owner: owner.to_string(),
            program: program.to_string(),
            command: None,
        }
    }

    /// Same owner and program, narrowed to one command.
    pub fn with_command(&self, command: &str) -> Self {
        Self {
            owner: self.owner.clone(),
            program: self.program.clone(),
            command: Some(command.to_string()),
        }
    }

    /// Dotted root of property paths: `owner.program[.command]`.
    pub fn root(&self) -> String {
        match &self.command {
            Some(cmd) => format!("{}.{}.{cmd}", self.owner, self.program),
            None => format!("{}.{}", self.owner, self.program),
        }
    }

    /// The property-file keys to probe, most specific first.
    ///
    /// Without a command the command level is skipped.
    pub fn property_candidates(&self) -> Vec<(PropertyLevel, ConfigKey)> {
        let mut keys = Vec::with_capacity(3);
        if self.command.is_some() {
            keys.push((PropertyLevel::Command, ConfigKey::property_file(self)));
        }
        keys.push((
            PropertyLevel::Program,
            ConfigKey::program_property_file(self),
        ));
        keys.push((PropertyLevel::Owner, ConfigKey::owner_property_file(self)));
        keys
    }
}

/// Which precedence level supplied a property file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyLevel {
    /// `owner.program.command.property.file`; the file is explicitly pinned.
    Command,
    /// `owner.program.property.file`.
    Program,
    /// `owner.property.file`.
    Owner,
    /// No property file; hard-coded defaults only.
    None,
}

impl PropertyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Program => "program",
            Self::Owner => "owner",
            Self::None => "none",
        }
    }
}

impl fmt::Display for PropertyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dotted configuration key: `[owner.][program.][command.]suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    owner: Option<String>,
    program: Option<String>,
    command: Option<String>,
    suffix: String,
}

impl ConfigKey {
    fn build(owner: Option<&str>, program: Option<&str>, command: Option<&str>, suffix: &str) -> Self {
        Self {
            owner: owner.map(str::to_string),
            program: program.map(str::to_string),
            command: command.map(str::to_string),
            suffix: suffix.to_string(),
        }
    }

    /// `owner.program[.command].property.file`, following the scope's command.
    pub fn property_file(scope: &Scope) -> Self {
        Self::build(
            Some(&scope.owner),
            Some(&scope.program),
            scope.command.as_deref(),
            "property.file",
        )
    }

    /// `owner.program.property.file`, ignoring any command.
    pub fn program_property_file(scope: &Scope) -> Self {
        Self::build(Some(&scope.owner), Some(&scope.program), None, "property.file")
    }

    /// `owner.property.file`.
    pub fn owner_property_file(scope: &Scope) -> Self {
        Self::build(Some(&scope.owner), None, None, "property.file")
    }

    /// `program.owner.id`.
    pub fn owner_id(program: &str) -> Self {
        Self::build(None, Some(program), None, "owner.id")
    }

    /// `owner.program.trace`.
    pub fn trace(scope: &Scope) -> Self {
        Self::build(Some(&scope.owner), Some(&scope.program), None, "trace")
    }

    /// `owner.program.trace.file`.
    pub fn trace_file(scope: &Scope) -> Self {
        Self::build(Some(&scope.owner), Some(&scope.program), None, "trace.file")
    }

    /// `owner.program[.command].envar.<name>`.
    pub fn envar(scope: &Scope, name: &str) -> Self {
        Self::build(
            Some(&scope.owner),
            Some(&scope.program),
            scope.command.as_deref(),
            &format!("envar.{name}"),
        )
    }

    /// Prefix shared by all envar keys of a scope, including the trailing dot.
    pub fn envar_prefix(scope: &Scope) -> String {
        format!("{}.envar.", scope.root())
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.owner, &self.program, &self.command]
            .into_iter()
            .flatten()
        {
            write!(f, "{part}.")?;
        }
        f.write_str(&self.suffix)
    }
}
