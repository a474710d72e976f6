//! Condition-code taxonomy and the policy that clamps raw outcomes onto it.
//!
//! Standard codes form a strictly increasing severity scale up to
//! [`CEILING`]. Anything above the ceiling is a *special* code defined by a
//! user command; special codes are never clamped.

use std::fmt;

use crate::error::{CleError, Result};

/// Highest value of the standard taxonomy. Codes above it are special.
pub const CEILING: i32 = 64;

/// A standard condition code, ordered by ascending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionCode {
    Ok,
    Info,
    FinishFailed,
    Warning,
    RunFailed,
    MapFailed,
    SyntaxError,
    CommandError,
    InitFailed,
    ConfigError,
    TableError,
    SystemError,
    AccessError,
    InterfaceError,
    MemoryError,
    Fatal,
}

impl ConditionCode {
    /// Every standard code in ascending order.
    pub const ALL: [ConditionCode; 16] = [
        Self::Ok,
        Self::Info,
        Self::FinishFailed,
        Self::Warning,
        Self::RunFailed,
        Self::MapFailed,
        Self::SyntaxError,
        Self::CommandError,
        Self::InitFailed,
        Self::ConfigError,
        Self::TableError,
        Self::SystemError,
        Self::AccessError,
        Self::InterfaceError,
        Self::MemoryError,
        Self::Fatal,
    ];

    /// Numeric value published as process exit code.
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Info => 1,
            Self::FinishFailed => 2,
            Self::Warning => 4,
            Self::RunFailed => 8,
            Self::MapFailed => 12,
            Self::SyntaxError => 16,
            Self::CommandError => 20,
            Self::InitFailed => 24,
            Self::ConfigError => 28,
            Self::TableError => 32,
            Self::SystemError => 36,
            Self::AccessError => 40,
            Self::InterfaceError => 44,
            Self::MemoryError => 48,
            Self::Fatal => 52,
        }
    }

    /// Look up the standard code with exactly this numeric value.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Short lower-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::FinishFailed => "finish-failed",
            Self::Warning => "warning",
            Self::RunFailed => "run-failed",
            Self::MapFailed => "map-failed",
            Self::SyntaxError => "syntax-error",
            Self::CommandError => "command-error",
            Self::InitFailed => "init-failed",
            Self::ConfigError => "config-error",
            Self::TableError => "table-error",
            Self::SystemError => "system-error",
            Self::AccessError => "access-error",
            Self::InterfaceError => "interface-error",
            Self::MemoryError => "memory-error",
            Self::Fatal => "fatal",
        }
    }

    /// Static human-readable classification.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "command line, syntax, mapping, execution and finish were successful",
            Self::Info => "command was successful but an informational message was written",
            Self::FinishFailed => "command was successful but its cleanup failed",
            Self::Warning => "command was executed but returned a warning",
            Self::RunFailed => "command was mapped but its execution failed",
            Self::MapFailed => "command syntax was valid but mapping of the parameters failed",
            Self::SyntaxError => "command line or property file has a syntax error",
            Self::CommandError => "command or built-in function is unknown or was used wrongly",
            Self::InitFailed => "initialization of the command or its parameter table failed",
            Self::ConfigError => "configuration could not be read, written or resolved",
            Self::TableError => "the argument table of a command is invalid",
            Self::SystemError => "an operating system call failed",
            Self::AccessError => "access to a file or resource was denied",
            Self::InterfaceError => "an interface between host program and executor was misused",
            Self::MemoryError => "memory allocation failed",
            Self::Fatal => "fatal error, the run was aborted",
        }
    }
}

impl fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

/// Whether `raw` is a command-defined special code above the ceiling.
pub const fn is_special(raw: i32) -> bool {
    raw > CEILING
}

/// Human-readable classification of any raw code.
///
/// Values between two standard codes are classified by the next lower one.
pub fn classify(raw: i32) -> String {
    if is_special(raw) {
        return format!("{raw}: special condition code defined by the command");
    }
    let base = ConditionCode::ALL
        .iter()
        .rev()
        .find(|c| c.code() <= raw)
        .copied()
        .unwrap_or(ConditionCode::Ok);
    format!("{raw}: {}", base.description())
}

/// Run-scoped clamp bounds for standard condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcPolicy {
    min: i32,
    max: i32,
}

impl Default for CcPolicy {
    fn default() -> Self {
        Self {
            min: 0,
            max: i32::MAX,
        }
    }
}

impl CcPolicy {
    /// Create a policy; requires `0 <= min <= max`.
    pub fn new(max: i32, min: i32) -> Result<Self> {
        if min < 0 || max < 0 {
            return Err(CleError::Syntax(format!(
                "condition code bounds must not be negative (max={max}, min={min})"
            )));
        }
        if min > max {
            return Err(CleError::Syntax(format!(
                "minimum condition code {min} is greater than maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// Map a raw outcome onto the published scale.
    ///
    /// Special codes pass through unchanged. Standard codes above `max`
    /// become `max`, codes below `min` become 0.
    pub fn apply(&self, raw: i32) -> i32 {
        if is_special(raw) {
            return raw;
        }
        if raw > self.max {
            self.max
        } else if raw < self.min {
            0
        } else {
            raw
        }
    }

    /// Build the run policy from environment values and a `MAXCC=` token.
    ///
    /// Later sources override earlier ones: default, then `env_max`/`env_min`,
    /// then the token's `max[-min]`.
    pub fn from_sources(
        env_max: Option<&str>,
        env_min: Option<&str>,
        token: Option<&str>,
    ) -> Result<Self> {
        let defaults = Self::default();
        let mut max = match env_max {
            Some(text) => parse_code(text)?,
            None => defaults.max,
        };
        let mut min = match env_min {
            Some(text) => parse_code(text)?,
            None => defaults.min,
        };
        if let Some(text) = token {
            let (token_max, token_min) = parse_bounds(text)?;
            max = token_max;
            if let Some(m) = token_min {
                min = m;
            }
        }
        Self::new(max, min)
    }
}

/// Parse the value part of a `MAXCC=max[-min]` token.
pub fn parse_bounds(text: &str) -> Result<(i32, Option<i32>)> {
    let text = text.trim();
    match text.split_once('-') {
        Some((max, min)) => {
            let max = if max.trim().is_empty() {
                i32::MAX
            } else {
                parse_code(max)?
            };
            Ok((max, Some(parse_code(min)?)))
        },
        None => Ok((parse_code(text)?, None)),
    }
}

fn parse_code(text: &str) -> Result<i32> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| CleError::Syntax(format!("invalid condition code value '{text}'")))
}
