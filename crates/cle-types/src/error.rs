//! Error types for the command line executor.

use std::io;

use crate::code::ConditionCode;

/// Errors produced by the executor framework.
#[derive(Debug, thiserror::Error)]
pub enum CleError {
    #[error("config error: {0}")]
    Config(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("initialization failed: {0}")]
    Init(String),

    #[error("mapping failed: {0}")]
    Map(String),

    #[error("run failed: {0}")]
    Run(String),

    #[error("access error: {0}")]
    Access(String),

    #[error("interface error: {0}")]
    Interface(String),

    #[error("conflict: key '{key}' already set to '{existing}'")]
    Conflict { key: String, existing: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl CleError {
    /// Standard condition code for this error when no phase overrides it.
    pub fn condition_code(&self) -> ConditionCode {
        match self {
            Self::Config(_) | Self::Conflict { .. } | Self::TomlParse(_) => {
                ConditionCode::ConfigError
            },
            Self::Syntax(_) => ConditionCode::SyntaxError,
            Self::Command(_) => ConditionCode::CommandError,
            Self::Table(_) => ConditionCode::TableError,
            Self::Init(_) => ConditionCode::InitFailed,
            Self::Map(_) => ConditionCode::MapFailed,
            Self::Run(_) => ConditionCode::RunFailed,
            Self::Access(_) => ConditionCode::AccessError,
            Self::Interface(_) => ConditionCode::InterfaceError,
            Self::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                ConditionCode::AccessError
            },
            Self::Io(_) => ConditionCode::SystemError,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CleError>;
