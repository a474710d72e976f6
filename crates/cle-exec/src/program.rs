//! Metadata a host program hands to the dispatcher.

use serde::Deserialize;

use cle_types::code::CEILING;
use cle_types::error::{CleError, Result};

/// A command-defined condition code above the standard ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpecialCode {
    pub code: i32,
    pub description: String,
}

/// Program metadata. Optional texts switch their built-in functions on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgramInfo {
    /// Logical program name used in configuration keys.
    pub program: String,
    #[serde(default = "default_owner")]
    pub default_owner: String,
    /// Command run when no or an unknown command is given.
    #[serde(default)]
    pub default_command: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    /// Program manual page.
    #[serde(default)]
    pub manpage: Option<String>,
    #[serde(default)]
    pub special_codes: Vec<SpecialCode>,
}

fn default_owner() -> String {
    "default".to_string()
}

impl ProgramInfo {
    pub fn new(program: &str, default_owner: &str) -> Self {
        Self {
            program: program.to_string(),
            default_owner: default_owner.to_string(),
            default_command: None,
            case_sensitive: false,
            version: None,
            about: None,
            license: None,
            manpage: None,
            special_codes: Vec::new(),
        }
    }

    /// Parse and validate a TOML manifest.
    pub fn from_toml(text: &str) -> Result<Self> {
        let info: Self = toml::from_str(text)?;
        info.validate()?;
        Ok(info)
    }

    pub fn validate(&self) -> Result<()> {
        let valid_name = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !valid_name(&self.program) {
            return Err(CleError::Config(format!(
                "invalid program name '{}'",
                self.program
            )));
        }
        if !valid_name(&self.default_owner) {
            return Err(CleError::Config(format!(
                "invalid default owner '{}'",
                self.default_owner
            )));
        }
        if let Some(special) = self.special_codes.iter().find(|s| s.code <= CEILING) {
            return Err(CleError::Config(format!(
                "special condition code {} must be above {CEILING}",
                special.code
            )));
        }
        Ok(())
    }

    /// Prefix of program-specific environment variables, e.g. `MY_TOOL`.
    pub fn env_prefix(&self) -> String {
        self.program
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// `<PROGRAM>_DEFAULT_OWNER_ID`.
    pub fn owner_env_var(&self) -> String {
        format!("{}_DEFAULT_OWNER_ID", self.env_prefix())
    }

    /// `<PROGRAM>_CONFIG_FILE`.
    pub fn config_env_var(&self) -> String {
        format!("{}_CONFIG_FILE", self.env_prefix())
    }

    pub fn special_code(&self, code: i32) -> Option<&SpecialCode> {
        self.special_codes.iter().find(|s| s.code == code)
    }
}
