//! Run-scoped options taken off the argument vector before dispatch.
//!
//! A leading `OWNER=id` selects the owner. Trailing `SILENT`, `QUIET` and
//! `MAXCC=max[-min]` tokens may appear in any order after the command's
//! own arguments. `CLE_QUIET`, `CLE_SILENT`, `CLE_MAX_CC` and `CLE_MIN_CC`
//! supply the same settings from the environment; tokens win.

use cle_config::Environment;
use cle_types::code::CcPolicy;
use cle_types::error::{CleError, Result};

pub const ENV_QUIET: &str = "CLE_QUIET";
pub const ENV_SILENT: &str = "CLE_SILENT";
pub const ENV_MAX_CC: &str = "CLE_MAX_CC";
pub const ENV_MIN_CC: &str = "CLE_MIN_CC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Owner given with `OWNER=`.
    pub owner: Option<String>,
    /// Suppress normal output.
    pub quiet: bool,
    /// Suppress error output.
    pub silent: bool,
    pub policy: CcPolicy,
    /// Remaining arguments, starting with the program name.
    pub args: Vec<String>,
}

/// A rejected run option, with the output modes found on the same line.
#[derive(Debug)]
pub struct ScanError {
    pub quiet: bool,
    pub silent: bool,
    pub error: CleError,
}

impl RunOptions {
    pub fn scan(argv: &[String], env: &dyn Environment) -> std::result::Result<Self, ScanError> {
        let mut args: Vec<String> = argv.to_vec();
        if args.is_empty() {
            args.push(String::new());
        }

        let mut quiet = env.is_enabled(ENV_QUIET);
        let mut silent = env.is_enabled(ENV_SILENT);
        let mut maxcc = None;
        while args.len() > 1 {
            let Some(last) = args.last() else { break };
            if last.eq_ignore_ascii_case("QUIET") {
                quiet = true;
            } else if last.eq_ignore_ascii_case("SILENT") {
                silent = true;
            } else if let Some(value) = strip_keyword(last, "MAXCC=") {
                // The token closest to the end was removed first and wins.
                if maxcc.is_none() {
                    maxcc = Some(value.to_string());
                }
            } else {
                break;
            }
            args.pop();
        }

        let fail = |error| ScanError {
            quiet,
            silent,
            error,
        };

        let mut owner = None;
        if let Some(first) = args.get(1)
            && let Some(value) = strip_keyword(first, "OWNER=")
        {
            owner = Some(owner_id(value).map_err(fail)?.to_string());
            args.remove(1);
        }

        let env_max = env.get(ENV_MAX_CC).filter(|v| !v.trim().is_empty());
        let env_min = env.get(ENV_MIN_CC).filter(|v| !v.trim().is_empty());
        let policy =
            CcPolicy::from_sources(env_max.as_deref(), env_min.as_deref(), maxcc.as_deref())
                .map_err(fail)?;

        log::debug!(
            "Run options: owner={owner:?} quiet={quiet} silent={silent} maxcc={} mincc={}",
            policy.max(),
            policy.min()
        );
        Ok(Self {
            owner,
            quiet,
            silent,
            policy,
            args,
        })
    }
}

/// Check an owner id. Owner ids are one segment of a dotted config key.
pub fn owner_id(value: &str) -> Result<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CleError::Syntax("owner id is empty".into()));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CleError::Syntax(format!("invalid owner id '{value}'")));
    }
    Ok(value)
}

fn strip_keyword<'a>(token: &'a str, keyword: &str) -> Option<&'a str> {
    let head = token.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| &token[keyword.len()..])
}
