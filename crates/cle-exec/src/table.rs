//! Argument tables: the typed symbol table of one command.
//!
//! Each argument has a dotted path, a kind, an optional hard-coded default
//! set in `init`, an optional property default taken from a property file,
//! and an optional value from the command line. The effective value is the
//! first present of command line, property default and hard-coded default.
//!
//! Command-line arguments are `path=value` or a bare switch `path`. A path
//! may be abbreviated segment by segment as long as the abbreviation stays
//! unique. Property text uses fully qualified `owner.program.command.path`
//! assignments and is never abbreviated.

use std::fmt::Write as _;

use cle_config::PropertyTable;
use cle_types::error::{CleError, Result};

/// Grammar of command lines and property files, printed by `GRAMMAR`.
pub const GRAMMAR: &str = "\
command       : KEYWORD argument*
argument      : path '=' value
              | path                      (switch set to ON)
path          : KEYWORD ('.' KEYWORD)*
value         : NUMBER | STRING | SWITCH
property_file : property*
property      : owner '.' program '.' command '.' path '=' value
              | owner '.' program '.' command '.' path    (reset to default)
";

/// Lexical elements, printed by `LEXEMES`.
pub const LEXEMES: &str = "\
KEYWORD : letter (letter | digit | '_' | '-')*
          each dotted segment of an argument path may be shortened
          to a unique prefix on the command line
NUMBER  : ['+' | '-'] digit+
STRING  : '\"' any '\"' | \"'\" any \"'\" | any text without blanks
SWITCH  : ON | OFF | YES | NO | TRUE | FALSE | 1 | 0
COMMENT : '#' up to the end of the line (property files only)
";

/// Kind of value an argument accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Switch,
    Number,
    Text,
}

impl ArgKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Number => "number",
            Self::Text => "text",
        }
    }

    /// Check and normalize a value for this kind.
    fn normalize(self, path: &str, value: &str) -> Result<String> {
        match self {
            Self::Switch => match value.trim().to_ascii_uppercase().as_str() {
                "ON" | "YES" | "TRUE" | "1" => Ok("ON".into()),
                "OFF" | "NO" | "FALSE" | "0" => Ok("OFF".into()),
                _ => Err(CleError::Syntax(format!(
                    "'{value}' is not a switch value for {path} (use ON or OFF)"
                ))),
            },
            Self::Number => value
                .trim()
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| CleError::Syntax(format!("'{value}' is not a number for {path}"))),
            Self::Text => Ok(value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct Arg {
    path: String,
    kind: ArgKind,
    initial: Option<String>,
    default: Option<String>,
    value: Option<String>,
    help: String,
}

impl Arg {
    fn effective(&self) -> Option<&str> {
        self.value
            .as_deref()
            .or(self.default.as_deref())
            .or(self.initial.as_deref())
    }
}

/// Symbol table of one command.
#[derive(Debug, Clone, Default)]
pub struct ArgTable {
    args: Vec<Arg>,
    case_sensitive: bool,
}

impl ArgTable {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            args: Vec::new(),
            case_sensitive,
        }
    }

    // -- Declaration (used in `init`) --

    /// Declare an ON/OFF switch, OFF unless set.
    pub fn switch(&mut self, path: &str, help: &str) -> Result<()> {
        self.declare(path, ArgKind::Switch, None, help)
    }

    pub fn number(&mut self, path: &str, initial: Option<i64>, help: &str) -> Result<()> {
        self.declare(path, ArgKind::Number, initial.map(|n| n.to_string()), help)
    }

    pub fn text(&mut self, path: &str, initial: Option<&str>, help: &str) -> Result<()> {
        self.declare(path, ArgKind::Text, initial.map(str::to_string), help)
    }

    fn declare(
        &mut self,
        path: &str,
        kind: ArgKind,
        initial: Option<String>,
        help: &str,
    ) -> Result<()> {
        let valid_segment = |s: &str| {
            s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !path.split('.').all(valid_segment) {
            return Err(CleError::Table(format!("invalid argument path '{path}'")));
        }
        if self.args.iter().any(|a| self.eq(&a.path, path)) {
            return Err(CleError::Table(format!("argument '{path}' declared twice")));
        }
        self.args.push(Arg {
            path: path.to_string(),
            kind,
            initial,
            default: None,
            value: None,
            help: help.to_string(),
        });
        Ok(())
    }

    // -- Access (used in `map`) --

    /// Effective value of an argument.
    pub fn value(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(Arg::effective)
    }

    pub fn switch_value(&self, path: &str) -> bool {
        self.value(path) == Some("ON")
    }

    /// Effective number; values were checked when they were set.
    pub fn number_value(&self, path: &str) -> Option<i64> {
        self.value(path).and_then(|v| v.parse().ok())
    }

    /// Whether the argument was given on the command line.
    pub fn is_given(&self, path: &str) -> bool {
        self.find(path).is_some_and(|a| a.value.is_some())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|a| a.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn find(&self, path: &str) -> Option<&Arg> {
        self.args.iter().find(|a| self.eq(&a.path, path))
    }

    fn eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    fn starts_with(&self, text: &str, prefix: &str) -> bool {
        text.len() >= prefix.len()
            && text.is_char_boundary(prefix.len())
            && self.eq(&text[..prefix.len()], prefix)
    }

    /// Index of the argument named by a possibly abbreviated path.
    fn resolve(&self, given: &str) -> Result<usize> {
        if let Some(i) = self.args.iter().position(|a| self.eq(&a.path, given)) {
            return Ok(i);
        }
        let parts: Vec<&str> = given.split('.').collect();
        let matches: Vec<usize> = self
            .args
            .iter()
            .enumerate()
            .filter(|(_, a)| {
                let segments: Vec<&str> = a.path.split('.').collect();
                segments.len() == parts.len()
                    && segments
                        .iter()
                        .zip(&parts)
                        .all(|(s, p)| !p.is_empty() && self.starts_with(s, p))
            })
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [i] => Ok(*i),
            [] => Err(CleError::Syntax(format!("unknown argument '{given}'"))),
            many => {
                let names: Vec<&str> = many.iter().map(|&i| self.args[i].path.as_str()).collect();
                Err(CleError::Syntax(format!(
                    "argument '{given}' is ambiguous ({})",
                    names.join(", ")
                )))
            },
        }
    }

    /// Arguments at or below `path` (exact or abbreviated), all when `None`.
    fn select(&self, path: Option<&str>) -> Result<Vec<&Arg>> {
        let Some(path) = path else {
            return Ok(self.args.iter().collect());
        };
        let selected: Vec<&Arg> = self
            .args
            .iter()
            .filter(|a| {
                self.eq(&a.path, path)
                    || (self.starts_with(&a.path, path) && a.path[path.len()..].starts_with('.'))
            })
            .collect();
        if !selected.is_empty() {
            return Ok(selected);
        }
        let i = self.resolve(path)?;
        Ok(vec![&self.args[i]])
    }

    // -- Command line --

    /// Parse command-line arguments into values.
    pub fn parse_args(&mut self, args: &[String]) -> Result<()> {
        for arg in args {
            let (given, raw) = match arg.split_once('=') {
                Some((p, v)) => (p.trim(), Some(unquote(v.trim()))),
                None => (arg.trim(), None),
            };
            let i = self.resolve(given)?;
            let entry = &self.args[i];
            if entry.value.is_some() {
                return Err(CleError::Syntax(format!(
                    "argument '{}' given more than once",
                    entry.path
                )));
            }
            let value = match (raw, entry.kind) {
                (Some(v), kind) => kind.normalize(&entry.path, v)?,
                (None, ArgKind::Switch) => "ON".to_string(),
                (None, _) => {
                    return Err(CleError::Syntax(format!(
                        "argument '{}' needs a value ({}=...)",
                        entry.path, entry.path
                    )));
                },
            };
            log::trace!("Argument {}={value}", entry.path);
            self.args[i].value = Some(value);
        }
        Ok(())
    }

    // -- Documentation --

    /// One-line syntax of the command or of one argument subtree.
    pub fn syntax(&self, keyword: &str, path: Option<&str>) -> Result<String> {
        let mut out = keyword.to_string();
        for arg in self.select(path)? {
            let form = match arg.kind {
                ArgKind::Switch => arg.path.clone(),
                ArgKind::Number => format!("{}=num", arg.path),
                ArgKind::Text => format!("{}='str'", arg.path),
            };
            let _ = write!(out, " [{form}]");
        }
        Ok(out)
    }

    /// Per-argument help lines.
    pub fn help(&self, path: Option<&str>) -> Result<String> {
        let selected = self.select(path)?;
        let width = selected.iter().map(|a| a.path.len()).max().unwrap_or(0);
        let mut out = String::new();
        for arg in selected {
            let _ = write!(out, "  {:width$}  {:6}  {}", arg.path, arg.kind.as_str(), arg.help);
            if let Some(initial) = &arg.initial {
                let _ = write!(out, " (default: {initial})");
            }
            out.push('\n');
        }
        Ok(out)
    }

    // -- Property text --

    /// Parse property text into `(relative path, value)` pairs below `root`.
    fn parse_properties(&self, text: &str, root: &str) -> Result<Vec<(usize, Option<String>)>> {
        let prefix = format!("{root}.");
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for token in tokenize(line)? {
                if token.starts_with('#') {
                    break;
                }
                let (full, value) = match token.split_once('=') {
                    Some((p, v)) => (p.trim().to_string(), Some(v.to_string())),
                    None => (token.trim().to_string(), None),
                };
                if !self.starts_with(&full, &prefix) {
                    continue;
                }
                let relative = &full[prefix.len()..];
                let Some(i) = self.args.iter().position(|a| self.eq(&a.path, relative)) else {
                    return Err(CleError::Syntax(format!("unknown property '{full}'")));
                };
                let value = value
                    .map(|v| self.args[i].kind.normalize(&full, &v))
                    .transpose()?;
                entries.push((i, value));
            }
        }
        Ok(entries)
    }
}

impl PropertyTable for ArgTable {
    fn apply_properties(&mut self, text: &str, root: &str) -> Result<()> {
        let entries = self.parse_properties(text, root)?;
        log::debug!("Applying {} propert(ies) below {root}", entries.len());
        for (i, value) in entries {
            self.args[i].default = value;
        }
        Ok(())
    }

    fn update_properties(&mut self, text: &str, root: &str) -> Result<usize> {
        let entries = self.parse_properties(text, root)?;
        let mut changed = 0;
        for (i, value) in entries {
            let arg = &mut self.args[i];
            if arg.default != value {
                arg.default = value;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn render_properties(&self, root: &str, path: Option<&str>) -> Result<String> {
        let mut out = String::new();
        for arg in self.select(path)? {
            let _ = write!(out, "# {} ({})", arg.help, arg.kind.as_str());
            if let Some(initial) = &arg.initial {
                let _ = write!(out, ", default {initial}");
            }
            out.push('\n');
            match &arg.default {
                Some(v) => {
                    let _ = writeln!(out, "{root}.{}=\"{}\"", arg.path, escape(v));
                },
                None => {
                    let _ = writeln!(out, "#{root}.{}=\"\"", arg.path);
                },
            }
        }
        Ok(out)
    }
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tokenizer: handles single quotes, double quotes, and backslash escapes.
// ---------------------------------------------------------------------------

/// Split a line into tokens respecting quotes and backslash escapes.
///
/// - Single-quoted text is taken literally.
/// - Inside double quotes `\"` and `\\` are escapes.
/// - Outside quotes a backslash escapes the next character.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut quoted = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(&next) = chars.peek()
                && matches!(next, '"' | '\\')
            {
                current.push(next);
                chars.next();
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    quoted = true;
                },
                '"' => {
                    in_double = true;
                    quoted = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                },
                c if c.is_whitespace() => {
                    if !current.is_empty() || quoted {
                        tokens.push(std::mem::take(&mut current));
                    }
                    quoted = false;
                },
                _ => current.push(ch),
            }
        }
    }

    if in_single {
        return Err(CleError::Syntax("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(CleError::Syntax("unterminated double quote".to_string()));
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    Ok(tokens)
}
