//! Built-in functions.

use std::fs;
use std::io::Write;
use std::path::Path;

use cle_config::{ConfigKey, PropertyLifecycle, PropertyTable, Scope, map_file_name};
use cle_types::code::{CEILING, ConditionCode};
use cle_types::error::{CleError, Result};

use super::{Dispatcher, RunState};
use crate::builtin::Builtin;
use crate::docs::{AsciiDocRenderer, DocRenderer, DocSection, Document};
use crate::options::{ENV_MAX_CC, ENV_MIN_CC, ENV_QUIET, ENV_SILENT, owner_id};
use crate::table::{GRAMMAR, LEXEMES};

/// Highest reason code listed by ERRORS.
const MAX_REASON: i32 = 999;

impl Dispatcher {
    pub(super) fn run_builtin(
        &mut self,
        builtin: Builtin,
        args: &[String],
        state: &mut RunState,
    ) -> Result<i32> {
        match builtin {
            Builtin::Syntax => self.builtin_syntax(args, state),
            Builtin::Help => self.builtin_help(args, state),
            Builtin::Manpage => self.builtin_manpage(args, state),
            Builtin::Gendocu => self.builtin_gendocu(args, state),
            Builtin::Htmldoc => self.builtin_htmldoc(args, state),
            Builtin::Genprop => self.builtin_genprop(args, state),
            Builtin::Setprop => self.builtin_setprop(args, state),
            Builtin::Chgprop => self.builtin_chgprop(args, state),
            Builtin::Delprop => self.builtin_delprop(args, state),
            Builtin::Getprop => self.builtin_getprop(args, state),
            Builtin::Setowner => self.builtin_setowner(args, state),
            Builtin::Getowner => {
                expect_args(builtin, args, 0, 0)?;
                writeln!(self.console.out(), "{}", state.scope.owner)?;
                Ok(0)
            },
            Builtin::Setenv => self.builtin_setenv(args, state),
            Builtin::Getenv => self.builtin_getenv(args, state),
            Builtin::Delenv => self.builtin_delenv(args, state),
            Builtin::Lstenv => self.builtin_lstenv(args),
            Builtin::Hlpenv => self.builtin_hlpenv(args),
            Builtin::Trace => self.builtin_trace(args, state),
            Builtin::Config => self.builtin_config(args, state),
            Builtin::Grammar => self.print_text(builtin, args, GRAMMAR),
            Builtin::Lexemes => self.print_text(builtin, args, LEXEMES),
            Builtin::License => {
                let text = self.info.license.clone().unwrap_or_default();
                self.print_text(builtin, args, &text)
            },
            Builtin::Version => {
                let text = self.info.version.clone().unwrap_or_default();
                self.print_text(builtin, args, &text)
            },
            Builtin::About => {
                let text = self.info.about.clone().unwrap_or_default();
                self.print_text(builtin, args, &text)
            },
            Builtin::Errors => self.builtin_errors(args),
        }
    }

    // -- Lookup helpers --

    fn command_index(&self, keyword: &str) -> Result<usize> {
        self.command_position(keyword)
            .ok_or_else(|| CleError::Command(format!("command '{keyword}' not found")))
    }

    /// Indices of the listed commands, or of the one named command.
    fn selected_commands(&self, keyword: Option<&str>) -> Result<Vec<usize>> {
        match keyword {
            Some(k) => Ok(vec![self.command_index(k)?]),
            None => Ok((0..self.commands.len())
                .filter(|&i| !self.commands[i].hidden())
                .collect()),
        }
    }

    /// Scope of a named command (canonical keyword) or the program scope.
    fn target_scope(&self, state: &RunState, keyword: Option<&str>) -> Result<Scope> {
        match keyword {
            Some(k) => {
                let index = self.command_index(k)?;
                Ok(state.scope.with_command(self.commands[index].keyword()))
            },
            None => Ok(state.scope.clone()),
        }
    }

    fn print_text(&mut self, builtin: Builtin, args: &[String], text: &str) -> Result<i32> {
        expect_args(builtin, args, 0, 0)?;
        let out = self.console.out();
        out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        Ok(0)
    }

    fn section(&mut self, index: usize, state: &RunState) -> Result<DocSection> {
        let table = self.command_table(index, state, false)?;
        let command = &self.commands[index];
        Ok(DocSection {
            keyword: command.keyword().to_string(),
            description: command.description().to_string(),
            syntax: table.syntax(command.keyword(), None)?,
            help: table.help(None)?,
            manpage: command.manpage().to_string(),
        })
    }

    fn builtin_section(builtin: Builtin) -> DocSection {
        DocSection {
            keyword: builtin.keyword().to_string(),
            description: builtin.description().to_string(),
            syntax: format!("{} {}", builtin.keyword(), builtin.usage())
                .trim_end()
                .to_string(),
            ..DocSection::default()
        }
    }

    fn document(&mut self, state: &RunState, keyword: Option<&str>) -> Result<Document> {
        let mut commands = Vec::new();
        for index in self.selected_commands(keyword)? {
            commands.push(self.section(index, state)?);
        }
        let builtins = Builtin::ALL
            .iter()
            .filter(|b| self.is_available(**b))
            .map(|b| Self::builtin_section(*b))
            .collect();
        Ok(Document {
            program: self.info.program.clone(),
            version: self.info.version.clone(),
            about: self.info.about.clone(),
            manpage: self.info.manpage.clone(),
            commands,
            builtins,
            special_codes: self
                .info
                .special_codes
                .iter()
                .map(|s| (s.code, s.description.clone()))
                .collect(),
        })
    }

    fn write_output(&mut self, file: &str, text: &str, what: &str) -> Result<()> {
        let path = map_file_name(file, self.env.as_ref());
        if let Some(parent) = Path::new(&path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        log::info!("Wrote {what} to {path}");
        writeln!(self.console.out(), "{what} written to {path}")?;
        Ok(())
    }

    // -- Documentation --

    fn builtin_syntax(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Syntax, args, 0, 1)?;
        let (keyword, path) = match args.first() {
            Some(arg) => split_path(arg),
            None => (None, None),
        };
        for index in self.selected_commands(keyword)? {
            let table = self.command_table(index, state, false)?;
            let syntax = table.syntax(self.commands[index].keyword(), path)?;
            writeln!(self.console.out(), "{} {syntax}", self.info.program)?;
        }
        Ok(0)
    }

    fn builtin_help(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        let (man, rest) = match args.split_last() {
            Some((last, rest)) if last.eq_ignore_ascii_case("MAN") => (true, rest),
            _ => (false, args),
        };
        expect_args(Builtin::Help, rest, 0, 1)?;

        let Some(arg) = rest.first() else {
            let mut text = String::new();
            text.push_str(&self.info.program);
            if let Some(version) = &self.info.version {
                text.push(' ');
                text.push_str(version.trim());
            }
            text.push_str("\n\nCommands:\n");
            for c in self.commands.iter().filter(|c| !c.hidden()) {
                text.push_str(&format!("  {:12} {}\n", c.keyword(), c.description()));
            }
            text.push_str("\nBuilt-in functions:\n");
            for b in Builtin::ALL.iter().filter(|b| self.is_available(**b)) {
                let form = format!("{} {}", b.keyword(), b.usage());
                text.push_str(&format!("  {:40} {}\n", form.trim_end(), b.description()));
            }
            if man && let Some(manpage) = &self.info.manpage {
                text.push('\n');
                text.push_str(manpage.trim_end());
                text.push('\n');
            }
            text.push_str("\nType 'HELP <command>' for details.\n");
            self.console.out().write_all(text.as_bytes())?;
            return Ok(0);
        };

        let (keyword, path) = split_path(arg);
        let keyword = keyword.unwrap_or_default();
        let index = self.command_index(keyword)?;
        let table = self.command_table(index, state, true)?;
        let command = &self.commands[index];
        let mut text = format!(
            "{} - {}\n\n  {} {}\n\n{}",
            command.keyword(),
            command.description(),
            self.info.program,
            table.syntax(command.keyword(), path)?,
            table.help(path)?
        );
        if man && !command.manpage().is_empty() {
            text.push('\n');
            text.push_str(command.manpage().trim_end());
            text.push('\n');
        }
        self.console.out().write_all(text.as_bytes())?;
        Ok(0)
    }

    fn builtin_manpage(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Manpage, args, 0, 1)?;
        let (name, file) = match args.first().map(|a| a.split_once('=')) {
            None => (None, None),
            Some(None) => (Some(args[0].as_str()), None),
            Some(Some((name, file))) => ((!name.is_empty()).then_some(name), Some(file)),
        };

        let renderer = AsciiDocRenderer;
        let text = match name {
            None => renderer.program_page(&self.document(state, None)?),
            Some(name) => match self.command_position(name) {
                Some(index) => {
                    let section = self.section(index, state)?;
                    renderer.section(&self.info.program, &section)
                },
                None => {
                    let builtin = Builtin::from_keyword(name, self.info.case_sensitive)
                        .filter(|b| self.is_available(*b))
                        .ok_or_else(|| {
                            CleError::Command(format!("no manual page for '{name}'"))
                        })?;
                    renderer.section(&self.info.program, &Self::builtin_section(builtin))
                },
            },
        };

        match file {
            Some(file) if !file.trim().is_empty() => {
                self.write_output(file.trim(), &text, "Manual page")?
            },
            Some(_) => {
                return Err(CleError::Syntax("MANPAGE needs a file name after '='".into()));
            },
            None => self.console.out().write_all(text.as_bytes())?,
        }
        Ok(0)
    }

    fn builtin_gendocu(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Gendocu, args, 1, 1)?;
        let (keyword, file) = split_target(&args[0]);
        let doc = self.document(state, keyword)?;
        let text = AsciiDocRenderer.render(&doc)?;
        self.write_output(file, &text, "User manual")?;
        Ok(0)
    }

    fn builtin_htmldoc(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Htmldoc, args, 0, 1)?;
        let dir = args.first().map_or(".", |d| d.as_str()).to_string();
        let doc = self.document(state, None)?;
        let Some(renderer) = self.html.as_ref() else {
            return Err(CleError::Interface("no HTML renderer was provided".into()));
        };
        let text = renderer.render(&doc)?;
        let file = format!(
            "{}/{}.{}",
            dir.trim_end_matches(['/', '\\']),
            self.info.program.to_lowercase(),
            renderer.extension()
        );
        self.write_output(&file, &text, "HTML documentation")?;
        Ok(0)
    }

    // -- Property files --

    fn builtin_genprop(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Genprop, args, 1, 1)?;
        let (keyword, file) = split_target(&args[0]);
        let mut keywords = Vec::new();
        let mut tables = Vec::new();
        for index in self.selected_commands(keyword)? {
            tables.push(self.command_table(index, state, true)?);
            keywords.push(self.commands[index].keyword().to_string());
        }
        let refs: Vec<(&str, &dyn PropertyTable)> = keywords
            .iter()
            .zip(&tables)
            .map(|(k, t)| (k.as_str(), t as &dyn PropertyTable))
            .collect();
        let path = PropertyLifecycle::new(&mut state.store, self.reader.as_ref(), self.env.as_ref())
            .generate(file, &state.scope, &refs)?;
        writeln!(self.console.out(), "Property file written to {path}")?;
        Ok(0)
    }

    fn builtin_setprop(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Setprop, args, 1, 1)?;
        let (keyword, file) = split_target(&args[0]);
        let scope = self.target_scope(state, keyword)?;
        let key = PropertyLifecycle::new(&mut state.store, self.reader.as_ref(), self.env.as_ref())
            .activate(&scope, file)?;
        writeln!(
            self.console.out(),
            "Property file {} activated for {} ({key})",
            file.trim(),
            scope.root()
        )?;
        Ok(0)
    }

    fn builtin_chgprop(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        let Some((keyword, assignments)) = args.split_first() else {
            return Err(CleError::Syntax(format!(
                "CHGPROP needs a command (usage: CHGPROP {})",
                Builtin::Chgprop.usage()
            )));
        };
        let index = self.command_index(keyword)?;
        let scope = state.scope.with_command(self.commands[index].keyword());
        let mut table = self.command_table(index, state, false)?;
        let report =
            PropertyLifecycle::new(&mut state.store, self.reader.as_ref(), self.env.as_ref())
                .change(&scope, &mut table, assignments)?;
        let out = self.console.out();
        writeln!(out, "{} value(s) changed in {}", report.changed, report.path)?;
        if report.promoted {
            writeln!(out, "Property file {} activated for {}", report.path, scope.root())?;
        }
        Ok(0)
    }

    fn builtin_delprop(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Delprop, args, 0, 1)?;
        let scope = self.target_scope(state, args.first().map(String::as_str))?;
        let existed =
            PropertyLifecycle::new(&mut state.store, self.reader.as_ref(), self.env.as_ref())
                .remove(&scope)?;
        if existed {
            writeln!(self.console.out(), "Property file deactivated for {}", scope.root())?;
        } else {
            writeln!(self.console.out(), "No property file active for {}", scope.root())?;
        }
        Ok(0)
    }

    fn builtin_getprop(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Getprop, args, 0, 1)?;
        let (keyword, path) = match args.first() {
            Some(arg) => split_path(arg),
            None => (None, None),
        };
        for index in self.selected_commands(keyword)? {
            let mut table = self.command_table(index, state, false)?;
            let scope = state.scope.with_command(self.commands[index].keyword());
            let text =
                PropertyLifecycle::new(&mut state.store, self.reader.as_ref(), self.env.as_ref())
                    .get(&scope, &mut table, path)?;
            self.console.out().write_all(text.as_bytes())?;
        }
        Ok(0)
    }

    // -- Owner and environment --

    fn builtin_setowner(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Setowner, args, 1, 1)?;
        let owner = owner_id(&args[0])?;
        let key = ConfigKey::owner_id(&self.info.program).to_string();
        state.store.set(&key, owner, true)?;
        writeln!(self.console.out(), "Default owner set to {owner}")?;
        Ok(0)
    }

    fn builtin_setenv(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Setenv, args, 1, 1)?;
        let Some((target, value)) = args[0].split_once('=') else {
            return Err(CleError::Syntax("SETENV needs [command.]name=value".into()));
        };
        let key = self.envar_key(state, target)?;
        state.store.set(&key, value.trim(), true)?;
        writeln!(self.console.out(), "{key}={}", value.trim())?;
        Ok(0)
    }

    fn builtin_getenv(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Getenv, args, 0, 0)?;
        let prefix = format!("{}.", state.scope.root());
        let out = self.console.out();
        let mut count = 0;
        for (key, value) in state.store.keys_with_prefix(&prefix) {
            if key.contains(".envar.") {
                writeln!(out, "{key}={value}")?;
                count += 1;
            }
        }
        if count == 0 {
            writeln!(out, "No environment variables stored for {}", state.scope.root())?;
        }
        Ok(0)
    }

    fn builtin_delenv(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Delenv, args, 1, 1)?;
        let key = self.envar_key(state, &args[0])?;
        let existed = state.store.get(&key).is_some();
        state.store.set(&key, "", true)?;
        if existed {
            writeln!(self.console.out(), "{key} removed")?;
        } else {
            writeln!(self.console.out(), "{key} was not set")?;
        }
        Ok(0)
    }

    /// Config key of `[command.]name`, at command level when a command is named.
    fn envar_key(&self, state: &RunState, target: &str) -> Result<String> {
        let (keyword, name) = match target.trim().split_once('.') {
            Some((keyword, name)) => (Some(keyword), name),
            None => (None, target),
        };
        let scope = self.target_scope(state, keyword)?;
        Ok(ConfigKey::envar(&scope, env_name(name)?).to_string())
    }

    fn executor_variables(&self) -> Vec<(String, &'static str)> {
        vec![
            ("OWNERID".to_string(), "owner id of the current run (set by the executor)"),
            (self.info.owner_env_var(), "default owner id, used when no OWNER= is given"),
            (self.info.config_env_var(), "path of the configuration file"),
            (ENV_QUIET.to_string(), "YES/ON suppresses normal output"),
            (ENV_SILENT.to_string(), "YES/ON suppresses error output"),
            (ENV_MAX_CC.to_string(), "highest published standard condition code"),
            (ENV_MIN_CC.to_string(), "standard condition codes below this become 0"),
        ]
    }

    fn builtin_lstenv(&mut self, args: &[String]) -> Result<i32> {
        expect_args(Builtin::Lstenv, args, 0, 0)?;
        let lines: Vec<String> = self
            .executor_variables()
            .into_iter()
            .map(|(name, _)| match self.env.get(&name) {
                Some(value) => format!("{name}={value}"),
                None => format!("{name} (not set)"),
            })
            .collect();
        let out = self.console.out();
        for line in lines {
            writeln!(out, "{line}")?;
        }
        Ok(0)
    }

    fn builtin_hlpenv(&mut self, args: &[String]) -> Result<i32> {
        expect_args(Builtin::Hlpenv, args, 0, 0)?;
        let vars = self.executor_variables();
        let out = self.console.out();
        for (name, help) in vars {
            writeln!(out, "  {name:28} {help}")?;
        }
        writeln!(
            out,
            "\nVariables stored with SETENV are set at the start of every run."
        )?;
        Ok(0)
    }

    // -- Trace and configuration --

    fn builtin_trace(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Trace, args, 1, 1)?;
        let arg = args[0].trim();
        let upper = arg.to_ascii_uppercase();
        if upper == "ON" || upper == "OFF" {
            state
                .store
                .set(&ConfigKey::trace(&state.scope).to_string(), &upper, true)?;
            writeln!(self.console.out(), "Trace switched {upper}")?;
        } else if upper.starts_with("FILE=") {
            let file = arg[5..].trim();
            state
                .store
                .set(&ConfigKey::trace_file(&state.scope).to_string(), file, true)?;
            if file.is_empty() {
                writeln!(self.console.out(), "Trace file removed, tracing to stderr")?;
            } else {
                writeln!(self.console.out(), "Trace file set to {file}")?;
            }
        } else {
            return Err(CleError::Syntax(format!(
                "invalid TRACE argument '{arg}' (usage: TRACE {})",
                Builtin::Trace.usage()
            )));
        }
        Ok(0)
    }

    fn builtin_config(&mut self, args: &[String], state: &mut RunState) -> Result<i32> {
        expect_args(Builtin::Config, args, 0, 1)?;
        match args.first() {
            Some(arg) if arg.eq_ignore_ascii_case("CLEAR") => {
                let count = state.store.clear();
                writeln!(self.console.out(), "{count} configuration entries removed")?;
            },
            Some(arg) => {
                return Err(CleError::Syntax(format!(
                    "invalid CONFIG argument '{arg}' (usage: CONFIG {})",
                    Builtin::Config.usage()
                )));
            },
            None => {
                let out = self.console.out();
                match state.store.path() {
                    Some(path) => writeln!(out, "Configuration file: {}", path.display())?,
                    None => writeln!(out, "Configuration is not stored in a file")?,
                }
                for (key, value) in state.store.entries() {
                    writeln!(out, "{key}={value}")?;
                }
            },
        }
        Ok(0)
    }

    fn builtin_errors(&mut self, args: &[String]) -> Result<i32> {
        expect_args(Builtin::Errors, args, 0, 0)?;
        let mut text = String::from("Standard condition codes:\n");
        for code in ConditionCode::ALL {
            text.push_str(&format!("  {:>3} {:16} {}\n", code.code(), code.name(), code.description()));
        }
        text.push_str(&format!(
            "\nCodes above {CEILING} are special condition codes defined by the commands and are never clamped.\n"
        ));
        for special in &self.info.special_codes {
            text.push_str(&format!("  {:>3} {}\n", special.code, special.description));
        }
        if let Some(lookup) = &self.reasons {
            text.push_str("\nReason codes:\n");
            for reason in 1..=MAX_REASON {
                if let Some(message) = lookup(reason) {
                    text.push_str(&format!("  {reason:>3} {message}\n"));
                }
            }
        }
        self.console.out().write_all(text.as_bytes())?;
        Ok(0)
    }
}

/// Reject argument counts outside `min..=max`.
fn expect_args(builtin: Builtin, args: &[String], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        let usage = format!("{} {}", builtin.keyword(), builtin.usage());
        return Err(CleError::Syntax(format!(
            "wrong number of arguments for {} (usage: {})",
            builtin.keyword(),
            usage.trim_end()
        )));
    }
    Ok(())
}

/// Split `command[.path]`.
fn split_path(arg: &str) -> (Option<&str>, Option<&str>) {
    match arg.split_once('.') {
        Some((keyword, path)) => (Some(keyword), (!path.is_empty()).then_some(path)),
        None => (Some(arg), None),
    }
}

/// Split `[command=]filename`.
fn split_target(arg: &str) -> (Option<&str>, &str) {
    match arg.split_once('=') {
        Some((keyword, file)) if !keyword.trim().is_empty() => (Some(keyword.trim()), file.trim()),
        Some((_, file)) => (None, file.trim()),
        None => (None, arg.trim()),
    }
}

fn env_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() || name.contains(['=', '#', '.']) || name.contains(char::is_whitespace) {
        return Err(CleError::Syntax(format!(
            "invalid environment variable name '{name}'"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_forms() {
        assert_eq!(split_path("ECHO"), (Some("ECHO"), None));
        assert_eq!(split_path("ECHO.text"), (Some("ECHO"), Some("text")));
        assert_eq!(split_path("ECHO."), (Some("ECHO"), None));
    }

    #[test]
    fn split_target_forms() {
        assert_eq!(split_target("out.props"), (None, "out.props"));
        assert_eq!(split_target("ECHO=out.props"), (Some("ECHO"), "out.props"));
        assert_eq!(split_target("=out.props"), (None, "out.props"));
    }

    #[test]
    fn argument_count_check() {
        let one = vec!["a".to_string()];
        assert!(expect_args(Builtin::Getowner, &one, 0, 0).is_err());
        assert!(expect_args(Builtin::Setowner, &one, 1, 1).is_ok());
        assert!(expect_args(Builtin::Setowner, &[], 1, 1).is_err());
    }

    #[test]
    fn environment_names_are_checked() {
        assert_eq!(env_name(" LANG ").unwrap(), "LANG");
        assert!(env_name("A.B").is_err());
        assert!(env_name("").is_err());
    }
}
