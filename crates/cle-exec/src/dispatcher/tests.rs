use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Write};
use std::rc::Rc;

use cle_config::{Environment, MemoryEnvironment};
use cle_types::error::{CleError, Result};
use tempfile::TempDir;

use super::Dispatcher;
use crate::command::{Command, Outcome, RunContext};
use crate::docs::{DocRenderer, Document};
use crate::program::{ProgramInfo, SpecialCode};
use crate::table::ArgTable;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Shared(Rc<RefCell<Vec<u8>>>);

impl Shared {
    fn take(&self) -> String {
        String::from_utf8(std::mem::take(&mut *self.0.borrow_mut())).unwrap()
    }
}

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Prints `text` `count` times.
#[derive(Default)]
struct Echo {
    text: String,
    count: i64,
    upper: bool,
}

impl Command for Echo {
    fn keyword(&self) -> &str {
        "ECHO"
    }

    fn description(&self) -> &str {
        "Print a text"
    }

    fn manpage(&self) -> &str {
        "Prints its text argument."
    }

    fn init(&mut self, table: &mut ArgTable) -> Result<()> {
        table.text("text", Some("hello"), "Text to print")?;
        table.number("count", Some(1), "Number of lines")?;
        table.switch("upper", "Print in upper case")
    }

    fn map(&mut self, table: &ArgTable) -> Result<()> {
        self.text = table.value("text").unwrap_or_default().to_string();
        self.count = table.number_value("count").unwrap_or(1);
        self.upper = table.switch_value("upper");
        Ok(())
    }

    fn run(&mut self, ctx: &mut RunContext<'_>) -> Result<Outcome> {
        for _ in 0..self.count {
            if self.upper {
                writeln!(ctx.out, "{}", self.text.to_uppercase())?;
            } else {
                writeln!(ctx.out, "{}", self.text)?;
            }
        }
        Ok(Outcome::ok())
    }
}

/// Returns a preset outcome.
struct Fixed(Outcome);

impl Command for Fixed {
    fn keyword(&self) -> &str {
        "FIXED"
    }

    fn description(&self) -> &str {
        "Return a fixed outcome"
    }

    fn init(&mut self, _table: &mut ArgTable) -> Result<()> {
        Ok(())
    }

    fn map(&mut self, _table: &ArgTable) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Result<Outcome> {
        Ok(self.0)
    }
}

/// Fails in `map` or `finish` and counts `finish` calls.
struct Faulty {
    keyword: &'static str,
    fail_map: bool,
    finished: Rc<Cell<u32>>,
}

impl Command for Faulty {
    fn keyword(&self) -> &str {
        self.keyword
    }

    fn description(&self) -> &str {
        "Fail on purpose"
    }

    fn hidden(&self) -> bool {
        true
    }

    fn init(&mut self, _table: &mut ArgTable) -> Result<()> {
        Ok(())
    }

    fn map(&mut self, _table: &ArgTable) -> Result<()> {
        if self.fail_map {
            return Err(CleError::Map("cannot open input".into()));
        }
        Ok(())
    }

    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Result<Outcome> {
        Ok(Outcome::ok())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished.set(self.finished.get() + 1);
        if self.fail_map {
            Ok(())
        } else {
            Err(CleError::Run("cannot close output".into()))
        }
    }
}

struct Harness {
    dir: TempDir,
    out: Shared,
    err: Shared,
    finished: Rc<Cell<u32>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            out: Shared::default(),
            err: Shared::default(),
            finished: Rc::new(Cell::new(0)),
        }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn env(&self) -> MemoryEnvironment {
        MemoryEnvironment::new().with("HOME", &self.path(""))
    }

    fn info() -> ProgramInfo {
        ProgramInfo::new("test", "default")
    }

    fn build(&self, info: ProgramInfo, env: MemoryEnvironment) -> Dispatcher {
        let mut d = Dispatcher::new(info)
            .with_environment(env)
            .with_config_path(self.path("test.config"))
            .with_output(self.out.clone(), self.err.clone());
        d.register(Box::new(Echo::default()));
        d.register(Box::new(Fixed(Outcome::ok())));
        d.register(Box::new(Faulty {
            keyword: "BADMAP",
            fail_map: true,
            finished: Rc::clone(&self.finished),
        }));
        d.register(Box::new(Faulty {
            keyword: "BADFINISH",
            fail_map: false,
            finished: Rc::clone(&self.finished),
        }));
        d
    }

    fn dispatcher(&self) -> Dispatcher {
        self.build(Self::info(), self.env())
    }
}

fn argv(words: &[&str]) -> Vec<String> {
    std::iter::once("test")
        .chain(words.iter().copied())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Condition codes
// ---------------------------------------------------------------------------

#[test]
fn maxcc_clamps_standard_codes() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    d.register(Box::new(Fixed(Outcome::new(16))));
    assert_eq!(d.execute(&argv(&["FIXED", "MAXCC=8-2"])), 8);

    d.register(Box::new(Fixed(Outcome::info())));
    assert_eq!(d.execute(&argv(&["FIXED", "MAXCC=8-2"])), 0);
    assert_eq!(d.execute(&argv(&["FIXED"])), 1);
}

#[test]
fn special_code_passes_through_with_reason() {
    let h = Harness::new();
    let mut info = Harness::info();
    info.special_codes.push(SpecialCode {
        code: 80,
        description: "sum overflow".into(),
    });
    let mut d = h
        .build(info, h.env())
        .with_reason_lookup(|r| (r == 3).then(|| "value too large".to_string()));
    d.register(Box::new(Fixed(Outcome::special(80, Some(3)))));

    assert_eq!(d.execute(&argv(&["FIXED", "MAXCC=8"])), 80);
    let err = h.err.take();
    assert!(err.contains("condition code 80: sum overflow"));
    assert!(err.contains("reason 3: value too large"));
}

#[test]
fn reason_without_lookup_has_placeholder() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    d.register(Box::new(Fixed(Outcome::failed(7))));
    assert_eq!(d.execute(&argv(&["FIXED"])), 8);
    assert!(h.err.take().contains("reason 7: no message available"));
}

#[test]
fn unknown_command_is_command_error() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["NOPE"])), 20);
    assert!(
        h.err
            .take()
            .contains("unknown command or built-in function 'NOPE'")
    );
    assert_eq!(d.execute(&argv(&[])), 20);
}

#[test]
fn invalid_maxcc_is_reported_before_dispatch() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["ECHO", "MAXCC=abc"])), 16);
    assert!(h.out.take().is_empty());
}

// ---------------------------------------------------------------------------
// Dispatch and phases
// ---------------------------------------------------------------------------

#[test]
fn command_arguments_are_parsed_and_mapped() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["echo", "te=hi", "co=2", "up"])), 0);
    assert_eq!(h.out.take(), "HI\nHI\n");
}

#[test]
fn syntax_error_in_arguments_is_16() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["ECHO", "count=many"])), 16);
    assert_eq!(d.execute(&argv(&["ECHO", "bogus=1"])), 16);
    assert!(h.err.take().contains("parse of ECHO failed"));
}

#[test]
fn default_command_is_used_once() {
    let h = Harness::new();
    let mut info = Harness::info();
    info.default_command = Some("ECHO".into());
    let mut d = h.build(info, h.env());

    assert_eq!(d.execute(&argv(&[])), 0);
    assert_eq!(h.out.take(), "hello\n");
    assert_eq!(d.execute(&argv(&["text=bye"])), 0);
    assert_eq!(h.out.take(), "bye\n");
}

#[test]
fn unknown_default_command_is_not_retried_forever() {
    let h = Harness::new();
    let mut info = Harness::info();
    info.default_command = Some("MISSING".into());
    let mut d = h.build(info, h.env());
    assert_eq!(d.execute(&argv(&["NOPE"])), 20);
}

#[test]
fn map_failure_finishes_once() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["BADMAP"])), 12);
    assert_eq!(h.finished.get(), 1);
    let err = h.err.take();
    assert!(err.contains("map of BADMAP failed: mapping failed: cannot open input"));
    assert!(err.contains("condition code 12:"));
}

#[test]
fn finish_failure_after_success_is_2() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["BADFINISH"])), 2);
    assert_eq!(h.finished.get(), 1);
}

#[test]
fn case_sensitive_programs_match_exactly() {
    let h = Harness::new();
    let mut info = Harness::info();
    info.case_sensitive = true;
    let mut d = h.build(info, h.env());
    assert_eq!(d.execute(&argv(&["echo"])), 20);
    assert_eq!(d.execute(&argv(&["help"])), 20);
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
}

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

#[test]
fn quiet_suppresses_output() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["ECHO", "QUIET"])), 0);
    assert!(h.out.take().is_empty());
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "hello\n");
}

#[test]
fn silent_suppresses_error_reports() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["NOPE", "SILENT"])), 20);
    assert!(h.err.take().is_empty());

    let env = h.env().with("CLE_SILENT", "yes");
    let mut d = h.build(Harness::info(), env);
    assert_eq!(d.execute(&argv(&["NOPE"])), 20);
    assert!(h.err.take().is_empty());
}

#[test]
fn silent_applies_to_rejected_run_options() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["ECHO", "MAXCC=x", "SILENT"])), 16);
    assert!(h.err.take().is_empty());
    assert_eq!(d.execute(&argv(&["OWNER=", "ECHO", "SILENT"])), 16);
    assert!(h.err.take().is_empty());
    assert!(h.out.take().is_empty());
}

#[test]
fn owner_precedence() {
    let h = Harness::new();
    let env = h.env().with("TEST_DEFAULT_OWNER_ID", "carol");
    let mut d = h.build(Harness::info(), env);

    assert_eq!(d.execute(&argv(&["GETOWNER"])), 0);
    assert_eq!(h.out.take(), "carol\n");
    assert_eq!(d.execute(&argv(&["OWNER=alice", "GETOWNER"])), 0);
    assert_eq!(h.out.take(), "alice\n");
    assert_eq!(d.environment().get("OWNERID").as_deref(), Some("alice"));
}

#[test]
fn owner_with_dots_is_rejected() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["OWNER=a.b", "ECHO"])), 16);
    assert!(h.out.take().is_empty());
    assert!(h.err.take().contains("invalid owner id 'a.b'"));

    let env = h.env().with("TEST_DEFAULT_OWNER_ID", "x.y");
    let mut d = h.build(Harness::info(), env);
    assert_eq!(d.execute(&argv(&["GETOWNER"])), 16);
    assert!(h.out.take().is_empty());
}

#[test]
fn setowner_is_persisted() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["SETOWNER", "bob"])), 0);
    h.out.take();
    assert_eq!(d.execute(&argv(&["GETOWNER"])), 0);
    assert_eq!(h.out.take(), "bob\n");

    let config = fs::read_to_string(h.path("test.config")).unwrap();
    assert!(config.contains("test.owner.id=bob"));
    assert_eq!(d.execute(&argv(&["SETOWNER", "no.dots"])), 16);
}

#[test]
fn config_file_from_environment() {
    let h = Harness::new();
    let env = h.env().with("TEST_CONFIG_FILE", &h.path("sub/other.config"));
    let mut d = h.build(Harness::info(), env);
    assert_eq!(d.execute(&argv(&["SETOWNER", "x"])), 0);

    let config = fs::read_to_string(h.path("sub/other.config")).unwrap();
    assert!(config.contains("test.owner.id=x"));
    assert!(!h.dir.path().join("test.config").exists());
}

#[test]
fn unreadable_config_file_stops_the_run() {
    let h = Harness::new();
    let mut d = Dispatcher::new(Harness::info())
        .with_environment(h.env())
        .with_config_path(h.path(""))
        .with_output(h.out.clone(), h.err.clone());
    d.register(Box::new(Echo::default()));
    assert_eq!(d.execute(&argv(&["ECHO"])), 36);
    assert!(h.out.take().is_empty());
    assert!(h.err.take().contains("I/O error"));
}

// ---------------------------------------------------------------------------
// Property files
// ---------------------------------------------------------------------------

#[test]
fn property_file_is_applied_before_command_line() {
    let h = Harness::new();
    let props = h.path("echo.properties");
    fs::write(&props, "default.test.ECHO.text=\"from file\"\n").unwrap();
    let mut d = h.dispatcher();

    assert_eq!(d.execute(&argv(&["SETPROP", &format!("ECHO={props}")])), 0);
    h.out.take();
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "from file\n");
    assert_eq!(d.execute(&argv(&["ECHO", "text=cli"])), 0);
    assert_eq!(h.out.take(), "cli\n");

    assert_eq!(d.execute(&argv(&["DELPROP", "ECHO"])), 0);
    h.out.take();
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "hello\n");
}

#[test]
fn missing_property_file_falls_back_to_defaults() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    let missing = h.path("missing.properties");
    assert_eq!(d.execute(&argv(&["SETPROP", &format!("ECHO={missing}")])), 0);
    h.out.take();
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "hello\n");
}

#[test]
fn chgprop_promotes_to_command_file() {
    let h = Harness::new();
    let program_props = h.path("program.properties");
    fs::write(&program_props, "default.test.ECHO.count=\"2\"\n").unwrap();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["SETPROP", &program_props])), 0);
    h.out.take();

    assert_eq!(d.execute(&argv(&["CHGPROP", "ECHO", "text=changed"])), 0);
    let out = h.out.take();
    assert!(out.contains("1 value(s) changed"));
    assert!(out.contains("activated for default.test.ECHO"));

    let command_props = h.path(".default.test.ECHO.properties");
    let written = fs::read_to_string(&command_props).unwrap();
    assert!(written.contains("default.test.ECHO.text=\"changed\""));
    assert!(written.contains("default.test.ECHO.count=\"2\""));
    // The program-level file is left alone.
    assert_eq!(
        fs::read_to_string(&program_props).unwrap(),
        "default.test.ECHO.count=\"2\"\n"
    );

    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "changed\nchanged\n");

    // Second change rewrites the pinned file in place.
    assert_eq!(d.execute(&argv(&["CHGPROP", "ECHO", "count"])), 0);
    assert!(!h.out.take().contains("activated"));
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "changed\n");
}

#[test]
fn chgprop_keeps_quotes_in_values() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["CHGPROP", "ECHO", r#"text=say "hi""#])), 0);
    h.out.take();
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    assert_eq!(h.out.take(), "say \"hi\"\n");
}

#[test]
fn chgprop_rejects_unknown_paths() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["CHGPROP", "ECHO", "nothing=1"])), 16);
    assert_eq!(d.execute(&argv(&["CHGPROP"])), 16);
    assert_eq!(d.execute(&argv(&["CHGPROP", "NOPE"])), 20);
}

#[test]
fn getprop_shows_active_values() {
    let h = Harness::new();
    let props = h.path("echo.properties");
    fs::write(&props, "default.test.ECHO.text=\"shown\"\n").unwrap();
    let mut d = h.dispatcher();
    d.execute(&argv(&["SETPROP", &format!("ECHO={props}")]));
    h.out.take();

    assert_eq!(d.execute(&argv(&["GETPROP", "ECHO.text"])), 0);
    let out = h.out.take();
    assert!(out.contains("default.test.ECHO.text=\"shown\""));
    assert!(!out.contains("count"));
}

#[test]
fn genprop_writes_defaults() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    let target = h.path("gen/echo.properties");
    assert_eq!(d.execute(&argv(&["GENPROP", &format!("ECHO={target}")])), 0);

    let text = fs::read_to_string(&target).unwrap();
    assert!(text.starts_with("# Property file of program 'test' for owner 'default'"));
    assert!(text.contains("# Properties of command ECHO"));
    assert!(text.contains("#default.test.ECHO.text=\"\""));
    assert!(!text.contains("FIXED"));
}

// ---------------------------------------------------------------------------
// Environment, trace and configuration
// ---------------------------------------------------------------------------

#[test]
fn setenv_is_materialized_on_next_run() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["SETENV", "GREETING=hi"])), 0);
    assert_eq!(h.out.take(), "default.test.envar.GREETING=hi\n");
    assert_eq!(d.environment().get("GREETING"), None);

    assert_eq!(d.execute(&argv(&["GETENV"])), 0);
    assert_eq!(h.out.take(), "default.test.envar.GREETING=hi\n");
    assert_eq!(d.environment().get("GREETING").as_deref(), Some("hi"));

    assert_eq!(d.execute(&argv(&["DELENV", "GREETING"])), 0);
    h.out.take();
    assert_eq!(d.execute(&argv(&["GETENV"])), 0);
    assert!(h.out.take().starts_with("No environment variables"));
}

#[test]
fn setenv_for_one_command() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["SETENV", "echo.GREETING=hi"])), 0);
    assert_eq!(h.out.take(), "default.test.ECHO.envar.GREETING=hi\n");

    assert_eq!(d.execute(&argv(&["FIXED"])), 0);
    assert_eq!(d.environment().get("GREETING"), None);
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);
    h.out.take();
    assert_eq!(d.environment().get("GREETING").as_deref(), Some("hi"));

    assert_eq!(d.execute(&argv(&["DELENV", "ECHO.GREETING"])), 0);
    assert_eq!(h.out.take(), "default.test.ECHO.envar.GREETING removed\n");
    assert_eq!(d.execute(&argv(&["SETENV", "NOPE.X=1"])), 20);
}

#[test]
fn config_clear_empties_the_store() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    d.execute(&argv(&["SETENV", "A=1"]));
    d.execute(&argv(&["SETOWNER", "bob"]));
    h.out.take();

    assert_eq!(d.execute(&argv(&["CONFIG"])), 0);
    let out = h.out.take();
    assert!(out.contains("test.owner.id=bob"));
    assert!(out.contains("default.test.envar.A=1"));

    assert_eq!(d.execute(&argv(&["CONFIG", "CLEAR"])), 0);
    assert_eq!(h.out.take(), "2 configuration entries removed\n");
    let config = fs::read_to_string(h.path("test.config")).unwrap();
    assert!(!config.contains('='));
    assert_eq!(d.execute(&argv(&["CONFIG", "WIPE"])), 16);
}

#[test]
fn trace_file_records_phases() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    let trace = h.path("trace.log");
    assert_eq!(d.execute(&argv(&["TRACE", &format!("FILE={trace}")])), 0);
    assert_eq!(d.execute(&argv(&["TRACE", "on"])), 0);
    assert_eq!(d.execute(&argv(&["ECHO"])), 0);

    let text = fs::read_to_string(&trace).unwrap();
    assert!(text.contains("start"));
    assert!(text.contains("map"));
    assert!(text.contains("raw condition code 0"));

    assert_eq!(d.execute(&argv(&["TRACE", "OFF"])), 0);
    let before = fs::read_to_string(&trace).unwrap();
    d.execute(&argv(&["ECHO"]));
    assert_eq!(fs::read_to_string(&trace).unwrap(), before);
    assert_eq!(d.execute(&argv(&["TRACE", "LOUD"])), 16);
}

// ---------------------------------------------------------------------------
// Documentation and optional built-ins
// ---------------------------------------------------------------------------

#[test]
fn help_lists_commands_and_builtins() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["--help"])), 0);
    let out = h.out.take();
    assert!(out.contains("ECHO"));
    assert!(out.contains("Built-in functions:"));
    assert!(out.contains("SETPROP"));
    assert!(!out.contains("BADMAP"));
    assert!(!out.contains("LICENSE"));
    assert!(!out.contains("ERRORS"));

    assert_eq!(d.execute(&argv(&["HELP", "ECHO", "MAN"])), 0);
    let out = h.out.take();
    assert!(out.contains("test ECHO [text='str'] [count=num] [upper]"));
    assert!(out.contains("Prints its text argument."));
}

#[test]
fn syntax_of_one_argument() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["SYNTAX", "ECHO.count"])), 0);
    assert_eq!(h.out.take(), "test ECHO [count=num]\n");
    assert_eq!(d.execute(&argv(&["SYNTAX", "NOPE"])), 20);
}

#[test]
fn optional_texts_enable_builtins() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["LICENSE"])), 20);

    let mut info = Harness::info();
    info.license = Some("Licensed under MIT".into());
    info.version = Some("1.2.3".into());
    let mut d = h.build(info, h.env());
    assert_eq!(d.execute(&argv(&["LICENSE"])), 0);
    assert_eq!(h.out.take(), "Licensed under MIT\n");
    assert_eq!(d.execute(&argv(&["-version"])), 0);
    assert_eq!(h.out.take(), "1.2.3\n");
    assert_eq!(d.execute(&argv(&["ABOUT"])), 20);
}

#[test]
fn errors_needs_reason_lookup() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["ERRORS"])), 20);

    let mut d = h
        .dispatcher()
        .with_reason_lookup(|r| (r == 7).then(|| "seven".to_string()));
    assert_eq!(d.execute(&argv(&["ERRORS"])), 0);
    let out = h.out.take();
    assert!(out.contains("syntax-error"));
    assert!(out.contains("Reason codes:"));
    assert!(out.contains("    7 seven"));
}

#[test]
fn manpage_and_gendocu() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["MANPAGE", "ECHO"])), 0);
    assert!(h.out.take().starts_with("= test-echo(1)"));

    let page = h.path("setprop.adoc");
    assert_eq!(d.execute(&argv(&["MANPAGE", &format!("SETPROP={page}")])), 0);
    assert!(fs::read_to_string(&page).unwrap().contains("SETPROP [command=]filename"));

    let manual = h.path("docs/test.adoc");
    assert_eq!(d.execute(&argv(&["GENDOCU", &manual])), 0);
    let text = fs::read_to_string(&manual).unwrap();
    assert!(text.starts_with("= test(1)"));
    assert!(text.contains("=== test-echo(1)"));
    assert!(text.contains("`GETOWNER`:: Print the current owner"));
}

#[test]
fn lstenv_shows_executor_variables() {
    let h = Harness::new();
    let env = h.env().with("CLE_MAX_CC", "8");
    let mut d = h.build(Harness::info(), env);
    assert_eq!(d.execute(&argv(&["LSTENV"])), 0);
    let out = h.out.take();
    assert!(out.contains("CLE_MAX_CC=8"));
    assert!(out.contains("TEST_CONFIG_FILE (not set)"));
    assert!(out.contains("OWNERID=default"));
}

struct TitleOnly;

impl DocRenderer for TitleOnly {
    fn render(&self, doc: &Document) -> Result<String> {
        Ok(format!("<h1>{}</h1>{}", doc.program, doc.commands.len()))
    }

    fn extension(&self) -> &str {
        "html"
    }
}

#[test]
fn htmldoc_uses_host_renderer() {
    let h = Harness::new();
    let mut d = h.dispatcher();
    assert_eq!(d.execute(&argv(&["HTMLDOC"])), 20);

    let mut d = h.dispatcher().with_html_renderer(TitleOnly);
    let dir = h.path("html");
    assert_eq!(d.execute(&argv(&["HTMLDOC", &dir])), 0);
    // Hidden commands are left out of the manual.
    assert_eq!(
        fs::read_to_string(h.path("html/test.html")).unwrap(),
        "<h1>test</h1>2"
    );
}
