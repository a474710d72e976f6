//! Output handles of a run: console streams and the trace sink.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};

use cle_config::{ConfigKey, ConfigStore, Environment, Scope, map_file_name};

/// Normal and error output with QUIET / SILENT suppression.
pub struct Console {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    sink: io::Sink,
    quiet: bool,
    silent: bool,
}

impl Console {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            out,
            err,
            sink: io::sink(),
            quiet: false,
            silent: false,
        }
    }

    /// Console on the process stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn set_mode(&mut self, quiet: bool, silent: bool) {
        self.quiet = quiet;
        self.silent = silent;
    }

    /// Normal output, or a sink when QUIET is active.
    pub fn out(&mut self) -> &mut dyn Write {
        if self.quiet { &mut self.sink } else { self.out.as_mut() }
    }

    /// Error output, or a sink when SILENT is active.
    pub fn err(&mut self) -> &mut dyn Write {
        if self.silent { &mut self.sink } else { self.err.as_mut() }
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}

/// Destination of TRACE output for one run.
pub enum TraceSink {
    Off,
    Stderr,
    File(BufWriter<File>),
}

impl TraceSink {
    /// Open the trace configured for `scope` (`owner.program.trace=ON`).
    ///
    /// The trace goes to `owner.program.trace.file` when that is set and can
    /// be opened, otherwise to stderr.
    pub fn open(store: &ConfigStore, scope: &Scope, env: &dyn Environment) -> Self {
        let enabled = store
            .get(&ConfigKey::trace(scope).to_string())
            .is_some_and(|v| v.eq_ignore_ascii_case("ON"));
        if !enabled {
            return Self::Off;
        }
        let Some(file) = store.get(&ConfigKey::trace_file(scope).to_string()) else {
            return Self::Stderr;
        };
        let path = map_file_name(file, env);
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => Self::File(BufWriter::new(f)),
            Err(e) => {
                log::warn!("Cannot open trace file {path}: {e}, tracing to stderr");
                Self::Stderr
            },
        }
    }

    pub fn is_on(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Write one timestamped trace line.
    pub fn line(&mut self, phase: &str, message: &str) {
        if !self.is_on() {
            return;
        }
        log::trace!("{phase}: {message}");
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let text = format!("{stamp} {phase:<8} {message}\n");
        let result = match self {
            Self::Off => Ok(()),
            Self::Stderr => io::stderr().write_all(text.as_bytes()),
            Self::File(w) => w.write_all(text.as_bytes()),
        };
        if let Err(e) = result {
            log::warn!("Trace write failed: {e}");
        }
    }

    pub fn close(self) {
        if let Self::File(mut w) = self
            && let Err(e) = w.flush()
        {
            log::warn!("Trace flush failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use cle_config::MemoryEnvironment;
    use tempfile::TempDir;

    use super::*;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn quiet_and_silent_suppress_their_stream() {
        let out = Shared::default();
        let err = Shared::default();
        let mut console = Console::new(Box::new(out.clone()), Box::new(err.clone()));
        console.set_mode(true, false);
        write!(console.out(), "hidden").unwrap();
        write!(console.err(), "shown").unwrap();
        console.set_mode(false, true);
        write!(console.out(), "visible").unwrap();
        write!(console.err(), "dropped").unwrap();
        assert_eq!(out.0.borrow().as_slice(), b"visible");
        assert_eq!(err.0.borrow().as_slice(), b"shown");
    }

    #[test]
    fn trace_off_unless_enabled() {
        let store = ConfigStore::in_memory(true, "pgm");
        let env = MemoryEnvironment::new();
        assert!(!TraceSink::open(&store, &Scope::new("o", "pgm"), &env).is_on());
    }

    #[test]
    fn trace_to_file_appends_lines() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("trace.log");
        let mut store = ConfigStore::in_memory(true, "pgm");
        store.set("o.pgm.trace", "ON", true).unwrap();
        store
            .set("o.pgm.trace.file", file.to_str().unwrap(), true)
            .unwrap();
        let env = MemoryEnvironment::new();
        let mut trace = TraceSink::open(&store, &Scope::new("o", "pgm"), &env);
        assert!(matches!(trace, TraceSink::File(_)));
        trace.line("run", "hello");
        trace.close();
        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.contains("run"));
        assert!(text.ends_with("hello\n"));
    }
}
