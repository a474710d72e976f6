//! File-name mapping and the whole-file reader seam.

use std::fs;
use std::io;

use cle_types::error::Result;

use crate::env::Environment;

/// Map a configured file name to a local path.
///
/// A leading `~` is replaced by the home directory and every `<NAME>`
/// placeholder by the value of environment variable `NAME`. Unknown
/// placeholders are left as written.
pub fn map_file_name(path: &str, env: &dyn Environment) -> String {
    let path = path.trim();
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    if let Some(tail) = rest.strip_prefix('~')
        && let Some(home) = env.home()
    {
        out.push_str(home.trim_end_matches(['/', '\\']));
        rest = tail;
    }

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) => {
                let name = &after[..close];
                match env.get(name) {
                    Some(value) if !name.is_empty() => out.push_str(&value),
                    _ => {
                        out.push('<');
                        out.push_str(name);
                        out.push('>');
                    },
                }
                rest = &after[close + 1..];
            },
            None => {
                out.push('<');
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

/// Whole-file reader used to load property files.
pub trait FileReader {
    /// Read `path` completely. `Ok(None)` means the file does not exist.
    fn read(&self, path: &str) -> Result<Option<String>>;
}

/// Reads files from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileReader;

impl FileReader for LocalFileReader {
    fn read(&self, path: &str) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
