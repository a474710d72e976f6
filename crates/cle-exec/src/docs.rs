//! Documentation model and renderers.
//!
//! The dispatcher assembles a [`Document`] from the program metadata, the
//! registered commands and the built-in functions. GENDOCU and MANPAGE use
//! the [`AsciiDocRenderer`]; HTMLDOC needs a renderer from the host.

use std::fmt::Write as _;

use cle_types::code::ConditionCode;
use cle_types::error::Result;

/// One documented command or built-in function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocSection {
    pub keyword: String,
    pub description: String,
    /// One-line syntax.
    pub syntax: String,
    /// Argument help lines.
    pub help: String,
    pub manpage: String,
}

/// Everything the user manual contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub program: String,
    pub version: Option<String>,
    pub about: Option<String>,
    pub manpage: Option<String>,
    pub commands: Vec<DocSection>,
    pub builtins: Vec<DocSection>,
    /// `(code, description)` of command-defined special codes.
    pub special_codes: Vec<(i32, String)>,
}

/// Turns a [`Document`] into text of some markup language.
pub trait DocRenderer {
    fn render(&self, doc: &Document) -> Result<String>;

    /// File extension of the rendered output.
    fn extension(&self) -> &str {
        "txt"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiDocRenderer;

impl AsciiDocRenderer {
    /// Manual page of a single command or built-in function.
    pub fn section(&self, program: &str, section: &DocSection) -> String {
        let mut out = format!(
            "= {}-{}(1)\n:doctype: manpage\n\n== NAME\n\n{} - {}\n\n== SYNOPSIS\n\n----\n{} {}\n----\n",
            program.to_lowercase(),
            section.keyword.to_lowercase(),
            section.keyword,
            section.description,
            program,
            section.syntax
        );
        if !section.help.is_empty() {
            let _ = write!(out, "\n== ARGUMENTS\n\n----\n{}----\n", ensure_newline(&section.help));
        }
        if !section.manpage.is_empty() {
            let _ = write!(out, "\n== DESCRIPTION\n\n{}\n", section.manpage.trim_end());
        }
        out
    }

    /// Manual page of the program itself.
    pub fn program_page(&self, doc: &Document) -> String {
        let mut out = format!(
            "= {}(1)\n:doctype: manpage\n\n== NAME\n\n{}",
            doc.program.to_lowercase(),
            doc.program
        );
        if let Some(version) = &doc.version {
            let _ = write!(out, " {}", version.trim());
        }
        out.push_str("\n\n== SYNOPSIS\n\n----\n");
        let _ = writeln!(out, "{} [OWNER=id] command [arguments] [MAXCC=max[-min]] [QUIET] [SILENT]", doc.program);
        out.push_str("----\n");
        if let Some(manpage) = &doc.manpage {
            let _ = write!(out, "\n== DESCRIPTION\n\n{}\n", manpage.trim_end());
        }
        out
    }
}

impl DocRenderer for AsciiDocRenderer {
    fn render(&self, doc: &Document) -> Result<String> {
        let mut out = self.program_page(doc);
        if let Some(about) = &doc.about {
            let _ = write!(out, "\n== ABOUT\n\n{}\n", about.trim_end());
        }
        if !doc.commands.is_empty() {
            out.push_str("\n== COMMANDS\n");
            for section in &doc.commands {
                out.push('\n');
                out.push_str(&demote(&self.section(&doc.program, section)));
            }
        }
        if !doc.builtins.is_empty() {
            out.push_str("\n== BUILT-IN FUNCTIONS\n\n");
            for b in &doc.builtins {
                let _ = writeln!(out, "`{}`:: {}", b.syntax, b.description);
            }
        }
        out.push_str("\n== CONDITION CODES\n\n");
        for code in ConditionCode::ALL {
            let _ = writeln!(out, "{}:: {}", code, code.description());
        }
        for (code, description) in &doc.special_codes {
            let _ = writeln!(out, "{code} (special):: {description}");
        }
        Ok(out)
    }

    fn extension(&self) -> &str {
        "adoc"
    }
}

fn ensure_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Nest a stand-alone page below a chapter: titles gain one level and the
/// document attributes are dropped.
fn demote(page: &str) -> String {
    page.lines()
        .filter(|l| !l.starts_with(":doctype:"))
        .map(|l| {
            if l.starts_with('=') {
                format!("=={l}")
            } else {
                l.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}
