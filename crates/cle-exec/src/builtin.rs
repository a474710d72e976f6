//! Keywords of the built-in functions.

/// A framework-provided administrative function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Syntax,
    Help,
    Manpage,
    Gendocu,
    Htmldoc,
    Genprop,
    Setprop,
    Chgprop,
    Delprop,
    Getprop,
    Setowner,
    Getowner,
    Setenv,
    Getenv,
    Delenv,
    Lstenv,
    Hlpenv,
    Trace,
    Config,
    Grammar,
    Lexemes,
    License,
    Version,
    About,
    Errors,
}

impl Builtin {
    pub const ALL: [Builtin; 25] = [
        Self::Syntax,
        Self::Help,
        Self::Manpage,
        Self::Gendocu,
        Self::Htmldoc,
        Self::Genprop,
        Self::Setprop,
        Self::Chgprop,
        Self::Delprop,
        Self::Getprop,
        Self::Setowner,
        Self::Getowner,
        Self::Setenv,
        Self::Getenv,
        Self::Delenv,
        Self::Lstenv,
        Self::Hlpenv,
        Self::Trace,
        Self::Config,
        Self::Grammar,
        Self::Lexemes,
        Self::License,
        Self::Version,
        Self::About,
        Self::Errors,
    ];

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Syntax => "SYNTAX",
            Self::Help => "HELP",
            Self::Manpage => "MANPAGE",
            Self::Gendocu => "GENDOCU",
            Self::Htmldoc => "HTMLDOC",
            Self::Genprop => "GENPROP",
            Self::Setprop => "SETPROP",
            Self::Chgprop => "CHGPROP",
            Self::Delprop => "DELPROP",
            Self::Getprop => "GETPROP",
            Self::Setowner => "SETOWNER",
            Self::Getowner => "GETOWNER",
            Self::Setenv => "SETENV",
            Self::Getenv => "GETENV",
            Self::Delenv => "DELENV",
            Self::Lstenv => "LSTENV",
            Self::Hlpenv => "HLPENV",
            Self::Trace => "TRACE",
            Self::Config => "CONFIG",
            Self::Grammar => "GRAMMAR",
            Self::Lexemes => "LEXEMES",
            Self::License => "LICENSE",
            Self::Version => "VERSION",
            Self::About => "ABOUT",
            Self::Errors => "ERRORS",
        }
    }

    /// Argument forms after the keyword.
    pub const fn usage(self) -> &'static str {
        match self {
            Self::Syntax => "[command[.path]]",
            Self::Help => "[command[.path]] [MAN]",
            Self::Manpage => "[name][=filename]",
            Self::Gendocu => "[command=]filename",
            Self::Htmldoc => "[directory]",
            Self::Genprop => "[command=]filename",
            Self::Setprop => "[command=]filename",
            Self::Chgprop => "command [path[=value]]*",
            Self::Delprop => "[command]",
            Self::Getprop => "[command[.path]]",
            Self::Setowner => "name",
            Self::Setenv => "[command.]name=value",
            Self::Delenv => "[command.]name",
            Self::Trace => "ON|OFF|FILE=filename",
            Self::Config => "[CLEAR]",
            Self::Getowner
            | Self::Getenv
            | Self::Lstenv
            | Self::Hlpenv
            | Self::Grammar
            | Self::Lexemes
            | Self::License
            | Self::Version
            | Self::About
            | Self::Errors => "",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Syntax => "Print the syntax of the commands",
            Self::Help => "Print help for the commands and their arguments",
            Self::Manpage => "Print or write manual pages",
            Self::Gendocu => "Write the user manual as AsciiDoc",
            Self::Htmldoc => "Write the user manual as HTML",
            Self::Genprop => "Write a property file with the current defaults",
            Self::Setprop => "Activate a property file",
            Self::Chgprop => "Change properties of a command",
            Self::Delprop => "Deactivate a property file",
            Self::Getprop => "Print the active properties",
            Self::Setowner => "Set the default owner",
            Self::Getowner => "Print the current owner",
            Self::Setenv => "Store an environment variable for this program or one command",
            Self::Getenv => "Print the stored environment variables",
            Self::Delenv => "Remove a stored environment variable",
            Self::Lstenv => "Print the environment variables used by the executor",
            Self::Hlpenv => "Describe the environment variables used by the executor",
            Self::Trace => "Switch tracing on or off, or set the trace file",
            Self::Config => "Print or clear the configuration",
            Self::Grammar => "Print the grammar of command lines and property files",
            Self::Lexemes => "Print the lexical elements of the grammar",
            Self::License => "Print the license",
            Self::Version => "Print the version",
            Self::About => "Print information about the program",
            Self::Errors => "Print the condition codes and reason codes",
        }
    }

    /// Look up a keyword (already stripped of `-`/`--`).
    pub fn from_keyword(word: &str, case_sensitive: bool) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| {
            if case_sensitive {
                b.keyword() == word
            } else {
                b.keyword().eq_ignore_ascii_case(word)
            }
        })
    }
}

/// Strip the optional `-` or `--` in front of a keyword.
pub fn strip_dashes(word: &str) -> &str {
    word.strip_prefix("--")
        .or_else(|| word.strip_prefix('-'))
        .unwrap_or(word)
}
