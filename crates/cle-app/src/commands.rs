//! Commands of the demo program.

use cle_exec::{ArgTable, Command, Outcome, RunContext};
use cle_types::error::{CleError, Result};

/// Special condition code of SUM when the total overflows.
pub const SUM_OVERFLOW: i32 = 80;

/// Reason codes reported by the demo commands.
pub fn reason(code: i32) -> Option<String> {
    let text = match code {
        1 => "the sum does not fit into a 64-bit integer",
        2 => "no values were given",
        3 => "text was cut to the maximum width",
        _ => return None,
    };
    Some(text.to_string())
}

// ---------------------------------------------------------------------------
// ECHO
// ---------------------------------------------------------------------------

/// Prints a text, optionally repeated and in upper case.
#[derive(Debug, Default)]
pub struct Echo {
    text: String,
    count: i64,
    upper: bool,
    width: Option<usize>,
}

impl Command for Echo {
    fn keyword(&self) -> &str {
        "ECHO"
    }

    fn description(&self) -> &str {
        "Print a text"
    }

    fn manpage(&self) -> &str {
        "Prints the text `count` times. With `upper` the text is converted to upper case. \
         A `width` cuts longer text and ends with a warning."
    }

    fn init(&mut self, table: &mut ArgTable) -> Result<()> {
        table.text("text", Some("Hello"), "Text to print")?;
        table.number("count", Some(1), "Number of lines")?;
        table.switch("upper", "Print in upper case")?;
        table.number("width", None, "Maximum number of characters per line")
    }

    fn map(&mut self, table: &ArgTable) -> Result<()> {
        self.text = table.value("text").unwrap_or_default().to_string();
        self.count = table.number_value("count").unwrap_or(1);
        if self.count < 0 {
            return Err(CleError::Map(format!("count must not be negative ({})", self.count)));
        }
        self.upper = table.switch_value("upper");
        self.width = match table.number_value("width") {
            Some(w) if w <= 0 => {
                return Err(CleError::Map(format!("width must be positive ({w})")));
            },
            Some(w) => Some(
                usize::try_from(w).map_err(|_| CleError::Map(format!("width {w} is too large")))?,
            ),
            None => None,
        };
        Ok(())
    }

    fn run(&mut self, ctx: &mut RunContext<'_>) -> Result<Outcome> {
        let mut line = if self.upper {
            self.text.to_uppercase()
        } else {
            self.text.clone()
        };
        let mut cut = false;
        if let Some(width) = self.width
            && line.chars().count() > width
        {
            line = line.chars().take(width).collect();
            cut = true;
        }
        for _ in 0..self.count {
            writeln!(ctx.out, "{line}")?;
        }
        log::debug!("ECHO wrote {} line(s) for {}", self.count, ctx.owner);
        Ok(if cut { Outcome::warning(3) } else { Outcome::ok() })
    }
}

// ---------------------------------------------------------------------------
// SUM
// ---------------------------------------------------------------------------

/// Adds a list of integers.
#[derive(Debug, Default)]
pub struct Sum {
    values: Vec<i64>,
}

impl Command for Sum {
    fn keyword(&self) -> &str {
        "SUM"
    }

    fn description(&self) -> &str {
        "Add integer values"
    }

    fn init(&mut self, table: &mut ArgTable) -> Result<()> {
        table.text("values", None, "Integers separated by blanks or commas")
    }

    fn map(&mut self, table: &ArgTable) -> Result<()> {
        let text = table.value("values").unwrap_or_default();
        self.values = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| CleError::Map(format!("'{v}' is not an integer")))
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut RunContext<'_>) -> Result<Outcome> {
        if self.values.is_empty() {
            return Ok(Outcome::warning(2));
        }
        match self.values.iter().try_fold(0i64, |acc, v| acc.checked_add(*v)) {
            Some(total) => {
                writeln!(ctx.out, "{total}")?;
                Ok(Outcome::ok())
            },
            None => Ok(Outcome::special(SUM_OVERFLOW, Some(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use cle_config::MemoryEnvironment;

    use super::*;

    fn run(command: &mut dyn Command, args: &[&str]) -> (Result<Outcome>, String) {
        let mut table = ArgTable::new(false);
        command.init(&mut table).unwrap();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        table.parse_args(&args).unwrap();
        if let Err(e) = command.map(&table) {
            return (Err(e), String::new());
        }
        let keyword = command.keyword().to_string();
        let mut out = Vec::new();
        let mut env = MemoryEnvironment::new();
        let result = {
            let mut ctx = RunContext {
                owner: "demo",
                program: "cle-demo",
                command: &keyword,
                out: &mut out,
                env: &mut env,
            };
            command.run(&mut ctx)
        };
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn echo_defaults() {
        let (outcome, out) = run(&mut Echo::default(), &[]);
        assert_eq!(outcome.unwrap(), Outcome::ok());
        assert_eq!(out, "Hello\n");
    }

    #[test]
    fn echo_width_cuts_with_warning() {
        let (outcome, out) = run(&mut Echo::default(), &["text=abcdef", "width=3", "upper", "count=2"]);
        assert_eq!(outcome.unwrap(), Outcome::warning(3));
        assert_eq!(out, "ABC\nABC\n");
    }

    #[test]
    fn echo_rejects_negative_count() {
        let (outcome, _) = run(&mut Echo::default(), &["count=-1"]);
        assert!(matches!(outcome, Err(CleError::Map(_))));
    }

    #[test]
    fn sum_adds_values() {
        let (outcome, out) = run(&mut Sum::default(), &["values='1, 2 3'"]);
        assert_eq!(outcome.unwrap(), Outcome::ok());
        assert_eq!(out, "6\n");
    }

    #[test]
    fn sum_overflow_is_special() {
        let max = format!("values={},1", i64::MAX);
        let (outcome, out) = run(&mut Sum::default(), &[max.as_str()]);
        assert_eq!(outcome.unwrap(), Outcome::special(SUM_OVERFLOW, Some(1)));
        assert!(out.is_empty());
    }

    #[test]
    fn sum_without_values_warns() {
        let (outcome, _) = run(&mut Sum::default(), &[]);
        let outcome = outcome.unwrap();
        assert_eq!(outcome.code, 4);
        assert_eq!(outcome.reason, Some(2));
    }

    #[test]
    fn sum_rejects_text() {
        let (outcome, _) = run(&mut Sum::default(), &["values=1,x"]);
        assert!(matches!(outcome, Err(CleError::Map(_))));
    }

    #[test]
    fn reasons_are_known() {
        assert!(reason(1).is_some());
        assert!(reason(99).is_none());
    }
}
