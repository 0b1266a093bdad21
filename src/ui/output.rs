//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Warnings and errors go
//! to stderr. Errors are always shown.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Align `(label, value)` rows into two columns.
pub fn format_rows<L: Display, V: Display>(rows: &[(L, V)], indent: &str) -> String {
    let labels: Vec<String> = rows.iter().map(|(l, _)| l.to_string()).collect();
    let width = labels.iter().map(String::len).max().unwrap_or(0);

    labels
        .iter()
        .zip(rows)
        .map(|(label, (_, value))| format!("{indent}{label:<width$}  {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_debug() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn rows_are_aligned() {
        let rows = [("dc1", "v1"), ("dc-long", "<missing>")];
        insta::assert_snapshot!(format_rows(&rows, ""), @r"
        dc1      v1
        dc-long  <missing>
        ");
        assert!(format_rows(&rows, "  ").starts_with("  dc1 "));
    }

    #[test]
    fn no_rows() {
        let rows: [(&str, &str); 0] = [];
        assert_eq!(format_rows(&rows, ""), "");
    }
}
