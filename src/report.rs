//! Source-anchored rendering of parse diagnostics.
//!
//! Parse failures carry a line and column; this module renders them as a
//! one-header `file:line:col: error: message` diagnostic with the
//! offending source line quoted and a caret under the column.

use crate::errors::VmError;

/// Renders a positioned parse failure against its source text.
///
/// The quoted line and caret are skipped when the position no longer maps
/// into the source.
pub fn render_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    column: usize,
    message: &str,
) -> String {
    let mut diag = format!("{file}:{line}:{column}: error: {message}\n");

    let quoted = line
        .checked_sub(1)
        .and_then(|index| source.lines().nth(index));
    if let Some(text) = quoted {
        diag.push_str("    ");
        diag.push_str(text.trim_end());
        diag.push('\n');
        diag.push_str("    ");
        for _ in 1..column {
            diag.push(' ');
        }
        diag.push_str("^\n");
    }

    diag
}

/// Prints a parse failure to stderr, quoting the source when the error
/// carries a position.
pub fn log_parse_error(file: &str, source: &str, err: &VmError) {
    match err {
        VmError::ParseError {
            line,
            column,
            message,
        } => eprint!(
            "{}",
            render_diagnostic(file, source, *line, *column, message)
        ),
        other => eprintln!("{file}: error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_offending_line_with_a_caret() {
        let diag = render_diagnostic("t.cma", "loadc 5\nbogus 1", 2, 1, "unknown mnemonic: bogus");
        assert_eq!(
            diag,
            "t.cma:2:1: error: unknown mnemonic: bogus\n    bogus 1\n    ^\n"
        );
    }

    #[test]
    fn caret_sits_under_the_column() {
        let diag = render_diagnostic("t.cma", "jump nowhere", 1, 6, "unknown label: nowhere");
        assert_eq!(
            diag,
            "t.cma:1:6: error: unknown label: nowhere\n    jump nowhere\n         ^\n"
        );
    }

    #[test]
    fn renders_the_header_alone_when_the_line_is_gone() {
        let diag = render_diagnostic("t.cma", "loadc 5", 9, 1, "boom");
        assert_eq!(diag, "t.cma:9:1: error: boom\n");
    }

    #[test]
    fn carriage_returns_do_not_leak_into_the_quote() {
        let diag = render_diagnostic("t.cma", "bogus 1\r\nhalt", 1, 1, "unknown mnemonic: bogus");
        assert_eq!(
            diag,
            "t.cma:1:1: error: unknown mnemonic: bogus\n    bogus 1\n    ^\n"
        );
    }
}
