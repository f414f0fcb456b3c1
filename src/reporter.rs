// Reporter for assembler diagnostics with source context.

use crate::assembler::AsmError;

pub fn format_diagnostic(err: &AsmError, use_color: bool) -> String {
    let mut out = String::new();
    out.push_str(err.reason);
    out.push_str(":\n");
    out.push_str(err.line.trim_end());
    out.push('\n');
    out.push_str(&caret_line(err.pos, use_color));
    out
}

fn caret_line(column: usize, use_color: bool) -> String {
    let pad = " ".repeat(column);
    if use_color {
        format!("{pad}\x1b[31m^\x1b[0m")
    } else {
        format!("{pad}^")
    }
}
