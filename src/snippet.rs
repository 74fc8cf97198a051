//! Source excerpts attached to render, transform and validation errors.
//!
//! ```text
//!   3 | <ul>
//! > 4 |   {{#each items}
//!     |          ^
//!   5 | </ul>
//! ```

/// Lines shown on each side of the failing line.
pub const SNIPPET_RANGE: usize = 5;

/// Excerpt `code` around 1-based `line`, marking `column` (1-based) when known.
///
/// `start_index` is the line in the enclosing file where `code` begins, for
/// code cut out of a bigger file (an inline `<style>` block); displayed line
/// numbers are shifted by it. Returns an empty string when `line` is 0 or past
/// the end of `code`.
pub fn code_snippet(code: &str, line: usize, column: Option<usize>, start_index: usize) -> String {
    let lines: Vec<&str> = code.lines().collect();
    if line == 0 || line > lines.len() {
        return String::new();
    }

    let first = line.saturating_sub(SNIPPET_RANGE).max(1);
    let last = (line + SNIPPET_RANGE).min(lines.len());
    let width = (last + start_index).to_string().len();

    let mut out = Vec::new();
    for no in first..=last {
        let text = lines[no - 1];
        let shown = no + start_index;
        if no == line {
            out.push(format!("> {shown:>width$} | {text}"));
            if let Some(col) = column.filter(|c| *c > 0) {
                out.push(format!("  {:>width$} | {}^", "", " ".repeat(col - 1)));
            }
        } else {
            out.push(format!("  {shown:>width$} | {text}"));
        }
    }
    out.join("\n")
}
