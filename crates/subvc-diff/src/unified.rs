//! Human-readable unified rendering of hunks.
//!
//! Descriptive only; not meant to round-trip through `patch`.

use std::fmt::Write;

use crate::line_diff::Hunk;

/// Rendering used when either side is not UTF-8 text.
pub const BINARY_MARKER: &str = "Binary files differ";

/// Render hunks as `@@ -<src>,<len> +<tgt>,<len> @@` blocks, each followed
/// by its removed lines (`- `) and then its added lines (`+ `).
pub fn render_hunks(hunks: &[Hunk]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            hunk.source_pos + 1,
            hunk.source_len(),
            hunk.target_pos + 1,
            hunk.target_len()
        );
        for line in &hunk.source_lines {
            let _ = writeln!(out, "- {line}");
        }
        for line in &hunk.target_lines {
            let _ = writeln!(out, "+ {line}");
        }
    }
    out
}

/// Marker rendered in place of a diff that could not be computed.
pub(crate) fn error_marker(message: &str) -> String {
    format!("Error generating diff: {message}")
}
