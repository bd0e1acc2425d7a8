//! Output helpers for CLI commands.

use std::io::Write;

/// Writes a block of text to stdout, adding a trailing newline if missing.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn emit(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()
}
