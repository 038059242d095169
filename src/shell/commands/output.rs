//! Listing output that tolerates a closed stdout.
//!
//! `ls -l /courses | head` closes the pipe after a few lines; the command
//! then stops printing and returns `Ok(())`.

/// `println!` for use inside a command returning `anyhow::Result<()>`
///
/// A broken pipe ends the command successfully; any other write error is
/// returned from the enclosing function.
#[macro_export]
macro_rules! print_line {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        if let Err(e) = writeln!(std::io::stdout(), $($arg)*) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(e.into());
        }
    }};
}
