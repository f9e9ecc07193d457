use std::io::{self, IsTerminal, Write};

const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";

/// Keeps the terminal cursor hidden while alive. The cursor comes back when
/// the guard drops, whether the run finished, failed, was interrupted or
/// panicked.
#[derive(Debug)]
pub struct CursorGuard {
    hidden: bool,
}

impl CursorGuard {
    pub fn hide() -> Self {
        let mut stderr = io::stderr();
        let hidden = stderr.is_terminal()
            && stderr.write_all(HIDE_CURSOR.as_bytes()).is_ok()
            && stderr.flush().is_ok();
        CursorGuard { hidden }
    }

    /// A guard that leaves the terminal alone.
    pub fn inactive() -> Self {
        CursorGuard { hidden: false }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if self.hidden {
            let mut stderr = io::stderr();
            let _ = stderr.write_all(SHOW_CURSOR.as_bytes());
            let _ = stderr.flush();
        }
    }
}
