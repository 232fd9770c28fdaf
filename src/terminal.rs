use anyhow::Context;
use crossterm::cursor::{Hide, Show};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{Write, stdout};

/// Modes the presenters leave behind: synchronized output, disabled autowrap, colors.
const RESET_PRESENTER_MODES: &[u8] = b"\x1b[?2026l\x1b[?7h\x1b[0m";

/// Holds the terminal in raw mode on the alternate screen with the cursor hidden.
/// Dropping it hands the terminal back as it was found.
pub struct TerminalGuard(());

impl TerminalGuard {
    pub fn enter() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // From here on Drop owns the cleanup.
        let guard = TerminalGuard(());
        execute!(stdout(), EnterAlternateScreen, Clear(ClearType::All), Hide)
            .context("switch to the alternate screen")?;
        Ok(guard)
    }

    /// Wipes the screen before a full repaint.
    pub fn clear(out: &mut impl Write) -> anyhow::Result<()> {
        execute!(out, Clear(ClearType::All)).context("clear screen")
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = stdout();
        let _ = out.write_all(RESET_PRESENTER_MODES);
        let _ = queue!(out, Show, LeaveAlternateScreen);
        let _ = out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

/// `(cols, rows)` of the controlling terminal, or 80x24 when it cannot be queried.
pub fn size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}
