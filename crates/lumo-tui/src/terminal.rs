//! Terminal setup and restore.
//!
//! The terminal is put back on normal exit (runtime `Drop`), on panic
//! (hook below), and on Ctrl+C.

use std::io::{self, Stdout};
use std::panic;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

/// Enters raw mode and the alternate screen.
///
/// # Errors
/// Returns an error if the terminal refuses either mode.
pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

/// Turns on mouse capture for wheel scrolling and bracketed paste.
///
/// # Errors
/// Returns an error if the escape sequence cannot be written.
pub fn enable_input_capture() -> Result<()> {
    execute!(io::stdout(), EnableMouseCapture, EnableBracketedPaste)
        .context("Failed to enable input capture")
}

/// # Errors
/// Returns an error if the escape sequence cannot be written.
pub fn disable_input_capture() -> Result<()> {
    execute!(io::stdout(), DisableBracketedPaste, DisableMouseCapture)
        .context("Failed to disable input capture")
}

/// Leaves the alternate screen and raw mode. Safe to call repeatedly.
///
/// # Errors
/// Returns an error if the terminal cannot be restored.
pub fn restore_terminal() -> Result<()> {
    let _ = execute!(io::stdout(), DisableBracketedPaste, DisableMouseCapture);
    execute!(io::stdout(), LeaveAlternateScreen).context("Failed to leave alternate screen")?;
    disable_raw_mode().context("Failed to disable raw mode")
}

/// Restores the terminal before the default panic output is printed.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        previous(info);
    }));
}
