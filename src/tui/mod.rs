//! Terminal user interface
//!
//! A three-panel live view of a run: phase header, activity and
//! conversation panels, and the input line. The TUI is a pure observer of
//! the event bus plus a thin input path back into the controller.

mod events;
mod runner;
mod state;
mod views;

pub use events::{Event, EventHandler};
pub use runner::TuiRunner;
pub use state::TuiState;

use std::io::{self, Stdout};
use std::sync::Arc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use eyre::Result;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::events::EventBus;
use crate::pipeline::PipelineController;

/// Terminal type alias
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run the TUI for one pipeline run
pub async fn run(controller: Arc<PipelineController>, bus: Arc<EventBus>) -> Result<()> {
    let terminal = init()?;

    // Restore the terminal on every exit path, including errors
    struct TerminalGuard;
    impl Drop for TerminalGuard {
        fn drop(&mut self) {
            let _ = restore();
        }
    }
    let _guard = TerminalGuard;

    let mut runner = TuiRunner::new(terminal, controller, &bus);
    runner.run().await
}
