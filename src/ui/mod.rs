// src/ui/mod.rs
//
// Full-screen terminal front end (ratatui + crossterm).
// One task multiplexes terminal input, channel events and the earliest
// armed timer, so every handler runs to completion before the next event.

pub mod app;
pub mod dialogs;
pub mod keymap;
pub mod render;
pub mod settings_dialog;

pub use app::{App, PortLister};

use crossterm::{
    event::{Event, EventStream},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::time::Instant;

use crate::events::EventReceiver;
use crate::io::Channel;
use crate::logging::set_stderr_echo;

/// Take over the terminal and run until the user quits.
/// The terminal is restored on every exit path.
pub async fn run<C: Channel>(app: &mut App<C>, mut events: EventReceiver) -> Result<(), String> {
    terminal::enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
    if let Err(e) = crossterm::execute!(std::io::stdout(), EnterAlternateScreen) {
        let _ = terminal::disable_raw_mode();
        return Err(format!("Failed to enter alternate screen: {}", e));
    }
    set_stderr_echo(false);

    let result = match Terminal::new(CrosstermBackend::new(std::io::stdout())) {
        Ok(mut terminal) => event_loop(&mut terminal, app, &mut events).await,
        Err(e) => Err(format!("Failed to create terminal: {}", e)),
    };

    let _ = terminal::disable_raw_mode();
    let _ = crossterm::execute!(std::io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    set_stderr_echo(true);
    result
}

async fn event_loop<B: Backend, C: Channel>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
    events: &mut EventReceiver,
) -> Result<(), String> {
    let mut input = EventStream::new();

    loop {
        terminal
            .draw(|frame| render::draw(frame, app))
            .map_err(|e| format!("Failed to draw: {}", e))?;

        if app.should_quit() {
            return Ok(());
        }

        let deadline = app.session().next_timer().map(|(deadline, _)| deadline);
        let timer = async {
            match deadline {
                Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => app.on_terminal_key(&key, Instant::now()),
                // Resize and the rest only need a redraw
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(format!("Terminal input error: {}", e)),
                None => return Ok(()),
            },
            Some(event) = events.recv() => {
                app.on_event(event, Instant::now());
                // Drain the backlog before the next redraw
                while let Ok(event) = events.try_recv() {
                    app.on_event(event, Instant::now());
                }
            }
            _ = timer => app.session_mut().fire_due_timers(Instant::now()),
        }
    }
}
