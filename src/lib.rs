// Must come first so `tlog!` is visible in every module below
#[macro_use]
mod logging;

pub mod codec;
pub mod console;
pub mod events;
pub mod io;
pub mod session;
pub mod settings;
pub mod timer;
pub mod ui;

pub use logging::{init_file_logging, set_stderr_echo, stop_file_logging};

use std::path::PathBuf;

use events::{event_channel, EventReceiver};
use io::serial::list_serial_ports;
use io::{loopback_ports, Channel, LoopbackChannel, SerialChannel, LOOPBACK_PORT};
use session::Session;
use settings::ChannelConfig;
use timer::Timing;
use ui::{App, PortLister};

// ============================================================================
// Entry Point
// ============================================================================

/// Startup options resolved from the command line and the settings file.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub settings_path: PathBuf,
    pub config: ChannelConfig,
    /// Use the in-memory echo channel instead of a serial port
    pub loopback: bool,
    /// Open the channel before the first frame is drawn
    pub connect: bool,
    pub timing: Timing,
    /// Where the exit transcript is written
    pub transcript_dir: PathBuf,
}

/// Run the terminal until the user quits, then write the exit transcript.
pub async fn run(mut options: RunOptions) -> Result<(), String> {
    let (tx, rx) = event_channel();

    if options.loopback {
        if options.config.port.is_empty() {
            options.config.port = LOOPBACK_PORT.to_string();
        }
        tlog!("[main] Using loopback channel");
        run_with(LoopbackChannel::new(tx, true), loopback_ports, options, rx).await
    } else {
        run_with(SerialChannel::new(tx), list_serial_ports, options, rx).await
    }
}

async fn run_with<C: Channel>(
    channel: C,
    list_ports: PortLister,
    options: RunOptions,
    events: EventReceiver,
) -> Result<(), String> {
    let session = Session::new(
        channel,
        &options.config,
        options.timing,
        options.transcript_dir,
    );
    let mut app = App::new(session, options.config, options.settings_path, list_ports);

    if options.connect {
        app.connect();
    }

    let result = ui::run(&mut app, events).await;

    match app.shutdown() {
        Ok(Some(path)) => tlog!("[main] Session saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => tlog!("[main] {}", e),
    }

    result
}
