use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use simterm_lib::io::serial::list_serial_ports;
use simterm_lib::settings::{self, validate_baud_rate};
use simterm_lib::timer::Timing;
use simterm_lib::RunOptions;

/// Serial port terminal with local echo and session transcripts
#[derive(Parser, Debug)]
#[command(name = "simterm", version, about)]
struct Args {
    /// Serial port to use (overrides the saved setting)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the saved setting)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Settings file (default: <exe name>.toml next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use an in-memory echo channel instead of a serial port
    #[arg(long)]
    loopback: bool,

    /// Connect on startup
    #[arg(long)]
    connect: bool,

    /// List serial ports and exit
    #[arg(long)]
    list: bool,

    /// Print the port list as JSON
    #[arg(long, requires = "list")]
    json: bool,

    /// Write a log file to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Typing settle delay in milliseconds
    #[arg(long, default_value_t = 5000)]
    settle_ms: u64,

    /// Deferred read retry delay in milliseconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    retry_ms: u64,
}

fn list_ports(json: bool) -> Result<(), String> {
    let ports = list_serial_ports()?;

    if json {
        let text = serde_json::to_string_pretty(&ports)
            .map_err(|e| format!("Failed to serialize port list: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in &ports {
        println!("{} ({})", port.port_name, port.port_type);
        for line in port.info_lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), String> {
    if args.list {
        return list_ports(args.json);
    }

    if let Some(dir) = &args.log_dir {
        simterm_lib::init_file_logging(dir)?;
    }

    let settings_path = args.config.unwrap_or_else(settings::default_settings_path);
    let mut config = settings::load_settings(&settings_path)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(baud) = args.baud {
        validate_baud_rate(baud)?;
        config.baud_rate = baud;
    }

    let options = RunOptions {
        settings_path,
        config,
        loopback: args.loopback,
        connect: args.connect,
        timing: Timing {
            settle: Duration::from_millis(args.settle_ms),
            read_retry: Duration::from_millis(args.retry_ms),
        },
        transcript_dir: settings::app_dir(),
    };

    let result = simterm_lib::run(options).await;
    simterm_lib::stop_file_logging();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
