// src/io/serial/mod.rs
//
// Serial port channel.
// Provides cross-platform serial communication through the serialport crate.
//
// Features:
// - Background reader thread filling a bounded read buffer
// - Readiness and transport-error notifications on the event queue
// - Port enumeration with USB metadata for the settings dialog
// - Mark/Space parity and 1.5 stop bits applied to the native port

mod native;
pub mod ports;
pub mod reader;
pub(crate) mod utils;

pub use ports::{list_serial_ports, SerialPortInfo};
pub use reader::SerialChannel;
