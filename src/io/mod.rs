// src/io/mod.rs
//
// Channel abstraction for SimTerm.
// A channel is a duplex byte stream: the serial port in normal use, or an
// in-memory loopback for demos and tests. Channels report readiness and
// transport failures by posting `AppEvent`s; reads never block.

pub mod loopback;
pub mod serial;

pub use loopback::{loopback_ports, LoopbackChannel, LoopbackHandle, LOOPBACK_PORT};
pub use serial::SerialChannel;

use crate::settings::ChannelConfig;

/// Bytes a channel buffers before it stops pulling from the device.
/// When the buffer is full the reader leaves data in the OS driver, so flow
/// control throttles the sender instead of bytes being dropped.
pub const READ_BUFFER_SIZE: usize = 10_000;

/// Channel lifecycle state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Open,
    Error(String),
}

/// A duplex byte stream owned by the session.
pub trait Channel: Send {
    /// Open with the given line parameters.
    fn open(&mut self, config: &ChannelConfig) -> Result<(), String>;

    /// Close the channel. Unread buffered bytes are discarded.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Queue bytes for transmission. Single attempt, no retry.
    fn write(&mut self, data: &[u8]) -> Result<usize, String>;

    /// Take every byte currently buffered. Empty when closed.
    fn read_all(&mut self) -> Vec<u8>;

    /// Bytes buffered and not yet read
    fn bytes_available(&self) -> usize;

    fn set_data_terminal_ready(&mut self, on: bool) -> Result<(), String>;

    fn set_request_to_send(&mut self, on: bool) -> Result<(), String>;

    fn state(&self) -> ChannelState;

    /// Device type identifier used in logs
    fn device_type(&self) -> &'static str {
        "unknown"
    }
}
