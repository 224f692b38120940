// src/io/serial/reader.rs
//
// Serial port channel backed by the serialport crate.
// One port thread owns all blocking I/O. It moves bytes from the OS into a
// bounded read buffer and posts `ChannelReadable`; the session drains the
// buffer with `read_all` whenever the console is ready for more text.
// `write` only queues bytes for that thread.

use serialport::{SerialPort, SerialPortBuilder};
use std::io::{Read, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc as std_mpsc, Arc, Mutex, MutexGuard,
};
use std::thread::JoinHandle;
use std::time::Duration;

use super::{native, utils};
use crate::events::{AppEvent, EventSender};
use crate::io::{Channel, ChannelState, READ_BUFFER_SIZE};
use crate::settings::ChannelConfig;

/// Port read timeout. Keeps the port mutex free for writes between reads.
const READ_TIMEOUT: Duration = Duration::from_millis(5);

/// Pause while the read buffer is full.
const FULL_BUFFER_BACKOFF: Duration = Duration::from_millis(10);

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Outgoing bytes handed to the port thread.
type TransmitSender = std_mpsc::Sender<Vec<u8>>;

fn lock_buffer(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Serial Channel
// ============================================================================

pub struct SerialChannel {
    events: EventSender,
    port: Option<SharedPort>,
    port_name: String,
    transmit_tx: Option<TransmitSender>,
    rx_buffer: Arc<Mutex<Vec<u8>>>,
    cancel_flag: Arc<AtomicBool>,
    /// Set by the reader thread when the device fails
    failure: Arc<Mutex<Option<String>>>,
    task_handle: Option<JoinHandle<()>>,
}

impl SerialChannel {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            port: None,
            port_name: String::new(),
            transmit_tx: None,
            rx_buffer: Arc::new(Mutex::new(Vec::with_capacity(READ_BUFFER_SIZE))),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
            task_handle: None,
        }
    }

    fn port(&self) -> Result<&SharedPort, String> {
        self.port.as_ref().ok_or_else(|| "Port is not open".to_string())
    }
}

impl Channel for SerialChannel {
    fn open(&mut self, config: &ChannelConfig) -> Result<(), String> {
        if self.port.is_some() {
            return Err(format!("{} is already open", self.port_name));
        }

        utils::check_line_settings(config.parity, config.stop_bits)?;

        let builder = serialport::new(config.port.as_str(), config.baud_rate)
            .data_bits(utils::to_serialport_data_bits(config.data_bits))
            .stop_bits(utils::to_serialport_stop_bits(config.stop_bits))
            .parity(utils::to_serialport_parity(config.parity))
            .flow_control(utils::to_serialport_flow_control(config.flow_control))
            .timeout(READ_TIMEOUT);
        let port = open_port(builder, config)?;

        tlog!(
            "[Serial] Opened {} at {} baud ({}, flow: {})",
            config.port,
            config.baud_rate,
            utils::line_format(config.data_bits, config.parity, config.stop_bits),
            config.flow_control.label()
        );

        let port: SharedPort = Arc::new(Mutex::new(port));
        lock_buffer(&self.rx_buffer).clear();
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
        self.cancel_flag = Arc::new(AtomicBool::new(false));
        let (transmit_tx, transmit_rx) = std_mpsc::channel();

        let reader = Reader {
            port: port.clone(),
            port_name: config.port.clone(),
            transmit_rx,
            rx_buffer: self.rx_buffer.clone(),
            cancel_flag: self.cancel_flag.clone(),
            failure: self.failure.clone(),
            events: self.events.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || reader.run())
            .map_err(|e| format!("Failed to start reader thread: {}", e))?;

        self.port = Some(port);
        self.port_name = config.port.clone();
        self.transmit_tx = Some(transmit_tx);
        self.task_handle = Some(handle);
        Ok(())
    }

    fn close(&mut self) {
        self.transmit_tx = None;
        self.cancel_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.task_handle.take() {
            if handle.join().is_err() {
                tlog!("[Serial] Reader thread for {} panicked", self.port_name);
            }
        }

        if self.port.take().is_some() {
            tlog!("[Serial] Closed {}", self.port_name);
        }
        lock_buffer(&self.rx_buffer).clear();
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Queue `data` for the port thread. Returns the number of bytes queued.
    fn write(&mut self, data: &[u8]) -> Result<usize, String> {
        if data.is_empty() {
            return Ok(0);
        }

        let tx = self
            .transmit_tx
            .as_ref()
            .ok_or_else(|| "Port is not open".to_string())?;
        tx.send(data.to_vec())
            .map_err(|e| format!("Failed to queue transmit request: {}", e))?;
        Ok(data.len())
    }

    fn read_all(&mut self) -> Vec<u8> {
        if self.port.is_none() {
            return Vec::new();
        }
        std::mem::take(&mut *lock_buffer(&self.rx_buffer))
    }

    fn bytes_available(&self) -> usize {
        lock_buffer(&self.rx_buffer).len()
    }

    fn set_data_terminal_ready(&mut self, on: bool) -> Result<(), String> {
        let port = self.port()?;
        let mut guard = port
            .lock()
            .map_err(|e| format!("Port mutex poisoned: {}", e))?;
        guard
            .write_data_terminal_ready(on)
            .map_err(|e| format!("Failed to set DTR: {}", e))
    }

    fn set_request_to_send(&mut self, on: bool) -> Result<(), String> {
        let port = self.port()?;
        let mut guard = port
            .lock()
            .map_err(|e| format!("Port mutex poisoned: {}", e))?;
        guard
            .write_request_to_send(on)
            .map_err(|e| format!("Failed to set RTS: {}", e))
    }

    fn state(&self) -> ChannelState {
        if let Ok(failure) = self.failure.lock() {
            if let Some(reason) = failure.as_ref() {
                return ChannelState::Error(reason.clone());
            }
        }
        if self.port.is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    fn device_type(&self) -> &'static str {
        "serial"
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open the native port so settings outside the builder can be applied.
fn open_port(
    builder: SerialPortBuilder,
    config: &ChannelConfig,
) -> Result<Box<dyn SerialPort>, String> {
    let port = builder
        .open_native()
        .map_err(|e| format!("Failed to open {}: {}", config.port, e))?;
    native::apply_line_settings(&port, config.parity, config.stop_bits)?;
    Ok(Box::new(port))
}

// ============================================================================
// Transmit Queue
// ============================================================================

/// Bytes waiting for the port. Drained by the port thread one write at a
/// time, so a slow line never stalls the dispatch loop or drops bytes.
#[derive(Debug, Default)]
struct TxQueue {
    pending: Vec<u8>,
}

impl TxQueue {
    fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    /// One write attempt. A timeout keeps everything queued for the next
    /// attempt; any other error drops the queue.
    fn write_to<W: Write + ?Sized>(&mut self, port: &mut W) -> Result<usize, String> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        match port.write(&self.pending) {
            Ok(n) => {
                self.pending.drain(..n);
                Ok(n)
            }
            Err(ref e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => {
                let dropped = self.len();
                self.pending.clear();
                Err(format!("Serial write error ({} byte(s) dropped): {}", dropped, e))
            }
        }
    }
}

// ============================================================================
// Reader Thread
// ============================================================================

struct Reader {
    port: SharedPort,
    port_name: String,
    transmit_rx: std_mpsc::Receiver<Vec<u8>>,
    rx_buffer: Arc<Mutex<Vec<u8>>>,
    cancel_flag: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<String>>>,
    events: EventSender,
}

impl Reader {
    fn run(self) {
        let mut buf = [0u8; 256];
        let mut tx_queue = TxQueue::default();

        loop {
            if self.cancel_flag.load(Ordering::Relaxed) {
                break;
            }

            // Pending transmit requests (non-blocking)
            while let Ok(data) = self.transmit_rx.try_recv() {
                tx_queue.push(&data);
            }
            if !tx_queue.is_empty() {
                let result = match self.port.lock() {
                    Ok(mut port) => tx_queue.write_to(&mut **port),
                    Err(e) => {
                        self.fail(format!("Port mutex poisoned: {}", e));
                        return;
                    }
                };
                if let Err(e) = result {
                    tlog!("[Serial] {}", e);
                }
            }

            let room = READ_BUFFER_SIZE.saturating_sub(lock_buffer(&self.rx_buffer).len());
            if room == 0 {
                std::thread::sleep(FULL_BUFFER_BACKOFF);
                continue;
            }
            let want = room.min(buf.len());

            let read_result = match self.port.lock() {
                Ok(mut port) => port.read(&mut buf[..want]),
                Err(e) => {
                    self.fail(format!("Port mutex poisoned: {}", e));
                    return;
                }
            };

            match read_result {
                Ok(n) if n > 0 => {
                    lock_buffer(&self.rx_buffer).extend_from_slice(&buf[..n]);
                    let _ = self.events.send(AppEvent::ChannelReadable);
                }
                Ok(_) => {
                    // EOF - port closed/disconnected
                    self.fail(format!("{} disconnected", self.port_name));
                    return;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    // Timeout is expected for serial reads
                }
                Err(e) => {
                    self.fail(format!("Read error on {}: {}", self.port_name, e));
                    return;
                }
            }
        }
    }

    fn fail(&self, reason: String) {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return;
        }
        tlog!("[Serial] {}", reason);
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(reason.clone());
        }
        let _ = self.events.send(AppEvent::ChannelError(reason));
    }
}
