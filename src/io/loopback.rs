// src/io/loopback.rs
//
// In-memory channel.
// Written bytes are recorded and, with echo enabled, fed straight back as
// received data. A `LoopbackHandle` plays the remote side: it injects
// received bytes, inspects what was written and raises transport errors.

use std::sync::{Arc, Mutex, MutexGuard};

use super::serial::SerialPortInfo;
use super::{Channel, ChannelState};
use crate::events::{AppEvent, EventSender};
use crate::settings::ChannelConfig;

/// Port name used when the saved settings name no port.
pub const LOOPBACK_PORT: &str = "loopback";

/// Port list offered by the settings dialog in loopback mode.
pub fn loopback_ports() -> Result<Vec<SerialPortInfo>, String> {
    Ok(vec![SerialPortInfo {
        port_name: LOOPBACK_PORT.to_string(),
        port_type: "Loopback".to_string(),
        manufacturer: None,
        product: Some("In-memory echo channel".to_string()),
        serial_number: None,
        vid: None,
        pid: None,
    }])
}

#[derive(Default)]
struct LoopbackInner {
    state: Option<ChannelState>,
    echo: bool,
    rx: Vec<u8>,
    written: Vec<u8>,
    dtr: bool,
    rts: bool,
    config: Option<ChannelConfig>,
    fail_next_open: Option<String>,
}

impl LoopbackInner {
    fn is_open(&self) -> bool {
        self.state == Some(ChannelState::Open)
    }
}

fn lock(inner: &Mutex<LoopbackInner>) -> MutexGuard<'_, LoopbackInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct LoopbackChannel {
    inner: Arc<Mutex<LoopbackInner>>,
    events: EventSender,
}

impl LoopbackChannel {
    /// Create a loopback channel. With `echo`, every write comes back as input.
    pub fn new(events: EventSender, echo: bool) -> Self {
        let inner = LoopbackInner {
            echo,
            ..LoopbackInner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            events,
        }
    }

    /// Handle for driving the remote side of this channel.
    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            inner: self.inner.clone(),
            events: self.events.clone(),
        }
    }
}

impl Channel for LoopbackChannel {
    fn open(&mut self, config: &ChannelConfig) -> Result<(), String> {
        let mut inner = lock(&self.inner);
        if let Some(reason) = inner.fail_next_open.take() {
            inner.state = Some(ChannelState::Error(reason.clone()));
            return Err(reason);
        }
        if inner.is_open() {
            return Err("Channel is already open".to_string());
        }

        inner.rx.clear();
        inner.config = Some(config.clone());
        inner.state = Some(ChannelState::Open);
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = lock(&self.inner);
        inner.rx.clear();
        inner.state = Some(ChannelState::Closed);
    }

    fn is_open(&self) -> bool {
        lock(&self.inner).is_open()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, String> {
        let echoed = {
            let mut inner = lock(&self.inner);
            if !inner.is_open() {
                return Err("Channel is not open".to_string());
            }
            inner.written.extend_from_slice(data);
            if inner.echo && !data.is_empty() {
                inner.rx.extend_from_slice(data);
                true
            } else {
                false
            }
        };

        if echoed {
            let _ = self.events.send(AppEvent::ChannelReadable);
        }
        Ok(data.len())
    }

    fn read_all(&mut self) -> Vec<u8> {
        let mut inner = lock(&self.inner);
        if !inner.is_open() {
            return Vec::new();
        }
        std::mem::take(&mut inner.rx)
    }

    fn bytes_available(&self) -> usize {
        lock(&self.inner).rx.len()
    }

    fn set_data_terminal_ready(&mut self, on: bool) -> Result<(), String> {
        lock(&self.inner).dtr = on;
        Ok(())
    }

    fn set_request_to_send(&mut self, on: bool) -> Result<(), String> {
        lock(&self.inner).rts = on;
        Ok(())
    }

    fn state(&self) -> ChannelState {
        lock(&self.inner).state.clone().unwrap_or(ChannelState::Closed)
    }

    fn device_type(&self) -> &'static str {
        "loopback"
    }
}

/// Remote side of a `LoopbackChannel`.
#[derive(Clone)]
pub struct LoopbackHandle {
    inner: Arc<Mutex<LoopbackInner>>,
    events: EventSender,
}

impl LoopbackHandle {
    /// Deliver bytes as if the device had sent them. Dropped while closed.
    pub fn inject(&self, data: &[u8]) {
        {
            let mut inner = lock(&self.inner);
            if !inner.is_open() {
                return;
            }
            inner.rx.extend_from_slice(data);
        }
        let _ = self.events.send(AppEvent::ChannelReadable);
    }

    /// Everything written to the channel so far.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.inner).written.clone()
    }

    /// Simulate a transport failure (e.g. the device was unplugged).
    pub fn raise_error(&self, reason: &str) {
        lock(&self.inner).state = Some(ChannelState::Error(reason.to_string()));
        let _ = self.events.send(AppEvent::ChannelError(reason.to_string()));
    }

    /// Make the next `open` fail with `reason`.
    pub fn fail_next_open(&self, reason: &str) {
        lock(&self.inner).fail_next_open = Some(reason.to_string());
    }

    pub fn dtr(&self) -> bool {
        lock(&self.inner).dtr
    }

    pub fn rts(&self) -> bool {
        lock(&self.inner).rts
    }

    /// Configuration passed to the last successful `open`.
    pub fn last_config(&self) -> Option<ChannelConfig> {
        lock(&self.inner).config.clone()
    }
}
