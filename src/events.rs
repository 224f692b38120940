// src/events.rs
//
// Events consumed by the single session dispatcher.
// Channels post readiness and transport errors through an `EventSender`;
// the UI posts key input; the event loop posts timer expiries.

use tokio::sync::mpsc;

use crate::timer::TimerId;

/// A key press as seen by the console: the raw bytes to send and the edit
/// action the text buffer applies when echoing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub bytes: Vec<u8>,
    pub key: EditKey,
}

impl KeyInput {
    pub fn new(bytes: impl Into<Vec<u8>>, key: EditKey) -> Self {
        Self {
            bytes: bytes.into(),
            key,
        }
    }
}

/// Edit action applied to the console text when a key is echoed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKey {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    /// Key with no visible effect (control characters, escape)
    None,
}

/// Everything the dispatcher reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    KeyInput(KeyInput),
    ChannelReadable,
    ChannelError(String),
    TimerFired(TimerId),
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
