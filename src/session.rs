// src/session.rs
//
// Session controller: owns the channel and the console and routes every
// event between them.
//
// Read path: readiness is ignored while the console is busy (the user is
// mid-line); a short retry timer re-runs the read later and the channel keeps
// buffering meanwhile. Write path: each keystroke is one write attempt.

use chrono::NaiveDateTime;
use hex::ToHex;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::codec::TextCodec;
use crate::console::Console;
use crate::events::{AppEvent, KeyInput};
use crate::io::Channel;
use crate::settings::ChannelConfig;
use crate::timer::{SingleShotTimer, TimerId, Timing};

// ============================================================================
// Types
// ============================================================================

/// Which menu actions are currently available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Affordances {
    pub connect: bool,
    pub disconnect: bool,
    pub configure: bool,
}

impl Affordances {
    pub fn disconnected() -> Self {
        Self {
            connect: true,
            disconnect: false,
            configure: true,
        }
    }

    pub fn connected() -> Self {
        Self {
            connect: false,
            disconnect: true,
            configure: false,
        }
    }
}

/// Result of sending a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub bytes: usize,
    /// Whether the bytes were written to an open channel
    pub sent: bool,
    /// Set when the channel had to be opened and that failed
    pub open_error: Option<String>,
}

/// Session transcript file name for the given local time: `YYYY-MM-DD HH-MM-SS.log`.
pub fn transcript_file_name(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H-%M-%S.log").to_string()
}

// ============================================================================
// Session
// ============================================================================

pub struct Session<C: Channel> {
    channel: C,
    console: Console,
    codec: TextCodec,
    read_retry: SingleShotTimer,
    timing: Timing,
    save_on_exit: bool,
    transcript_dir: PathBuf,
    affordances: Affordances,
    status: String,
}

impl<C: Channel> Session<C> {
    /// Create a disconnected session. `settings` seeds the text encoding and
    /// the save-on-exit flag until the first open.
    pub fn new(channel: C, settings: &ChannelConfig, timing: Timing, transcript_dir: PathBuf) -> Self {
        Self {
            channel,
            console: Console::new(timing.settle),
            codec: TextCodec::new(settings.encoding),
            read_retry: SingleShotTimer::new(),
            timing,
            save_on_exit: settings.save_on_exit,
            transcript_dir,
            affordances: Affordances::disconnected(),
            status: "Disconnected".to_string(),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub fn handle(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::KeyInput(input) => self.on_key_input(now, &input),
            AppEvent::ChannelReadable => self.on_channel_readable(now),
            AppEvent::ChannelError(reason) => self.on_channel_error(&reason),
            AppEvent::TimerFired(TimerId::EchoSettle) => {
                self.console.on_settle_timeout(now);
            }
            AppEvent::TimerFired(TimerId::ReadRetry) => {
                if self.read_retry.expire(now) {
                    self.on_channel_readable(now);
                }
            }
        }
    }

    /// Earliest armed timer, if any.
    pub fn next_timer(&self) -> Option<(Instant, TimerId)> {
        let settle = self
            .console
            .settle_deadline()
            .map(|d| (d, TimerId::EchoSettle));
        let retry = self.read_retry.deadline().map(|d| (d, TimerId::ReadRetry));

        match (settle, retry) {
            (Some(s), Some(r)) => Some(if r.0 < s.0 { r } else { s }),
            (s, r) => s.or(r),
        }
    }

    /// Deliver `TimerFired` for every timer due at `now`, earliest first.
    /// A timer re-armed by its own handler waits for the next call.
    pub fn fire_due_timers(&mut self, now: Instant) {
        let mut due: Vec<(Instant, TimerId)> = Vec::with_capacity(2);
        if let Some(d) = self.console.settle_deadline().filter(|d| *d <= now) {
            due.push((d, TimerId::EchoSettle));
        }
        if let Some(d) = self.read_retry.deadline().filter(|d| *d <= now) {
            due.push((d, TimerId::ReadRetry));
        }
        due.sort_by_key(|(deadline, _)| *deadline);

        for (_, id) in due {
            self.handle(AppEvent::TimerFired(id), now);
        }
    }

    // ========================================================================
    // Read / Write Paths
    // ========================================================================

    /// Channel has bytes. Defers while the console is busy, otherwise drains,
    /// decodes and appends.
    pub fn on_channel_readable(&mut self, now: Instant) {
        if self.console.is_busy() {
            self.read_retry.start(now, self.timing.read_retry);
            return;
        }
        self.read_retry.stop();

        if !self.channel.is_open() {
            return;
        }

        let data = self.channel.read_all();
        if data.is_empty() {
            return;
        }
        tlog!("[Session] rx {} byte(s)", data.len());

        let text = self.codec.decode(&data);
        if !text.is_empty() {
            self.console.append(&text);
        }
    }

    /// Key press from the UI: the console forwards bytes here before echoing.
    pub fn on_key_input(&mut self, now: Instant, input: &KeyInput) {
        let open = self.channel.is_open();
        let channel = &mut self.channel;
        self.console
            .on_key_input(now, input, open, |bytes| write_to_channel(channel, bytes));
    }

    /// Bytes destined for the device. Dropped when the channel is closed.
    pub fn on_console_keystroke(&mut self, bytes: &[u8]) {
        write_to_channel(&mut self.channel, bytes);
    }

    /// Transport failure: close and return to the disconnected state.
    pub fn on_channel_error(&mut self, reason: &str) {
        tlog!("[Session] Channel error: {}", reason);
        self.close_channel();
        self.status = format!("Disconnected: {}", reason);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn open_channel(&mut self, config: &ChannelConfig) -> Result<(), String> {
        if let Err(e) = config.validate() {
            self.status = "Open error".to_string();
            return Err(e);
        }

        self.codec = TextCodec::new(config.encoding);
        self.save_on_exit = config.save_on_exit;

        if let Err(e) = self.channel.open(config) {
            tlog!("[Session] Open failed: {}", e);
            self.status = "Open error".to_string();
            return Err(e);
        }

        self.console.set_local_echo_enabled(config.local_echo);
        if let Err(e) = self.channel.set_data_terminal_ready(config.dtr) {
            tlog!("[Session] {}", e);
        }
        if let Err(e) = self.channel.set_request_to_send(config.rts) {
            tlog!("[Session] {}", e);
        }

        self.affordances = Affordances::connected();
        self.status = format!("Connected to {}", config.summary());
        tlog!(
            "[Session] {} ({}, encoding: {}, echo: {})",
            self.status,
            self.channel.device_type(),
            config.encoding.label(),
            config.local_echo
        );
        Ok(())
    }

    pub fn close_channel(&mut self) {
        if self.channel.is_open() {
            self.channel.close();
        }
        self.read_retry.stop();
        self.affordances = Affordances::disconnected();
        self.status = "Disconnected".to_string();
    }

    /// Write the console transcript as UTF-8.
    pub fn save_transcript(&self, path: &Path) -> Result<(), String> {
        std::fs::write(path, self.console.to_plain_text()).map_err(|e| {
            format!("Could not write to file {}:\n{}", path.display(), e)
        })?;
        tlog!("[Session] Transcript saved to {}", path.display());
        Ok(())
    }

    /// Manual save. The port is closed first so the transcript is final.
    pub fn save_transcript_as(&mut self, path: &Path) -> Result<(), String> {
        self.close_channel();
        self.save_transcript(path)
    }

    /// Send a file: open the channel if needed, write the raw bytes, and show
    /// them in the console. A read failure aborts before anything changes.
    pub fn load_file(&mut self, path: &Path, config: &ChannelConfig) -> Result<LoadReport, String> {
        let data = std::fs::read(path)
            .map_err(|e| format!("Can't read file {}:\n{}", path.display(), e))?;

        let open_error = if self.channel.is_open() {
            None
        } else {
            self.open_channel(config).err()
        };

        let sent = self.channel.is_open();
        self.on_console_keystroke(&data);

        let text = self.codec.decode_complete(&data);
        self.console.append(&text);
        tlog!(
            "[Session] Loaded {} bytes from {} (sent: {})",
            data.len(),
            path.display(),
            sent
        );

        Ok(LoadReport {
            bytes: data.len(),
            sent,
            open_error,
        })
    }

    /// Close the channel and, with save-on-exit set, write the transcript
    /// into the transcript directory. Returns the file written, if any.
    pub fn shutdown(&mut self, at: NaiveDateTime) -> Result<Option<PathBuf>, String> {
        self.close_channel();

        if !self.save_on_exit || self.console.is_empty() {
            return Ok(None);
        }

        let path = self.transcript_dir.join(transcript_file_name(at));
        self.save_transcript(&path)?;
        Ok(Some(path))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Codec for the active (or last configured) encoding.
    pub fn codec(&self) -> &TextCodec {
        &self.codec
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn save_on_exit(&self) -> bool {
        self.save_on_exit
    }

    pub fn read_retry_pending(&self) -> bool {
        self.read_retry.is_active()
    }
}

fn write_to_channel<C: Channel>(channel: &mut C, bytes: &[u8]) {
    if !channel.is_open() {
        return;
    }
    match channel.write(bytes) {
        Ok(n) if n > 0 => tlog!(
            "[Session] tx {} byte(s): {}",
            n,
            bytes.encode_hex::<String>()
        ),
        Ok(_) => {}
        Err(e) => tlog!("[Session] {}", e),
    }
}
