// src/ui/app.rs
//
// Terminal front end state: the session plus whichever dialog is on top.
// Keys go to the settings dialog first, then to a modal, then to the menu
// or the console.

use crossterm::event::KeyEvent;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::dialogs::{Modal, ModalOutcome, PathPurpose};
use super::keymap::{map_key, KeyAction, MenuAction};
use super::settings_dialog::{DialogOutcome, SettingsDialog};
use crate::events::AppEvent;
use crate::io::serial::SerialPortInfo;
use crate::io::Channel;
use crate::session::Session;
use crate::settings::{save_settings, ChannelConfig};

/// Source of the port list shown in the settings dialog.
pub type PortLister = fn() -> Result<Vec<SerialPortInfo>, String>;

pub struct App<C: Channel> {
    session: Session<C>,
    config: ChannelConfig,
    settings_path: PathBuf,
    list_ports: PortLister,
    modal: Option<Modal>,
    settings: Option<SettingsDialog>,
    quit: bool,
}

impl<C: Channel> App<C> {
    pub fn new(
        session: Session<C>,
        config: ChannelConfig,
        settings_path: PathBuf,
        list_ports: PortLister,
    ) -> Self {
        Self {
            session,
            config,
            settings_path,
            list_ports,
            modal: None,
            settings: None,
            quit: false,
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn on_terminal_key(&mut self, key: &KeyEvent, now: Instant) {
        if let Some(dialog) = self.settings.as_mut() {
            match dialog.handle_key(key) {
                DialogOutcome::Pending => {}
                DialogOutcome::Cancelled => self.settings = None,
                DialogOutcome::Applied(config) => {
                    self.settings = None;
                    self.apply_settings(config);
                }
            }
            return;
        }

        if let Some(modal) = self.modal.as_mut() {
            match modal.handle_key(key) {
                ModalOutcome::Pending => {}
                ModalOutcome::Dismissed => self.modal = None,
                ModalOutcome::Path(purpose, path) => {
                    self.modal = None;
                    self.on_path(purpose, Path::new(&path));
                }
            }
            return;
        }

        match map_key(key, self.session.codec()) {
            KeyAction::Menu(action) => self.menu(action),
            KeyAction::Input(input) => self.session.handle(AppEvent::KeyInput(input), now),
            KeyAction::Ignore => {}
        }
    }

    /// Event from the channel or a timer; a transport error also gets a modal.
    pub fn on_event(&mut self, event: AppEvent, now: Instant) {
        let failure = match &event {
            AppEvent::ChannelError(reason) if self.session.affordances().disconnect => {
                Some(reason.clone())
            }
            _ => None,
        };
        self.session.handle(event, now);
        if let Some(reason) = failure {
            self.modal = Some(Modal::error("Critical Error", reason));
        }
    }

    pub fn is_enabled(&self, action: MenuAction) -> bool {
        let affordances = self.session.affordances();
        match action {
            MenuAction::Connect => affordances.connect,
            MenuAction::Disconnect => affordances.disconnect,
            MenuAction::Configure => affordances.configure,
            _ => true,
        }
    }

    pub fn menu(&mut self, action: MenuAction) {
        if !self.is_enabled(action) {
            return;
        }

        match action {
            MenuAction::About => self.modal = Some(Modal::About),
            MenuAction::Configure => {
                let ports = (self.list_ports)().unwrap_or_else(|e| {
                    tlog!("[UI] {}", e);
                    Vec::new()
                });
                self.settings = Some(SettingsDialog::new(&self.config, ports));
            }
            MenuAction::Connect => self.connect(),
            MenuAction::Disconnect => self.session.close_channel(),
            MenuAction::Clear => self.session.clear_console(),
            MenuAction::SendFile => self.modal = Some(Modal::path_prompt(PathPurpose::SendFile)),
            MenuAction::SaveAs => {
                // The port closes before the file is chosen
                self.session.close_channel();
                self.modal = Some(Modal::path_prompt(PathPurpose::SaveAs));
            }
            MenuAction::Quit => self.quit = true,
        }
    }

    pub fn connect(&mut self) {
        if let Err(e) = self.session.open_channel(&self.config) {
            self.modal = Some(Modal::error("Error", e));
        }
    }

    fn apply_settings(&mut self, config: ChannelConfig) {
        tlog!("[UI] Settings applied: {}", config.summary());
        if let Err(e) = save_settings(&self.settings_path, &config) {
            self.modal = Some(Modal::warning("Warning!", e));
        }
        self.config = config;
    }

    fn on_path(&mut self, purpose: PathPurpose, path: &Path) {
        match purpose {
            PathPurpose::SendFile => match self.session.load_file(path, &self.config) {
                Ok(report) => {
                    if let Some(e) = report.open_error {
                        self.modal = Some(Modal::error("Error", e));
                    }
                }
                Err(e) => self.modal = Some(Modal::warning("Codecs", e)),
            },
            PathPurpose::SaveAs => {
                if let Err(e) = self.session.save_transcript_as(path) {
                    self.modal = Some(Modal::warning("Warning!", e));
                }
            }
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn settings_dialog(&self) -> Option<&SettingsDialog> {
        self.settings.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Close the session, writing the exit transcript if enabled.
    pub fn shutdown(&mut self) -> Result<Option<PathBuf>, String> {
        self.session.shutdown(chrono::Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_channel, EventReceiver};
    use crate::io::{LoopbackChannel, LoopbackHandle};
    use crate::timer::Timing;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn no_ports() -> Result<Vec<SerialPortInfo>, String> {
        Ok(Vec::new())
    }

    fn app(dir: &Path) -> (App<LoopbackChannel>, LoopbackHandle, EventReceiver) {
        let (tx, rx) = event_channel();
        let channel = LoopbackChannel::new(tx, false);
        let handle = channel.handle();
        let config = ChannelConfig {
            port: "loop0".to_string(),
            ..ChannelConfig::default()
        };
        let session = Session::new(channel, &config, Timing::default(), dir.to_path_buf());
        let app = App::new(session, config, dir.join("simterm.toml"), no_ports);
        (app, handle, rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(app: &mut App<LoopbackChannel>, text: &str, now: Instant) {
        for c in text.chars() {
            app.on_terminal_key(&key(KeyCode::Char(c)), now);
        }
    }

    #[test]
    fn test_connect_and_disconnect_affordances() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _handle, _rx) = app(dir.path());
        let now = Instant::now();

        app.on_terminal_key(&key(KeyCode::F(3)), now);
        assert!(app.session().is_open());
        assert!(!app.is_enabled(MenuAction::Connect));
        assert!(!app.is_enabled(MenuAction::Configure));

        // Configure is disabled while connected
        app.on_terminal_key(&key(KeyCode::F(2)), now);
        assert!(app.settings_dialog().is_none());

        app.on_terminal_key(&key(KeyCode::F(4)), now);
        assert!(!app.session().is_open());
        assert!(app.is_enabled(MenuAction::Connect));
    }

    #[test]
    fn test_open_failure_shows_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, handle, _rx) = app(dir.path());
        handle.fail_next_open("Device or resource busy");

        app.on_terminal_key(&key(KeyCode::F(3)), Instant::now());
        assert_eq!(
            app.modal(),
            Some(&Modal::error("Error", "Device or resource busy"))
        );

        // The modal swallows keys until dismissed
        app.on_terminal_key(&key(KeyCode::Char('a')), Instant::now());
        assert!(app.session().console().is_empty());
        app.on_terminal_key(&key(KeyCode::Enter), Instant::now());
        assert!(app.modal().is_none());
    }

    #[test]
    fn test_settings_apply_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _handle, _rx) = app(dir.path());
        let now = Instant::now();

        app.on_terminal_key(&key(KeyCode::F(2)), now);
        assert!(app.settings_dialog().is_some());
        app.on_terminal_key(&key(KeyCode::Enter), now);

        assert!(app.settings_dialog().is_none());
        let saved = crate::settings::load_settings(&dir.path().join("simterm.toml")).unwrap();
        assert_eq!(&saved, app.config());
    }

    #[test]
    fn test_save_as_closes_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _handle, _rx) = app(dir.path());
        let now = Instant::now();
        app.connect();
        type_str(&mut app, "hi", now);

        app.on_terminal_key(&key(KeyCode::F(8)), now);
        assert!(!app.session().is_open());

        let path = dir.path().join("session.log");
        type_str(&mut app, path.to_str().unwrap(), now);
        app.on_terminal_key(&key(KeyCode::Enter), now);

        assert!(app.modal().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
    }

    #[test]
    fn test_send_missing_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _handle, _rx) = app(dir.path());
        let now = Instant::now();

        app.on_terminal_key(&key(KeyCode::F(7)), now);
        type_str(&mut app, dir.path().join("nope.txt").to_str().unwrap(), now);
        app.on_terminal_key(&key(KeyCode::Enter), now);

        assert!(matches!(app.modal(), Some(Modal::Warning { .. })));
        assert!(!app.session().is_open());
    }

    #[test]
    fn test_transport_error_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, handle, mut rx) = app(dir.path());
        app.connect();

        handle.raise_error("device removed");
        let event = rx.try_recv().unwrap();
        app.on_event(event, Instant::now());

        assert!(!app.session().is_open());
        assert!(matches!(app.modal(), Some(Modal::Error { .. })));
    }

    #[test]
    fn test_quit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _handle, _rx) = app(dir.path());
        app.on_terminal_key(&key(KeyCode::F(10)), Instant::now());
        assert!(app.should_quit());
    }
}
