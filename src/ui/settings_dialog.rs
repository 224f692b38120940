// src/ui/settings_dialog.rs
//
// Port settings form. Up/Down move between fields, Left/Right cycle a
// selector, Space toggles a checkbox, Enter applies and Esc cancels.
// "Custom" port and baud entries accept typed text.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::io::serial::SerialPortInfo;
use crate::settings::{
    validate_baud_rate, ChannelConfig, DataBits, FlowControl, Parity, StopBits, TextEncoding,
    MAX_BAUD_RATE, STANDARD_BAUD_RATES,
};

const CUSTOM: &str = "Custom";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Port,
    Baud,
    DataBits,
    Parity,
    StopBits,
    FlowControl,
    Encoding,
    LocalEcho,
    Dtr,
    Rts,
    SaveOnExit,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Self::Port,
        Self::Baud,
        Self::DataBits,
        Self::Parity,
        Self::StopBits,
        Self::FlowControl,
        Self::Encoding,
        Self::LocalEcho,
        Self::Dtr,
        Self::Rts,
        Self::SaveOnExit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Port => "Serial port",
            Self::Baud => "Baud rate",
            Self::DataBits => "Data bits",
            Self::Parity => "Parity",
            Self::StopBits => "Stop bits",
            Self::FlowControl => "Flow control",
            Self::Encoding => "Encoding",
            Self::LocalEcho => "Local echo",
            Self::Dtr => "DTR",
            Self::Rts => "RTS",
            Self::SaveOnExit => "Save session on exit",
        }
    }

    pub fn is_checkbox(&self) -> bool {
        matches!(
            self,
            Self::LocalEcho | Self::Dtr | Self::Rts | Self::SaveOnExit
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogOutcome {
    Pending,
    Cancelled,
    Applied(ChannelConfig),
}

pub struct SettingsDialog {
    ports: Vec<SerialPortInfo>,
    /// Index into `ports`; `ports.len()` selects the custom entry
    port_index: usize,
    custom_port: String,
    /// Index into `STANDARD_BAUD_RATES`; its length selects the custom entry
    baud_index: usize,
    custom_baud: String,
    data_bits: DataBits,
    parity: Parity,
    stop_bits: StopBits,
    flow_control: FlowControl,
    encoding: TextEncoding,
    local_echo: bool,
    dtr: bool,
    rts: bool,
    save_on_exit: bool,
    focus: usize,
    error: Option<String>,
}

impl SettingsDialog {
    pub fn new(current: &ChannelConfig, ports: Vec<SerialPortInfo>) -> Self {
        let (port_index, custom_port) = match ports.iter().position(|p| p.port_name == current.port) {
            Some(i) => (i, String::new()),
            None if current.port.is_empty() && !ports.is_empty() => (0, String::new()),
            None => (ports.len(), current.port.clone()),
        };

        let (baud_index, custom_baud) =
            match STANDARD_BAUD_RATES.iter().position(|b| *b == current.baud_rate) {
                Some(i) => (i, String::new()),
                None => (STANDARD_BAUD_RATES.len(), current.baud_rate.to_string()),
            };

        // Settings not offered here fall back to the plain ones
        let parity = if Parity::available().contains(&current.parity) {
            current.parity
        } else {
            Parity::None
        };
        let stop_bits = if StopBits::available().contains(&current.stop_bits) {
            current.stop_bits
        } else {
            StopBits::One
        };

        Self {
            ports,
            port_index,
            custom_port,
            baud_index,
            custom_baud,
            data_bits: current.data_bits,
            parity,
            stop_bits,
            flow_control: current.flow_control,
            encoding: current.encoding,
            local_echo: current.local_echo,
            dtr: current.dtr,
            rts: current.rts,
            save_on_exit: current.save_on_exit,
            focus: 0,
            error: None,
        }
    }

    pub fn focused(&self) -> Field {
        Field::ALL[self.focus]
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn port_is_custom(&self) -> bool {
        self.port_index >= self.ports.len()
    }

    fn baud_is_custom(&self) -> bool {
        self.baud_index >= STANDARD_BAUD_RATES.len()
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> DialogOutcome {
        if key.kind == KeyEventKind::Release {
            return DialogOutcome::Pending;
        }

        match key.code {
            KeyCode::Esc => return DialogOutcome::Cancelled,
            KeyCode::Enter => match self.config() {
                Ok(config) => return DialogOutcome::Applied(config),
                Err(e) => self.error = Some(e),
            },
            KeyCode::Up | KeyCode::BackTab => {
                self.focus = (self.focus + Field::ALL.len() - 1) % Field::ALL.len();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.focus = (self.focus + 1) % Field::ALL.len();
            }
            KeyCode::Left => self.cycle(false),
            KeyCode::Right => self.cycle(true),
            KeyCode::Char(' ') if self.focused().is_checkbox() => self.toggle(),
            KeyCode::Char(c) => self.type_char(c),
            KeyCode::Backspace => self.erase(),
            _ => {}
        }
        DialogOutcome::Pending
    }

    fn cycle(&mut self, forward: bool) {
        fn step<T: Copy + PartialEq>(items: &[T], current: T, forward: bool) -> T {
            let i = items.iter().position(|v| *v == current).unwrap_or(0);
            let n = items.len();
            items[if forward { (i + 1) % n } else { (i + n - 1) % n }]
        }
        fn step_index(i: usize, n: usize, forward: bool) -> usize {
            if forward {
                (i + 1) % n
            } else {
                (i + n - 1) % n
            }
        }

        match self.focused() {
            Field::Port => {
                self.port_index = step_index(self.port_index, self.ports.len() + 1, forward);
                if self.port_is_custom() {
                    self.custom_port.clear();
                }
            }
            Field::Baud => {
                self.baud_index =
                    step_index(self.baud_index, STANDARD_BAUD_RATES.len() + 1, forward);
                if self.baud_is_custom() {
                    self.custom_baud.clear();
                }
            }
            Field::DataBits => self.data_bits = step(&DataBits::ALL, self.data_bits, forward),
            Field::Parity => self.parity = step(&Parity::available(), self.parity, forward),
            Field::StopBits => {
                self.stop_bits = step(&StopBits::available(), self.stop_bits, forward)
            }
            Field::FlowControl => {
                self.flow_control = step(&FlowControl::ALL, self.flow_control, forward)
            }
            Field::Encoding => self.encoding = step(&TextEncoding::ALL, self.encoding, forward),
            _ => self.toggle(),
        }
        self.error = None;
    }

    fn toggle(&mut self) {
        match self.focused() {
            Field::LocalEcho => self.local_echo = !self.local_echo,
            Field::Dtr => self.dtr = !self.dtr,
            Field::Rts => self.rts = !self.rts,
            Field::SaveOnExit => self.save_on_exit = !self.save_on_exit,
            _ => {}
        }
    }

    fn type_char(&mut self, c: char) {
        match self.focused() {
            Field::Port if self.port_is_custom() && !c.is_control() => self.custom_port.push(c),
            Field::Baud if self.baud_is_custom() && c.is_ascii_digit() => {
                let mut candidate = self.custom_baud.clone();
                candidate.push(c);
                // Digits beyond the maximum are refused as typed
                if candidate.parse::<u32>().map_or(false, |b| b <= MAX_BAUD_RATE) {
                    self.custom_baud = candidate;
                }
            }
            _ => return,
        }
        self.error = None;
    }

    fn erase(&mut self) {
        match self.focused() {
            Field::Port if self.port_is_custom() => {
                self.custom_port.pop();
            }
            Field::Baud if self.baud_is_custom() => {
                self.custom_baud.pop();
            }
            _ => {}
        }
    }

    /// Configuration described by the form, or why it cannot be applied.
    pub fn config(&self) -> Result<ChannelConfig, String> {
        let port = match self.ports.get(self.port_index) {
            Some(info) => info.port_name.clone(),
            None => self.custom_port.trim().to_string(),
        };

        let baud_rate = match STANDARD_BAUD_RATES.get(self.baud_index) {
            Some(b) => *b,
            None => self
                .custom_baud
                .parse::<u32>()
                .map_err(|_| "Enter a custom baud rate".to_string())?,
        };
        validate_baud_rate(baud_rate)?;

        Ok(ChannelConfig {
            port,
            baud_rate,
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            flow_control: self.flow_control,
            encoding: self.encoding,
            local_echo: self.local_echo,
            dtr: self.dtr,
            rts: self.rts,
            save_on_exit: self.save_on_exit,
        })
    }

    /// Display value for a field.
    pub fn value(&self, field: Field) -> String {
        let check = |on: bool| if on { "[x]" } else { "[ ]" }.to_string();
        match field {
            Field::Port => match self.ports.get(self.port_index) {
                Some(info) => info.port_name.clone(),
                None => format!("{}: {}", CUSTOM, self.custom_port),
            },
            Field::Baud => match STANDARD_BAUD_RATES.get(self.baud_index) {
                Some(b) => b.to_string(),
                None => format!("{}: {}", CUSTOM, self.custom_baud),
            },
            Field::DataBits => self.data_bits.label().to_string(),
            Field::Parity => self.parity.label().to_string(),
            Field::StopBits => self.stop_bits.label().to_string(),
            Field::FlowControl => self.flow_control.label().to_string(),
            Field::Encoding => self.encoding.label().to_string(),
            Field::LocalEcho => check(self.local_echo),
            Field::Dtr => check(self.dtr),
            Field::Rts => check(self.rts),
            Field::SaveOnExit => check(self.save_on_exit),
        }
    }

    /// Detail lines for the selected port; all `N/A` for a custom path.
    pub fn port_info_lines(&self) -> Vec<String> {
        match self.ports.get(self.port_index) {
            Some(info) => info.info_lines(),
            None => SerialPortInfo {
                port_name: self.custom_port.clone(),
                port_type: CUSTOM.to_string(),
                manufacturer: None,
                product: None,
                serial_number: None,
                vid: None,
                pid: None,
            }
            .info_lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn port(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: "USB".to_string(),
            manufacturer: Some("FTDI".to_string()),
            product: None,
            serial_number: None,
            vid: Some(0x0403),
            pid: Some(0x6001),
        }
    }

    fn focus(dialog: &mut SettingsDialog, field: Field) {
        while dialog.focused() != field {
            dialog.handle_key(&key(KeyCode::Down));
        }
    }

    #[test]
    fn test_apply_unchanged_returns_current() {
        let current = ChannelConfig {
            port: "/dev/ttyUSB1".to_string(),
            baud_rate: 9600,
            ..ChannelConfig::default()
        };
        let mut dialog = SettingsDialog::new(&current, vec![port("/dev/ttyUSB0"), port("/dev/ttyUSB1")]);
        assert_eq!(
            dialog.handle_key(&key(KeyCode::Enter)),
            DialogOutcome::Applied(current)
        );
    }

    #[test]
    fn test_unknown_port_becomes_custom() {
        let current = ChannelConfig {
            port: "/dev/ttyS9".to_string(),
            ..ChannelConfig::default()
        };
        let dialog = SettingsDialog::new(&current, vec![port("/dev/ttyUSB0")]);
        assert_eq!(dialog.value(Field::Port), "Custom: /dev/ttyS9");
        assert_eq!(dialog.config().unwrap().port, "/dev/ttyS9");
        assert_eq!(dialog.port_info_lines()[0], "Description: N/A");
    }

    #[test]
    fn test_custom_baud_rate_entry() {
        let mut dialog = SettingsDialog::new(&ChannelConfig::default(), Vec::new());
        focus(&mut dialog, Field::Baud);
        // 115200 is last in the list, so one step right reaches Custom
        dialog.handle_key(&key(KeyCode::Right));
        assert_eq!(dialog.value(Field::Baud), "Custom: ");

        for c in "250000".chars() {
            dialog.handle_key(&key(KeyCode::Char(c)));
        }
        dialog.handle_key(&key(KeyCode::Char('x')));
        assert_eq!(dialog.config().unwrap().baud_rate, 250000);
    }

    #[test]
    fn test_custom_baud_rate_capped() {
        let mut dialog = SettingsDialog::new(&ChannelConfig::default(), Vec::new());
        focus(&mut dialog, Field::Baud);
        dialog.handle_key(&key(KeyCode::Right));
        for c in "40000009".chars() {
            dialog.handle_key(&key(KeyCode::Char(c)));
        }
        assert_eq!(dialog.value(Field::Baud), "Custom: 4000000");
    }

    #[test]
    fn test_empty_custom_baud_blocks_apply() {
        let mut dialog = SettingsDialog::new(&ChannelConfig::default(), Vec::new());
        focus(&mut dialog, Field::Baud);
        dialog.handle_key(&key(KeyCode::Right));

        assert_eq!(dialog.handle_key(&key(KeyCode::Enter)), DialogOutcome::Pending);
        assert!(dialog.error().is_some());

        dialog.handle_key(&key(KeyCode::Char('0')));
        assert_eq!(dialog.handle_key(&key(KeyCode::Enter)), DialogOutcome::Pending);
    }

    #[test]
    fn test_selectors_and_checkboxes() {
        let mut dialog = SettingsDialog::new(&ChannelConfig::default(), vec![port("COM1")]);
        focus(&mut dialog, Field::Parity);
        dialog.handle_key(&key(KeyCode::Right));
        focus(&mut dialog, Field::Encoding);
        dialog.handle_key(&key(KeyCode::Left));
        focus(&mut dialog, Field::SaveOnExit);
        dialog.handle_key(&key(KeyCode::Char(' ')));

        let config = dialog.config().unwrap();
        assert_eq!(config.port, "COM1");
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert!(config.save_on_exit);
    }

    #[test]
    fn test_parity_cycle_offers_only_supported_settings() {
        let mut dialog = SettingsDialog::new(&ChannelConfig::default(), vec![port("COM1")]);
        focus(&mut dialog, Field::Parity);

        let offered = Parity::available();
        for expected in offered.iter().cycle().skip(1).take(offered.len()) {
            dialog.handle_key(&key(KeyCode::Right));
            assert_eq!(dialog.config().unwrap().parity, *expected);
        }
        assert_eq!(dialog.config().unwrap().parity, Parity::None);
    }

    #[test]
    fn test_escape_cancels() {
        let mut dialog = SettingsDialog::new(&ChannelConfig::default(), Vec::new());
        assert_eq!(dialog.handle_key(&key(KeyCode::Esc)), DialogOutcome::Cancelled);
    }

    #[test]
    fn test_port_info_follows_selection() {
        let dialog = SettingsDialog::new(&ChannelConfig::default(), vec![port("/dev/ttyUSB0")]);
        let lines = dialog.port_info_lines();
        assert_eq!(lines[1], "Manufacturer: FTDI");
        assert_eq!(lines[4], "Vendor Identifier: 403");
    }
}
