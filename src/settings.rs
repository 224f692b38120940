// src/settings.rs
//
// Channel configuration and its persistence.
// The last applied configuration is stored as TOML next to the executable
// (or in the user config dir when the executable path is unknown).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Baud rates offered by the settings dialog before "Custom".
pub const STANDARD_BAUD_RATES: [u32; 5] = [2400, 9600, 19200, 38400, 115200];

/// Upper bound accepted for a custom baud rate.
pub const MAX_BAUD_RATE: u32 = 4_000_000;

// ============================================================================
// Line Parameters
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
}

impl DataBits {
    pub const ALL: [DataBits; 4] = [Self::Five, Self::Six, Self::Seven, Self::Eight];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
        }
    }
}

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl Parity {
    pub const ALL: [Parity; 5] = [Self::None, Self::Even, Self::Odd, Self::Mark, Self::Space];

    /// Parity settings offered on this platform. Mark and Space need
    /// stick parity from the OS (Linux `CMSPAR`, Windows DCB).
    pub fn available() -> Vec<Parity> {
        if cfg!(any(target_os = "linux", target_os = "android", windows)) {
            Self::ALL.to_vec()
        } else {
            vec![Self::None, Self::Even, Self::Odd]
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Even => "Even",
            Self::Odd => "Odd",
            Self::Mark => "Mark",
            Self::Space => "Space",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "1.5")]
    OneAndHalf,
    #[serde(rename = "2")]
    Two,
}

impl StopBits {
    pub fn label(&self) -> &'static str {
        match self {
            Self::One => "1",
            Self::OneAndHalf => "1.5",
            Self::Two => "2",
        }
    }

    /// Stop bit settings offered on this platform. 1.5 is Windows-only.
    pub fn available() -> Vec<StopBits> {
        let mut list = vec![Self::One];
        if cfg!(target_os = "windows") {
            list.push(Self::OneAndHalf);
        }
        list.push(Self::Two);
        list
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Hardware,
    Software,
}

impl FlowControl {
    pub const ALL: [FlowControl; 3] = [Self::None, Self::Hardware, Self::Software];

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Hardware => "RTS/CTS",
            Self::Software => "XON/XOFF",
        }
    }
}

/// Text encoding used to decode received bytes and encode typed keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "windows-1251")]
    Windows1251,
    #[serde(rename = "ibm866")]
    Ibm866,
    #[serde(rename = "utf-8")]
    Utf8,
}

impl TextEncoding {
    pub const ALL: [TextEncoding; 3] = [Self::Windows1251, Self::Ibm866, Self::Utf8];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Windows1251 => "Windows 1251",
            Self::Ibm866 => "IBM 866",
            Self::Utf8 => "UTF-8",
        }
    }
}

// ============================================================================
// Channel Configuration
// ============================================================================

/// Everything needed to open a channel, plus the console flags that travel with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: DataBits,
    #[serde(default = "default_parity")]
    pub parity: Parity,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: StopBits,
    #[serde(default = "default_flow_control")]
    pub flow_control: FlowControl,
    #[serde(default = "default_encoding")]
    pub encoding: TextEncoding,
    #[serde(default = "default_true")]
    pub local_echo: bool,
    #[serde(default = "default_true")]
    pub dtr: bool,
    #[serde(default)]
    pub rts: bool,
    #[serde(default)]
    pub save_on_exit: bool,
}

fn default_baud_rate() -> u32 {
    115200
}
fn default_data_bits() -> DataBits {
    DataBits::Eight
}
fn default_parity() -> Parity {
    Parity::None
}
fn default_stop_bits() -> StopBits {
    StopBits::One
}
fn default_flow_control() -> FlowControl {
    FlowControl::None
}
fn default_encoding() -> TextEncoding {
    TextEncoding::Windows1251
}
fn default_true() -> bool {
    true
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            flow_control: default_flow_control(),
            encoding: default_encoding(),
            local_echo: true,
            dtr: true,
            rts: false,
            save_on_exit: false,
        }
    }
}

impl ChannelConfig {
    /// Check the invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), String> {
        validate_baud_rate(self.baud_rate)?;
        if self.port.trim().is_empty() {
            return Err("No serial port selected".to_string());
        }
        Ok(())
    }

    /// One-line description used in the status bar: `port : baud, data, parity, stop, flow`.
    pub fn summary(&self) -> String {
        format!(
            "{} : {}, {}, {}, {}, {}",
            self.port,
            self.baud_rate,
            self.data_bits.label(),
            self.parity.label(),
            self.stop_bits.label(),
            self.flow_control.label()
        )
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

pub fn validate_baud_rate(baud_rate: u32) -> Result<(), String> {
    if baud_rate == 0 || baud_rate > MAX_BAUD_RATE {
        return Err(format!(
            "Invalid baud rate {} (expected 1..={})",
            baud_rate, MAX_BAUD_RATE
        ));
    }
    Ok(())
}

// ============================================================================
// Persistence
// ============================================================================

/// Default settings file: `<exe dir>/<exe name>.toml`.
pub fn default_settings_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let (Some(dir), Some(name)) = (exe.parent(), exe.file_name()) {
            let mut file = name.to_os_string();
            file.push(".toml");
            return dir.join(file);
        }
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simterm")
        .join("simterm.toml")
}

/// Directory the application runs from. Session transcripts land here.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load the saved configuration. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<ChannelConfig, String> {
    if !path.exists() {
        return Ok(ChannelConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings: {}", e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
}

pub fn save_settings(path: &Path, config: &ChannelConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings dir: {}", e))?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}
