// src/ui/keymap.rs
//
// Terminal key events to menu actions or console key input.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::codec::TextCodec;
use crate::events::{EditKey, KeyInput};

/// Menu entries reachable from function keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    About,
    Configure,
    Connect,
    Disconnect,
    Clear,
    SendFile,
    SaveAs,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 8] = [
        Self::About,
        Self::Configure,
        Self::Connect,
        Self::Disconnect,
        Self::Clear,
        Self::SendFile,
        Self::SaveAs,
        Self::Quit,
    ];

    pub fn key_label(&self) -> &'static str {
        match self {
            Self::About => "F1",
            Self::Configure => "F2",
            Self::Connect => "F3",
            Self::Disconnect => "F4",
            Self::Clear => "F5",
            Self::SendFile => "F7",
            Self::SaveAs => "F8",
            Self::Quit => "F10",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::About => "About",
            Self::Configure => "Configure",
            Self::Connect => "Connect",
            Self::Disconnect => "Disconnect",
            Self::Clear => "Clear",
            Self::SendFile => "Send file",
            Self::SaveAs => "Save as",
            Self::Quit => "Quit",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Menu(MenuAction),
    Input(KeyInput),
    Ignore,
}

/// Map a terminal key event. Printable characters are encoded with `codec`
/// so the device sees the configured code page.
pub fn map_key(key: &KeyEvent, codec: &TextCodec) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }

    let menu = match key.code {
        KeyCode::F(1) => Some(MenuAction::About),
        KeyCode::F(2) => Some(MenuAction::Configure),
        KeyCode::F(3) => Some(MenuAction::Connect),
        KeyCode::F(4) => Some(MenuAction::Disconnect),
        KeyCode::F(5) => Some(MenuAction::Clear),
        KeyCode::F(7) => Some(MenuAction::SendFile),
        KeyCode::F(8) => Some(MenuAction::SaveAs),
        KeyCode::F(10) => Some(MenuAction::Quit),
        _ => None,
    };
    if let Some(action) = menu {
        return KeyAction::Menu(action);
    }

    if key.modifiers.contains(KeyModifiers::ALT) {
        return KeyAction::Ignore;
    }

    let input = match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            match control_byte(c) {
                Some(b) => KeyInput::new(vec![b], EditKey::None),
                None => return KeyAction::Ignore,
            }
        }
        KeyCode::Char(c) => KeyInput::new(codec.encode(c.encode_utf8(&mut [0u8; 4])), EditKey::Char(c)),
        KeyCode::Enter => KeyInput::new(b"\r".to_vec(), EditKey::Enter),
        KeyCode::Tab => KeyInput::new(b"\t".to_vec(), EditKey::Tab),
        KeyCode::Backspace => KeyInput::new(vec![0x08], EditKey::Backspace),
        KeyCode::Delete => KeyInput::new(vec![0x7f], EditKey::Delete),
        KeyCode::Esc => KeyInput::new(vec![0x1b], EditKey::None),
        KeyCode::Left => KeyInput::new(Vec::new(), EditKey::Left),
        KeyCode::Right => KeyInput::new(Vec::new(), EditKey::Right),
        KeyCode::Up => KeyInput::new(Vec::new(), EditKey::Up),
        KeyCode::Down => KeyInput::new(Vec::new(), EditKey::Down),
        KeyCode::Home => KeyInput::new(Vec::new(), EditKey::Home),
        KeyCode::End => KeyInput::new(Vec::new(), EditKey::End),
        KeyCode::PageUp => KeyInput::new(Vec::new(), EditKey::PageUp),
        KeyCode::PageDown => KeyInput::new(Vec::new(), EditKey::PageDown),
        _ => return KeyAction::Ignore,
    };
    KeyAction::Input(input)
}

/// Ctrl+A..Ctrl+Z -> 0x01..0x1A, plus the punctuation controls.
fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' => Some(c as u8 - b'a' + 1),
        'A'..='Z' => Some(c as u8 - b'A' + 1),
        '@' | ' ' => Some(0x00),
        '[' => Some(0x1b),
        '\\' => Some(0x1c),
        ']' => Some(0x1d),
        '^' => Some(0x1e),
        '_' => Some(0x1f),
        _ => None,
    }
}
