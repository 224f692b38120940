// src/ui/dialogs.rs
//
// Blocking modals: error, warning, about, and the file path prompt used by
// "Send file" and "Save as".

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

pub const ABOUT_TITLE: &str = "About Simple Terminal";

pub const ABOUT_TEXT: &str = "Simple Terminal is a console for serial interface devices.\n\
\n\
Typed keys go straight to the port. Incoming text waits while you type\n\
and appears once the line settles.";

/// What a path prompt is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathPurpose {
    SendFile,
    SaveAs,
}

impl PathPurpose {
    pub fn title(&self) -> &'static str {
        match self {
            Self::SendFile => "Open file",
            Self::SaveAs => "Save as...",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modal {
    Error { title: String, message: String },
    Warning { title: String, message: String },
    About,
    PathPrompt { purpose: PathPurpose, input: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalOutcome {
    Pending,
    Dismissed,
    /// Path prompt confirmed with a non-empty path
    Path(PathPurpose, String),
}

impl Modal {
    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self::Error {
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(title: &str, message: impl Into<String>) -> Self {
        Self::Warning {
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn path_prompt(purpose: PathPurpose) -> Self {
        Self::PathPrompt {
            purpose,
            input: String::new(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Error { title, .. } | Self::Warning { title, .. } => title,
            Self::About => ABOUT_TITLE,
            Self::PathPrompt { purpose, .. } => purpose.title(),
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> ModalOutcome {
        if key.kind == KeyEventKind::Release {
            return ModalOutcome::Pending;
        }

        match self {
            Self::PathPrompt { purpose, input } => match key.code {
                KeyCode::Esc => ModalOutcome::Dismissed,
                KeyCode::Enter => {
                    let path = input.trim();
                    // An empty path is the same as cancelling the file dialog
                    if path.is_empty() {
                        ModalOutcome::Dismissed
                    } else {
                        ModalOutcome::Path(*purpose, path.to_string())
                    }
                }
                KeyCode::Backspace => {
                    input.pop();
                    ModalOutcome::Pending
                }
                KeyCode::Char(c) if !c.is_control() => {
                    input.push(c);
                    ModalOutcome::Pending
                }
                _ => ModalOutcome::Pending,
            },
            _ => match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => ModalOutcome::Dismissed,
                _ => ModalOutcome::Pending,
            },
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

    #[test]
    fn test_path_prompt_collects_input() {
        let mut modal = Modal::path_prompt(PathPurpose::SaveAs);
        for c in "out.log".chars() {
            assert_eq!(modal.handle_key(&key(KeyCode::Char(c))), ModalOutcome::Pending);
        }
        modal.handle_key(&key(KeyCode::Char('x')));
        modal.handle_key(&key(KeyCode::Backspace));
        assert_eq!(
            modal.handle_key(&key(KeyCode::Enter)),
            ModalOutcome::Path(PathPurpose::SaveAs, "out.log".to_string())
        );
    }

    #[test]
    fn test_empty_path_dismisses() {
        let mut modal = Modal::path_prompt(PathPurpose::SendFile);
        modal.handle_key(&key(KeyCode::Char(' ')));
        assert_eq!(modal.handle_key(&key(KeyCode::Enter)), ModalOutcome::Dismissed);
    }

    #[test]
    fn test_message_modal_dismissed_by_enter() {
        let mut modal = Modal::error("Error", "Permission denied");
        assert_eq!(modal.title(), "Error");
        assert_eq!(modal.handle_key(&key(KeyCode::Char('q'))), ModalOutcome::Pending);
        assert_eq!(modal.handle_key(&key(KeyCode::Enter)), ModalOutcome::Dismissed);
    }
}
