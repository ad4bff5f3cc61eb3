use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::warn;

/// Emitted for every keystroke the interpreter accepts, including
/// backspaces and mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Always a prefix of the target; wrong characters never land here
    pub typed: String,
    pub correct_characters: usize,
    pub total_typed_characters: usize,
    pub is_error: bool,
    pub timestamp: u64,
    /// The character the user missed, set only when `is_error`
    pub expected_char: Option<char>,
    pub is_error_recovery: bool,
}

impl Progress {
    pub fn typed_len(&self) -> usize {
        self.correct_characters
    }
}

/// What a raw key event means to the linear prefix model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Ignore,
    Backspace,
    Type(char),
}

const SUPPRESSED_SHORTCUTS: [char; 6] = ['z', 'y', 'a', 'x', 'c', 'v'];

pub fn classify(key: &KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }

    match key.code {
        KeyCode::Left
        | KeyCode::Right
        | KeyCode::Up
        | KeyCode::Down
        | KeyCode::Home
        | KeyCode::End
        | KeyCode::PageUp
        | KeyCode::PageDown
        | KeyCode::Tab
        | KeyCode::BackTab => KeyAction::Ignore,
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Enter => KeyAction::Type('\n'),
        KeyCode::Char(c) => {
            let mods = key.modifiers;
            // AltGr arrives as CONTROL | ALT and produces real characters
            let altgr = mods.contains(KeyModifiers::CONTROL | KeyModifiers::ALT);
            let shortcut = !altgr
                && (mods.contains(KeyModifiers::CONTROL) || mods.contains(KeyModifiers::SUPER));

            if shortcut {
                let lower = c.to_ascii_lowercase();
                if lower == 'v' {
                    warn!(target: "anti_cheat", "paste shortcut suppressed");
                } else if SUPPRESSED_SHORTCUTS.contains(&lower) {
                    warn!(target: "anti_cheat", shortcut = %lower, "editing shortcut suppressed");
                }
                return KeyAction::Ignore;
            }
            // Intentionally stricter than a browser keydown: Ctrl/Super/Alt +
            // any letter is a chord and is dropped, never typed as the bare
            // letter. Only the z/y/a/x/c/v set above is logged.
            if !altgr && mods.contains(KeyModifiers::ALT) {
                return KeyAction::Ignore;
            }
            KeyAction::Type(c)
        }
        _ => KeyAction::Ignore,
    }
}

/// Forced-correction state machine over a fixed target.
#[derive(Debug, Clone)]
pub struct Interpreter {
    target: Vec<char>,
    typed: String,
    typed_len: usize,
    total_typed: usize,
    wrong_char: Option<char>,
}

impl Interpreter {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            typed: String::new(),
            typed_len: 0,
            total_typed: 0,
            wrong_char: None,
        }
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn typed_len(&self) -> usize {
        self.typed_len
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    pub fn total_typed(&self) -> usize {
        self.total_typed
    }

    pub fn in_error(&self) -> bool {
        self.wrong_char.is_some()
    }

    /// The rejected character while in error state.
    pub fn wrong_char(&self) -> Option<char> {
        self.wrong_char
    }

    pub fn expected_char(&self) -> Option<char> {
        self.target.get(self.typed_len).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.typed_len == self.target.len()
    }

    pub fn handle_key(&mut self, key: &KeyEvent, timestamp: u64) -> Option<Progress> {
        self.apply(classify(key), timestamp)
    }

    /// Pasted text never reaches the prefix.
    pub fn handle_paste(&self, text: &str) {
        warn!(target: "anti_cheat", chars = text.chars().count(), "paste suppressed");
    }

    pub fn apply(&mut self, action: KeyAction, timestamp: u64) -> Option<Progress> {
        if self.in_error() {
            if action != KeyAction::Backspace {
                return None;
            }
            self.wrong_char = None;
            return Some(Progress {
                is_error_recovery: true,
                ..self.progress(false, timestamp, None)
            });
        }

        match action {
            KeyAction::Ignore => None,
            KeyAction::Backspace => {
                self.typed.pop()?;
                self.typed_len -= 1;
                Some(self.progress(false, timestamp, None))
            }
            KeyAction::Type(c) => {
                let expected = self.expected_char()?;
                self.total_typed += 1;

                if c == expected {
                    self.typed.push(c);
                    self.typed_len += 1;
                    Some(self.progress(false, timestamp, None))
                } else {
                    self.wrong_char = Some(c);
                    Some(self.progress(true, timestamp, Some(expected)))
                }
            }
        }
    }

    fn progress(&self, is_error: bool, timestamp: u64, expected_char: Option<char>) -> Progress {
        Progress {
            typed: self.typed.clone(),
            correct_characters: self.typed_len,
            total_typed_characters: self.total_typed,
            is_error,
            timestamp,
            expected_char,
            is_error_recovery: false,
        }
    }
}
