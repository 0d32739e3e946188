use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use tracing::{debug, warn};

use crate::types::InputEvent;

/// Result of translating one terminal key event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyInput {
    Input(InputEvent),
    Quit,
    Ignore,
}

/// Translate a crossterm key event. Esc and Ctrl+C quit; auto-repeat is dropped
pub fn translate_key(key: KeyEvent) -> KeyInput {
    let pressed = match key.kind {
        KeyEventKind::Press => true,
        KeyEventKind::Release => false,
        KeyEventKind::Repeat => return KeyInput::Ignore,
    };

    if pressed {
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c'));
        if ctrl_c || key.code == KeyCode::Esc {
            return KeyInput::Quit;
        }
    }

    KeyInput::Input(InputEvent::Key {
        key: key.code,
        pressed,
    })
}

/// Terminal keyboard in raw mode. Restores the terminal when dropped
pub struct KeyboardInput {
    enhanced: bool,
}

impl KeyboardInput {
    pub fn open() -> Result<Self> {
        enable_raw_mode()?;

        // Key releases are only reported with the enhanced keyboard protocol
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            warn!("terminal does not report key releases; keyboard note buttons will stay held");
        }

        Ok(Self { enhanced })
    }

    /// Read every pending key event without blocking.
    /// Returns true when quit was requested.
    pub fn drain(&mut self, out: &mut Vec<InputEvent>) -> Result<bool> {
        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            match translate_key(key) {
                KeyInput::Input(input) => {
                    debug!("key {:?}", input);
                    out.push(input);
                }
                KeyInput::Quit => return Ok(true),
                KeyInput::Ignore => {}
            }
        }
        Ok(false)
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_press_and_release() {
        let press = key(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Press);
        let release = key(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(
            translate_key(press),
            KeyInput::Input(InputEvent::Key {
                key: KeyCode::Char('q'),
                pressed: true
            })
        );
        assert_eq!(
            translate_key(release),
            KeyInput::Input(InputEvent::Key {
                key: KeyCode::Char('q'),
                pressed: false
            })
        );
    }

    #[test]
    fn test_repeat_ignored() {
        let repeat = key(KeyCode::Char('w'), KeyModifiers::NONE, KeyEventKind::Repeat);
        assert_eq!(translate_key(repeat), KeyInput::Ignore);
    }

    #[test]
    fn test_quit_keys() {
        let esc = key(KeyCode::Esc, KeyModifiers::NONE, KeyEventKind::Press);
        let ctrl_c = key(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert_eq!(translate_key(esc), KeyInput::Quit);
        assert_eq!(translate_key(ctrl_c), KeyInput::Quit);

        let plain_c = key(KeyCode::Char('c'), KeyModifiers::NONE, KeyEventKind::Press);
        assert!(matches!(translate_key(plain_c), KeyInput::Input(_)));
    }
}
