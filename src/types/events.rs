use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};

/// Identifies one player's input in display events and control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputId(pub u32);

impl std::fmt::Display for InputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw platform input, already translated out of crossterm/gilrs event types
/// Must be cheap to copy: every player's profile sees every event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Keyboard key pressed or released
    Key { key: KeyCode, pressed: bool },
    /// Gamepad button pressed or released on pad `pad`
    Button {
        pad: usize,
        button: gilrs::Button,
        pressed: bool,
    },
    /// Gamepad axis moved on pad `pad`, value in -1.0..=1.0
    Axis {
        pad: usize,
        axis: gilrs::Axis,
        value: f32,
    },
}

/// Control actions understood by the note state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Note button `index` pressed
    NoteDown { index: usize },
    /// Note button `index` released
    NoteUp { index: usize },
    /// Strum. `None` for a discrete button, `Some` for an axis or a directional button
    Strum { value: Option<f32> },
    TransposeIncrement,
    TransposeDecrement,
    /// Raw controller pitch axis, -1.0..=1.0
    PitchBend { value: f32 },
}
