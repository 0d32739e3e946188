use std::time::Duration;

use thiserror::Error;

use crate::music::{Note, Scale, note_to_text};

/// Number of note buttons on the controller
pub const NUM_BUTTONS: usize = 5;

/// Axis strums must move further than this from centre
pub const STRUM_DEADZONE: f32 = 0.1;

/// Playing power lost each time a note is sent
pub const DEFAULT_HAMMER_DECAY: f32 = -0.05;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeroError {
    #[error("root note {root} is outside the playable range {lower}..={upper}")]
    RootOutOfRange {
        root: String,
        lower: String,
        upper: String,
    },
    #[error("invalid note range: lower {lower} is above upper {upper}")]
    InvalidNoteLimit { lower: String, upper: String },
    #[error("note range {lower}..={upper} is outside MIDI notes 0..=127")]
    NoteLimitOutOfRange { lower: Note, upper: Note },
}

/// Highest MIDI note number
pub const MIDI_NOTE_MAX: Note = 127;

/// Inclusive bound on playable MIDI notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteLimit {
    pub lower: Note,
    pub upper: Note,
}

impl NoteLimit {
    pub fn new(lower: Note, upper: Note) -> Result<Self, HeroError> {
        if lower < 0 || upper > MIDI_NOTE_MAX {
            return Err(HeroError::NoteLimitOutOfRange { lower, upper });
        }
        if lower > upper {
            return Err(HeroError::InvalidNoteLimit {
                lower: note_to_text(lower),
                upper: note_to_text(upper),
            });
        }
        Ok(Self { lower, upper })
    }

    pub fn contains(&self, note: Note) -> bool {
        (self.lower..=self.upper).contains(&note)
    }
}

impl Default for NoteLimit {
    /// The full MIDI range
    fn default() -> Self {
        Self {
            lower: 0,
            upper: MIDI_NOTE_MAX,
        }
    }
}

/// Everything a player's state machine needs besides its sinks
#[derive(Debug, Clone)]
pub struct HeroSettings {
    pub root_note: Note,
    pub scale: Scale,
    pub note_limit: NoteLimit,
    /// Sound new notes on fret changes without a fresh strum
    pub hammer_ons: bool,
    /// Added to playing power after each note (negative)
    pub hammer_decay: f32,
    /// Ignore strums that repeat the current note this soon after it started
    pub hammer_strum_block: Option<Duration>,
}

impl HeroSettings {
    pub fn new(root_note: Note, scale: Scale) -> Self {
        Self {
            root_note,
            scale,
            note_limit: NoteLimit::default(),
            hammer_ons: true,
            hammer_decay: DEFAULT_HAMMER_DECAY,
            hammer_strum_block: None,
        }
    }
}
