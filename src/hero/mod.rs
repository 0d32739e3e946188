pub mod settings;

use std::ops::RangeInclusive;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::display::{DisplayEvent, DisplaySink};
use crate::midi::MidiSink;
use crate::music::{Note, Scale, note_to_text};
use crate::types::{ControlAction, InputId};

pub use settings::{
    DEFAULT_HAMMER_DECAY, HeroError, HeroSettings, NUM_BUTTONS, NoteLimit, STRUM_DEADZONE,
};

/// Playing power below one MIDI velocity step is treated as silence.
/// Anything smaller would go out as a velocity 0 note on
const POWER_FLOOR: f32 = 1.0 / 127.0;

/// One player's controller state.
///
/// Control actions update buttons, transposition and pitch immediately;
/// `process_state` runs once per tick and decides which notes to send.
/// The button with the highest index decides the note (no chords).
pub struct HeroInput {
    id: InputId,
    settings: HeroSettings,
    midi: Box<dyn MidiSink>,
    display: Box<dyn DisplaySink>,

    root_note: Note,
    scale_index_offset: i32,
    scale_index_offset_limit: RangeInclusive<i32>,
    button_states: [bool; NUM_BUTTONS],
    playing_power: f32,
    previous_note: Option<Note>,
    previous_note_timestamp: Option<Instant>,
    pitch_bend: f32,
    previous_pitch_bend: f32,
    mute: bool,
}

impl HeroInput {
    pub fn new(
        id: InputId,
        settings: HeroSettings,
        midi: Box<dyn MidiSink>,
        display: Box<dyn DisplaySink>,
    ) -> Result<Self, HeroError> {
        let limit = settings.note_limit;
        if !limit.contains(settings.root_note) {
            return Err(HeroError::RootOutOfRange {
                root: note_to_text(settings.root_note),
                lower: note_to_text(limit.lower),
                upper: note_to_text(limit.upper),
            });
        }

        // Struct literals can bypass NoteLimit::new, so check the MIDI bounds again
        NoteLimit::new(limit.lower, limit.upper)?;

        let root_note = settings.root_note;
        let scale_index_offset_limit = offset_limit(root_note, &settings.scale, &limit);

        info!(
            input = %id,
            "root note {}, transpose range {:?}",
            note_to_text(root_note),
            scale_index_offset_limit
        );

        Ok(Self {
            id,
            settings,
            midi,
            display,
            root_note,
            scale_index_offset: 0,
            scale_index_offset_limit,
            button_states: [false; NUM_BUTTONS],
            playing_power: 0.0,
            previous_note: None,
            previous_note_timestamp: None,
            pitch_bend: 0.0,
            previous_pitch_bend: 0.0,
            mute: false,
        })
    }

    pub fn id(&self) -> InputId {
        self.id
    }

    pub fn root_note(&self) -> Note {
        self.root_note
    }

    pub fn scale_index_offset(&self) -> i32 {
        self.scale_index_offset
    }

    pub fn scale_index_offset_limit(&self) -> RangeInclusive<i32> {
        self.scale_index_offset_limit.clone()
    }

    pub fn playing_power(&self) -> f32 {
        self.playing_power
    }

    /// The note currently considered sounding
    pub fn previous_note(&self) -> Option<Note> {
        self.previous_note
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    /// Highest pressed button, if any
    fn button_greatest(&self) -> Option<usize> {
        self.button_states.iter().rposition(|&pressed| pressed)
    }

    fn button_all(&self) -> bool {
        self.button_states.iter().all(|&pressed| pressed)
    }

    fn note_for_button(&self, button: usize) -> Note {
        self.root_note + self.settings.scale.scale_note(button as i32 + self.scale_index_offset)
    }

    // Input Logic ----------------------------------------------------------

    /// Apply one control action. Never sends MIDI
    pub fn update_state(&mut self, action: ControlAction) {
        match action {
            ControlAction::NoteDown { index } => self.set_button(index, true),
            ControlAction::NoteUp { index } => self.set_button(index, false),
            ControlAction::Strum { value } => self.strum(value),
            ControlAction::TransposeIncrement => self.transpose(1),
            ControlAction::TransposeDecrement => self.transpose(-1),
            ControlAction::PitchBend { value } if value.is_nan() => {}
            ControlAction::PitchBend { value } => {
                // Pushing the whammy down reads positive but should bend down
                self.pitch_bend = (-value).clamp(-1.0, 1.0);
            }
        }
    }

    fn set_button(&mut self, index: usize, pressed: bool) {
        let Some(state) = self.button_states.get_mut(index) else {
            warn!(input = %self.id, "ignoring note button {} (only {} buttons)", index, NUM_BUTTONS);
            return;
        };
        *state = pressed;

        let event = if pressed {
            DisplayEvent::ButtonDown { button: index }
        } else {
            DisplayEvent::ButtonUp { button: index }
        };
        self.display.event(self.id, event);
    }

    fn strum(&mut self, value: Option<f32>) {
        if let Some(v) = value {
            if v.abs() <= STRUM_DEADZONE {
                return;
            }
        }

        self.playing_power = 1.0;

        let direction = match value {
            Some(v) if v < 0.0 => -1,
            _ => 1,
        };
        self.display.event(self.id, DisplayEvent::Strum { value: direction });
    }

    /// Holding every note button moves the root by a semitone, otherwise the
    /// buttons shift along the scale
    fn transpose(&mut self, step: i32) {
        if self.button_all() {
            self.transpose_root(step);
        } else {
            self.transpose_scale(step);
        }
    }

    fn transpose_root(&mut self, step: i32) {
        let root = self.root_note + step;
        if !self.settings.note_limit.contains(root) {
            info!(input = %self.id, "root note {} is out of range, ignoring", note_to_text(root));
            return;
        }

        let limit = offset_limit(root, &self.settings.scale, &self.settings.note_limit);
        if limit.is_empty() {
            info!(
                input = %self.id,
                "root note {} leaves no room for every button, ignoring",
                note_to_text(root)
            );
            return;
        }

        self.root_note = root;
        self.scale_index_offset = self.scale_index_offset.clamp(*limit.start(), *limit.end());
        self.scale_index_offset_limit = limit;

        info!(input = %self.id, "root note: {}", note_to_text(root));
        self.emit_transpose();
    }

    fn transpose_scale(&mut self, step: i32) {
        let offset = self.scale_index_offset + step;
        if !self.scale_index_offset_limit.contains(&offset) {
            info!(
                input = %self.id,
                "scale transpose {} is outside {:?}, ignoring",
                offset,
                self.scale_index_offset_limit
            );
            return;
        }

        self.scale_index_offset = offset;
        info!(input = %self.id, "scale transpose: {}", offset);
        self.emit_transpose();
    }

    fn emit_transpose(&mut self) {
        let notes = (0..NUM_BUTTONS)
            .map(|button| note_to_text(self.note_for_button(button)))
            .collect();
        self.display.event(self.id, DisplayEvent::Transpose { notes });
    }

    // Tick -----------------------------------------------------------------

    pub fn process_state(&mut self) {
        self.process_state_at(Instant::now());
    }

    /// Decide what to send for the current state. `now` timestamps new notes
    pub fn process_state_at(&mut self, now: Instant) {
        match self.button_greatest() {
            None => {
                self.playing_power = 0.0;
                self.send_note(None, now);
            }
            Some(greatest) if self.playing_power > 0.0 => {
                let current_note = self.note_for_button(greatest);
                let fresh_strum = self.playing_power >= 1.0;

                if fresh_strum && self.is_hammer_blocked(current_note, now) {
                    debug!(input = %self.id, "strum blocked, {} already sounding", note_to_text(current_note));
                    self.decay();
                } else if Some(current_note) != self.previous_note || fresh_strum {
                    self.send_note(Some((current_note, greatest)), now);
                    self.decay();
                }
            }
            Some(_) => {}
        }

        if self.pitch_bend != self.previous_pitch_bend {
            self.previous_pitch_bend = self.pitch_bend;
            self.send_pitch_bend(self.pitch_bend);
        }
    }

    /// A strum repeating the note a hammer-on just started is redundant
    fn is_hammer_blocked(&self, note: Note, now: Instant) -> bool {
        let Some(block) = self.settings.hammer_strum_block else {
            return false;
        };
        self.previous_note == Some(note)
            && self
                .previous_note_timestamp
                .is_some_and(|started| now.saturating_duration_since(started) < block)
    }

    fn decay(&mut self) {
        self.playing_power += self.settings.hammer_decay;
        if self.playing_power < POWER_FLOOR {
            self.playing_power = 0.0;
        }
    }

    /// Release the sounding note and start `next` (note, button) if any
    fn send_note(&mut self, next: Option<(Note, usize)>, now: Instant) {
        if let Some(previous) = self.previous_note.take() {
            if !self.mute {
                self.midi.note(Some(previous), 0.0);
                self.display.event(self.id, DisplayEvent::NoteOff { value: previous });
            }
        }

        let Some((note, button)) = next else {
            return;
        };

        // Decayed power is a hammer-on/pull-off
        if self.playing_power < 1.0 && !self.settings.hammer_ons {
            return;
        }

        self.previous_note = Some(note);
        self.previous_note_timestamp = Some(now);

        if !self.mute {
            self.midi.note(Some(note), self.playing_power.min(1.0));
            self.display.event(self.id, DisplayEvent::NoteOn { value: note, button });
        }
    }

    fn send_pitch_bend(&mut self, pitch: f32) {
        if self.mute {
            return;
        }
        self.midi.pitch(pitch);
        self.display.event(self.id, DisplayEvent::Pitch { pitch });
    }

    // Mute -----------------------------------------------------------------

    /// Set mute, or toggle it with `None`. Muting silences immediately
    pub fn set_mute_state(&mut self, mute: Option<bool>) {
        let mute = mute.unwrap_or(!self.mute);
        if mute == self.mute {
            return;
        }

        if mute {
            if let Some(note) = self.previous_note {
                self.midi.note(Some(note), 0.0);
                self.display.event(self.id, DisplayEvent::NoteOff { value: note });
            }
            self.midi.pitch(0.0);
        }

        self.mute = mute;
        info!(input = %self.id, "mute: {}", mute);
    }

    /// Release any sounding note. Safe to call more than once
    pub fn shutdown(&mut self) {
        if let Some(note) = self.previous_note.take() {
            if !self.mute {
                self.midi.note(Some(note), 0.0);
            }
        }
    }
}

impl Drop for HeroInput {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Scale offsets that keep every button inside `limit`.
///
/// Searches upward until the top button's note passes `limit.upper` and downward
/// until button 0's note drops below `limit.lower`. Assumes the root is inside
/// the limit, which `NoteLimit` keeps inside the MIDI range so both searches
/// terminate. The result may be empty when the buttons span more than the limit.
fn offset_limit(root: Note, scale: &Scale, limit: &NoteLimit) -> RangeInclusive<i32> {
    let top = NUM_BUTTONS as i32 - 1;
    let note_at = |index: i32| root + scale.scale_note(index);

    let mut max = 0;
    while note_at(top + max) <= limit.upper {
        max += 1;
    }

    let mut min = 0;
    while note_at(min) >= limit.lower {
        min -= 1;
    }

    (min + 1)..=(max - 1)
}
