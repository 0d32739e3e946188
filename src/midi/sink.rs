use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use tracing::{debug, warn};

use super::message::MidiMessage;
use crate::music::{Note, note_to_text};

/// Minimal MIDI output capability used by the note state machine
pub trait MidiSink {
    /// Send a note. `None` or note 0 is a no-op, velocity 0.0 means note off
    fn note(&mut self, note: Option<Note>, velocity: f32);

    /// Send a pitch bend, -1.0..=1.0
    fn pitch(&mut self, value: f32);
}

/// Sink used when no MIDI device is available
#[derive(Debug, Default)]
pub struct NullMidiSink;

impl MidiSink for NullMidiSink {
    fn note(&mut self, _note: Option<Note>, _velocity: f32) {}

    fn pitch(&mut self, _value: f32) {}
}

/// Anything that accepts raw MIDI bytes
pub trait MidiWrite {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

impl MidiWrite for midir::MidiOutputConnection {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.send(bytes)?;
        Ok(())
    }
}

/// Writes one player's messages on its own channel of a shared output
pub struct ChannelSink<W: MidiWrite> {
    output: Rc<RefCell<W>>,
    channel: u8,
}

impl<W: MidiWrite> ChannelSink<W> {
    /// `channel` is 0-indexed (0-15)
    pub fn new(output: Rc<RefCell<W>>, channel: u8) -> Self {
        Self { output, channel }
    }

    fn send(&mut self, message: MidiMessage) {
        if let Err(e) = self.output.borrow_mut().write(&message.to_bytes()) {
            warn!(channel = self.channel, "MIDI send failed: {:#}", e);
        }
    }
}

impl<W: MidiWrite> MidiSink for ChannelSink<W> {
    fn note(&mut self, note: Option<Note>, velocity: f32) {
        let Some(note) = note.filter(|n| *n != 0) else {
            return;
        };

        match MidiMessage::note(self.channel, note, velocity) {
            Some(message) => {
                debug!(
                    "note: ch{} - {} {} - {:.2}",
                    self.channel,
                    note,
                    note_to_text(note),
                    velocity
                );
                self.send(message);
            }
            None => warn!("note {} ({}) is outside the MIDI range", note, note_to_text(note)),
        }
    }

    fn pitch(&mut self, value: f32) {
        debug!("pitch: ch{} - {:.3}", self.channel, value);
        self.send(MidiMessage::PitchBend {
            channel: self.channel,
            value,
        });
    }
}
