/// Centre of the 14-bit pitch bend range (no bend)
pub const PITCH_BEND_CENTER: i32 = 0x2000;

/// Largest deflection from centre representable in either direction
const PITCH_BEND_SPAN: f32 = 0x1FFF as f32;

/// Outbound MIDI messages we produce
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiMessage {
    /// Note On. Velocity 0 is treated as Note Off by receivers
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Pitch bend, -1.0 (full down) to 1.0 (full up)
    PitchBend { channel: u8, value: f32 },
}

impl MidiMessage {
    /// Build a note message from a normalised velocity (0.0-1.0)
    /// Returns None for notes outside the MIDI range
    pub fn note(channel: u8, note: i32, velocity: f32) -> Option<Self> {
        let note = u8::try_from(note).ok().filter(|n| *n <= 127)?;
        Some(MidiMessage::NoteOn {
            channel,
            note,
            velocity: normalised_to_velocity(velocity),
        })
    }

    /// Encode to raw bytes: [status, data1, data2]
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                [0x90 + (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let (status, lsb, msb) = midi_pitch_bend(value, channel);
                [status, lsb, msb]
            }
        }
    }
}

/// Convert normalised velocity (0.0-1.0) to MIDI velocity (0-127)
pub fn normalised_to_velocity(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Encode a pitch bend of -1.0..=1.0 as a MIDI pitch bend message.
/// The 14-bit value is centred on 0x2000 and split into 7-bit LSB/MSB.
pub fn midi_pitch_bend(value: f32, channel: u8) -> (u8, u8, u8) {
    let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
    let encoded = (PITCH_BEND_CENTER + (value * PITCH_BEND_SPAN).round() as i32).clamp(0, 0x3FFF);
    (
        0xE0 + (channel & 0x0F),
        (encoded & 0x7F) as u8,
        ((encoded >> 7) & 0x7F) as u8,
    )
}
