use thiserror::Error;

use super::note::NOTES_PER_OCTAVE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("unknown scale '{0}'")]
    Unknown(String),
    #[error("scale offsets must start at 0, be strictly increasing and stay below 12: {0:?}")]
    Invalid(Vec<i32>),
}

/// Ordered semitone offsets from a root note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    offsets: Vec<i32>,
}

impl Scale {
    pub fn new(offsets: Vec<i32>) -> Result<Self, ScaleError> {
        let starts_at_root = offsets.first() == Some(&0);
        let increasing = offsets.windows(2).all(|pair| pair[0] < pair[1]);
        let within_octave = offsets.iter().all(|&o| (0..NOTES_PER_OCTAVE).contains(&o));

        if !(starts_at_root && increasing && within_octave) {
            return Err(ScaleError::Invalid(offsets));
        }

        Ok(Self { offsets })
    }

    /// Look up one of the built-in scales by name
    /// Case-insensitive, `-` and `_` are interchangeable
    pub fn named(name: &str) -> Result<Self, ScaleError> {
        let key = name.trim().to_lowercase().replace('-', "_");
        let offsets: &[i32] = match key.as_str() {
            "pentatonic" | "pentatonic_minor" => &[0, 3, 5, 7, 10],
            "pentatonic_major" => &[0, 2, 4, 7, 9],
            "blues" => &[0, 3, 5, 6, 7, 10],
            "major" => &[0, 2, 4, 5, 7, 9, 11],
            "minor" => &[0, 2, 3, 5, 7, 8, 10],
            "chromatic" => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            _ => return Err(ScaleError::Unknown(name.to_string())),
        };
        Scale::new(offsets.to_vec())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Distance in semitones from the scale root for a scale-relative index.
    /// Indices past either end wrap into neighbouring octaves.
    pub fn scale_note(&self, index: i32) -> i32 {
        let len = self.offsets.len() as i32;
        let degree = index.rem_euclid(len);
        let octave = index.div_euclid(len);
        self.offsets[degree as usize] + octave * NOTES_PER_OCTAVE
    }
}

/// Names accepted by `Scale::named`
pub const SCALE_NAMES: [&str; 6] = [
    "pentatonic_minor",
    "pentatonic_major",
    "blues",
    "major",
    "minor",
    "chromatic",
];
