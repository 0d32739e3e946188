use thiserror::Error;

/// Semitone index. `OCTAVE_ZERO_OFFSET` fixes where octave numbering starts.
pub type Note = i32;

pub const NOTES_PER_OCTAVE: i32 = 12;

/// Note number of "C0". With 24, middle C (60) reads as "C3".
pub const OCTAVE_ZERO_OFFSET: i32 = NOTES_PER_OCTAVE * 2;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to parse note '{input}'")]
pub struct NoteParseError {
    pub input: String,
}

impl NoteParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// Format a note as `<Letter><#?><Octave>`, e.g. 61 -> "C#3"
pub fn note_to_text(note: Note) -> String {
    let name = NOTE_NAMES[note.rem_euclid(NOTES_PER_OCTAVE) as usize];
    let octave = (note - OCTAVE_ZERO_OFFSET).div_euclid(NOTES_PER_OCTAVE);
    format!("{}{}", name, octave)
}

/// Parse a note from text.
///
/// Accepts either a plain integer ("61") or a note name with an optional sharp
/// and a signed one or two digit octave ("C#3", "a-1", "G10"). Letters are
/// case-insensitive.
pub fn parse_note(text: &str) -> Result<Note, NoteParseError> {
    let trimmed = text.trim();

    if let Ok(number) = trimmed.parse::<Note>() {
        return Ok(number);
    }

    let mut chars = trimmed.chars().peekable();

    let letter = chars
        .next()
        .map(|c| c.to_ascii_uppercase())
        .ok_or_else(|| NoteParseError::new(text))?;

    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(NoteParseError::new(text)),
    };

    let sharp = if chars.peek() == Some(&'#') {
        chars.next();
        1
    } else {
        0
    };

    let octave_str: String = chars.collect();
    let digits = octave_str.strip_prefix('-').unwrap_or(&octave_str);
    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(NoteParseError::new(text));
    }

    let octave: i32 = octave_str
        .parse()
        .map_err(|_| NoteParseError::new(text))?;

    Ok(base + sharp + octave * NOTES_PER_OCTAVE + OCTAVE_ZERO_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_text_reference_points() {
        assert_eq!(note_to_text(0), "C-2");
        assert_eq!(note_to_text(24), "C0");
        assert_eq!(note_to_text(60), "C3");
        assert_eq!(note_to_text(61), "C#3");
        assert_eq!(note_to_text(23), "B-1");
        assert_eq!(note_to_text(-1), "B-3");
    }

    #[test]
    fn test_parse_note_reference_points() {
        assert_eq!(parse_note("C-2").unwrap(), 0);
        assert_eq!(parse_note("C0").unwrap(), 24);
        assert_eq!(parse_note("C3").unwrap(), 60);
        assert_eq!(parse_note("C#3").unwrap(), 61);
        assert_eq!(parse_note("A3").unwrap(), 69);
        assert_eq!(parse_note("G10").unwrap(), 151);
    }

    #[test]
    fn test_parse_note_is_case_insensitive() {
        assert_eq!(parse_note("c#3").unwrap(), parse_note("C#3").unwrap());
        assert_eq!(parse_note(" a3 ").unwrap(), 69);
    }

    #[test]
    fn test_parse_note_accepts_numbers() {
        assert_eq!(parse_note("61").unwrap(), 61);
        assert_eq!(parse_note("-3").unwrap(), -3);
    }

    #[test]
    fn test_parse_note_rejects_garbage() {
        for bad in ["", "H3", "C", "C#", "Cb3", "C123", "C3x", "#3", "C--1"] {
            let err = parse_note(bad).unwrap_err();
            assert_eq!(err.input, bad);
        }
    }

    #[test]
    fn test_round_trip() {
        for note in -48..200 {
            assert_eq!(parse_note(&note_to_text(note)).unwrap(), note);
        }
    }

    #[test]
    fn test_text_round_trip_normalises_case() {
        for text in ["c#3", "a-1", "G10", "e0"] {
            let note = parse_note(text).unwrap();
            assert_eq!(note_to_text(note), text.to_uppercase());
        }
    }
}
