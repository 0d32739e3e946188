pub mod note;
pub mod scale;

pub use note::{Note, NoteParseError, note_to_text, parse_note};
pub use scale::{Scale, ScaleError};
