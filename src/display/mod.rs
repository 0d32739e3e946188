pub mod command;
pub mod network;

use serde::Serialize;

use crate::music::Note;
use crate::types::InputId;

pub use command::MuteCommand;
pub use network::NetworkDisplay;

/// Default event-bus function name carried by every outbound display event
pub const DEFAULT_DISPLAY_FUNC: &str = "pentatonic_hero";

/// Default function name for inbound mute commands
pub const DEFAULT_MUTE_FUNC: &str = "pentatonic_hero_mute";

/// UI mirror events. Serialised with the variant name in the `event` field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DisplayEvent {
    ButtonDown { button: usize },
    ButtonUp { button: usize },
    Strum { value: i8 },
    Transpose { notes: Vec<String> },
    NoteOn { value: Note, button: usize },
    NoteOff { value: Note },
    Pitch { pitch: f32 },
}

/// Where display events go. Delivery is best effort
pub trait DisplaySink {
    fn event(&mut self, input: InputId, event: DisplayEvent);
}

/// Drops every event
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn event(&mut self, _input: InputId, _event: DisplayEvent) {}
}

/// One line of the display wire format
#[derive(Serialize)]
struct DisplayMessage<'a> {
    func: &'a str,
    input: InputId,
    #[serde(flatten)]
    event: &'a DisplayEvent,
}

/// Serialise an event as a single newline-terminated JSON object
pub fn encode_event(func: &str, input: InputId, event: &DisplayEvent) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&DisplayMessage { func, input, event })?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn decode(line: &str) -> Value {
        assert!(line.ends_with('\n'));
        serde_json::from_str(line.trim_end()).unwrap()
    }

    #[test]
    fn test_encode_button_event() {
        let line = encode_event("pentatonic_hero", InputId(1), &DisplayEvent::ButtonDown { button: 3 }).unwrap();
        assert_eq!(
            decode(&line),
            json!({"func": "pentatonic_hero", "input": 1, "event": "button_down", "button": 3})
        );
    }

    #[test]
    fn test_encode_transpose_event() {
        let event = DisplayEvent::Transpose {
            notes: vec!["A3".to_string(), "C4".to_string()],
        };
        let line = encode_event("hero", InputId(0), &event).unwrap();
        assert_eq!(
            decode(&line),
            json!({"func": "hero", "input": 0, "event": "transpose", "notes": ["A3", "C4"]})
        );
    }

    #[test]
    fn test_encode_note_events() {
        let on = encode_event("hero", InputId(2), &DisplayEvent::NoteOn { value: 69, button: 0 }).unwrap();
        assert_eq!(decode(&on)["event"], "note_on");
        assert_eq!(decode(&on)["value"], 69);

        let off = encode_event("hero", InputId(2), &DisplayEvent::NoteOff { value: 69 }).unwrap();
        assert_eq!(decode(&off), json!({"func": "hero", "input": 2, "event": "note_off", "value": 69}));
    }

    #[test]
    fn test_encode_is_single_line() {
        let line = encode_event("hero", InputId(0), &DisplayEvent::Pitch { pitch: -0.5 }).unwrap();
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(decode(&line)["pitch"], -0.5);
    }
}
