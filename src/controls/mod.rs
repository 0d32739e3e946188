pub mod gamepad;
pub mod keyboard;

use std::str::FromStr;

use crossterm::event::KeyCode;
use gilrs::{Axis, Button};
use serde::{Deserialize, Serialize};

use crate::types::{ControlAction, InputEvent};

/// What a rule listens for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    ButtonDown(Button),
    ButtonUp(Button),
    Axis(Axis),
}

/// What a rule produces. Axis actions take the event's value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionTemplate {
    NoteDown(usize),
    NoteUp(usize),
    Strum(Option<f32>),
    StrumAxis,
    TransposeIncrement,
    TransposeDecrement,
    PitchBendAxis,
}

impl ActionTemplate {
    fn build(self, axis_value: f32) -> ControlAction {
        match self {
            ActionTemplate::NoteDown(index) => ControlAction::NoteDown { index },
            ActionTemplate::NoteUp(index) => ControlAction::NoteUp { index },
            ActionTemplate::Strum(value) => ControlAction::Strum { value },
            ActionTemplate::StrumAxis => ControlAction::Strum {
                value: Some(axis_value),
            },
            ActionTemplate::TransposeIncrement => ControlAction::TransposeIncrement,
            ActionTemplate::TransposeDecrement => ControlAction::TransposeDecrement,
            ActionTemplate::PitchBendAxis => ControlAction::PitchBend { value: axis_value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub trigger: Trigger,
    pub action: ActionTemplate,
}

/// Declarative mapping from raw input events to control actions
#[derive(Debug, Clone, PartialEq)]
pub struct InputProfile {
    name: &'static str,
    /// Gamepad this profile listens to. Keyboard rules ignore it
    pad: usize,
    rules: Vec<Rule>,
}

impl InputProfile {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Zero or one action for a raw event. The first matching rule wins
    pub fn map(&self, event: &InputEvent) -> Option<ControlAction> {
        let (trigger, value) = match *event {
            InputEvent::Key { key, pressed } => {
                let key = normalise_key(key);
                (if pressed { Trigger::KeyDown(key) } else { Trigger::KeyUp(key) }, 0.0)
            }
            InputEvent::Button { pad, button, pressed } => {
                if pad != self.pad {
                    return None;
                }
                (
                    if pressed { Trigger::ButtonDown(button) } else { Trigger::ButtonUp(button) },
                    0.0,
                )
            }
            InputEvent::Axis { pad, axis, value } => {
                if pad != self.pad {
                    return None;
                }
                (Trigger::Axis(axis), value)
            }
        };

        self.rules
            .iter()
            .find(|rule| rule.trigger == trigger)
            .map(|rule| rule.action.build(value))
    }
}

/// Letters compare case-insensitively so Shift does not change the mapping
fn normalise_key(key: KeyCode) -> KeyCode {
    match key {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// A controller's physical layout, turned into rules by `hero_controls`
pub struct ControlLayout<T: 'static> {
    pub strum: &'static [(T, Option<f32>)],
    pub transpose_increment: T,
    pub transpose_decrement: T,
    pub notes: [T; crate::hero::NUM_BUTTONS],
    /// Keyboards have no axes
    pub axis_pitch_bend: Option<Axis>,
    /// Some controllers report the strum bar as an axis
    pub axis_strum: Option<Axis>,
}

/// Build the rule list shared by every profile from a layout
fn hero_controls<T: Copy>(
    layout: &ControlLayout<T>,
    down: impl Fn(T) -> Trigger,
    up: impl Fn(T) -> Trigger,
) -> Vec<Rule> {
    let rule = |trigger, action| Rule { trigger, action };

    let mut rules: Vec<Rule> = layout
        .strum
        .iter()
        .map(|&(control, value)| rule(down(control), ActionTemplate::Strum(value)))
        .collect();

    rules.push(rule(down(layout.transpose_increment), ActionTemplate::TransposeIncrement));
    rules.push(rule(down(layout.transpose_decrement), ActionTemplate::TransposeDecrement));

    for (index, &control) in layout.notes.iter().enumerate() {
        rules.push(rule(down(control), ActionTemplate::NoteDown(index)));
        rules.push(rule(up(control), ActionTemplate::NoteUp(index)));
    }

    if let Some(axis) = layout.axis_pitch_bend {
        rules.push(rule(Trigger::Axis(axis), ActionTemplate::PitchBendAxis));
    }
    if let Some(axis) = layout.axis_strum {
        rules.push(rule(Trigger::Axis(axis), ActionTemplate::StrumAxis));
    }

    rules
}

const KEYBOARD: ControlLayout<KeyCode> = ControlLayout {
    strum: &[(KeyCode::Char(' '), None)],
    transpose_increment: KeyCode::Char('p'),
    transpose_decrement: KeyCode::Char('o'),
    notes: [
        KeyCode::Char('q'),
        KeyCode::Char('w'),
        KeyCode::Char('e'),
        KeyCode::Char('r'),
        KeyCode::Char('t'),
    ],
    axis_pitch_bend: None,
    axis_strum: None,
};

const GUITAR_FRETS: [Button; crate::hero::NUM_BUTTONS] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::LeftTrigger,
];

/// Strum bar reported as an axis
const JOY1: ControlLayout<Button> = ControlLayout {
    strum: &[],
    transpose_increment: Button::Start,
    transpose_decrement: Button::Select,
    notes: GUITAR_FRETS,
    axis_pitch_bend: Some(Axis::RightStickX),
    axis_strum: Some(Axis::LeftStickY),
};

/// Strum bar reported as the d-pad
const JOY2: ControlLayout<Button> = ControlLayout {
    strum: &[(Button::DPadDown, Some(1.0)), (Button::DPadUp, Some(-1.0))],
    transpose_increment: Button::Start,
    transpose_decrement: Button::Select,
    notes: GUITAR_FRETS,
    axis_pitch_bend: Some(Axis::RightZ),
    axis_strum: None,
};

/// Which built-in profile a player uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Keyboard,
    Joy1,
    Joy2,
}

impl ProfileKind {
    pub fn build(self, pad: usize) -> InputProfile {
        let (name, rules) = match self {
            ProfileKind::Keyboard => (
                "keyboard",
                hero_controls(&KEYBOARD, Trigger::KeyDown, Trigger::KeyUp),
            ),
            ProfileKind::Joy1 => (
                "joy1",
                hero_controls(&JOY1, Trigger::ButtonDown, Trigger::ButtonUp),
            ),
            ProfileKind::Joy2 => (
                "joy2",
                hero_controls(&JOY2, Trigger::ButtonDown, Trigger::ButtonUp),
            ),
        };
        InputProfile { name, pad, rules }
    }

    pub fn uses_gamepad(self) -> bool {
        !matches!(self, ProfileKind::Keyboard)
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyboard" | "key" => Ok(ProfileKind::Keyboard),
            "joy1" => Ok(ProfileKind::Joy1),
            "joy2" => Ok(ProfileKind::Joy2),
            other => Err(format!("unknown input profile '{}' (keyboard, joy1, joy2)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char, pressed: bool) -> InputEvent {
        InputEvent::Key {
            key: KeyCode::Char(c),
            pressed,
        }
    }

    #[test]
    fn test_keyboard_notes() {
        let profile = ProfileKind::Keyboard.build(0);
        assert_eq!(profile.map(&key('q', true)), Some(ControlAction::NoteDown { index: 0 }));
        assert_eq!(profile.map(&key('T', true)), Some(ControlAction::NoteDown { index: 4 }));
        assert_eq!(profile.map(&key('e', false)), Some(ControlAction::NoteUp { index: 2 }));
    }

    #[test]
    fn test_keyboard_strum_and_transpose() {
        let profile = ProfileKind::Keyboard.build(0);
        assert_eq!(profile.map(&key(' ', true)), Some(ControlAction::Strum { value: None }));
        assert_eq!(profile.map(&key(' ', false)), None);
        assert_eq!(profile.map(&key('p', true)), Some(ControlAction::TransposeIncrement));
        assert_eq!(profile.map(&key('o', true)), Some(ControlAction::TransposeDecrement));
        assert_eq!(profile.map(&key('z', true)), None);
    }

    #[test]
    fn test_keyboard_ignores_gamepads() {
        let profile = ProfileKind::Keyboard.build(0);
        let event = InputEvent::Button {
            pad: 0,
            button: Button::South,
            pressed: true,
        };
        assert_eq!(profile.map(&event), None);
    }

    #[test]
    fn test_joy1_axes() {
        let profile = ProfileKind::Joy1.build(1);
        let strum = InputEvent::Axis {
            pad: 1,
            axis: Axis::LeftStickY,
            value: -0.7,
        };
        assert_eq!(profile.map(&strum), Some(ControlAction::Strum { value: Some(-0.7) }));

        let bend = InputEvent::Axis {
            pad: 1,
            axis: Axis::RightStickX,
            value: 0.25,
        };
        assert_eq!(profile.map(&bend), Some(ControlAction::PitchBend { value: 0.25 }));
    }

    #[test]
    fn test_joy_profiles_filter_by_pad() {
        let profile = ProfileKind::Joy1.build(1);
        let other_pad = InputEvent::Button {
            pad: 0,
            button: Button::South,
            pressed: true,
        };
        assert_eq!(profile.map(&other_pad), None);

        let own_pad = InputEvent::Button {
            pad: 1,
            button: Button::LeftTrigger,
            pressed: false,
        };
        assert_eq!(profile.map(&own_pad), Some(ControlAction::NoteUp { index: 4 }));
    }

    #[test]
    fn test_joy2_dpad_strum() {
        let profile = ProfileKind::Joy2.build(0);
        let down = InputEvent::Button {
            pad: 0,
            button: Button::DPadDown,
            pressed: true,
        };
        let up = InputEvent::Button {
            pad: 0,
            button: Button::DPadUp,
            pressed: true,
        };
        assert_eq!(profile.map(&down), Some(ControlAction::Strum { value: Some(1.0) }));
        assert_eq!(profile.map(&up), Some(ControlAction::Strum { value: Some(-1.0) }));
    }

    #[test]
    fn test_profile_kind_parsing() {
        assert_eq!("Joy2".parse::<ProfileKind>().unwrap(), ProfileKind::Joy2);
        assert!("mouse".parse::<ProfileKind>().is_err());
        assert!(ProfileKind::Joy1.uses_gamepad());
        assert!(!ProfileKind::Keyboard.uses_gamepad());
    }
}
