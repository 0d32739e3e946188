use gilrs::{Event, EventType, Gilrs};
use tracing::{debug, info, warn};

use crate::types::InputEvent;

/// Translate a gilrs event from pad `pad`
pub fn translate_event(pad: usize, event: EventType) -> Option<InputEvent> {
    match event {
        EventType::ButtonPressed(button, _) => Some(InputEvent::Button {
            pad,
            button,
            pressed: true,
        }),
        EventType::ButtonReleased(button, _) => Some(InputEvent::Button {
            pad,
            button,
            pressed: false,
        }),
        EventType::AxisChanged(axis, value, _) => Some(InputEvent::Axis {
            pad,
            axis,
            value: value.clamp(-1.0, 1.0),
        }),
        EventType::Connected => {
            info!("gamepad {} connected", pad);
            None
        }
        EventType::Disconnected => {
            warn!("gamepad {} disconnected", pad);
            None
        }
        _ => None,
    }
}

/// Gamepad event pump
pub struct GamepadInput {
    gilrs: Gilrs,
}

impl GamepadInput {
    /// Open the gamepad subsystem. Returns None when the platform has no support
    pub fn open() -> Option<Self> {
        match Gilrs::new() {
            Ok(gilrs) => {
                for (id, gamepad) in gilrs.gamepads() {
                    info!("gamepad {}: {}", usize::from(id), gamepad.name());
                }
                Some(Self { gilrs })
            }
            Err(e) => {
                warn!("gamepad support unavailable: {}", e);
                None
            }
        }
    }

    /// Names of connected gamepads, indexed by pad number
    pub fn list_devices() -> Vec<(usize, String)> {
        match Gilrs::new() {
            Ok(gilrs) => gilrs
                .gamepads()
                .map(|(id, gamepad)| (usize::from(id), gamepad.name().to_string()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Read every pending gamepad event without blocking
    pub fn drain(&mut self, out: &mut Vec<InputEvent>) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(input) = translate_event(usize::from(id), event) {
                debug!("gamepad {:?}", input);
                out.push(input);
            }
        }
    }
}
