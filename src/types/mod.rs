pub mod events;

pub use events::{ControlAction, InputEvent, InputId};
