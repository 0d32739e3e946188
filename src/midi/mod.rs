pub mod handler;
pub mod message;
pub mod sink;

pub use handler::MidiOutputHandler;
pub use sink::{ChannelSink, MidiSink, NullMidiSink};
