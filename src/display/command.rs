use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::types::InputId;

/// Inbound request to mute, unmute or toggle (`mute: None`) one player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteCommand {
    pub input: InputId,
    pub mute: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputRef {
    Number(u32),
    Text(String),
}

impl InputRef {
    fn to_id(&self) -> Option<InputId> {
        match self {
            InputRef::Number(n) => Some(InputId(*n)),
            InputRef::Text(s) => s.trim().parse().ok().map(InputId),
        }
    }
}

#[derive(Deserialize)]
struct RawCommand {
    func: String,
    input: InputRef,
    #[serde(default)]
    mute: Option<bool>,
}

/// Parse one line from the control channel.
/// The line holds a single command object or a list of them; entries that are
/// malformed or name another function are skipped.
pub fn parse_commands(line: &str, mute_func: &str) -> Vec<MuteCommand> {
    let value: Value = match serde_json::from_str(line.trim()) {
        Ok(value) => value,
        Err(e) => {
            debug!("ignoring malformed control line: {}", e);
            return Vec::new();
        }
    };

    let entries = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawCommand>(entry).ok())
        .filter(|command| command.func == mute_func)
        .filter_map(|command| {
            let input = command.input.to_id()?;
            Some(MuteCommand {
                input,
                mute: command.mute,
            })
        })
        .collect()
}
