use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::controls::ProfileKind;
use crate::display::{DEFAULT_DISPLAY_FUNC, DEFAULT_MUTE_FUNC};
use crate::hero::{DEFAULT_HAMMER_DECAY, HeroSettings, NoteLimit};
use crate::music::{Note, NoteParseError, Scale, parse_note};

/// Port used when a display endpoint names only a host
pub const DEFAULT_DISPLAY_PORT: u16 = 9872;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeroConfig {
    #[serde(default)]
    pub devices: DeviceConfig,

    #[serde(default)]
    pub display: Option<DisplayConfig>,

    #[serde(default = "default_root")]
    pub root: NoteSpec,

    #[serde(default = "default_scale")]
    pub scale: String,

    /// First player's MIDI channel (1-16). Player n uses midich + n
    #[serde(default = "default_midich")]
    pub midich: u8,

    #[serde(default = "default_hammer_ons")]
    pub hammer_ons: bool,

    #[serde(default = "default_hammer_decay")]
    pub hammer_decay: f32,

    /// 0 disables the strum block
    #[serde(default)]
    pub hammer_strum_block_ms: u64,

    #[serde(default = "default_note_range")]
    pub note_range: [NoteSpec; 2],

    #[serde(default = "default_players")]
    pub players: Vec<PlayerConfig>,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            devices: DeviceConfig::default(),
            display: None,
            root: default_root(),
            scale: default_scale(),
            midich: default_midich(),
            hammer_ons: default_hammer_ons(),
            hammer_decay: default_hammer_decay(),
            hammer_strum_block_ms: 0,
            note_range: default_note_range(),
            players: default_players(),
        }
    }
}

impl HeroConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: HeroConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.players.is_empty() {
            return Err(anyhow!("Configuration must have at least one player"));
        }

        // Validate MIDI channel (1-16), leaving room for every player
        let last_channel = self.midich as usize + self.players.len() - 1;
        if self.midich < 1 || last_channel > 16 {
            return Err(anyhow!(
                "MIDI channel must be between 1 and 16 for all {} players (player n uses midich + n)",
                self.players.len()
            ));
        }

        if !(-1.0..0.0).contains(&self.hammer_decay) {
            return Err(anyhow!("Hammer decay must be negative and no less than -1.0"));
        }

        if let Some(display) = &self.display {
            if display.endpoint.trim().is_empty() {
                return Err(anyhow!("Display endpoint must not be empty"));
            }
        }

        // Notes, scale and range all resolve
        self.hero_settings()?;

        Ok(())
    }

    /// Build the state machine settings shared by every player
    pub fn hero_settings(&self) -> Result<HeroSettings> {
        let root = self.root.parse().context("Invalid root note")?;
        let scale = Scale::named(&self.scale)?;
        let lower = self.note_range[0].parse().context("Invalid note range")?;
        let upper = self.note_range[1].parse().context("Invalid note range")?;
        let note_limit = NoteLimit::new(lower, upper)?;

        if !note_limit.contains(root) {
            return Err(anyhow!(
                "Root note {} is outside the note range {}..={}",
                self.root,
                self.note_range[0],
                self.note_range[1]
            ));
        }

        let hammer_strum_block = match self.hammer_strum_block_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(HeroSettings {
            root_note: root,
            scale,
            note_limit,
            hammer_ons: self.hammer_ons,
            hammer_decay: self.hammer_decay,
            hammer_strum_block,
        })
    }

    /// 0-indexed MIDI channel for player `index`
    pub fn player_channel(&self, index: usize) -> u8 {
        (self.midich as usize - 1 + index) as u8
    }
}

/// Device configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Output port index or name substring. First port when absent
    #[serde(default)]
    pub midiout: Option<String>,
}

/// Network display mirror
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub endpoint: String,

    #[serde(default = "default_display_func")]
    pub func: String,

    #[serde(default = "default_mute_func")]
    pub mute_func: String,
}

impl DisplayConfig {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            func: default_display_func(),
            mute_func: default_mute_func(),
        }
    }

    /// `host:port`, adding the default port when only a host is given
    pub fn address(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.contains(':') {
            endpoint.to_string()
        } else {
            format!("{}:{}", endpoint, DEFAULT_DISPLAY_PORT)
        }
    }
}

/// Per-player input selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerConfig {
    pub profile: ProfileKind,

    /// Gamepad index for joystick profiles
    #[serde(default)]
    pub pad: usize,
}

impl FromStr for PlayerConfig {
    type Err = String;

    /// `keyboard`, `joy1`, `joy2:1` (profile with gamepad index)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (profile, pad) = match s.split_once(':') {
            Some((profile, pad)) => {
                let pad = pad
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid gamepad index in '{}'", s))?;
                (profile, pad)
            }
            None => (s, 0),
        };
        Ok(Self {
            profile: profile.parse()?,
            pad,
        })
    }
}

/// A note given either as a number or as text like "C#3"
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NoteSpec {
    Number(Note),
    Text(String),
}

impl NoteSpec {
    pub fn parse(&self) -> Result<Note, NoteParseError> {
        match self {
            NoteSpec::Number(note) => Ok(*note),
            NoteSpec::Text(text) => parse_note(text),
        }
    }
}

impl std::fmt::Display for NoteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteSpec::Number(note) => write!(f, "{}", note),
            NoteSpec::Text(text) => write!(f, "{}", text),
        }
    }
}

// Default value functions for serde
fn default_root() -> NoteSpec {
    NoteSpec::Text("C#3".to_string())
}

fn default_scale() -> String {
    "pentatonic_minor".to_string()
}

fn default_midich() -> u8 {
    1
}

fn default_hammer_ons() -> bool {
    true
}

fn default_hammer_decay() -> f32 {
    DEFAULT_HAMMER_DECAY
}

fn default_note_range() -> [NoteSpec; 2] {
    [
        NoteSpec::Text("C0".to_string()),
        NoteSpec::Text("C6".to_string()),
    ]
}

fn default_players() -> Vec<PlayerConfig> {
    vec![PlayerConfig {
        profile: ProfileKind::Keyboard,
        pad: 0,
    }]
}

fn default_display_func() -> String {
    DEFAULT_DISPLAY_FUNC.to_string()
}

fn default_mute_func() -> String {
    DEFAULT_MUTE_FUNC.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
devices:
  midiout: "PentatonicHero"

display:
  endpoint: "localhost:9872"

root: "A3"
scale: blues
midich: 3
hammer_ons: false
hammer_decay: -0.1
hammer_strum_block_ms: 80
note_range: ["C1", 100]

players:
  - profile: keyboard
  - profile: joy1
    pad: 1
"#;

        let config: HeroConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.devices.midiout.as_deref(), Some("PentatonicHero"));
        assert_eq!(config.players.len(), 2);
        assert_eq!(config.players[1].profile, ProfileKind::Joy1);
        assert_eq!(config.players[1].pad, 1);
        assert_eq!(config.player_channel(0), 2);
        assert_eq!(config.player_channel(1), 3);

        let display = config.display.as_ref().unwrap();
        assert_eq!(display.func, "pentatonic_hero");
        assert_eq!(display.mute_func, "pentatonic_hero_mute");

        let settings = config.hero_settings().unwrap();
        assert_eq!(settings.root_note, 69);
        assert_eq!(settings.note_limit, NoteLimit::new(36, 100).unwrap());
        assert!(!settings.hammer_ons);
        assert_eq!(settings.hammer_strum_block, Some(Duration::from_millis(80)));
    }

    #[test]
    fn test_defaults() {
        let config: HeroConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert!(config.display.is_none());
        assert_eq!(config.players, default_players());

        let settings = config.hero_settings().unwrap();
        assert_eq!(settings.root_note, 61);
        assert!(settings.hammer_ons);
        assert_eq!(settings.hammer_decay, -0.05);
        assert_eq!(settings.hammer_strum_block, None);
        assert_eq!(settings.note_limit, NoteLimit::new(24, 96).unwrap());
    }

    #[test]
    fn test_validate_midi_channel_range() {
        let yaml = r#"
midich: 16
players:
  - profile: keyboard
  - profile: joy1
"#;

        let config: HeroConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_notes() {
        let config: HeroConfig = serde_yaml::from_str("root: \"H2\"").unwrap();
        assert!(config.validate().is_err());

        let config: HeroConfig = serde_yaml::from_str("root: \"C8\"").unwrap();
        assert!(config.validate().is_err());

        let config: HeroConfig = serde_yaml::from_str("note_range: [\"C5\", \"C1\"]").unwrap();
        assert!(config.validate().is_err());

        let config: HeroConfig = serde_yaml::from_str("note_range: [0, 2147483647]").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_scale_and_decay() {
        let config: HeroConfig = serde_yaml::from_str("scale: lydian").unwrap();
        assert!(config.validate().is_err());

        let config: HeroConfig = serde_yaml::from_str("hammer_decay: 0.1").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_profile_fails_to_parse() {
        let yaml = r#"
players:
  - profile: mouse
"#;
        assert!(serde_yaml::from_str::<HeroConfig>(yaml).is_err());
    }

    #[test]
    fn test_player_spec_parsing() {
        assert_eq!(
            "joy2:1".parse::<PlayerConfig>().unwrap(),
            PlayerConfig {
                profile: ProfileKind::Joy2,
                pad: 1
            }
        );
        assert_eq!("keyboard".parse::<PlayerConfig>().unwrap().pad, 0);
        assert!("joy1:x".parse::<PlayerConfig>().is_err());
    }

    #[test]
    fn test_display_address_default_port() {
        assert_eq!(DisplayConfig::new("localhost".into()).address(), "localhost:9872");
        assert_eq!(DisplayConfig::new("10.0.0.2:9000".into()).address(), "10.0.0.2:9000");
    }
}
