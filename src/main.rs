mod app;
mod config;
mod controls;
mod display;
mod hero;
mod midi;
mod music;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};

use app::{App, Player};
use config::{DisplayConfig, HeroConfig, NoteSpec, PlayerConfig};
use controls::gamepad::GamepadInput;
use controls::keyboard::KeyboardInput;
use display::{DisplaySink, NetworkDisplay, NullDisplay};
use hero::HeroInput;
use midi::{ChannelSink, MidiOutputHandler, MidiSink, NullMidiSink};
use types::InputId;

/// Play MIDI notes from a guitar-style controller using scale-mapped buttons
#[derive(Parser, Debug)]
#[command(name = "pentatonic-hero")]
#[command(about = "Guitar controller to MIDI, mapped onto a musical scale", long_about = None)]
struct Args {
    /// Configuration file (YAML). Command line options override it
    #[arg(short = 'c', long = "config")]
    config: Option<std::path::PathBuf>,

    /// List available devices and exit
    #[arg(short = 'l', long = "list")]
    list_devices: bool,

    /// Player input profile: keyboard, joy1[:pad] or joy2[:pad]. Repeat for more players
    #[arg(short = 'i', long = "input")]
    inputs: Vec<PlayerConfig>,

    /// Root note, e.g. "C#3" or a note number
    #[arg(short = 'r', long = "root")]
    root: Option<String>,

    /// Scale name (pentatonic_minor, pentatonic_major, blues, major, minor, chromatic)
    #[arg(short = 's', long = "scale")]
    scale: Option<String>,

    /// MIDI channel for the first player (1-16); later players use the following channels
    #[arg(long = "channel")]
    channel: Option<u8>,

    /// Only sound notes on a strum
    #[arg(long = "no-hammer-ons")]
    no_hammer_ons: bool,

    /// Playing power change per note (negative)
    #[arg(long = "hammer-decay", allow_hyphen_values = true)]
    hammer_decay: Option<f32>,

    /// Ignore strums repeating a just-hammered note within this many ms (0 disables)
    #[arg(long = "hammer-block-ms")]
    hammer_block_ms: Option<u64>,

    /// Lowest and highest playable notes
    #[arg(long = "note-range", num_args = 2, value_names = ["LOWER", "UPPER"], allow_hyphen_values = true)]
    note_range: Option<Vec<String>>,

    /// Display event endpoint, host[:port]
    #[arg(short = 'd', long = "display")]
    display: Option<String>,

    /// MIDI output port (index or name substring)
    #[arg(short = 'm', long = "midi-port")]
    midi_port: Option<String>,

    /// Input ticks per second
    #[arg(long = "tick-hz", default_value_t = 100)]
    tick_hz: u32,
}

impl Args {
    /// Overlay command line options onto the loaded configuration
    fn apply(&self, config: &mut HeroConfig) {
        if !self.inputs.is_empty() {
            config.players = self.inputs.clone();
        }
        if let Some(root) = &self.root {
            config.root = NoteSpec::Text(root.clone());
        }
        if let Some(scale) = &self.scale {
            config.scale = scale.clone();
        }
        if let Some(channel) = self.channel {
            config.midich = channel;
        }
        if self.no_hammer_ons {
            config.hammer_ons = false;
        }
        if let Some(decay) = self.hammer_decay {
            config.hammer_decay = decay;
        }
        if let Some(ms) = self.hammer_block_ms {
            config.hammer_strum_block_ms = ms;
        }
        if let Some([lower, upper]) = self.note_range.as_deref() {
            config.note_range = [NoteSpec::Text(lower.clone()), NoteSpec::Text(upper.clone())];
        }
        if let Some(endpoint) = &self.display {
            match config.display.as_mut() {
                Some(display) => display.endpoint = endpoint.clone(),
                None => config.display = Some(DisplayConfig::new(endpoint.clone())),
            }
        }
        if let Some(port) = &self.midi_port {
            config.devices.midiout = Some(port.clone());
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so they don't fight the raw-mode terminal on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_devices {
        println!("Available MIDI Output Devices:");
        for (i, device) in MidiOutputHandler::list_devices()?.iter().enumerate() {
            println!("  {}: {}", i, device);
        }
        println!("\nConnected Gamepads:");
        for (pad, name) in GamepadInput::list_devices() {
            println!("  {}: {}", pad, name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => HeroConfig::load(path)?,
        None => HeroConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    run(config, args.tick_hz)
}

fn run(config: HeroConfig, tick_hz: u32) -> Result<()> {
    let settings = config.hero_settings()?;

    // A missing MIDI device leaves the controller playable but silent
    let midi_out = match MidiOutputHandler::connect(config.devices.midiout.as_deref()) {
        Ok(connection) => Some(Rc::new(RefCell::new(connection))),
        Err(e) => {
            warn!("MIDI output unavailable, continuing without sound: {:#}", e);
            None
        }
    };

    let (display, commands) = match &config.display {
        Some(display) => {
            let (sink, commands) = NetworkDisplay::spawn(display.address(), &display.func, &display.mute_func);
            (Some(sink), Some(commands))
        }
        None => (None, None),
    };

    let mut players = Vec::new();
    for (index, player) in config.players.iter().enumerate() {
        let channel = config.player_channel(index);

        let midi: Box<dyn MidiSink> = match &midi_out {
            Some(output) => Box::new(ChannelSink::new(Rc::clone(output), channel)),
            None => Box::new(NullMidiSink),
        };
        let display_sink: Box<dyn DisplaySink> = match &display {
            Some(sink) => Box::new(sink.clone()),
            None => Box::new(NullDisplay),
        };

        let id = InputId(index as u32);
        let hero = HeroInput::new(id, settings.clone(), midi, display_sink)
            .with_context(|| format!("Unable to set up player {}", index + 1))?;

        let profile = player.profile.build(player.pad);
        info!(
            "player {}: {} input, MIDI channel {}",
            index + 1,
            profile.name(),
            channel + 1
        );

        players.push(Player { hero, profile });
    }

    let gamepads = if config.players.iter().any(|p| p.profile.uses_gamepad()) {
        GamepadInput::open()
    } else {
        None
    };

    let mut keyboard = KeyboardInput::open().context("Unable to put the terminal into raw mode")?;
    let mut app = App::new(players, commands);

    let tick = Duration::from_secs_f64(1.0 / f64::from(tick_hz.max(1)));
    app::run(&mut app, &mut keyboard, gamepads, tick)
}
