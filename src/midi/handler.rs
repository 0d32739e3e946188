use anyhow::{Result, anyhow};
use midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

const CLIENT_NAME: &str = "pentatonic-hero";

/// Lists MIDI output ports and opens a connection to one of them
pub struct MidiOutputHandler;

impl MidiOutputHandler {
    /// List all available MIDI output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new("pentatonic-hero-list")?;
        let ports = midi_out.ports();

        let mut devices = Vec::new();
        for port in ports.iter() {
            if let Ok(name) = midi_out.port_name(port) {
                devices.push(name);
            }
        }

        Ok(devices)
    }

    /// Connect to an output port chosen by index or name substring.
    /// Without a search string the first port is used.
    pub fn connect(search: Option<&str>) -> Result<MidiOutputConnection> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;
        let ports = midi_out.ports();

        if ports.is_empty() {
            return Err(anyhow!("No MIDI output devices found"));
        }

        let names: Vec<String> = ports
            .iter()
            .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
            .collect();

        let index = match search {
            Some(search) => find_midi_device(&names, search)?,
            None => 0,
        };

        info!("using MIDI output: {}", names[index]);

        midi_out
            .connect(&ports[index], CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to connect to MIDI port '{}': {}", names[index], e))
    }
}

/// Find MIDI device index by name or index string
pub fn find_midi_device(devices: &[String], search: &str) -> Result<usize> {
    // Try to parse as index first
    if let Ok(index) = search.parse::<usize>() {
        if index < devices.len() {
            return Ok(index);
        } else {
            return Err(anyhow!(
                "MIDI device index {} out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            ));
        }
    }

    // Search by name (case-insensitive substring match)
    let search_lower = search.to_lowercase();
    devices
        .iter()
        .position(|device| device.to_lowercase().contains(&search_lower))
        .ok_or_else(|| anyhow!("MIDI device '{}' not found", search))
}
