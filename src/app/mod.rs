use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::controls::InputProfile;
use crate::controls::gamepad::GamepadInput;
use crate::controls::keyboard::KeyboardInput;
use crate::display::MuteCommand;
use crate::hero::HeroInput;
use crate::types::InputEvent;

/// One player: a state machine fed by one input profile
pub struct Player {
    pub hero: HeroInput,
    pub profile: InputProfile,
}

/// Application state shared by the tick loop
pub struct App {
    players: Vec<Player>,
    commands: Option<Receiver<MuteCommand>>,
    /// Whether to quit the application
    pub should_quit: bool,
}

impl App {
    pub fn new(players: Vec<Player>, commands: Option<Receiver<MuteCommand>>) -> Self {
        Self {
            players,
            commands,
            should_quit: false,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Offer a raw event to every player's profile
    pub fn handle_input(&mut self, event: &InputEvent) {
        for player in &mut self.players {
            if let Some(action) = player.profile.map(event) {
                player.hero.update_state(action);
            }
        }
    }

    /// Apply a mute command to the player it names
    pub fn handle_command(&mut self, command: MuteCommand) {
        match self.players.iter_mut().find(|p| p.hero.id() == command.input) {
            Some(player) => player.hero.set_mute_state(command.mute),
            None => debug!("mute command for unknown input {}", command.input),
        }
    }

    fn drain_commands(&mut self) {
        let Some(commands) = &self.commands else {
            return;
        };
        let pending: Vec<MuteCommand> = commands.try_iter().collect();
        for command in pending {
            self.handle_command(command);
        }
    }

    /// One scheduler tick for every player
    pub fn process(&mut self, now: Instant) {
        for player in &mut self.players {
            player.hero.process_state_at(now);
        }
    }

    /// Silence every player before exit
    pub fn shutdown(&mut self) {
        for player in &mut self.players {
            player.hero.shutdown();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Run the input loop at a fixed tick rate until quit is requested.
/// Each tick drains all pending input first, then evaluates every player once.
pub fn run(
    app: &mut App,
    keyboard: &mut KeyboardInput,
    mut gamepads: Option<GamepadInput>,
    tick: Duration,
) -> Result<()> {
    let mut events = Vec::new();
    let mut next_tick = Instant::now();

    info!("running at {:.0} ticks/s, press Esc to quit", 1.0 / tick.as_secs_f64());

    while !app.should_quit {
        events.clear();

        if keyboard.drain(&mut events)? {
            app.quit();
        }
        if let Some(pads) = gamepads.as_mut() {
            pads.drain(&mut events);
        }

        for event in &events {
            app.handle_input(event);
        }
        app.drain_commands();

        let now = Instant::now();
        app.process(now);

        next_tick += tick;
        match next_tick.checked_duration_since(Instant::now()) {
            Some(wait) => std::thread::sleep(wait),
            // Fell behind; don't try to catch up with a burst of ticks
            None => next_tick = Instant::now(),
        }
    }

    app.shutdown();
    info!("stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ProfileKind;
    use crate::display::NullDisplay;
    use crate::hero::HeroSettings;
    use crate::midi::MidiSink;
    use crate::music::{Note, Scale};
    use crate::types::InputId;
    use crossterm::event::KeyCode;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct NoteLog(Rc<RefCell<Vec<(Note, f32)>>>);

    impl MidiSink for NoteLog {
        fn note(&mut self, note: Option<Note>, velocity: f32) {
            if let Some(note) = note {
                self.0.borrow_mut().push((note, velocity));
            }
        }

        fn pitch(&mut self, _value: f32) {}
    }

    fn player(id: u32, kind: ProfileKind, log: &NoteLog) -> Player {
        let settings = HeroSettings::new(60, Scale::named("pentatonic").unwrap());
        Player {
            hero: HeroInput::new(InputId(id), settings, Box::new(log.clone()), Box::new(NullDisplay)).unwrap(),
            profile: kind.build(0),
        }
    }

    fn key(c: char, pressed: bool) -> InputEvent {
        InputEvent::Key {
            key: KeyCode::Char(c),
            pressed,
        }
    }

    #[test]
    fn test_events_reach_matching_player_only() {
        let keys = NoteLog::default();
        let pad = NoteLog::default();
        let mut app = App::new(
            vec![player(0, ProfileKind::Keyboard, &keys), player(1, ProfileKind::Joy2, &pad)],
            None,
        );

        app.handle_input(&key('w', true));
        app.handle_input(&key(' ', true));
        app.process(Instant::now());

        assert_eq!(*keys.0.borrow(), vec![(63, 1.0)]);
        assert!(pad.0.borrow().is_empty());
    }

    #[test]
    fn test_mute_commands_route_by_input_id() {
        let first = NoteLog::default();
        let second = NoteLog::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut app = App::new(
            vec![player(0, ProfileKind::Keyboard, &first), player(1, ProfileKind::Keyboard, &second)],
            Some(rx),
        );

        tx.send(MuteCommand {
            input: InputId(1),
            mute: None,
        })
        .unwrap();
        tx.send(MuteCommand {
            input: InputId(7),
            mute: Some(true),
        })
        .unwrap();
        app.drain_commands();

        assert!(!app.players()[0].hero.is_muted());
        assert!(app.players()[1].hero.is_muted());

        app.handle_input(&key('q', true));
        app.handle_input(&key(' ', true));
        app.process(Instant::now());

        assert_eq!(first.0.borrow().len(), 1);
        assert!(second.0.borrow().is_empty());
    }

    #[test]
    fn test_shutdown_silences_players() {
        let log = NoteLog::default();
        let mut app = App::new(vec![player(0, ProfileKind::Keyboard, &log)], None);

        app.handle_input(&key('q', true));
        app.handle_input(&key(' ', true));
        app.process(Instant::now());
        app.shutdown();

        assert_eq!(*log.0.borrow(), vec![(60, 1.0), (60, 0.0)]);
    }
}
