use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use super::command::{MuteCommand, parse_commands};
use super::{DisplayEvent, DisplaySink, encode_event};
use crate::types::InputId;

/// Minimum time between connection attempts
pub const RECONNECT_COOLDOWN: Duration = Duration::from_secs(5);

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Events queued beyond this are dropped rather than blocking input handling
const QUEUE_CAPACITY: usize = 256;

/// Spaces connection attempts at least `cooldown` apart
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    cooldown: Duration,
    last_attempt: Option<Instant>,
}

impl ReconnectPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_attempt: None,
        }
    }

    /// Returns true (and records the attempt) if an attempt is allowed at `now`
    pub fn try_attempt(&mut self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) if now.saturating_duration_since(last) < self.cooldown => false,
            _ => {
                self.last_attempt = Some(now);
                true
            }
        }
    }
}

/// Newline-delimited JSON display sink over TCP.
///
/// Cloning is cheap; every clone feeds the same connection. Sends never block:
/// a writer thread owns the socket, and events that cannot be delivered are
/// dropped. Control commands read back from the socket arrive on the receiver
/// returned by `spawn`.
#[derive(Clone)]
pub struct NetworkDisplay {
    func: Arc<str>,
    tx: Sender<String>,
}

impl NetworkDisplay {
    pub fn spawn(endpoint: String, func: &str, mute_func: &str) -> (Self, Receiver<MuteCommand>) {
        let (tx, rx) = crossbeam_channel::bounded::<String>(QUEUE_CAPACITY);
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let mute_func = mute_func.to_string();

        info!("display events -> {}", endpoint);

        thread::spawn(move || run_writer(endpoint, rx, command_tx, mute_func));

        (
            Self {
                func: Arc::from(func),
                tx,
            },
            command_rx,
        )
    }
}

impl DisplaySink for NetworkDisplay {
    fn event(&mut self, input: InputId, event: DisplayEvent) {
        let line = match encode_event(&self.func, input, &event) {
            Ok(line) => line,
            Err(e) => {
                warn!("unable to encode display event {:?}: {}", event, e);
                return;
            }
        };

        match self.tx.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("display queue full, dropping event"),
            Err(TrySendError::Disconnected(_)) => debug!("display writer gone, dropping event"),
        }
    }
}

/// Writer thread: owns the connection, reconnects no more often than the cooldown
fn run_writer(
    endpoint: String,
    rx: Receiver<String>,
    command_tx: Sender<MuteCommand>,
    mute_func: String,
) {
    let mut policy = ReconnectPolicy::new(RECONNECT_COOLDOWN);
    let mut stream: Option<TcpStream> = None;

    loop {
        if stream.is_none() && policy.try_attempt(Instant::now()) {
            stream = connect(&endpoint, &command_tx, &mute_func);
        }

        let line = match rx.recv_timeout(RECONNECT_COOLDOWN) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(socket) = stream.as_mut() {
            if let Err(e) = socket.write_all(line.as_bytes()) {
                warn!("display connection lost: {}", e);
                stream = None;
            }
        }
    }

    debug!("display writer stopped");
}

fn connect(endpoint: &str, command_tx: &Sender<MuteCommand>, mute_func: &str) -> Option<TcpStream> {
    let addr = match endpoint.to_socket_addrs().map(|mut addrs| addrs.next()) {
        Ok(Some(addr)) => addr,
        Ok(None) => {
            warn!("display endpoint {} resolved to no address", endpoint);
            return None;
        }
        Err(e) => {
            warn!("unable to resolve display endpoint {}: {}", endpoint, e);
            return None;
        }
    };

    let stream = match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
        Ok(stream) => stream,
        Err(e) => {
            debug!("display connect to {} failed: {}", endpoint, e);
            return None;
        }
    };

    let _ = stream.set_nodelay(true);
    info!("display connected to {}", endpoint);

    match stream.try_clone() {
        Ok(reader) => {
            let command_tx = command_tx.clone();
            let mute_func = mute_func.to_string();
            thread::spawn(move || run_reader(reader, command_tx, mute_func));
        }
        Err(e) => warn!("control commands unavailable: {}", e),
    }

    Some(stream)
}

/// Reader thread: forwards control commands until the connection closes
fn run_reader(stream: TcpStream, command_tx: Sender<MuteCommand>, mute_func: String) {
    for line in BufReader::new(stream).lines() {
        let Ok(line) = line else { break };
        for command in parse_commands(&line, &mute_func) {
            if command_tx.send(command).is_err() {
                return;
            }
        }
    }
    debug!("control channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_reconnect_policy_spaces_attempts() {
        let start = Instant::now();
        let mut policy = ReconnectPolicy::new(Duration::from_secs(5));

        assert!(policy.try_attempt(start));
        assert!(!policy.try_attempt(start + Duration::from_secs(1)));
        assert!(!policy.try_attempt(start + Duration::from_millis(4999)));
        assert!(policy.try_attempt(start + Duration::from_secs(5)));
        assert!(!policy.try_attempt(start + Duration::from_secs(6)));
    }

    #[test]
    fn test_events_and_commands_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let (mut display, commands) = NetworkDisplay::spawn(endpoint, "pentatonic_hero", "pentatonic_hero_mute");
        let (mut peer, _) = listener.accept().unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        display.event(InputId(1), DisplayEvent::ButtonDown { button: 2 });

        let mut reader = BufReader::new(peer.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "button_down");
        assert_eq!(value["input"], 1);
        assert_eq!(value["button"], 2);

        peer.write_all(b"{\"func\": \"pentatonic_hero_mute\", \"input\": 1, \"mute\": true}\n")
            .unwrap();
        let command = commands.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            command,
            MuteCommand {
                input: InputId(1),
                mute: Some(true)
            }
        );
    }

    #[test]
    fn test_unreachable_endpoint_never_blocks() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (mut display, _commands) = NetworkDisplay::spawn(endpoint, "pentatonic_hero", "pentatonic_hero_mute");
        let start = Instant::now();
        for button in 0..(QUEUE_CAPACITY * 2) {
            display.event(InputId(0), DisplayEvent::ButtonUp { button });
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
