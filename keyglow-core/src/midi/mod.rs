//! Hardware MIDI input.
//!
//! Only note messages matter to the player; everything else is dropped at
//! parse time. Events are queued from midir's callback thread and drained
//! without blocking by whoever owns the manager.

use midir::{MidiInput, MidiInputConnection};
use std::sync::mpsc::{self, Receiver};

/// A note event with its driver timestamp in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub timestamp_us: u64,
    pub kind: MidiEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEventKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

/// Information about an available MIDI port
#[derive(Debug, Clone)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
}

pub struct MidiInputManager {
    midi_in: Option<MidiInput>,
    connection: Option<MidiInputConnection<()>>,
    event_receiver: Option<Receiver<MidiEvent>>,
    connected_port_name: Option<String>,
    available_ports: Vec<MidiPortInfo>,
}

impl MidiInputManager {
    pub fn new() -> Self {
        let midi_in = MidiInput::new("keyglow").ok();
        Self {
            midi_in,
            connection: None,
            event_receiver: None,
            connected_port_name: None,
            available_ports: Vec::new(),
        }
    }

    /// Refresh the list of available MIDI input ports
    pub fn refresh_ports(&mut self) {
        self.available_ports.clear();

        if let Some(ref midi_in) = self.midi_in {
            for (index, port) in midi_in.ports().iter().enumerate() {
                if let Ok(name) = midi_in.port_name(port) {
                    self.available_ports.push(MidiPortInfo { index, name });
                }
            }
        }
    }

    pub fn list_ports(&self) -> &[MidiPortInfo] {
        &self.available_ports
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connected_port_name(&self) -> Option<&str> {
        self.connected_port_name.as_deref()
    }

    /// Connect to a MIDI input port by index
    pub fn connect(&mut self, port_index: usize) -> Result<(), String> {
        self.disconnect();

        // midir consumes the MidiInput on connect, so use a fresh one.
        let midi_in = MidiInput::new("keyglow").map_err(|e| e.to_string())?;
        let ports = midi_in.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| format!("Invalid port index: {}", port_index))?;
        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                port,
                "keyglow-input",
                move |timestamp, message, _| {
                    if let Some(kind) = parse_midi_message(message) {
                        let _ = tx.send(MidiEvent {
                            timestamp_us: timestamp,
                            kind,
                        });
                    }
                },
                (),
            )
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "connected to {}", port_name);
        self.connection = Some(connection);
        self.event_receiver = Some(rx);
        self.connected_port_name = Some(port_name);
        self.midi_in = MidiInput::new("keyglow").ok();
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
            log::info!(target: "midi", "disconnected");
        }
        self.event_receiver = None;
        self.connected_port_name = None;
    }

    /// Drain pending events (non-blocking)
    pub fn poll_events(&self) -> Vec<MidiEvent> {
        match &self.event_receiver {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl Default for MidiInputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Parse raw MIDI bytes into a note event. Note-on with velocity 0 is a note-off.
pub fn parse_midi_message(data: &[u8]) -> Option<MidiEventKind> {
    let (&status, rest) = data.split_first()?;
    let channel = status & 0x0F;

    match (status & 0xF0, rest) {
        (0x80, [note, _, ..]) => Some(MidiEventKind::NoteOff {
            channel,
            note: *note,
        }),
        (0x90, [note, 0, ..]) => Some(MidiEventKind::NoteOff {
            channel,
            note: *note,
        }),
        (0x90, [note, velocity, ..]) => Some(MidiEventKind::NoteOn {
            channel,
            note: *note,
            velocity: *velocity,
        }),
        _ => None,
    }
}
