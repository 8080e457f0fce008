//! Virtual MIDI output (through midir)
//!
//! One process-wide output port that the host sees as a MIDI source. It is
//! opened when the server starts and closed on shutdown; tools only check
//! [`MidiSink::is_open`] and send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use midir::{MidiOutput, MidiOutputConnection};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("Failed to initialize MIDI: {0}")]
    InitFailed(String),

    #[error("Virtual port could not be created: {0}")]
    ConnectionFailed(String),

    #[error("MIDI output is not open")]
    NotOpen,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid MIDI message: {0}")]
    InvalidMessage(String),
}

/// A channel-voice message. Channels are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// `value` is centered on zero, -8192..=8191.
    PitchBend { channel: u8, value: i16 },
}

impl ChannelMessage {
    /// Encode to wire bytes, rejecting out-of-range fields.
    pub fn encode(&self) -> Result<Vec<u8>, MidiError> {
        let bytes = match *self {
            ChannelMessage::NoteOn {
                channel,
                pitch,
                velocity,
            } => vec![0x90 | channel, pitch, velocity],
            ChannelMessage::NoteOff { channel, pitch } => vec![0x80 | channel, pitch, 0],
            ChannelMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | channel, controller, value],
            ChannelMessage::ProgramChange { channel, program } => vec![0xC0 | channel, program],
            ChannelMessage::PitchBend { channel, value } => {
                if !(-8192..=8191).contains(&value) {
                    return Err(MidiError::InvalidMessage(format!(
                        "pitch bend {} outside -8192..=8191",
                        value
                    )));
                }
                let centered = (value as i32 + 8192) as u16;
                vec![0xE0 | channel, (centered & 0x7F) as u8, ((centered >> 7) & 0x7F) as u8]
            }
        };
        if self.channel() > 0x0F {
            return Err(MidiError::InvalidMessage(format!(
                "channel {} outside 0..=15",
                self.channel()
            )));
        }
        validate(&bytes)?;
        Ok(bytes)
    }

    fn channel(&self) -> u8 {
        match *self {
            ChannelMessage::NoteOn { channel, .. }
            | ChannelMessage::NoteOff { channel, .. }
            | ChannelMessage::ControlChange { channel, .. }
            | ChannelMessage::ProgramChange { channel, .. }
            | ChannelMessage::PitchBend { channel, .. } => channel,
        }
    }
}

/// Accept 2-3 byte channel-voice messages only: status 0x80-0xEF followed
/// by 7-bit data bytes.
pub fn validate(bytes: &[u8]) -> Result<(), MidiError> {
    if !(2..=3).contains(&bytes.len()) {
        return Err(MidiError::InvalidMessage(format!(
            "expected 2 or 3 bytes, got {}",
            bytes.len()
        )));
    }
    if !(0x80..=0xEF).contains(&bytes[0]) {
        return Err(MidiError::InvalidMessage(format!(
            "status byte {:#04x} is not a channel-voice status",
            bytes[0]
        )));
    }
    if let Some(data) = bytes[1..].iter().find(|b| **b >= 0x80) {
        return Err(MidiError::InvalidMessage(format!(
            "data byte {:#04x} exceeds 0x7f",
            data
        )));
    }
    Ok(())
}

/// The process-wide virtual output port.
pub struct MidiSink {
    port_name: String,
    connection: Mutex<Option<MidiOutputConnection>>,
    messages_sent: AtomicU64,
}

impl MidiSink {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            connection: Mutex::new(None),
            messages_sent: AtomicU64::new(0),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_open(&self) -> bool {
        self.connection
            .lock()
            .expect("midi output mutex poisoned")
            .is_some()
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Create the virtual port. Opening an open sink does nothing.
    pub fn open(&self) -> Result<(), MidiError> {
        let mut guard = self.connection.lock().expect("midi output mutex poisoned");
        if guard.is_some() {
            return Ok(());
        }
        let midi_out =
            MidiOutput::new("stagehand").map_err(|e| MidiError::InitFailed(e.to_string()))?;
        *guard = Some(create_virtual(midi_out, &self.port_name)?);
        info!("Opened virtual MIDI output: {}", self.port_name);
        Ok(())
    }

    /// Close the virtual port. Closing a closed sink does nothing.
    pub fn close(&self) {
        let mut guard = self.connection.lock().expect("midi output mutex poisoned");
        if let Some(conn) = guard.take() {
            conn.close();
            info!("Closed virtual MIDI output: {}", self.port_name);
        }
    }

    pub fn send(&self, message: ChannelMessage) -> Result<(), MidiError> {
        let bytes = message.encode()?;
        self.send_raw(&bytes)
    }

    /// Send already-encoded bytes after validating them.
    pub fn send_raw(&self, bytes: &[u8]) -> Result<(), MidiError> {
        validate(bytes)?;
        let mut guard = self.connection.lock().expect("midi output mutex poisoned");
        let conn = guard.as_mut().ok_or(MidiError::NotOpen)?;
        conn.send(bytes)
            .map_err(|e| MidiError::SendFailed(e.to_string()))?;
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        debug!(?bytes, "sent MIDI");
        Ok(())
    }

    /// Note on, wait `duration`, note off.
    pub async fn note(&self, channel: u8, pitch: u8, velocity: u8, duration: Duration) -> Result<(), MidiError> {
        self.chord(channel, &[pitch], velocity, duration).await
    }

    /// All notes on together, then all off after `duration`.
    pub async fn chord(&self, channel: u8, pitches: &[u8], velocity: u8, duration: Duration) -> Result<(), MidiError> {
        let ons: Vec<ChannelMessage> = pitches
            .iter()
            .map(|&pitch| ChannelMessage::NoteOn {
                channel,
                pitch,
                velocity,
            })
            .collect();
        // Validate the whole chord before sounding any of it.
        for message in &ons {
            message.encode()?;
        }
        for message in ons {
            self.send(message)?;
        }
        tokio::time::sleep(duration).await;
        for &pitch in pitches {
            self.send(ChannelMessage::NoteOff { channel, pitch })?;
        }
        Ok(())
    }
}

impl Drop for MidiSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(unix)]
fn create_virtual(midi_out: MidiOutput, port_name: &str) -> Result<MidiOutputConnection, MidiError> {
    use midir::os::unix::VirtualOutput;
    midi_out
        .create_virtual(port_name)
        .map_err(|e| MidiError::ConnectionFailed(e.to_string()))
}

#[cfg(not(unix))]
fn create_virtual(_midi_out: MidiOutput, port_name: &str) -> Result<MidiOutputConnection, MidiError> {
    Err(MidiError::ConnectionFailed(format!(
        "virtual port {} needs CoreMIDI or ALSA",
        port_name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_channel_voice_messages() {
        let on = ChannelMessage::NoteOn {
            channel: 1,
            pitch: 60,
            velocity: 100,
        };
        assert_eq!(on.encode().unwrap(), vec![0x91, 60, 100]);
        assert_eq!(
            ChannelMessage::NoteOff { channel: 0, pitch: 60 }.encode().unwrap(),
            vec![0x80, 60, 0]
        );
        assert_eq!(
            ChannelMessage::ControlChange {
                channel: 15,
                controller: 7,
                value: 127
            }
            .encode()
            .unwrap(),
            vec![0xBF, 7, 127]
        );
        assert_eq!(
            ChannelMessage::ProgramChange { channel: 2, program: 5 }.encode().unwrap(),
            vec![0xC2, 5]
        );
    }

    #[test]
    fn pitch_bend_is_centered() {
        let bend = |value| ChannelMessage::PitchBend { channel: 0, value }.encode().unwrap();
        assert_eq!(bend(0), vec![0xE0, 0x00, 0x40]);
        assert_eq!(bend(-8192), vec![0xE0, 0x00, 0x00]);
        assert_eq!(bend(8191), vec![0xE0, 0x7F, 0x7F]);
        assert!(ChannelMessage::PitchBend { channel: 0, value: 8192 }.encode().is_err());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(ChannelMessage::NoteOn {
            channel: 16,
            pitch: 60,
            velocity: 1
        }
        .encode()
        .is_err());
        assert!(ChannelMessage::NoteOn {
            channel: 0,
            pitch: 128,
            velocity: 1
        }
        .encode()
        .is_err());
    }

    #[test]
    fn validation_rules() {
        assert!(validate(&[0x90, 60, 100]).is_ok());
        assert!(validate(&[0xC0, 1]).is_ok());
        assert!(validate(&[0x90]).is_err());
        assert!(validate(&[0x90, 60, 100, 0]).is_err());
        assert!(validate(&[0xF0, 1, 2]).is_err());
        assert!(validate(&[0x7F, 1, 2]).is_err());
        assert!(validate(&[0x90, 0x80, 2]).is_err());
    }

    #[test]
    fn closed_sink_refuses_to_send() {
        let sink = MidiSink::new("test");
        assert!(!sink.is_open());
        assert!(matches!(
            sink.send(ChannelMessage::ProgramChange { channel: 0, program: 1 }),
            Err(MidiError::NotOpen)
        ));
        sink.close();
        sink.close();
        assert_eq!(sink.messages_sent(), 0);
    }

    #[tokio::test]
    async fn invalid_chord_sends_nothing() {
        let sink = MidiSink::new("test");
        let err = sink
            .chord(0, &[60, 200], 100, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MidiError::InvalidMessage(_)));
    }
}
