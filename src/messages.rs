// Message types shared by the display reader, the controller and telemetry

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::motor::units::speed_byte_to_rps;

/// Bytes in one display command packet: [speed x10, turns, direction]
pub const PACKET_LEN: usize = 3;

/// Rotation direction as sent by the display
///
/// Anything other than 'R' or 'L' is a stop request. The raw byte is kept so
/// it can be echoed in the trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    Left,
    Stop(u8),
}

impl Direction {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'R' => Direction::Right,
            b'L' => Direction::Left,
            other => Direction::Stop(other),
        }
    }

    /// +1 for 'R', -1 for 'L', None for a stop request
    pub fn factor(&self) -> Option<i32> {
        match self {
            Direction::Right => Some(1),
            Direction::Left => Some(-1),
            Direction::Stop(_) => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Direction::Right => 'R',
            Direction::Left => 'L',
            Direction::Stop(byte) => *byte as char,
        }
    }
}

/// One command from the display, decoded from a 3-byte packet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenCommand {
    /// Revolutions per second
    pub speed_rps: f32,
    /// Revolutions to turn, 0 = run continuously
    pub turns: u8,
    pub direction: Direction,
}

impl ScreenCommand {
    pub fn from_packet(packet: &[u8; PACKET_LEN]) -> Self {
        Self {
            speed_rps: speed_byte_to_rps(packet[0]),
            turns: packet[1],
            direction: Direction::from_byte(packet[2]),
        }
    }

    /// Decode a packet from an arbitrary payload, None unless it is exactly 3 bytes
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let packet: &[u8; PACKET_LEN] = payload.try_into().ok()?;
        Some(Self::from_packet(packet))
    }
}

// Same layout the display firmware printed on the debug serial port
impl fmt::Display for ScreenCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Screen - Speed = {:.2} RPS, Turns = {}, Dir = {}",
            self.speed_rps,
            self.turns,
            self.direction.as_char()
        )
    }
}

/// Separator logged after each applied command
pub const TRACE_SEPARATOR: &str = "---------------------";

/// Snapshot of the controller, published as telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MotorState {
    pub continuous_mode: bool,
    pub current_position: i64,
    pub target_position: i64,
    pub speed_steps_per_second: i32,
}
