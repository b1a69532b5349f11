// Nextion display reader
//
// The display runs its own menu logic and only sends finished commands:
// [speed x10, turns, direction], no header, no checksum. Framing is purely
// "wait until three bytes are buffered".

use serialport::{self, SerialPort};
use std::collections::VecDeque;
use std::io::Read;
use tracing::{debug, info};

use crate::config::DISPLAY_TIMEOUT;
use crate::messages::{PACKET_LEN, ScreenCommand, TRACE_SEPARATOR};
use crate::motor::{Stepper, StepperController};

/// Transport errors on the display link
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScreenError>;

/// A byte stream that can report how much is buffered without blocking
pub trait ByteSource {
    /// Bytes that can be read right now
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read one packet; only called once `bytes_available() >= PACKET_LEN`
    fn read_packet(&mut self, packet: &mut [u8; PACKET_LEN]) -> Result<()>;
}

impl ByteSource for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read_packet(&mut self, packet: &mut [u8; PACKET_LEN]) -> Result<()> {
        self.read_exact(packet)?;
        Ok(())
    }
}

// In-memory source, used by tests and the dry-run demo
impl ByteSource for VecDeque<u8> {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.len())
    }

    fn read_packet(&mut self, packet: &mut [u8; PACKET_LEN]) -> Result<()> {
        for (slot, byte) in packet.iter_mut().zip(self.drain(..PACKET_LEN)) {
            *slot = byte;
        }
        Ok(())
    }
}

/// Open the serial link to the display
pub fn open_display(port_name: &str, baudrate: u32) -> Result<Box<dyn SerialPort>> {
    info!("Opening display link on {} at {} baud", port_name, baudrate);
    let port = serialport::new(port_name, baudrate)
        .timeout(DISPLAY_TIMEOUT)
        .open()?;
    Ok(port)
}

/// Polls the display link and forwards complete packets to the controller
pub struct ScreenReceiver<B> {
    source: B,
}

impl<B: ByteSource> ScreenReceiver<B> {
    pub fn new(source: B) -> Self {
        Self { source }
    }

    /// Check for a complete packet and apply it
    ///
    /// Never blocks: with fewer than three bytes buffered this returns
    /// `Ok(None)` without consuming anything.
    pub fn poll<S: Stepper>(
        &mut self,
        controller: &mut StepperController<S>,
    ) -> Result<Option<ScreenCommand>> {
        if self.source.bytes_available()? < PACKET_LEN {
            return Ok(None);
        }

        let mut packet = [0u8; PACKET_LEN];
        self.source.read_packet(&mut packet)?;
        debug!("Display packet {:02X?}", packet);

        let cmd = ScreenCommand::from_packet(&packet);
        apply(&cmd, controller);
        Ok(Some(cmd))
    }

    pub fn source(&self) -> &B {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut B {
        &mut self.source
    }
}

/// Log a command and hand it to the controller
pub fn apply<S: Stepper>(cmd: &ScreenCommand, controller: &mut StepperController<S>) {
    info!("{}", cmd);
    controller.update(cmd.speed_rps, cmd.turns, cmd.direction);
    info!("{}", TRACE_SEPARATOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorConfig;
    use crate::messages::{Direction, MotorState};
    use crate::motor::accel::tests::ManualClock;
    use crate::motor::accel::{AccelStepper, SimulatedDevice};

    type SimController = StepperController<AccelStepper<SimulatedDevice, ManualClock>>;

    fn setup(bytes: &[u8]) -> (ScreenReceiver<VecDeque<u8>>, SimController) {
        let stepper = AccelStepper::new(SimulatedDevice::default(), ManualClock::default());
        let controller = StepperController::new(stepper, &MotorConfig::default());
        (ScreenReceiver::new(bytes.iter().copied().collect()), controller)
    }

    #[test]
    fn test_partial_packet_waits() {
        let (mut receiver, mut controller) = setup(&[36, 2]);
        let before = controller.state();

        assert!(receiver.poll(&mut controller).unwrap().is_none());
        assert_eq!(receiver.source().len(), 2);
        assert_eq!(controller.state(), before);

        // Third byte arrives
        receiver.source_mut().push_back(b'R');
        let cmd = receiver.poll(&mut controller).unwrap().unwrap();
        assert_eq!(cmd.turns, 2);
        assert!(receiver.source().is_empty());
    }

    #[test]
    fn test_empty_source() {
        let (mut receiver, mut controller) = setup(&[]);
        assert!(receiver.poll(&mut controller).unwrap().is_none());
        assert_eq!(controller.state(), MotorState::default());
    }

    #[test]
    fn test_fixed_turn_packet() {
        let (mut receiver, mut controller) = setup(&[36, 2, b'R']);
        let cmd = receiver.poll(&mut controller).unwrap().unwrap();

        assert_eq!(cmd.speed_rps, 3.6);
        assert_eq!(cmd.direction, Direction::Right);
        let state = controller.state();
        assert_eq!(state.target_position, 6400);
        assert!(!state.continuous_mode);
        assert!(state.speed_steps_per_second > 0);
    }

    #[test]
    fn test_continuous_packet() {
        let (mut receiver, mut controller) = setup(&[10, 0, b'L']);
        let cmd = receiver.poll(&mut controller).unwrap().unwrap();

        assert_eq!(cmd.speed_rps, 1.0);
        let state = controller.state();
        assert!(state.continuous_mode);
        assert_eq!(state.speed_steps_per_second, -3200);
    }

    #[test]
    fn test_stop_packet() {
        let (mut receiver, mut controller) = setup(&[10, 1, b'R', 50, 5, b'X']);
        receiver.poll(&mut controller).unwrap();
        assert_eq!(controller.state().target_position, 3200);

        let cmd = receiver.poll(&mut controller).unwrap().unwrap();
        assert_eq!(cmd.direction, Direction::Stop(b'X'));
        let state = controller.state();
        assert!(!state.continuous_mode);
        assert_eq!(state.target_position, state.current_position);
    }

    #[test]
    fn test_one_packet_per_poll() {
        let (mut receiver, mut controller) = setup(&[10, 0, b'R', 20, 0, b'L', 7]);

        let first = receiver.poll(&mut controller).unwrap().unwrap();
        assert_eq!(first.direction, Direction::Right);
        assert_eq!(receiver.source().len(), 4);

        let second = receiver.poll(&mut controller).unwrap().unwrap();
        assert_eq!(second.direction, Direction::Left);
        assert_eq!(controller.state().speed_steps_per_second, -6400);

        // One stray byte left over
        assert!(receiver.poll(&mut controller).unwrap().is_none());
        assert_eq!(receiver.source().len(), 1);
    }

    #[test]
    fn test_misaligned_stream_is_read_literally() {
        // A dropped speed byte shifts the frame: turns becomes speed, 'R' becomes turns
        let (mut receiver, mut controller) = setup(&[2, b'R', 36]);
        let cmd = receiver.poll(&mut controller).unwrap().unwrap();
        assert_eq!(cmd.turns, b'R');
        assert_eq!(cmd.direction, Direction::Stop(36));
        assert!(!controller.is_continuous());
    }
}
