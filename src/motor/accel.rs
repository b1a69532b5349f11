// Constant-speed stepping engine, modelled on the AccelStepper library
//
// Only the constant-speed primitives are provided: run_speed() emits at most
// one step per call when the step interval has elapsed, run_speed_to_position()
// does the same but halts at the target. No acceleration ramp is modelled, so
// stop() halts on the spot.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Something that turns step requests into pulses on the STEP/DIR pins
pub trait Device {
    /// Take one step forwards (DIR high)
    fn forward(&mut self);
    /// Take one step backwards (DIR low)
    fn backward(&mut self);
}

/// Something which records the elapsed real time
pub trait SystemClock {
    /// Time since a clock-specific reference point (e.g. startup)
    fn elapsed(&self) -> Duration;
}

impl<F> SystemClock for F
where
    F: Fn() -> Duration,
{
    fn elapsed(&self) -> Duration {
        self()
    }
}

/// Monotonic clock backed by the operating system
#[derive(Debug, Clone)]
pub struct OperatingSystemClock {
    created_at: Instant,
}

impl OperatingSystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for OperatingSystemClock {
    fn default() -> Self {
        Self {
            created_at: Instant::now(),
        }
    }
}

impl SystemClock for OperatingSystemClock {
    fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Host stand-in for a STEP/DIR driver, counts the pulses it receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedDevice {
    pub forward_pulses: u64,
    pub backward_pulses: u64,
}

impl Device for SimulatedDevice {
    fn forward(&mut self) {
        self.forward_pulses += 1;
        trace!("step +");
    }

    fn backward(&mut self) {
        self.backward_pulses += 1;
        trace!("step -");
    }
}

/// The motion primitives the controller needs from a stepping library
pub trait Stepper {
    /// Set the speed cap in steps/second (sign is ignored)
    fn set_max_speed(&mut self, steps_per_second: f32);

    /// Set the signed constant speed in steps/second, clamped to the cap
    fn set_speed(&mut self, steps_per_second: f32);

    /// The most recently set (clamped) speed
    fn speed(&self) -> f32;

    /// Set an absolute target position
    fn move_to(&mut self, position: i64);

    /// Halt as soon as possible
    fn stop(&mut self);

    /// Step at the current speed if a step is due. Returns true if it stepped.
    fn run_speed(&mut self) -> bool;

    /// Like `run_speed`, but only while the target has not been reached
    fn run_speed_to_position(&mut self) -> bool;

    fn current_position(&self) -> i64;

    fn target_position(&self) -> i64;

    /// Steps remaining until the target, signed
    fn distance_to_go(&self) -> i64 {
        self.target_position() - self.current_position()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Constant-speed stepper driver
pub struct AccelStepper<D, C> {
    device: D,
    clock: C,
    current_position: i64,
    target_position: i64,
    speed: f32,
    max_speed: f32,
    step_interval: Duration,
    last_step_time: Duration,
    rotation: Rotation,
}

impl<D: Device, C: SystemClock> AccelStepper<D, C> {
    pub fn new(device: D, clock: C) -> Self {
        Self {
            device,
            clock,
            current_position: 0,
            target_position: 0,
            speed: 0.0,
            max_speed: 1.0,
            step_interval: Duration::ZERO,
            last_step_time: Duration::ZERO,
            rotation: Rotation::Clockwise,
        }
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Time between steps at the current speed, zero when stopped
    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    /// Redefine the current position (and target) without moving
    pub fn set_current_position(&mut self, position: i64) {
        self.current_position = position;
        self.target_position = position;
        self.step_interval = Duration::ZERO;
        self.speed = 0.0;
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }

    fn step(&mut self) {
        match self.rotation {
            Rotation::Clockwise => {
                self.current_position += 1;
                self.device.forward();
            }
            Rotation::CounterClockwise => {
                self.current_position -= 1;
                self.device.backward();
            }
        }
    }
}

impl<D: Device, C: SystemClock> Stepper for AccelStepper<D, C> {
    fn set_max_speed(&mut self, steps_per_second: f32) {
        self.max_speed = steps_per_second.abs();
        debug!("Max speed set to {} steps/s", self.max_speed);
    }

    fn set_speed(&mut self, steps_per_second: f32) {
        if steps_per_second == self.speed {
            return;
        }
        let speed = steps_per_second.clamp(-self.max_speed, self.max_speed);
        if speed == 0.0 {
            self.step_interval = Duration::ZERO;
        } else {
            // Whole microseconds between steps
            let micros = (1_000_000.0 / speed.abs()) as u64;
            self.step_interval = Duration::from_micros(micros);
            self.rotation = if speed > 0.0 {
                Rotation::Clockwise
            } else {
                Rotation::CounterClockwise
            };
        }
        self.speed = speed;
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn move_to(&mut self, position: i64) {
        self.target_position = position;
    }

    fn stop(&mut self) {
        self.speed = 0.0;
        self.step_interval = Duration::ZERO;
        self.target_position = self.current_position;
    }

    fn run_speed(&mut self) -> bool {
        if self.step_interval.is_zero() {
            return false;
        }
        let now = self.clock.elapsed();
        if now.saturating_sub(self.last_step_time) >= self.step_interval {
            self.step();
            self.last_step_time = now;
            true
        } else {
            false
        }
    }

    fn run_speed_to_position(&mut self) -> bool {
        if self.target_position == self.current_position {
            return false;
        }
        self.rotation = if self.target_position > self.current_position {
            Rotation::Clockwise
        } else {
            Rotation::CounterClockwise
        };
        self.run_speed()
    }

    fn current_position(&self) -> i64 {
        self.current_position
    }

    fn target_position(&self) -> i64 {
        self.target_position
    }
}
