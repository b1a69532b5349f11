// High-level stepper controller
//
// Turns display commands (speed in RPS, turns, direction) into stepping
// engine calls and picks the run mode each tick.

use tracing::{debug, info};

use super::accel::Stepper;
use super::units::{rps_to_steps_per_second, turns_to_steps};
use crate::config::MotorConfig;
use crate::messages::{Direction, MotorState};

/// Owns the stepping engine and the current run mode
pub struct StepperController<S> {
    stepper: S,
    steps_per_revolution: u32,
    continuous_mode: bool,
    speed_steps_per_second: i32,
}

impl<S: Stepper> StepperController<S> {
    /// Wrap a stepping engine, applying the speed cap from `config`
    pub fn new(mut stepper: S, config: &MotorConfig) -> Self {
        stepper.set_max_speed(config.max_speed);
        info!(
            "Stepper controller ready: {} steps/rev, max {} steps/s",
            config.steps_per_revolution(),
            config.max_speed
        );
        Self {
            stepper,
            steps_per_revolution: config.steps_per_revolution(),
            continuous_mode: false,
            speed_steps_per_second: 0,
        }
    }

    /// Apply a new command
    ///
    /// # Arguments
    /// * `speed` - Revolutions per second
    /// * `turns` - Revolutions to move, 0 = run until the next command
    /// * `direction` - 'R' turns clockwise, 'L' counter-clockwise, anything else stops
    pub fn update(&mut self, speed: f32, turns: u8, direction: Direction) {
        let Some(factor) = direction.factor() else {
            self.stop();
            return;
        };

        let steps_per_second = rps_to_steps_per_second(speed, self.steps_per_revolution);
        let signed_speed = factor.saturating_mul(steps_per_second);

        if turns == 0 {
            self.continuous_mode = true;
            self.speed_steps_per_second = signed_speed;
            self.stepper.set_speed(signed_speed as f32);
            debug!("Continuous mode at {} steps/s", signed_speed);
        } else {
            self.continuous_mode = false;
            let delta = i64::from(factor) * turns_to_steps(turns, self.steps_per_revolution);
            let target = self.stepper.current_position().saturating_add(delta);
            self.stepper.move_to(target);
            // Speed goes in after the target, the engine may reset it on move_to
            self.speed_steps_per_second = signed_speed;
            self.stepper.set_speed(signed_speed as f32);
            debug!(
                "Fixed-turn mode: {} turns to position {} at {} steps/s",
                turns, target, signed_speed
            );
        }
    }

    /// Stop immediately and drop any queued motion
    pub fn stop(&mut self) {
        self.continuous_mode = false;
        self.speed_steps_per_second = 0;
        self.stepper.stop();
        let here = self.stepper.current_position();
        self.stepper.move_to(here);
        debug!("Stopped at position {}", here);
    }

    /// Advance the motor by at most one step. Call every loop iteration.
    pub fn step(&mut self) {
        if self.continuous_mode {
            self.stepper.run_speed();
        } else {
            self.stepper.run_speed_to_position();
        }
    }

    pub fn state(&self) -> MotorState {
        MotorState {
            continuous_mode: self.continuous_mode,
            current_position: self.stepper.current_position(),
            target_position: self.stepper.target_position(),
            speed_steps_per_second: self.speed_steps_per_second,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous_mode
    }

    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    pub fn stepper(&self) -> &S {
        &self.stepper
    }
}
