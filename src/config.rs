// Serial link, motor geometry and runtime configuration
use std::time::Duration;

// Display link (Nextion screen -> controller)
pub const DISPLAY_PORT: &str = "/dev/ttyUSB0";
pub const DISPLAY_BAUDRATE: u32 = 9600;
pub const DISPLAY_TIMEOUT: Duration = Duration::from_millis(10);

// Nema 17: 200 full steps per revolution
pub const FULL_STEPS_PER_REV: u32 = 200;

// 1/16 microstepping on the DRV8825, change to match the driver's MS pins
pub const MICROSTEP_MULTIPLIER: u32 = 16;

// Steps/second cap handed to the stepping engine
pub const MAX_SPEED: f32 = 16000.0;

// Zenoh topics
pub const TOPIC_CMD: &str = "stepper/cmd"; // raw 3-byte command packets
pub const TOPIC_STATE: &str = "stepper/state"; // MotorState snapshots (JSON)

// State publishing rate when zenoh is enabled
pub const TELEMETRY_HZ: u64 = 10;

/// Motor geometry and speed limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    pub full_steps_per_rev: u32,
    pub microstep_multiplier: u32,
    pub max_speed: f32,
}

impl MotorConfig {
    /// Total (micro)steps per revolution
    pub fn steps_per_revolution(&self) -> u32 {
        self.full_steps_per_rev * self.microstep_multiplier
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            full_steps_per_rev: FULL_STEPS_PER_REV,
            microstep_multiplier: MICROSTEP_MULTIPLIER,
            max_speed: MAX_SPEED,
        }
    }
}

/// Everything `runtime::run` needs to start
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub display_port: String,
    pub display_baudrate: u32,
    pub motor: MotorConfig,
    pub zenoh: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            display_port: DISPLAY_PORT.to_string(),
            display_baudrate: DISPLAY_BAUDRATE,
            motor: MotorConfig::default(),
            zenoh: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_steps_per_revolution() {
        assert_eq!(MotorConfig::default().steps_per_revolution(), 3200);
    }

    #[test]
    fn test_custom_microstepping() {
        let motor = MotorConfig {
            microstep_multiplier: 8,
            ..MotorConfig::default()
        };
        assert_eq!(motor.steps_per_revolution(), 1600);
    }
}
