// Motor control module for the display-driven stepper
//
// Provides:
// - Constant-speed stepping engine (STEP/DIR pulse timing)
// - Unit conversions between display values and steps
// - High-level controller that maps display commands to run modes

pub mod accel;
mod controller;
pub mod units;

pub use accel::{AccelStepper, Device, OperatingSystemClock, SimulatedDevice, Stepper, SystemClock};
pub use controller::StepperController;
