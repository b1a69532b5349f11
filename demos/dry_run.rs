// Dry run: replays a fixed packet sequence against the simulated motor
//
// No hardware needed. Each packet is given a short run window, then the
// resulting position and pulse counts are printed.
//
// Usage: cargo run --example dry_run

use nextion_stepper::config::MotorConfig;
use nextion_stepper::motor::{AccelStepper, OperatingSystemClock, SimulatedDevice, StepperController};
use nextion_stepper::runtime::Runtime;
use nextion_stepper::screen::ScreenReceiver;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const RUN_WINDOW: Duration = Duration::from_millis(500);

const PACKETS: [[u8; 3]; 4] = [
    [36, 2, b'R'], // 3.6 RPS, 2 turns clockwise
    [10, 0, b'L'], // 1.0 RPS, continuous counter-clockwise
    [50, 5, b'X'], // stop
    [5, 1, b'L'],  // 0.5 RPS, 1 turn counter-clockwise
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let stepper = AccelStepper::new(SimulatedDevice::default(), OperatingSystemClock::new());
    let controller = StepperController::new(stepper, &MotorConfig::default());
    let mut runtime = Runtime::new(ScreenReceiver::new(VecDeque::new()), controller);

    for packet in PACKETS {
        runtime.receiver_mut().source_mut().extend(packet);

        let started = Instant::now();
        while started.elapsed() < RUN_WINDOW {
            runtime.tick()?;
        }

        let state = runtime.state();
        let pulses = runtime.controller().stepper().device();
        println!(
            "  position={} target={} continuous={} speed={} steps/s (pulses +{} -{})",
            state.current_position,
            state.target_position,
            state.continuous_mode,
            state.speed_steps_per_second,
            pulses.forward_pulses,
            pulses.backward_pulses
        );
    }

    Ok(())
}
