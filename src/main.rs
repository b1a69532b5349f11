use clap::Parser;
use tracing_subscriber::EnvFilter;

use nextion_stepper::config::{
    DISPLAY_BAUDRATE, DISPLAY_PORT, MAX_SPEED, MICROSTEP_MULTIPLIER, MotorConfig, RuntimeConfig,
};

/// Drive a stepper motor from Nextion display commands
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial port the display is connected to
    #[arg(short, long, default_value = DISPLAY_PORT)]
    port: String,

    /// Display link baud rate
    #[arg(short, long, default_value_t = DISPLAY_BAUDRATE)]
    baud: u32,

    /// Microstep multiplier configured on the driver
    #[arg(long, default_value_t = MICROSTEP_MULTIPLIER)]
    microsteps: u32,

    /// Speed cap in steps/second
    #[arg(long, default_value_t = MAX_SPEED)]
    max_speed: f32,

    /// Accept commands and publish state over zenoh
    #[arg(long)]
    zenoh: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let config = RuntimeConfig {
        display_port: args.port,
        display_baudrate: args.baud,
        motor: MotorConfig {
            microstep_multiplier: args.microsteps,
            max_speed: args.max_speed,
            ..MotorConfig::default()
        },
        zenoh: args.zenoh,
    };

    if let Err(e) = nextion_stepper::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
