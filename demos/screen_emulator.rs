// Screen emulator: stands in for the Nextion display and sends 3-byte commands
//
// Up/Down = speed +-0.1 RPS, Left/Right = turns -+1 (0 = continuous),
// R/L = send clockwise/counter-clockwise, S = send stop, Q = quit
//
// Usage: cargo run --example screen_emulator -- --port /dev/ttyUSB1
//        cargo run --example screen_emulator -- --zenoh
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use nextion_stepper::config::{DISPLAY_BAUDRATE, TOPIC_CMD};
use nextion_stepper::messages::ScreenCommand;
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
struct Args {
    /// Serial port wired to the controller's display input
    #[arg(short, long)]
    port: Option<String>,

    /// Publish packets on the zenoh command topic instead
    #[arg(long)]
    zenoh: bool,
}

enum Link {
    Serial(Box<dyn SerialPort>),
    Zenoh(zenoh::pubsub::Publisher<'static>),
}

impl Link {
    async fn send(&mut self, packet: [u8; 3]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self {
            Link::Serial(port) => {
                port.write_all(&packet)?;
                port.flush()?;
            }
            Link::Zenoh(publisher) => publisher.put(packet.to_vec()).await?,
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    // Keep the session alive for as long as the publisher is used
    let mut _session = None;
    let mut link = match (args.port, args.zenoh) {
        (_, true) => {
            info!("Opening Zenoh session...");
            let session = zenoh::open(zenoh::Config::default()).await?;
            let publisher = session.declare_publisher(TOPIC_CMD).await?;
            _session = Some(session);
            Link::Zenoh(publisher)
        }
        (Some(port), false) => {
            info!("Opening {} at {} baud", port, DISPLAY_BAUDRATE);
            let port = serialport::new(port, DISPLAY_BAUDRATE)
                .timeout(Duration::from_millis(100))
                .open()?;
            Link::Serial(port)
        }
        (None, false) => return Err("pass --port <PORT> or --zenoh".into()),
    };

    info!("Controls: Up/Down=speed, Left/Right=turns, R/L=run, S=stop, Q=quit");

    enable_raw_mode()?;
    let result = run_screen(&mut link).await;
    disable_raw_mode()?;

    result
}

async fn run_screen(link: &mut Link) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Raw values as the display would hold them
    let mut speed: u8 = 10;
    let mut turns: u8 = 0;

    loop {
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        let dir = match code {
            KeyCode::Up => {
                speed = speed.saturating_add(1);
                print_settings(speed, turns);
                continue;
            }
            KeyCode::Down => {
                speed = speed.saturating_sub(1);
                print_settings(speed, turns);
                continue;
            }
            KeyCode::Right => {
                turns = turns.saturating_add(1);
                print_settings(speed, turns);
                continue;
            }
            KeyCode::Left => {
                turns = turns.saturating_sub(1);
                print_settings(speed, turns);
                continue;
            }
            KeyCode::Char('r') => b'R',
            KeyCode::Char('l') => b'L',
            KeyCode::Char('s') => b'S',
            KeyCode::Char('q') | KeyCode::Esc => break,
            _ => continue,
        };

        let packet = [speed, turns, dir];
        link.send(packet).await?;
        info!("Sent {}", ScreenCommand::from_packet(&packet));
    }

    Ok(())
}

fn print_settings(speed: u8, turns: u8) {
    let mode = if turns == 0 { "continuous" } else { "fixed" };
    info!(
        "Speed: {:.1} RPS, Turns: {} ({})",
        f32::from(speed) / 10.0,
        turns,
        mode
    );
}
