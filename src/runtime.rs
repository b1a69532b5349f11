// Cooperative control loop: poll the display, step the motor, repeat
// Note: both calls run every iteration and never block. Step timing depends on
// the loop coming round far more often than the fastest step interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

// local imports
use crate::config::{RuntimeConfig, TELEMETRY_HZ, TOPIC_CMD, TOPIC_STATE};
use crate::messages::{MotorState, ScreenCommand};
use crate::motor::{AccelStepper, OperatingSystemClock, SimulatedDevice, Stepper, StepperController};
use crate::screen::{self, ByteSource, ScreenReceiver};

/// Display reader and motor controller, driven one tick at a time
pub struct Runtime<B, S> {
    receiver: ScreenReceiver<B>,
    controller: StepperController<S>,
}

impl<B: ByteSource, S: Stepper> Runtime<B, S> {
    pub fn new(receiver: ScreenReceiver<B>, controller: StepperController<S>) -> Self {
        Self {
            receiver,
            controller,
        }
    }

    /// One loop iteration: apply a display packet if one is complete, then step
    pub fn tick(&mut self) -> screen::Result<Option<ScreenCommand>> {
        let cmd = self.receiver.poll(&mut self.controller)?;
        self.controller.step();
        Ok(cmd)
    }

    /// Apply a command that arrived over zenoh instead of the display link
    pub fn on_remote_command(&mut self, payload: &[u8]) -> Option<ScreenCommand> {
        match ScreenCommand::from_payload(payload) {
            Some(cmd) => {
                screen::apply(&cmd, &mut self.controller);
                Some(cmd)
            }
            None => {
                warn!(
                    "Ignoring remote command of {} bytes (expected 3)",
                    payload.len()
                );
                None
            }
        }
    }

    pub fn state(&self) -> MotorState {
        self.controller.state()
    }

    /// Stop the motor, used on shutdown
    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn receiver_mut(&mut self) -> &mut ScreenReceiver<B> {
        &mut self.receiver
    }

    pub fn controller(&self) -> &StepperController<S> {
        &self.controller
    }
}

/// Remote command input and state output
struct ZenohLink {
    _session: zenoh::Session,
    subscriber: zenoh::pubsub::Subscriber<
        zenoh::handlers::FifoChannelHandler<zenoh::sample::Sample>,
    >,
    publisher: zenoh::pubsub::Publisher<'static>,
}

impl ZenohLink {
    async fn open() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Opening Zenoh session...");
        let session = zenoh::open(zenoh::Config::default()).await?;
        let subscriber = session.declare_subscriber(TOPIC_CMD).await?;
        let publisher = session.declare_publisher(TOPIC_STATE).await?;
        info!("Subscribed to: {}", TOPIC_CMD);
        info!("Publishing to: {}", TOPIC_STATE);
        Ok(Self {
            _session: session,
            subscriber,
            publisher,
        })
    }
}

pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let port = screen::open_display(&config.display_port, config.display_baudrate)?;
    let stepper = AccelStepper::new(SimulatedDevice::default(), OperatingSystemClock::new());
    let controller = StepperController::new(stepper, &config.motor);
    let mut runtime = Runtime::new(ScreenReceiver::new(port), controller);

    let link = if config.zenoh {
        Some(ZenohLink::open().await?)
    } else {
        None
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    let telemetry_period = Duration::from_millis(1000 / TELEMETRY_HZ);
    let mut last_publish = Instant::now();

    info!("Runtime started, waiting for display commands (Ctrl+C to quit)");

    while !shutdown.load(Ordering::Relaxed) {
        // 1. Display packet (if complete) + one motor step
        runtime.tick()?;

        if let Some(link) = &link {
            // 2. Drain remote commands (non-blocking)
            while let Ok(Some(sample)) = link.subscriber.try_recv() {
                let payload = sample.payload().to_bytes();
                runtime.on_remote_command(&payload);
            }

            // 3. Publish state
            if last_publish.elapsed() >= telemetry_period {
                let state_json = serde_json::to_string(&runtime.state())?;
                link.publisher.put(state_json).await?;
                last_publish = Instant::now();
            }
        }

        tokio::task::yield_now().await;
    }

    info!("Shutting down, stopping motor");
    runtime.stop();
    info!("Final state: {:?}", runtime.state());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorConfig;
    use crate::motor::accel::tests::ManualClock;
    use std::collections::VecDeque;

    type SimRuntime = Runtime<VecDeque<u8>, AccelStepper<SimulatedDevice, ManualClock>>;

    fn sim_runtime(bytes: &[u8]) -> (SimRuntime, ManualClock) {
        let clock = ManualClock::default();
        let stepper = AccelStepper::new(SimulatedDevice::default(), clock.clone());
        let controller = StepperController::new(stepper, &MotorConfig::default());
        let receiver = ScreenReceiver::new(bytes.iter().copied().collect());
        (Runtime::new(receiver, controller), clock)
    }

    #[test]
    fn test_tick_applies_then_steps() {
        let (mut runtime, clock) = sim_runtime(&[10, 1, b'R']);
        clock.advance(Duration::from_millis(1));

        let cmd = runtime.tick().unwrap();
        assert!(cmd.is_some());
        // The step in the same tick already moves toward the new target
        assert_eq!(runtime.state().current_position, 1);
        assert_eq!(runtime.state().target_position, 3200);
    }

    #[test]
    fn test_tick_without_packet_keeps_stepping() {
        let (mut runtime, clock) = sim_runtime(&[10, 0, b'L']);
        clock.advance(Duration::from_millis(1));
        runtime.tick().unwrap();

        for _ in 0..9 {
            clock.advance(Duration::from_millis(1));
            assert!(runtime.tick().unwrap().is_none());
        }
        assert_eq!(runtime.state().current_position, -10);
        assert!(runtime.state().continuous_mode);
    }

    #[test]
    fn test_packet_split_across_ticks() {
        let (mut runtime, _) = sim_runtime(&[36]);
        assert!(runtime.tick().unwrap().is_none());
        runtime.receiver_mut().source_mut().push_back(2);
        assert!(runtime.tick().unwrap().is_none());
        runtime.receiver_mut().source_mut().push_back(b'R');
        assert!(runtime.tick().unwrap().is_some());
        assert_eq!(runtime.state().target_position, 6400);
    }

    #[test]
    fn test_remote_command() {
        let (mut runtime, _) = sim_runtime(&[]);
        let cmd = runtime.on_remote_command(&[10, 0, b'R']).unwrap();
        assert_eq!(cmd.speed_rps, 1.0);
        assert!(runtime.state().continuous_mode);

        assert!(runtime.on_remote_command(&[1, 2]).is_none());
        assert!(runtime.state().continuous_mode);
    }

    #[test]
    fn test_stop_on_shutdown() {
        let (mut runtime, clock) = sim_runtime(&[10, 0, b'R']);
        clock.advance(Duration::from_millis(1));
        runtime.tick().unwrap();

        runtime.stop();
        let state = runtime.state();
        assert!(!state.continuous_mode);
        assert_eq!(state.target_position, state.current_position);
        assert_eq!(runtime.controller().stepper().speed(), 0.0);
    }
}
