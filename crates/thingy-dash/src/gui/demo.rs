//! Demo mode: a simulated tag that needs no Bluetooth.
//!
//! Each sensor gets its own [`MockBackend`] so one card can be disconnected
//! without affecting the other. A background task walks the values and
//! pushes them as notifications.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thingy_core::{BleBackend, MockBackend, MockLink};
use thingy_types::SensorKind;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Interval between simulated notifications.
const TICK: Duration = Duration::from_millis(500);

/// Simulated tags feeding the dashboard.
pub struct DemoFeed {
    backends: HashMap<SensorKind, Arc<MockBackend>>,
    cancel: CancellationToken,
}

impl DemoFeed {
    /// Create the simulated tags and start feeding them on `runtime`.
    pub fn start(runtime: &Handle) -> Self {
        let cancel = CancellationToken::new();
        let backends: HashMap<_, _> = SensorKind::ALL
            .iter()
            .map(|&kind| (kind, Arc::new(MockBackend::new("Thingy Demo"))))
            .collect();

        let temperature = backends[&SensorKind::Temperature].link();
        let rotary = backends[&SensorKind::Rotary].link();
        runtime.spawn(feed(temperature, rotary, cancel.clone()));
        info!("Demo feed started");

        Self { backends, cancel }
    }

    /// Backend the panel for `kind` should use.
    pub fn backend(&self, kind: SensorKind) -> Arc<dyn BleBackend> {
        match self.backends.get(&kind) {
            Some(backend) => backend.clone(),
            None => Arc::new(MockBackend::new("Thingy Demo")),
        }
    }
}

impl Drop for DemoFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn feed(temperature: Arc<MockLink>, rotary: Arc<MockLink>, cancel: CancellationToken) {
    let mut rng = StdRng::from_os_rng();
    let mut celsius: u16 = 22;
    let mut degrees: u16 = 0;

    // Seed readable values so one-shot reads work before the first tick.
    temperature.set_value(SensorKind::Temperature.characteristic(), encode(celsius));
    rotary.set_value(SensorKind::Rotary.characteristic(), encode(degrees));

    let mut ticker = tokio::time::interval(TICK);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        celsius = step_temperature(celsius, rng.random_range(-1..=1));
        degrees = step_rotary(degrees, rng.random_range(0..=20));

        temperature.notify(SensorKind::Temperature.characteristic(), encode(celsius));
        rotary.notify(SensorKind::Rotary.characteristic(), encode(degrees));
    }

    debug!("Demo feed stopped");
}

fn encode(value: u16) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Random walk bounded to a plausible room temperature.
fn step_temperature(current: u16, delta: i32) -> u16 {
    (i32::from(current) + delta).clamp(15, 35) as u16
}

/// Rotation that wraps at a full turn.
fn step_rotary(current: u16, delta: u16) -> u16 {
    (current + delta) % 360
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_temperature_stays_in_range() {
        assert_eq!(step_temperature(22, 1), 23);
        assert_eq!(step_temperature(15, -1), 15);
        assert_eq!(step_temperature(35, 1), 35);
    }

    #[test]
    fn test_step_rotary_wraps() {
        assert_eq!(step_rotary(350, 20), 10);
        assert_eq!(step_rotary(0, 0), 0);
    }

    #[test]
    fn test_encode_little_endian() {
        assert_eq!(encode(100), vec![0x64, 0x00]);
    }

    #[tokio::test]
    async fn test_feed_reaches_a_stream() {
        use futures::StreamExt;
        use thingy_core::BleSession;

        let demo = DemoFeed::start(&Handle::current());
        let session = BleSession::new(demo.backend(SensorKind::Rotary));
        session.configure(SensorKind::Rotary.descriptor());

        let mut stream = session.stream();
        let reading = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("no reading")
            .expect("stream ended")
            .unwrap();
        assert!((0.0..360.0).contains(&reading.value));
    }
}
