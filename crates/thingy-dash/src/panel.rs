//! Presentation state for one sensor card.
//!
//! A [`SensorPanel`] owns a [`BleSession`] configured for one sensor and a
//! display model (chart or gauge). BLE work runs on a tokio runtime; results
//! come back over a channel that the UI drains once per frame with
//! [`SensorPanel::poll`], so no panel method ever blocks.
//!
//! ```text
//! Idle --init--> Streaming --reading--> Streaming
//!                    |
//!                    +--stream error--> Error --> Terminated
//! Idle/Streaming --disconnect/destroy--> Terminated
//! ```
//!
//! Terminated is absorbing; the dashboard replaces the panel to reconnect.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;

use futures::StreamExt;
use thingy_core::{BleBackend, BleSession, ReadingStream, Subscription};
use thingy_types::{Reading, SensorKind};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chart::{GAUGE_TOTAL, PieGauge, TimeSeriesChart};

/// Called from worker tasks whenever the panel has something new to show.
pub type RepaintHook = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Configured, not yet streaming.
    Idle,
    /// Listening for notifications.
    Streaming,
    /// A stream error is being handled. Transient.
    Error,
    /// Torn down. All operations are no-ops.
    Terminated,
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PanelState::Idle => "Idle",
            PanelState::Streaming => "Streaming",
            PanelState::Error => "Error",
            PanelState::Terminated => "Terminated",
        };
        write!(f, "{}", s)
    }
}

/// What a panel renders.
#[derive(Debug, Clone)]
pub enum PanelDisplay {
    /// Rolling time series (temperature).
    Chart(TimeSeriesChart),
    /// Single-value pie gauge (rotary).
    Gauge(PieGauge),
}

impl PanelDisplay {
    fn for_kind(kind: SensorKind, chart_window: std::time::Duration) -> Self {
        match kind {
            SensorKind::Temperature => PanelDisplay::Chart(TimeSeriesChart::new(chart_window)),
            SensorKind::Rotary => PanelDisplay::Gauge(PieGauge::new(GAUGE_TOTAL, kind.label())),
        }
    }

    fn apply(&mut self, reading: Reading) {
        match self {
            PanelDisplay::Chart(chart) => {
                chart.append(reading);
                chart.start();
            }
            PanelDisplay::Gauge(gauge) => gauge.set(reading.value),
        }
    }

    fn stop(&mut self) {
        if let PanelDisplay::Chart(chart) = self {
            chart.stop();
        }
    }

    fn clear(&mut self) {
        match self {
            PanelDisplay::Chart(chart) => {
                chart.stop();
                chart.clear();
            }
            PanelDisplay::Gauge(gauge) => gauge.clear(),
        }
    }
}

#[derive(Debug)]
enum PanelEvent {
    Connected(Option<String>),
    Reading(Reading),
    ReadDone(u64, Reading),
    StreamFailed(String),
    ReadFailed(u64, String),
}

/// Sending half handed to worker tasks.
#[derive(Clone)]
struct EventSink {
    tx: mpsc::Sender<PanelEvent>,
    repaint: Option<RepaintHook>,
}

impl EventSink {
    /// Returns false once the panel is gone.
    fn send(&self, event: PanelEvent) -> bool {
        if self.tx.send(event).is_err() {
            return false;
        }
        if let Some(repaint) = &self.repaint {
            repaint();
        }
        true
    }
}

/// A one-shot read in flight, tagged so late results can be told apart.
#[derive(Debug)]
struct PendingRead {
    id: u64,
    token: CancellationToken,
}

/// One dashboard card bound to one sensor.
pub struct SensorPanel {
    kind: SensorKind,
    session: BleSession,
    runtime: Handle,
    state: PanelState,
    display: PanelDisplay,
    sink: EventSink,
    events: mpsc::Receiver<PanelEvent>,
    stream: Option<Subscription>,
    pending_read: Option<PendingRead>,
    next_read: u64,
    banner: Option<String>,
    device_name: Option<String>,
}

impl fmt::Debug for SensorPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorPanel")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("banner", &self.banner)
            .field("device_name", &self.device_name)
            .finish_non_exhaustive()
    }
}

impl SensorPanel {
    /// Build a panel with its own session on `backend`.
    ///
    /// The session is configured here; nothing touches the radio until
    /// [`init`](Self::init) or [`request_value`](Self::request_value).
    pub fn new(
        kind: SensorKind,
        backend: Arc<dyn BleBackend>,
        runtime: Handle,
        chart_window: std::time::Duration,
    ) -> Self {
        let session = BleSession::new(backend);
        session.configure(kind.descriptor());
        let (tx, events) = mpsc::channel();

        Self {
            kind,
            session,
            runtime,
            state: PanelState::Idle,
            display: PanelDisplay::for_kind(kind, chart_window),
            sink: EventSink { tx, repaint: None },
            events,
            stream: None,
            pending_read: None,
            next_read: 0,
            banner: None,
            device_name: None,
        }
    }

    /// Install a hook that wakes the UI when new events arrive.
    pub fn with_repaint(mut self, repaint: RepaintHook) -> Self {
        self.sink.repaint = Some(repaint);
        self
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn display(&self) -> &PanelDisplay {
        &self.display
    }

    /// Error message waiting to be shown, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Hide the banner ("Close").
    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Name of the connected peripheral, once known.
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// The session behind this panel.
    pub fn session(&self) -> &BleSession {
        &self.session
    }

    pub fn is_terminated(&self) -> bool {
        self.state == PanelState::Terminated
    }

    /// Whether a one-shot read is in flight.
    pub fn is_reading(&self) -> bool {
        self.pending_read.is_some()
    }

    /// Subscribe to the live stream.
    pub fn init(&mut self) {
        if self.state != PanelState::Idle {
            debug!(sensor = %self.kind, state = %self.state, "init() ignored");
            return;
        }

        let stream = {
            let _guard = self.runtime.enter();
            self.session.stream()
        };
        self.stream = Some(stream.subscription());
        self.transition(PanelState::Streaming);

        self.runtime
            .spawn(forward_stream(self.session.clone(), stream, self.sink.clone()));
    }

    /// Read the characteristic once and show the result.
    ///
    /// Releases any read still in flight first.
    pub fn request_value(&mut self) {
        if self.state == PanelState::Terminated {
            return;
        }
        if let Some(previous) = self.pending_read.take() {
            previous.token.cancel();
        }

        let id = self.next_read;
        self.next_read += 1;
        let token = CancellationToken::new();
        self.pending_read = Some(PendingRead {
            id,
            token: token.clone(),
        });

        let session = self.session.clone();
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            match token.run_until_cancelled(session.read_once()).await {
                Some(Ok(reading)) => {
                    sink.send(PanelEvent::ReadDone(id, reading));
                }
                Some(Err(e)) => {
                    sink.send(PanelEvent::ReadFailed(id, e.to_string()));
                }
                None => debug!("One-shot read released"),
            }
        });
    }

    /// Release everything and close the link.
    pub fn disconnect(&mut self) {
        if self.terminate() {
            info!(sensor = %self.kind, "Disconnecting");
        }
    }

    /// Tear down without user interaction (window closing, panel replaced).
    pub fn destroy(&mut self) {
        if self.terminate() {
            debug!(sensor = %self.kind, "Panel destroyed");
        }
    }

    /// Apply every queued event. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            changed |= self.handle(event);
        }
        changed
    }

    fn handle(&mut self, event: PanelEvent) -> bool {
        match event {
            PanelEvent::Connected(name) if self.state == PanelState::Streaming => {
                self.device_name = name;
                true
            }
            PanelEvent::Reading(reading) if self.state == PanelState::Streaming => {
                self.display.apply(reading);
                true
            }
            PanelEvent::ReadDone(id, reading) if self.is_current_read(id) => {
                self.pending_read = None;
                self.display.apply(reading);
                true
            }
            PanelEvent::ReadFailed(id, message) if self.is_current_read(id) => {
                self.pending_read = None;
                warn!(sensor = %self.kind, "Read failed: {}", message);
                self.banner = Some(message);
                true
            }
            PanelEvent::StreamFailed(message) if self.state == PanelState::Streaming => {
                self.fail(message);
                true
            }
            other => {
                debug!(sensor = %self.kind, state = %self.state, ?other, "Dropping late event");
                false
            }
        }
    }

    /// Results of superseded or released reads are dropped.
    fn is_current_read(&self, id: u64) -> bool {
        self.state != PanelState::Terminated
            && self.pending_read.as_ref().is_some_and(|read| read.id == id)
    }

    fn fail(&mut self, message: String) {
        warn!(sensor = %self.kind, "Stream failed: {}", message);
        self.transition(PanelState::Error);
        self.banner = Some(message);
        if let Some(subscription) = self.stream.take() {
            subscription.unsubscribe();
        }
        if let Some(read) = self.pending_read.take() {
            read.token.cancel();
        }
        self.display.stop();
        self.transition(PanelState::Terminated);
        self.release_session();
    }

    /// Returns false if the panel was already terminated.
    fn terminate(&mut self) -> bool {
        if self.state == PanelState::Terminated {
            return false;
        }
        if let Some(subscription) = self.stream.take() {
            subscription.unsubscribe();
        }
        if let Some(read) = self.pending_read.take() {
            read.token.cancel();
        }
        self.display.clear();
        self.transition(PanelState::Terminated);
        self.release_session();
        true
    }

    /// Close the link in the background.
    fn release_session(&self) {
        let session = self.session.clone();
        let kind = self.kind;
        self.runtime.spawn(async move {
            if let Err(e) = session.disconnect().await {
                warn!(sensor = %kind, "Disconnect failed: {}", e);
            }
        });
    }

    fn transition(&mut self, to: PanelState) {
        debug!(sensor = %self.kind, from = %self.state, to = %to, "Panel state");
        self.state = to;
    }
}

impl Drop for SensorPanel {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn forward_stream(session: BleSession, mut stream: ReadingStream, sink: EventSink) {
    match session.ensure_connected().await {
        Ok(link) => {
            sink.send(PanelEvent::Connected(link.name().map(str::to_string)));
        }
        Err(e) => {
            if !stream.is_cancelled() {
                sink.send(PanelEvent::StreamFailed(e.to_string()));
            }
            return;
        }
    }

    while let Some(item) = stream.next().await {
        match item {
            Ok(reading) => {
                if !sink.send(PanelEvent::Reading(reading)) {
                    break;
                }
            }
            Err(e) => {
                sink.send(PanelEvent::StreamFailed(e.to_string()));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use thingy_core::{GATT_DISCONNECTED, MockBackend, MockFailure};
    use thingy_types::uuids::{ROTARY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC};

    const WINDOW: Duration = Duration::from_secs(30);

    fn panel(kind: SensorKind) -> (Arc<MockBackend>, SensorPanel) {
        let backend = Arc::new(MockBackend::new("Thingy"));
        let panel = SensorPanel::new(kind, backend.clone(), Handle::current(), WINDOW);
        (backend, panel)
    }

    /// Poll until `done` holds, yielding to the runtime in between.
    async fn poll_until(panel: &mut SensorPanel, done: impl Fn(&SensorPanel) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                panel.poll();
                if done(panel) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("panel did not settle");
    }

    fn chart(panel: &SensorPanel) -> &TimeSeriesChart {
        match panel.display() {
            PanelDisplay::Chart(chart) => chart,
            PanelDisplay::Gauge(_) => panic!("expected chart"),
        }
    }

    fn gauge(panel: &SensorPanel) -> &PieGauge {
        match panel.display() {
            PanelDisplay::Gauge(gauge) => gauge,
            PanelDisplay::Chart(_) => panic!("expected gauge"),
        }
    }

    #[tokio::test]
    async fn test_new_panel_is_idle() {
        let (backend, panel) = panel(SensorKind::Temperature);
        assert_eq!(panel.state(), PanelState::Idle);
        assert!(panel.banner().is_none());
        assert!(chart(&panel).is_empty());
        assert_eq!(backend.connect_count(), 0);
        assert!(panel.session().descriptor().is_some());
    }

    #[tokio::test]
    async fn test_temperature_reading_lands_on_chart() {
        let (backend, mut panel) = panel(SensorKind::Temperature);
        let link = backend.link();

        panel.init();
        assert_eq!(panel.state(), PanelState::Streaming);
        link.wait_for_listeners(TEMPERATURE_CHARACTERISTIC, 1).await;

        link.notify(TEMPERATURE_CHARACTERISTIC, vec![0x64, 0x00]);
        poll_until(&mut panel, |p| !chart(p).is_empty()).await;

        let chart = chart(&panel);
        assert_eq!(chart.latest().map(|r| r.value), Some(100.0));
        assert!(chart.is_running());
        assert_eq!(panel.device_name(), Some("Thingy"));
    }

    #[tokio::test]
    async fn test_rotary_reading_replaces_gauge_value() {
        let (backend, mut panel) = panel(SensorKind::Rotary);
        let link = backend.link();

        panel.init();
        link.wait_for_listeners(ROTARY_CHARACTERISTIC, 1).await;

        link.notify(ROTARY_CHARACTERISTIC, vec![0x2D, 0x00]);
        poll_until(&mut panel, |p| gauge(p).value() == Some(45.0)).await;

        link.notify(ROTARY_CHARACTERISTIC, vec![0xB4, 0x00]);
        poll_until(&mut panel, |p| gauge(p).value() == Some(180.0)).await;
        assert_eq!(gauge(&panel).total(), 360.0);
        assert_eq!(gauge(&panel).label(), "Degree");
    }

    #[tokio::test]
    async fn test_gatt_disconnect_raises_banner_and_terminates() {
        let (backend, mut panel) = panel(SensorKind::Temperature);
        let link = backend.link();

        panel.init();
        link.wait_for_listeners(TEMPERATURE_CHARACTERISTIC, 1).await;
        link.notify(TEMPERATURE_CHARACTERISTIC, vec![0x01, 0x00]);
        poll_until(&mut panel, |p| chart(p).len() == 1).await;

        link.drop_connection(GATT_DISCONNECTED);
        poll_until(&mut panel, SensorPanel::is_terminated).await;

        assert_eq!(panel.banner(), Some("GATT Server disconnected"));
        // Stopped, but the points stay on screen.
        assert!(!chart(&panel).is_running());
        assert_eq!(chart(&panel).len(), 1);

        // No further chart updates.
        link.notify(TEMPERATURE_CHARACTERISTIC, vec![0x02, 0x00]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        panel.poll();
        assert_eq!(chart(&panel).len(), 1);

        panel.dismiss_banner();
        assert!(panel.banner().is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_terminates_with_banner() {
        let (backend, mut panel) = panel(SensorKind::Rotary);
        backend.set_failure(Some(MockFailure::PermissionDenied));

        panel.init();
        poll_until(&mut panel, SensorPanel::is_terminated).await;
        assert_eq!(panel.banner(), Some("Bluetooth permission denied"));
    }

    #[tokio::test]
    async fn test_disconnect_clears_and_is_absorbing() {
        let (backend, mut panel) = panel(SensorKind::Temperature);
        let link = backend.link();

        panel.init();
        link.wait_for_listeners(TEMPERATURE_CHARACTERISTIC, 1).await;
        link.notify(TEMPERATURE_CHARACTERISTIC, vec![0x10, 0x00]);
        poll_until(&mut panel, |p| !chart(p).is_empty()).await;

        panel.disconnect();
        assert!(panel.is_terminated());
        assert!(chart(&panel).is_empty());
        assert!(!chart(&panel).is_running());

        // Terminated is absorbing.
        panel.init();
        panel.request_value();
        panel.disconnect();
        assert!(panel.is_terminated());
        assert!(!panel.is_reading());

        tokio::time::timeout(Duration::from_secs(5), async {
            while link.is_connected_sync() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_before_init() {
        let (backend, mut panel) = panel(SensorKind::Rotary);
        panel.disconnect();
        assert!(panel.is_terminated());
        assert_eq!(backend.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_request_value_applies_result() {
        let (backend, mut panel) = panel(SensorKind::Rotary);
        backend.link().set_value(ROTARY_CHARACTERISTIC, vec![0x5A, 0x00]);

        panel.request_value();
        assert!(panel.is_reading());
        poll_until(&mut panel, |p| !p.is_reading()).await;

        assert_eq!(gauge(&panel).value(), Some(90.0));
        assert_eq!(panel.state(), PanelState::Idle);
    }

    #[tokio::test]
    async fn test_request_value_failure_raises_banner_only() {
        let (backend, mut panel) = panel(SensorKind::Temperature);
        backend.link().set_value(TEMPERATURE_CHARACTERISTIC, vec![0x01]);

        panel.request_value();
        poll_until(&mut panel, |p| p.banner().is_some()).await;

        assert!(panel.banner().unwrap_or_default().contains("Payload too short"));
        assert_eq!(panel.state(), PanelState::Idle);
        assert!(chart(&panel).is_empty());
    }

    #[tokio::test]
    async fn test_request_value_releases_previous_read() {
        let (backend, mut panel) = panel(SensorKind::Rotary);
        let link = backend.link();
        link.set_value(ROTARY_CHARACTERISTIC, vec![0x01, 0x00]);
        link.set_read_latency(Duration::from_millis(50));

        panel.request_value();
        panel.request_value();
        poll_until(&mut panel, |p| !p.is_reading()).await;
        assert_eq!(gauge(&panel).value(), Some(1.0));

        // Only the second read was allowed to finish.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!panel.poll());
        assert_eq!(link.read_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_read_result_keeps_newer_read_pending() {
        let (backend, mut panel) = panel(SensorKind::Rotary);
        let link = backend.link();
        link.set_value(ROTARY_CHARACTERISTIC, vec![0x0A, 0x00]);

        // First read completes before the UI gets a chance to poll.
        panel.request_value();
        tokio::time::timeout(Duration::from_secs(5), async {
            while link.read_count() < 1 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        link.set_read_latency(Duration::from_millis(200));
        link.set_value(ROTARY_CHARACTERISTIC, vec![0x14, 0x00]);
        panel.request_value();

        // The first result is stale now.
        assert!(!panel.poll());
        assert!(panel.is_reading());
        assert_eq!(gauge(&panel).value(), None);

        // A third request releases the second read.
        panel.request_value();
        poll_until(&mut panel, |p| !p.is_reading()).await;
        assert_eq!(gauge(&panel).value(), Some(20.0));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!panel.poll());
        assert_eq!(link.read_count(), 2);
    }
}
