//! The device session adapter.
//!
//! A [`BleSession`] owns at most one link to a peripheral and exposes the
//! operations the dashboard needs: configure, connect, stream, read once,
//! disconnect. It applies no timeouts and never retries.
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use thingy_core::{BleSession, BtleplugBackend};
//! use thingy_types::SensorKind;
//!
//! # async fn run() -> thingy_core::Result<()> {
//! let session = BleSession::new(Arc::new(BtleplugBackend::default()));
//! session.configure(SensorKind::Temperature.descriptor());
//!
//! let mut readings = session.stream();
//! while let Some(reading) = readings.next().await {
//!     println!("{}", reading?.value);
//! }
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use thingy_types::{Reading, SensorDescriptor};

use crate::error::{Error, Result};
use crate::streaming::ReadingStream;
use crate::traits::{BleBackend, GattLink};

/// Connection bookkeeping shared by every clone of a session.
struct Lifecycle {
    /// Set by `disconnect()`, cleared by `connect()`.
    released: bool,
    /// Parent of every live stream's token.
    streams: CancellationToken,
}

struct SessionInner {
    backend: Arc<dyn BleBackend>,
    descriptor: RwLock<Option<SensorDescriptor>>,
    /// Serialises connects so concurrent callers share one link.
    link: tokio::sync::Mutex<Option<Arc<dyn GattLink>>>,
    /// Mirrors `link.is_some()` without taking the lock.
    has_link: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

/// Session with one sensor characteristic on one peripheral.
///
/// Clones share the same link and lifecycle.
#[derive(Clone)]
pub struct BleSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for BleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleSession")
            .field("descriptor", &*self.read_descriptor())
            .field("released", &self.lifecycle().released)
            .finish_non_exhaustive()
    }
}

impl BleSession {
    /// Create an unconfigured session on top of a backend.
    pub fn new(backend: Arc<dyn BleBackend>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                descriptor: RwLock::new(None),
                link: tokio::sync::Mutex::new(None),
                has_link: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle {
                    released: false,
                    streams: CancellationToken::new(),
                }),
            }),
        }
    }

    /// Store the identifiers and decoder used by every later operation.
    ///
    /// Reconfiguring while a link is open only affects later connects and
    /// new streams; existing streams keep their descriptor.
    pub fn configure(&self, descriptor: SensorDescriptor) {
        if self.has_link() {
            warn!(sensor = %descriptor.kind(), "Reconfiguring a session with an active link");
        }
        debug!(?descriptor, "Session configured");
        *self
            .inner
            .descriptor
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(descriptor);
    }

    /// Whether a link is stored, connected or not.
    pub fn has_link(&self) -> bool {
        self.inner.has_link.load(Ordering::SeqCst)
    }

    /// The configured descriptor, if any.
    pub fn descriptor(&self) -> Option<SensorDescriptor> {
        self.read_descriptor().clone()
    }

    /// Return the current link, or establish one.
    ///
    /// Clears a previous `disconnect()` so streams and reads are allowed again.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn connect(&self) -> Result<Arc<dyn GattLink>> {
        let descriptor = self.configured()?;
        self.establish(&descriptor, true).await
    }

    /// Return the current link, connecting if needed.
    ///
    /// Unlike [`connect`](Self::connect) this respects a previous
    /// `disconnect()` and fails with [`Error::NotConnected`] instead of
    /// re-arming the session.
    pub async fn ensure_connected(&self) -> Result<Arc<dyn GattLink>> {
        let descriptor = self.configured()?;
        self.establish(&descriptor, false).await
    }

    /// Start a live stream of decoded readings.
    ///
    /// Connects lazily if needed. Each call registers its own listener, so
    /// two calls without unsubscribing yield two parallel streams that both
    /// receive every notification.
    ///
    /// Precondition failures (not configured, disconnected) arrive as the
    /// stream's terminal error.
    pub fn stream(&self) -> ReadingStream {
        // A released session hands out a live token so the NotConnected
        // error reaches the caller instead of a silent end.
        let token = {
            let lifecycle = self.lifecycle();
            if lifecycle.released {
                CancellationToken::new()
            } else {
                lifecycle.streams.child_token()
            }
        };
        let session = self.clone();

        ReadingStream::spawn(
            async move {
                let descriptor = session.configured()?;
                let link = session.establish(&descriptor, false).await?;
                Ok((link, descriptor))
            },
            token,
        )
    }

    /// Read and decode the characteristic once.
    ///
    /// Independent of any live stream.
    pub async fn read_once(&self) -> Result<Reading> {
        let descriptor = self.configured()?;
        let link = self.establish(&descriptor, false).await?;
        let payload = link.read(descriptor.characteristic()).await?;
        let value = descriptor.decode(&payload)?;
        debug!(sensor = %descriptor.kind(), value, "One-shot read");
        Ok(Reading::now(value))
    }

    /// Release the link and end every live stream.
    ///
    /// Safe to call without a prior connect; there is then nothing to release.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle();
            lifecycle.released = true;
            lifecycle.streams.cancel();
        }

        let link = {
            let mut slot = self.inner.link.lock().await;
            self.inner.has_link.store(false, Ordering::SeqCst);
            slot.take()
        };
        match link {
            Some(link) => {
                info!(name = ?link.name(), "Releasing link");
                link.disconnect().await
            }
            None => {
                debug!("disconnect() with no open link");
                Ok(())
            }
        }
    }

    /// Whether a link is open and the platform reports it connected.
    pub async fn is_connected(&self) -> bool {
        match self.inner.link.lock().await.as_ref() {
            Some(link) => link.is_connected().await,
            None => false,
        }
    }

    /// The open link, if any.
    pub async fn device(&self) -> Option<Arc<dyn GattLink>> {
        self.inner.link.lock().await.clone()
    }

    /// Hand out the stored link or open a new one.
    ///
    /// The released flag is checked under the link lock. `rearm` clears it
    /// instead of checking it.
    async fn establish(
        &self,
        descriptor: &SensorDescriptor,
        rearm: bool,
    ) -> Result<Arc<dyn GattLink>> {
        let mut slot = self.inner.link.lock().await;
        if rearm {
            self.rearm();
        } else {
            self.ensure_not_released()?;
        }

        if let Some(link) = slot.as_ref() {
            if link.is_connected().await {
                return Ok(link.clone());
            }
            debug!("Stored link is no longer connected, replacing it");
        }

        let link = self.inner.backend.connect(descriptor.service()).await?;
        info!(name = ?link.name(), address = link.address(), "Link established");
        *slot = Some(link.clone());
        self.inner.has_link.store(true, Ordering::SeqCst);
        Ok(link)
    }

    fn rearm(&self) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.released {
            lifecycle.released = false;
            lifecycle.streams = CancellationToken::new();
        }
    }

    fn configured(&self) -> Result<SensorDescriptor> {
        self.descriptor().ok_or(Error::NotConfigured)
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.lifecycle().released {
            Err(Error::NotConnected)
        } else {
            Ok(())
        }
    }

    fn read_descriptor(&self) -> std::sync::RwLockReadGuard<'_, Option<SensorDescriptor>> {
        self.inner
            .descriptor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
