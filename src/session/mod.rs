//! Video session controller
//!
//! An [`AirPlaySession`] hands one video to one receiver and controls it
//! until it stops. The lifecycle runs
//! `Idle -> TargetSet -> Starting -> Streaming <-> Paused -> Stopped`, where
//! `Stopped` can be reached from anywhere and is final. A new video on the
//! same receiver takes a new session.
//!
//! `start` returns as soon as the session is underway; connecting, handing
//! over the media and polling the receiver happen on a background task.
//! Anything that goes wrong there ends the session with a single
//! [`SessionEvent::Stopped`] carrying the error.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use airplay_video::media::StaticVideo;
//! use airplay_video::{AirPlaySession, DeviceRegistry, SessionEvent};
//!
//! # async fn example() -> Result<(), airplay_video::AirPlayError> {
//! let registry = DeviceRegistry::new();
//! let devices = airplay_video::scan(std::time::Duration::from_secs(3)).await?;
//! let Some(device) = devices.into_iter().next() else { return Ok(()) };
//!
//! let video = Arc::new(StaticVideo::new("http://192.168.1.10:8000/movie.mp4"));
//! let session = AirPlaySession::new(registry, video);
//! let mut events = session.subscribe();
//!
//! session.set_target_device(device).await?;
//! session.start().await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::Stopped { error } = event {
//!         println!("stopped: {error:?}");
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod driver;
pub mod events;
mod shared;

pub use events::{EventBus, SessionEvent, SessionObserver};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use self::driver::Driver;
use self::shared::Shared;
use crate::connection::{Connector, TcpConnector};
use crate::error::AirPlayError;
use crate::media::VideoManager;
use crate::protocol::video::VideoRequests;
use crate::registry::{DeviceRegistry, TargetHandle};
use crate::types::{AirPlayConfig, AirPlayDevice, PlaybackSnapshot, SessionState};


/// Controller for one video handed to one receiver
pub struct AirPlaySession {
    shared: Arc<Shared>,
    config: AirPlayConfig,
    registry: DeviceRegistry,
    connector: Arc<dyn Connector>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AirPlaySession {
    /// Create a session with the default configuration
    #[must_use]
    pub fn new(registry: DeviceRegistry, video: Arc<dyn VideoManager>) -> Self {
        Self::with_config(AirPlayConfig::default(), registry, video)
    }

    /// Create a session with a custom configuration
    #[must_use]
    pub fn with_config(
        config: AirPlayConfig,
        registry: DeviceRegistry,
        video: Arc<dyn VideoManager>,
    ) -> Self {
        let session_id = Uuid::new_v4().to_string().to_uppercase();
        let requests = VideoRequests::new(session_id, config.user_agent.clone());
        let shared = Arc::new(Shared::new(requests, video, config.event_capacity));

        Self {
            shared,
            config,
            registry,
            connector: Arc::new(TcpConnector),
            task: Mutex::new(None),
        }
    }

    /// Use a different way of reaching receivers
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Id sent as `X-Apple-Session-ID` on every request
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.shared.requests.session_id()
    }

    /// Registry targets are resolved in
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &AirPlayConfig {
        &self.config
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Current state with the last reported playback values
    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.snapshot()
    }

    /// Target the session will start against
    #[must_use]
    pub fn target(&self) -> Option<TargetHandle> {
        self.shared.target()
    }

    /// Subscribe to session events
    ///
    /// Events emitted before subscribing are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Forward events to a delegate-style observer
    pub fn observe(&self, observer: Arc<dyn SessionObserver>) -> JoinHandle<()> {
        events::observe(self.subscribe(), observer)
    }

    /// Choose the receiver to play on
    ///
    /// The handle is resolved when the session starts, so a device removed
    /// from the registry in between fails the start with `DeviceNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` once the session has started or stopped.
    pub fn set_target(&self, handle: TargetHandle) -> Result<(), AirPlayError> {
        self.shared.set_target(handle)?;
        tracing::debug!("Session {} targets {handle}", self.session_id());
        Ok(())
    }

    /// Register `device` and target it
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` once the session has started or stopped.
    pub async fn set_target_device(&self, device: AirPlayDevice) -> Result<TargetHandle, AirPlayError> {
        let state = self.state();
        if state.has_started() {
            return Err(AirPlayError::InvalidState {
                message: "target cannot change once started".to_string(),
                current_state: state.to_string(),
            });
        }
        let handle = self.registry.insert(device).await;
        self.set_target(handle)?;
        Ok(handle)
    }

    /// Start playing on the target
    ///
    /// Returns once the session is underway. Failures past this point end
    /// the session with `Stopped(Some(error))`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no target is set or the session has
    /// already been started.
    pub async fn start(&self) -> Result<(), AirPlayError> {
        let target = self.shared.begin()?;
        let driver = Driver {
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
            registry: self.registry.clone(),
            connector: Arc::clone(&self.connector),
        };
        let task = tokio::spawn(driver.run(target));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Pause if playing, resume if paused
    ///
    /// Returns the new paused state. Every successful call emits exactly one
    /// `PausedChanged`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` before the receiver is playing. If the
    /// receiver cannot be reached the session stops with that error and
    /// `SessionTerminated` is returned.
    pub async fn toggle_paused(&self) -> Result<bool, AirPlayError> {
        self.shared.ensure_active("toggle pause")?;

        let mut transport = self.shared.transport.lock().await;
        // Read under the connection lock; the poller may have changed it
        let paused = !self.shared.ensure_active("toggle pause")?;
        let Some(connection) = transport.as_mut() else {
            return Err(terminated());
        };

        let rate = if paused { 0.0 } else { 1.0 };
        if let Err(e) = connection.send(self.shared.requests.rate(rate)).await {
            drop(transport);
            return Err(self.shared.fail(e).await);
        }
        if !self.shared.set_paused(paused) {
            return Err(terminated());
        }
        drop(transport);

        tracing::debug!("Session {} paused: {paused}", self.session_id());
        self.shared.video.paused_changed(paused).await;
        Ok(paused)
    }

    /// Jump to `position` seconds
    ///
    /// # Errors
    ///
    /// Returns `SeekOutOfRange` for negative positions or positions past a
    /// known duration, otherwise fails like [`toggle_paused`](Self::toggle_paused).
    pub async fn seek(&self, position: f64) -> Result<(), AirPlayError> {
        self.shared.ensure_active("seek")?;
        let duration = self.shared.duration();
        if !position.is_finite() || position < 0.0 || duration.is_some_and(|d| position > d) {
            return Err(AirPlayError::SeekOutOfRange { position, duration });
        }

        let mut transport = self.shared.transport.lock().await;
        self.shared.ensure_active("seek")?;
        let Some(connection) = transport.as_mut() else {
            return Err(terminated());
        };
        if let Err(e) = connection.send(self.shared.requests.scrub(position)).await {
            drop(transport);
            return Err(self.shared.fail(e).await);
        }
        Ok(())
    }

    /// End the session
    ///
    /// Safe to call in any state and any number of times. The receiver is
    /// sent `POST /stop` if the media was handed over; a failure there is
    /// only logged. The video manager hears about it only if `start` ran.
    pub async fn stop(&self) {
        let left = self.shared.finish(None);
        self.shared.cancel.cancel();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!("Session task ended abnormally: {e}");
            }
        }

        if let Some(previous) = left {
            self.shared.release(true).await;
            if previous.has_started() {
                self.shared.video.playback_stopped().await;
            }
        }
    }
}

impl Drop for AirPlaySession {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
        if self.shared.finish(None).is_some() {
            tracing::debug!("Session {} dropped while running", self.session_id());
        }
    }
}

impl fmt::Debug for AirPlaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirPlaySession")
            .field("session_id", &self.session_id())
            .field("state", &self.state())
            .field("target", &self.target())
            .finish_non_exhaustive()
    }
}

fn terminated() -> AirPlayError {
    AirPlayError::SessionTerminated {
        reason: "session stopped".to_string(),
    }
}
