use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::events::{EventBus, SessionEvent};
use crate::connection::Transport;
use crate::error::AirPlayError;
use crate::media::VideoManager;
use crate::protocol::video::{PlaybackInfo, VideoRequests};
use crate::registry::TargetHandle;
use crate::types::{PlaybackSnapshot, SessionState};

/// State shared between the session handle and its background task
///
/// Every event is emitted while `inner` is locked, and `Stopped` flips the
/// state under that same lock, so nothing can be emitted after it.
pub(super) struct Shared {
    inner: Mutex<Inner>,
    pub(super) events: EventBus,
    /// Commands and polls take turns on the one connection
    pub(super) transport: tokio::sync::Mutex<Option<Box<dyn Transport>>>,
    pub(super) requests: VideoRequests,
    pub(super) cancel: CancellationToken,
    pub(super) video: Arc<dyn VideoManager>,
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    target: Option<TargetHandle>,
    paused: bool,
    position: Option<f64>,
    duration: Option<f64>,
}

/// What a `/playback-info` reply changed
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(super) struct PollUpdate {
    /// The media has played to the end
    pub finished: bool,
    /// The receiver changed its paused state on its own
    pub paused: Option<bool>,
}

impl Shared {
    pub(super) fn new(
        requests: VideoRequests,
        video: Arc<dyn VideoManager>,
        event_capacity: usize,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            events: EventBus::with_capacity(event_capacity),
            transport: tokio::sync::Mutex::new(None),
            requests,
            cancel: CancellationToken::new(),
            video,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn state(&self) -> SessionState {
        self.lock().state
    }

    pub(super) fn target(&self) -> Option<TargetHandle> {
        self.lock().target
    }

    pub(super) fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.lock();
        PlaybackSnapshot {
            state: inner.state,
            paused: inner.paused,
            position: inner.position,
            duration: inner.duration,
        }
    }

    pub(super) fn set_target(&self, handle: TargetHandle) -> Result<(), AirPlayError> {
        let mut inner = self.lock();
        if inner.state.has_started() {
            return Err(invalid_state("target cannot change once started", inner.state));
        }
        inner.target = Some(handle);
        inner.state = SessionState::TargetSet;
        Ok(())
    }

    /// Move to `Starting`, returning the target to start against
    pub(super) fn begin(&self) -> Result<TargetHandle, AirPlayError> {
        let mut inner = self.lock();
        match (inner.state, inner.target) {
            (SessionState::TargetSet, Some(target)) => {
                inner.state = SessionState::Starting;
                Ok(target)
            }
            (SessionState::Idle, _) | (SessionState::TargetSet, None) => {
                Err(invalid_state("no target set", inner.state))
            }
            (SessionState::Stopped, _) => Err(invalid_state("session has stopped", inner.state)),
            (state, _) => Err(invalid_state("session already started", state)),
        }
    }

    /// The receiver accepted the media; false if the session ended meanwhile
    pub(super) fn enter_streaming(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Starting {
            return false;
        }
        inner.state = SessionState::Streaming;
        true
    }

    /// Current paused flag, if the session accepts commands
    pub(super) fn ensure_active(&self, operation: &str) -> Result<bool, AirPlayError> {
        let inner = self.lock();
        if inner.state.is_active() {
            Ok(inner.paused)
        } else {
            Err(invalid_state(
                &format!("cannot {operation} before streaming"),
                inner.state,
            ))
        }
    }

    pub(super) fn duration(&self) -> Option<f64> {
        self.lock().duration
    }

    /// Record a confirmed paused state; false if the session has stopped
    pub(super) fn set_paused(&self, paused: bool) -> bool {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return false;
        }
        inner.paused = paused;
        if inner.state.is_active() {
            inner.state = if paused {
                SessionState::Paused
            } else {
                SessionState::Streaming
            };
        }
        self.events.emit(SessionEvent::PausedChanged { paused });
        true
    }

    /// Fold a playback-info reply into the session, emitting what changed
    ///
    /// `seen_ready` tracks whether the receiver has reported `readyToPlay`
    /// in an earlier reply; after that a reply without a duration means the
    /// media ended.
    pub(super) fn apply_playback(&self, info: &PlaybackInfo, seen_ready: &mut bool) -> PollUpdate {
        let mut update = PollUpdate::default();
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return update;
        }

        if *seen_ready && info.duration.is_none() {
            update.finished = true;
            return update;
        }
        *seen_ready |= info.ready_to_play;

        if let Some(duration) = info.duration.filter(|d| d.is_finite() && *d > 0.0) {
            if inner.duration != Some(duration) {
                inner.duration = Some(duration);
                self.events.emit(SessionEvent::DurationUpdated { duration });
            }
        }

        if let Some(position) = info.position.filter(|p| p.is_finite() && *p >= 0.0) {
            if inner.position != Some(position) {
                inner.position = Some(position);
                self.events.emit(SessionEvent::PositionUpdated { position });
            }
        }

        // Rate is meaningless while loading or stalled
        if info.ready_to_play && !info.playback_buffer_empty && inner.state.is_active() {
            if let Some(paused) = info.rate.map(|rate| rate.abs() < f64::EPSILON) {
                if paused != inner.paused {
                    inner.paused = paused;
                    inner.state = if paused {
                        SessionState::Paused
                    } else {
                        SessionState::Streaming
                    };
                    self.events.emit(SessionEvent::PausedChanged { paused });
                    update.paused = Some(paused);
                }
            }
        }

        update
    }

    /// Enter `Stopped` and announce it
    ///
    /// Returns the state the session left, or `None` if it was already stopped.
    pub(super) fn finish(&self, error: Option<Arc<AirPlayError>>) -> Option<SessionState> {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return None;
        }
        let previous = inner.state;
        inner.state = SessionState::Stopped;
        match &error {
            Some(e) => tracing::warn!(
                "Session {} failed while {previous}: {e}",
                self.requests.session_id()
            ),
            None => tracing::info!("Session {} stopped", self.requests.session_id()),
        }
        self.events.emit(SessionEvent::Stopped { error });
        Some(previous)
    }

    /// Finish the session and tear it down
    ///
    /// Only the caller that actually stopped the session releases the
    /// connection and tells the video manager.
    pub(super) async fn conclude(&self, error: Option<Arc<AirPlayError>>, send_stop: bool) -> bool {
        if self.finish(error).is_none() {
            return false;
        }
        self.cancel.cancel();
        self.release(send_stop).await;
        self.video.playback_stopped().await;
        true
    }

    /// Terminate after a failed command, returning the caller's error
    pub(super) async fn fail(&self, error: AirPlayError) -> AirPlayError {
        let reason = error.to_string();
        self.conclude(Some(Arc::new(error)), false).await;
        AirPlayError::SessionTerminated { reason }
    }

    /// Take the connection, optionally sending `POST /stop`, and close it
    pub(super) async fn release(&self, send_stop: bool) {
        let Some(mut transport) = self.transport.lock().await.take() else {
            return;
        };
        if send_stop {
            if let Err(e) = transport.send(self.requests.stop()).await {
                tracing::warn!("POST /stop failed: {e}");
            }
        }
        transport.close().await;
    }
}

fn invalid_state(message: &str, state: SessionState) -> AirPlayError {
    AirPlayError::InvalidState {
        message: message.to_string(),
        current_state: state.to_string(),
    }
}
