use std::fmt;

/// Lifecycle state of an `AirPlay` session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No target chosen yet
    #[default]
    Idle,
    /// Target chosen, not started
    TargetSet,
    /// Connecting and handing the media over
    Starting,
    /// Receiver is playing
    Streaming,
    /// Receiver is paused
    Paused,
    /// Session has ended, cleanly or with an error
    Stopped,
}

impl SessionState {
    /// Media has been handed over and the receiver accepts commands
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Streaming | Self::Paused)
    }

    /// No further transitions are possible
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Stopped
    }

    /// `start` has been called (or the session has ended)
    #[must_use]
    pub fn has_started(self) -> bool {
        !matches!(self, Self::Idle | Self::TargetSet)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::TargetSet => "TargetSet",
            Self::Starting => "Starting",
            Self::Streaming => "Streaming",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSnapshot {
    /// Lifecycle state
    pub state: SessionState,
    /// Last paused flag reported to observers
    pub paused: bool,
    /// Last position reported, in seconds
    pub position: Option<f64>,
    /// Last duration reported, in seconds
    pub duration: Option<f64>,
}
