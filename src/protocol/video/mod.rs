//! `AirPlay` video control endpoints
//!
//! The video protocol is plain HTTP/1.1 on the receiver's advertised port:
//! `POST /play` hands over a URL, `POST /rate` and `POST /scrub` control the
//! transport, `GET /playback-info` is polled for progress and `POST /stop`
//! ends playback. Every request of a session carries the same
//! `X-Apple-Session-ID`.

mod playback_info;
mod requests;

#[cfg(test)]
mod tests;

pub use playback_info::{PlaybackInfo, ServerInfo, TimeRange};
pub use requests::{VideoRequests, endpoints, format_play_parameters};
