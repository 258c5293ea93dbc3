use crate::media::MediaSource;
use crate::plist_dict;
use crate::protocol::http::headers::content_types;
use crate::protocol::http::{HttpRequest, HttpRequestBuilder, Method};
use crate::protocol::plist::xml;
use crate::types::PlayBody;

/// Endpoint paths served by video receivers
pub mod endpoints {
    pub const PLAY: &str = "/play";
    pub const RATE: &str = "/rate";
    pub const SCRUB: &str = "/scrub";
    pub const STOP: &str = "/stop";
    pub const PLAYBACK_INFO: &str = "/playback-info";
    pub const SERVER_INFO: &str = "/server-info";
}

/// Request factory bound to one `AirPlay` session
#[derive(Debug, Clone)]
pub struct VideoRequests {
    session_id: String,
    user_agent: String,
}

impl VideoRequests {
    /// Create a factory stamping every request with `session_id`
    pub fn new(session_id: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Session id sent as `X-Apple-Session-ID`
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn request(&self, method: Method, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequest::builder(method, path)
            .user_agent(&self.user_agent)
            .session(&self.session_id)
    }

    /// `POST /play` for the given media
    #[must_use]
    pub fn play(&self, media: &MediaSource, body: PlayBody) -> HttpRequest {
        let builder = self.request(Method::Post, endpoints::PLAY);
        match body {
            PlayBody::TextParameters => builder
                .content_type(content_types::TEXT_PARAMETERS)
                .body(format_play_parameters(&media.url, media.start_position).into_bytes())
                .build(),
            PlayBody::XmlPlist => {
                let plist = plist_dict! {
                    "Content-Location" => media.url.as_str(),
                    "Start-Position" => media.start_position,
                };
                builder
                    .content_type(content_types::XML_PLIST)
                    .body(xml::encode(&plist))
                    .build()
            }
        }
    }

    /// `POST /rate?value=` (0 pauses, 1 plays)
    #[must_use]
    pub fn rate(&self, rate: f64) -> HttpRequest {
        self.request(Method::Post, format!("{}?value={rate:.6}", endpoints::RATE))
            .build()
    }

    /// `POST /scrub?position=` to seek, in seconds
    #[must_use]
    pub fn scrub(&self, position: f64) -> HttpRequest {
        self.request(
            Method::Post,
            format!("{}?position={position:.6}", endpoints::SCRUB),
        )
        .build()
    }

    /// `POST /stop`
    #[must_use]
    pub fn stop(&self) -> HttpRequest {
        self.request(Method::Post, endpoints::STOP).build()
    }

    /// `GET /playback-info`
    #[must_use]
    pub fn playback_info(&self) -> HttpRequest {
        self.request(Method::Get, endpoints::PLAYBACK_INFO).build()
    }

    /// `GET /server-info`
    #[must_use]
    pub fn server_info(&self) -> HttpRequest {
        self.request(Method::Get, endpoints::SERVER_INFO).build()
    }
}

/// Render the `text/parameters` body of a play request
#[must_use]
pub fn format_play_parameters(url: &str, start_position: f64) -> String {
    format!("Content-Location: {url}\nStart-Position: {start_position:.6}\n")
}
