//! Error types for catalog retrieval and stream playback

/// Result type alias for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Fatal errors while loading the top-level track list.
///
/// Any of these halts list rendering and is shown as a full-screen error.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("Failed to fetch music list: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Failed to fetch music list: HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The list body was not a JSON array of track ids
    #[error("Malformed music list: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The list parsed but contained no tracks
    #[error("Music list is empty")]
    Empty,

    /// Origin could not be joined with a catalog path
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Per-track metadata failure. Recovered locally by omitting the track.
#[derive(Debug, thiserror::Error)]
pub enum TrackDetailError {
    #[error("details request for track {id} failed: {source}")]
    Http {
        id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("details request for track {id} returned HTTP {status}")]
    Status {
        id: String,
        status: reqwest::StatusCode,
    },

    #[error("details for track {id} are malformed: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Classification of a streaming error reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    Network,
    Media,
    Other,
}

/// Errors surfaced by the playback controller
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaybackError {
    /// Neither the adaptive engine nor the surface can play the stream
    #[error("No playback path for {url}: HLS is not supported")]
    UnsupportedFormat { url: String },

    /// Unrecoverable stream failure; a new selection is required
    #[error("Playback of track {track_id} failed: {details}")]
    StreamFatal {
        track_id: String,
        kind: StreamErrorKind,
        details: String,
    },

    /// The engine refused to construct or drive a client
    #[error("Streaming engine error: {0}")]
    Engine(String),

    /// The rendering surface rejected a command
    #[error("Rendering surface error: {0}")]
    Surface(String),
}

impl PlaybackError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }
}
