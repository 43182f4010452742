//! [`Error`][core::error::Error] implementations used across the crate

use core::{
    fmt::{Display, Formatter},
    str::Utf8Error,
};

/// Boxed error returned by setup callbacks and handlers
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Parser error for a body read from reqwest
pub type StreamError = EventStreamError<reqwest::Error>;

/// Errors yielded by [EventStream][crate::event_stream::EventStream].
///
/// Only [EventStreamError::Transport] ends the stream, the other variants are reported and the
/// offending line is dropped.
#[derive(Debug, PartialEq)]
pub enum EventStreamError<E> {
    /// Something went wrong with the underlying stream
    Transport(E),
    /// A line had invalid utf8
    Utf8Error(Utf8Error),
    /// A line matched none of the field prefixes and was not blank
    UnknownLine(String),
}

impl<E> EventStreamError<E> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl<E> From<Utf8Error> for EventStreamError<E> {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl<E> Display for EventStreamError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            EventStreamError::Transport(e) => e.fmt(f),
            EventStreamError::Utf8Error(e) => e.fmt(f),
            EventStreamError::UnknownLine(line) => write!(f, "unknown event: {line}"),
        }
    }
}

impl<E> core::error::Error for EventStreamError<E> where E: core::error::Error {}

/// Everything [Engine::open][crate::Engine::open] and the error handlers can see
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid engine or transport configuration
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The request could not be assembled (bad method, header or URL)
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The HTTP client could not be built from the transport configuration
    #[error("failed to build HTTP client: {0}")]
    Transport(#[source] reqwest::Error),

    /// DNS, TCP, TLS or HTTP failure before a response existed
    #[error("{0}")]
    Connect(#[source] reqwest::Error),

    /// The caller's context was cancelled while connecting
    #[error("request cancelled")]
    Cancelled,

    /// The setup callback returned an error
    #[error("setup callback failed: {0}")]
    Setup(#[source] BoxError),

    /// A registered handler returned an error
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// Decoding or reading failed mid-stream
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether the error happened before any response was available
    pub fn is_connect_err(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. } | Self::Transport(_) | Self::Connect(_) | Self::Cancelled
        )
    }
}
