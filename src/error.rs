//! Error types for retrying HTTP exchanges.
//!
//! Every failure is an [`Error`]: a [`Cause`] describing what went wrong, the
//! stage tag it originated in (`HTTP/Request`, `JSON/Response`, ...) and a trace
//! of the component operations it propagated through. Tests and callers that
//! need to branch on the failure should use [`Error::kind`] rather than the
//! rendered message.

use http::StatusCode;
use std::fmt;

/// The machine-checkable category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be built (bad method, URL or header) or its body
    /// could not be serialized. Never retried.
    Construction,
    /// The transport failed to complete the round trip or to read the body.
    /// Retried by the raw exchange layer.
    Transport,
    /// The response body was not valid JSON for the requested type. Never retried.
    Deserialization,
    /// The response status code was not in the acceptable set. Retried by the
    /// JSON exchange layer.
    Policy,
    /// The client itself was misconfigured.
    Configuration,
}

/// The underlying reason an exchange failed.
#[derive(thiserror::Error, Debug)]
pub enum Cause {
    /// The method, URL or a header could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A network-level error occurred (connection refused, DNS, timeout, ...).
    #[error("network error")]
    Network(#[source] reqwest::Error),

    /// The response arrived but its body could not be read in full.
    #[error("failed to read response body")]
    BodyRead(#[source] reqwest::Error),

    /// The request value could not be serialized to JSON.
    #[error("failed to serialize request")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the target type.
    #[error("failed to deserialize response (status {status})")]
    Deserialization {
        /// The HTTP status code of the response
        status: StatusCode,
        /// The raw response body, lossily decoded
        raw_response: String,
        /// The serde error
        #[source]
        source: serde_json::Error,
    },

    /// The response status code is not one of the acceptable codes.
    #[error("response status code ({status}) isn't in the acceptable set")]
    UnacceptableStatus {
        /// The HTTP status code of the response
        status: StatusCode,
        /// The raw response body, lossily decoded
        raw_response: String,
    },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Cause {
    fn kind(&self) -> ErrorKind {
        match self {
            Cause::InvalidRequest(_) | Cause::Serialization(_) => ErrorKind::Construction,
            Cause::Network(_) | Cause::BodyRead(_) => ErrorKind::Transport,
            Cause::Deserialization { .. } => ErrorKind::Deserialization,
            Cause::UnacceptableStatus { .. } => ErrorKind::Policy,
            Cause::Configuration(_) => ErrorKind::Configuration,
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            Cause::InvalidRequest(_) | Cause::Network(_) => "HTTP/Request",
            Cause::BodyRead(_) => "HTTP/Response",
            Cause::Serialization(_) => "JSON/Request",
            Cause::Deserialization { .. } => "JSON/Response",
            Cause::UnacceptableStatus { .. } => "HTTPCode/Response",
            Cause::Configuration(_) => "Config",
        }
    }
}

/// One step of the propagation trace: the component and operation an error passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// The component, e.g. `Client`.
    pub component: &'static str,
    /// The operation, e.g. `exchange_raw`.
    pub operation: &'static str,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.operation)
    }
}

/// The error type for HTTP exchanges.
///
/// # Examples
///
/// ```no_run
/// use httpwrap::{Client, ErrorKind, RequestMetadata};
///
/// # async fn example() -> Result<(), httpwrap::Error> {
/// let client = Client::builder().retries(3).acceptable_code(200).build()?;
/// let metadata = RequestMetadata::new("GET", "https://api.example.com/items");
///
/// match client.exchange_json::<(), serde_json::Value>(&metadata, &()).await {
///     Ok(Some(response)) => println!("{:?}", response.data),
///     Ok(None) => println!("no attempts configured"),
///     Err(e) if e.kind() == ErrorKind::Policy => {
///         eprintln!("gave up on status {:?} after {} attempts", e.status(), e.attempts());
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Error {
    cause: Cause,
    trace: Vec<Frame>,
    attempts: usize,
}

impl Error {
    pub(crate) fn new(cause: Cause) -> Self {
        Self {
            cause,
            trace: Vec::new(),
            attempts: 0,
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Cause::InvalidRequest(message.into()))
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::new(Cause::Configuration(message.into()))
    }

    /// Records that the error passed through `component::operation`.
    pub(crate) fn context(mut self, component: &'static str, operation: &'static str) -> Self {
        self.trace.push(Frame {
            component,
            operation,
        });
        self
    }

    /// Records the attempt count of the innermost retry loop that gave up.
    pub(crate) fn with_attempts(mut self, attempts: usize) -> Self {
        if self.attempts == 0 {
            self.attempts = attempts;
        }
        self
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    /// Returns the stage tag the error originated in, e.g. `"HTTP/Request"`.
    pub fn stage(&self) -> &'static str {
        self.cause.stage()
    }

    /// Returns the underlying cause.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Returns the propagation trace, innermost frame first.
    pub fn trace(&self) -> &[Frame] {
        &self.trace
    }

    /// Returns the number of attempts made by the retry loop the error escaped
    /// from first, or `0` if it was raised outside of one. A transport error
    /// surfacing from a JSON exchange reports the raw layer's attempts.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Returns `true` for transient failures: transport errors and status codes
    /// outside the acceptable set.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Policy)
    }

    /// Returns the HTTP status code if the failure happened after a response arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.cause {
            Cause::Deserialization { status, .. } | Cause::UnacceptableStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Returns the raw response body if the failure happened after a response arrived.
    pub fn raw_response(&self) -> Option<&str> {
        match &self.cause {
            Cause::Deserialization { raw_response, .. }
            | Cause::UnacceptableStatus { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

impl From<Cause> for Error {
    fn from(cause: Cause) -> Self {
        Error::new(cause)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage(), self.cause)?;
        if !self.trace.is_empty() {
            f.write_str(" (at ")?;
            for (i, frame) in self.trace.iter().enumerate() {
                if i > 0 {
                    f.write_str(" <- ")?;
                }
                write!(f, "{frame}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.cause)
    }
}

/// A specialized `Result` type for HTTP exchanges.
pub type Result<T> = std::result::Result<T, Error>;
