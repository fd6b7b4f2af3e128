use std::fmt;

use crate::classify::SinkDescriptor;
use crate::trusted::TrustTag;

/// Errors that can occur anywhere in the escaping pipeline.
///
/// None of the variants carry the value that was rejected; their `Display`
/// output is safe to log or return to a client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A sink was used without having been registered.
    #[error(transparent)]
    UnknownSink(#[from] UnknownSinkError),
    /// A value could not be escaped.
    #[error(transparent)]
    Sanitization(#[from] SanitizationError),
    /// A value was written to a sink it was not sanitized for.
    #[error(transparent)]
    TrustMismatch(#[from] TrustMismatchError),
    /// The sink itself failed after the guard accepted the value.
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A request body could not be parsed into its schema.
    #[error(transparent)]
    Body(#[from] BodyError),
}

impl Error {
    /// Returns `true` for errors caused by request input rather than by the
    /// host application's wiring.
    ///
    /// Hosts map these to a 4xx-class response; every other variant is a
    /// programming or deployment error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Sanitization(_) | Error::Body(_))
    }
}

/// A sink descriptor was classified without being registered.
///
/// This is a programming error at the call site. The request must fail; the
/// value is never rendered with a default context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sink '{descriptor}'")]
pub struct UnknownSinkError {
    descriptor: SinkDescriptor,
}

impl UnknownSinkError {
    pub(crate) fn new(descriptor: SinkDescriptor) -> Self {
        Self { descriptor }
    }

    /// Returns the descriptor that was not registered.
    pub fn descriptor(&self) -> &SinkDescriptor {
        &self.descriptor
    }
}

/// Error returned when a value cannot be escaped or composed.
///
/// # Examples
///
/// ```
/// use escape_core::{SanitizationError, SanitizationErrorKind};
///
/// let error = SanitizationError::new(SanitizationErrorKind::MalformedInput, "invalid UTF-8");
/// assert_eq!(error.kind(), SanitizationErrorKind::MalformedInput);
/// assert!(error.to_string().contains("malformed input"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sanitization failed ({kind}): {message}")]
pub struct SanitizationError {
    kind: SanitizationErrorKind,
    message: String,
}

impl SanitizationError {
    /// Creates a new sanitization error.
    pub fn new(kind: SanitizationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SanitizationErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Kind of sanitization error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizationErrorKind {
    /// Input is not valid text (invalid UTF-8, unpaired surrogates).
    MalformedInput,
    /// A value was composed into a context it cannot be nested in.
    InvalidNesting,
    /// Two values with different trust tags were concatenated.
    ContextMismatch,
    /// An unquoted attribute position was requested.
    UnquotedAttribute,
}

impl fmt::Display for SanitizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput => write!(f, "malformed input"),
            Self::InvalidNesting => write!(f, "invalid nesting"),
            Self::ContextMismatch => write!(f, "context mismatch"),
            Self::UnquotedAttribute => write!(f, "unquoted attribute"),
        }
    }
}

/// A value reached a sink without being sanitized for that sink's context.
///
/// In correct code this error is unreachable; seeing it means an escape call
/// is missing on the render path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sink '{sink}' requires {expected}, got {found}")]
pub struct TrustMismatchError {
    sink: SinkDescriptor,
    expected: TrustTag,
    found: TrustTag,
}

impl TrustMismatchError {
    pub(crate) fn new(sink: SinkDescriptor, expected: TrustTag, found: TrustTag) -> Self {
        Self {
            sink,
            expected,
            found,
        }
    }

    /// Returns the sink the write was aimed at.
    pub fn sink(&self) -> &SinkDescriptor {
        &self.sink
    }

    /// Returns the trust tag the sink requires.
    pub fn expected(&self) -> TrustTag {
        self.expected
    }

    /// Returns the trust tag the value actually carried.
    pub fn found(&self) -> TrustTag {
        self.found
    }
}

/// Error returned by a [`Sink`](crate::Sink) implementation.
///
/// # Examples
///
/// ```
/// use escape_core::{SinkError, SinkErrorKind};
///
/// let error = SinkError::with_message(SinkErrorKind::Io, "socket closed");
/// assert_eq!(error.kind(), SinkErrorKind::Io);
/// assert_eq!(error.message(), Some("socket closed"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError {
    kind: SinkErrorKind,
    message: Option<String>,
}

impl SinkError {
    /// Creates a new sink error with the specified kind.
    pub fn new(kind: SinkErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a new sink error with a custom message.
    pub fn with_message(kind: SinkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SinkErrorKind {
        self.kind
    }

    /// Returns the error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(msg) = &self.message {
            write!(f, "sink error ({}): {}", self.kind, msg)
        } else {
            write!(f, "sink error ({})", self.kind)
        }
    }
}

impl std::error::Error for SinkError {}

/// Kind of sink error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    /// I/O error occurred during the write.
    Io,
    /// Sink is full or has reached capacity.
    Full,
}

impl fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::Full => write!(f, "sink full"),
        }
    }
}

/// Errors raised while loading or validating a [`SanitizerConfig`](crate::SanitizerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for the schema.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// A sink descriptor was registered twice with different contexts.
    #[error("sink '{0}' is already registered with a different context")]
    Conflict(SinkDescriptor),
    /// A registration is well-formed JSON but not a usable sink or policy.
    #[error("invalid entry for '{name}': {reason}")]
    Invalid {
        /// Descriptor or policy name of the offending entry.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// A request body did not parse into the handler's schema.
///
/// Parsing only shapes the body; every string field still arrives
/// untrusted.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body is not valid JSON for the schema.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    /// A form field is not valid percent-encoded UTF-8.
    #[error("malformed form field '{field}'")]
    MalformedForm {
        /// Name of the offending field, or its position if the name itself
        /// is malformed.
        field: String,
    },
}
