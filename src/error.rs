//! Error types for the buffer engine, frame codec, handshake and connection.
//!
//! Errors fall into three families: buffer errors (local to the buffer
//! engine and recoverable by the caller), protocol errors (the peer broke
//! RFC 6455; the connection cannot be trusted afterwards) and transport
//! errors (I/O failure or EOF).

use thiserror::Error;

/// Result type alias for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while buffering, coding or exchanging frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An index or cursor fell outside the addressable range of a buffer.
    #[error("Index out of bounds: {index} (bound: {bound})")]
    OutOfBounds {
        /// Offending index.
        index: usize,
        /// Exclusive (byte access) or inclusive (cursor) upper bound.
        bound: usize,
    },

    /// More bytes were requested than are currently readable or writable.
    #[error("Insufficient bytes: requested {requested}, available {available}")]
    InsufficientBytes {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// The transport reported a transfer count it could not have performed.
    #[error("Transport contract violation: {0}")]
    TransportContract(String),

    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A continuation frame arrived out of sequence, or a data frame arrived
    /// while a fragmented message was still open.
    #[error("Invalid continuation: {0}")]
    InvalidContinuation(String),

    /// Invalid UTF-8 in a text message or close reason.
    #[error("Invalid UTF-8 in text payload")]
    InvalidUtf8,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// The 64-bit payload length does not fit the platform's address space.
    #[error("Payload too large for platform: {size} bytes (max: {max})")]
    PayloadTooLargeForPlatform {
        /// Declared payload length.
        size: u64,
        /// Largest length this platform can address.
        max: u64,
    },

    /// Connection has been closed.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// Invalid WebSocket handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// The peer answered the upgrade request with a non-101 status, or the
    /// local server rejected an upgrade request with this status.
    #[error("Handshake rejected with HTTP status {status}")]
    HandshakeRejected {
        /// HTTP status code.
        status: u16,
    },

    /// Handshake data exceeds configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Origin header not in the allow-list.
    #[error("Origin not allowed: {origin}")]
    OriginNotAllowed {
        /// Origin presented by the client.
        origin: String,
    },

    /// A header value would break the HTTP framing.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why the value was refused.
        reason: String,
    },

    /// The URL passed to `connect` could not be parsed or lacks a host.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL scheme cannot be dialed by this crate.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A bounded wait elapsed.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The operating system random source failed.
    #[error("Random source failure: {0}")]
    Random(String),

    /// Invalid close code.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Unmasked client frame (security violation).
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Masked server frame (security violation).
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without a negotiated extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Invalid opcode value.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),
}

impl Error {
    /// Whether this error was caused by the peer violating RFC 6455.
    ///
    /// Such errors are discovered in-band and leave the byte stream in an
    /// unknown state, so the connection is failed after reporting them.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidFrame(_)
                | Error::ProtocolViolation(_)
                | Error::InvalidContinuation(_)
                | Error::InvalidUtf8
                | Error::FrameTooLarge { .. }
                | Error::MessageTooLarge { .. }
                | Error::TooManyFragments { .. }
                | Error::PayloadTooLargeForPlatform { .. }
                | Error::InvalidCloseCode(_)
                | Error::ReservedOpcode(_)
                | Error::FragmentedControlFrame
                | Error::ControlFrameTooLarge(_)
                | Error::UnmaskedClientFrame
                | Error::MaskedServerFrame
                | Error::ReservedBitsSet
                | Error::InvalidOpcode(_)
        )
    }

    /// The close status code to send when failing a connection with this error.
    #[must_use]
    pub const fn close_code(&self) -> u16 {
        match self {
            Error::InvalidUtf8 => 1007,
            Error::FrameTooLarge { .. }
            | Error::MessageTooLarge { .. }
            | Error::TooManyFragments { .. }
            | Error::PayloadTooLargeForPlatform { .. } => 1009,
            Error::Timeout(_) => 1008,
            _ => 1002,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<getrandom::Error> for Error {
    fn from(err: getrandom::Error) -> Self {
        Error::Random(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientBytes {
            requested: 10,
            available: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient bytes: requested 10, available 4"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let ws_err: Error = io_err.into();
        assert!(matches!(ws_err, Error::Io(_)));
    }

    #[test]
    fn test_protocol_classification() {
        assert!(Error::ReservedBitsSet.is_protocol_error());
        assert!(Error::InvalidContinuation("x".into()).is_protocol_error());
        assert!(!Error::Io("reset".into()).is_protocol_error());
        assert!(
            !Error::OutOfBounds {
                index: 11,
                bound: 10
            }
            .is_protocol_error()
        );
    }

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(Error::ReservedBitsSet.close_code(), 1002);
        assert_eq!(Error::InvalidUtf8.close_code(), 1007);
        assert_eq!(Error::MessageTooLarge { size: 2, max: 1 }.close_code(), 1009);
    }
}
