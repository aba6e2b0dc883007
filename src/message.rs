//! Application-level messages and close status codes.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::frame::MAX_CONTROL_PAYLOAD;

/// Close status code (RFC 6455 §7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CloseCode(u16);

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: CloseCode = CloseCode(1000);
    /// Endpoint going away, e.g. server shutdown or page navigation.
    pub const GOING_AWAY: CloseCode = CloseCode(1001);
    /// Protocol error.
    pub const PROTOCOL_ERROR: CloseCode = CloseCode(1002);
    /// Received a data type the endpoint cannot accept.
    pub const UNSUPPORTED_DATA: CloseCode = CloseCode(1003);
    /// Message data inconsistent with its type, e.g. non-UTF-8 text.
    pub const INVALID_PAYLOAD: CloseCode = CloseCode(1007);
    /// Policy violation.
    pub const POLICY_VIOLATION: CloseCode = CloseCode(1008);
    /// Message too big to process.
    pub const MESSAGE_TOO_BIG: CloseCode = CloseCode(1009);
    /// Client expected the server to negotiate an extension.
    pub const MANDATORY_EXTENSION: CloseCode = CloseCode(1010);
    /// Unexpected condition on the server.
    pub const INTERNAL_ERROR: CloseCode = CloseCode(1011);

    #[inline]
    #[must_use]
    pub const fn new(code: u16) -> Self {
        CloseCode(code)
    }

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Codes that may appear on the wire: 1000-1003, 1007-1014 and the
    /// registered/private range 3000-4999.
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        matches!(self.0, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// 1004-1006 and 1015 are reserved for local reporting only.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self.0, 1004..=1006 | 1015)
    }
}

impl Default for CloseCode {
    fn default() -> Self {
        CloseCode::NORMAL
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode(code)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status code plus UTF-8 reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: CloseCode,
    pub reason: String,
}

impl CloseFrame {
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Interpret a received close payload. An empty payload carries no status.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a 1-byte payload
    /// - `Error::InvalidCloseCode` for a code that may not be sent
    /// - `Error::InvalidUtf8` if the reason is not UTF-8
    pub fn parse(payload: &[u8]) -> Result<Option<Self>> {
        match payload {
            [] => Ok(None),
            [_] => Err(Error::ProtocolViolation(
                "close payload must be empty or at least 2 bytes".into(),
            )),
            [hi, lo, reason @ ..] => {
                let code = CloseCode(u16::from_be_bytes([*hi, *lo]));
                if !code.is_sendable() {
                    return Err(Error::InvalidCloseCode(code.as_u16()));
                }
                let reason = std::str::from_utf8(reason)?;
                Ok(Some(CloseFrame::new(code, reason)))
            }
        }
    }

    /// Check the frame before sending it.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCloseCode` for a reserved or out-of-range code
    /// - `Error::ControlFrameTooLarge` if the reason is longer than 123 bytes
    pub fn validate(&self) -> Result<()> {
        if !self.code.is_sendable() {
            return Err(Error::InvalidCloseCode(self.code.as_u16()));
        }
        let len = 2 + self.reason.len();
        if len > MAX_CONTROL_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(len));
        }
        Ok(())
    }
}

/// A complete, reassembled message.
///
/// Pings and pongs are answered by the connection and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection, with its status if it sent one.
    Close(Option<CloseFrame>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Build a message from an opcode and a reassembled payload.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUtf8` for a text payload that is not UTF-8
    /// - `Error::InvalidContinuation` for an opcode that cannot start a
    ///   message
    /// - close payload errors of [`CloseFrame::parse`]
    pub fn from_parts(opcode: OpCode, payload: Vec<u8>) -> Result<Self> {
        match opcode {
            OpCode::Text => String::from_utf8(payload)
                .map(Message::Text)
                .map_err(|_| Error::InvalidUtf8),
            OpCode::Binary => Ok(Message::Binary(payload)),
            OpCode::Close => CloseFrame::parse(&payload).map(Message::Close),
            other => Err(Error::InvalidContinuation(format!(
                "{other} frame cannot carry a message"
            ))),
        }
    }

    #[must_use]
    pub fn opcode(&self) -> OpCode {
        match self {
            Message::Text(_) => OpCode::Text,
            Message::Binary(_) => OpCode::Binary,
            Message::Close(_) => OpCode::Close,
        }
    }

    /// Split into the opcode and the raw payload bytes.
    #[must_use]
    pub fn into_parts(self) -> (OpCode, Vec<u8>) {
        match self {
            Message::Text(text) => (OpCode::Text, text.into_bytes()),
            Message::Binary(data) => (OpCode::Binary, data),
            Message::Close(None) => (OpCode::Close, Vec::new()),
            Message::Close(Some(frame)) => {
                let mut payload = frame.code.as_u16().to_be_bytes().to_vec();
                payload.extend_from_slice(frame.reason.as_bytes());
                (OpCode::Close, payload)
            }
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Message::Binary(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Message::Close(_))
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}
