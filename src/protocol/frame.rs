//! The frame value and its header layout (RFC 6455 §5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               | Masking-key, if MASK set to 1 |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::protocol::OpCode;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Longest possible header: 2 fixed bytes, 8 length bytes, 4 key bytes.
pub const MAX_HEADER_LEN: usize = 14;

/// One frame. The payload is always held unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Last frame of its message.
    pub fin: bool,
    /// Reserved bit 1.
    pub rsv1: bool,
    /// Reserved bit 2.
    pub rsv2: bool,
    /// Reserved bit 3.
    pub rsv3: bool,
    /// Payload interpretation.
    pub opcode: OpCode,
    /// Masking key: applied when encoding, recorded when decoding.
    pub mask: Option<[u8; 4]>,
    payload: Bytes,
}

impl Frame {
    /// A frame with clear reserved bits and no masking key.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Final text frame.
    #[must_use]
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Text, payload)
    }

    /// Final binary frame.
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Binary, payload)
    }

    /// Continuation of a fragmented message.
    #[must_use]
    pub fn continuation(fin: bool, payload: impl Into<Bytes>) -> Self {
        Self::new(fin, OpCode::Continuation, payload)
    }

    /// Ping frame; the payload must not exceed 125 bytes.
    #[must_use]
    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Ping, payload)
    }

    /// Pong frame, usually echoing a ping payload.
    #[must_use]
    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Pong, payload)
    }

    /// Close frame with an optional status code and UTF-8 reason.
    ///
    /// The reason is only sent alongside a code.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut data = Vec::with_capacity(2 + reason.len());
                data.extend_from_slice(&code.to_be_bytes());
                data.extend_from_slice(reason.as_bytes());
                data
            }
            None => Vec::new(),
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Attach a masking key.
    #[must_use]
    pub fn with_mask(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Header plus payload length as encoded.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        header_len(self.len(), self.mask.is_some()) + self.len()
    }

    /// Check the RFC 6455 rules that do not depend on the role.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if any RSV bit is set
    /// - `Error::FragmentedControlFrame` if a control frame has FIN clear
    /// - `Error::ControlFrameTooLarge` if a control payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv1 || self.rsv2 || self.rsv3 {
            return Err(Error::ReservedBitsSet);
        }
        check_control(self.opcode, self.fin, self.len())
    }
}

/// Length of the header for a payload of `payload_len` bytes.
#[inline]
#[must_use]
pub const fn header_len(payload_len: usize, masked: bool) -> usize {
    let extended = if payload_len <= MAX_CONTROL_PAYLOAD {
        0
    } else if payload_len <= u16::MAX as usize {
        2
    } else {
        8
    };
    2 + extended + if masked { 4 } else { 0 }
}

pub(crate) fn check_control(opcode: OpCode, fin: bool, payload_len: usize) -> Result<()> {
    if opcode.is_control() {
        if !fin {
            return Err(Error::FragmentedControlFrame);
        }
        if payload_len > MAX_CONTROL_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(payload_len));
        }
    }
    Ok(())
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: OpCode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: usize,
    /// Bytes the header itself occupies on the wire.
    pub header_len: usize,
}

impl FrameHeader {
    /// Decode the header at the read cursor without consuming it.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if the header is not fully buffered yet
    /// - any error of [`FrameHeader::parse`]
    pub fn peek(buf: &dyn Buffer) -> Result<Self> {
        let available = buf.readable_bytes().min(MAX_HEADER_LEN);
        let mut raw = [0u8; MAX_HEADER_LEN];
        buf.get_bytes(buf.read_index(), &mut raw[..available])?;
        Self::parse(&raw[..available])
    }

    /// Decode a header from the start of `raw`.
    ///
    /// Rejects everything that is wrong with a frame before its payload is
    /// seen: reserved bits (no extension is ever negotiated), reserved
    /// opcodes, fragmented or oversized control frames, and length fields
    /// that are not minimally encoded or have the 64-bit MSB set.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if `raw` ends inside the header
    /// - `Error::ReservedBitsSet`, `Error::ReservedOpcode`
    /// - `Error::FragmentedControlFrame`, `Error::ControlFrameTooLarge`
    /// - `Error::InvalidFrame` for a malformed length field
    /// - `Error::PayloadTooLargeForPlatform` if the length exceeds `usize`
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let need = |n: usize| -> Result<()> {
            if raw.len() < n {
                return Err(Error::IncompleteFrame {
                    needed: n - raw.len(),
                });
            }
            Ok(())
        };

        need(2)?;
        let (b0, b1) = (raw[0], raw[1]);
        if b0 & 0x70 != 0 {
            return Err(Error::ReservedBitsSet);
        }
        let fin = b0 & 0x80 != 0;
        let opcode = OpCode::from_u8(b0 & 0x0F)?;
        let masked = b1 & 0x80 != 0;
        let short_len = b1 & 0x7F;

        if opcode.is_control() {
            check_control(opcode, fin, usize::from(short_len))?;
        }

        let (payload_len, mut offset) = match short_len {
            126 => {
                need(4)?;
                let len = u16::from_be_bytes([raw[2], raw[3]]);
                if len <= 125 {
                    return Err(Error::InvalidFrame(format!(
                        "length {len} must use the 7-bit field"
                    )));
                }
                (usize::from(len), 4)
            }
            127 => {
                need(10)?;
                let mut be = [0u8; 8];
                be.copy_from_slice(&raw[2..10]);
                let len = u64::from_be_bytes(be);
                if len >> 63 != 0 {
                    return Err(Error::InvalidFrame(
                        "64-bit length has its most significant bit set".into(),
                    ));
                }
                if len <= u64::from(u16::MAX) {
                    return Err(Error::InvalidFrame(format!(
                        "length {len} must use the 16-bit field"
                    )));
                }
                let len = usize::try_from(len).map_err(|_| Error::PayloadTooLargeForPlatform {
                    size: len,
                    max: usize::MAX as u64,
                })?;
                (len, 10)
            }
            n => (usize::from(n), 2),
        };

        let mask = if masked {
            need(offset + 4)?;
            let mut key = [0u8; 4];
            key.copy_from_slice(&raw[offset..offset + 4]);
            offset += 4;
            Some(key)
        } else {
            None
        };

        Ok(Self {
            fin,
            opcode,
            mask,
            payload_len,
            header_len: offset,
        })
    }

    /// Header plus payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLargeForPlatform` if the sum overflows.
    pub fn frame_len(&self) -> Result<usize> {
        self.header_len
            .checked_add(self.payload_len)
            .ok_or(Error::PayloadTooLargeForPlatform {
                size: self.payload_len as u64,
                max: (usize::MAX - self.header_len) as u64,
            })
    }
}
