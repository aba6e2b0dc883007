//! Role-dependent checks on incoming frame headers.
//!
//! [`FrameHeader::parse`](crate::protocol::FrameHeader::parse) already
//! rejects everything that is wrong regardless of who sent the frame. What
//! is left depends on the receiving side: the masking direction (RFC 6455
//! §5.1) and the locally configured frame size limit.

use crate::config::Limits;
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::protocol::FrameHeader;

/// Validates headers of frames received by one endpoint.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    role: Role,
    limits: Limits,
    accept_unmasked_frames: bool,
}

impl FrameValidator {
    /// Validator for frames received by an endpoint playing `role`.
    #[must_use]
    pub fn new(role: Role, limits: Limits) -> Self {
        Self {
            role,
            limits,
            accept_unmasked_frames: false,
        }
    }

    /// Let a server take unmasked client frames. Not RFC compliant.
    #[must_use]
    pub fn with_accept_unmasked(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }

    /// Check `header` before its payload is read.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` if a server sees an unmasked frame
    /// - `Error::MaskedServerFrame` if a client sees a masked frame
    /// - `Error::FrameTooLarge` if the payload exceeds `max_frame_size`
    pub fn validate(&self, header: &FrameHeader) -> Result<()> {
        let masked = header.mask.is_some();
        match self.role {
            Role::Server if !masked && !self.accept_unmasked_frames => {
                return Err(Error::UnmaskedClientFrame);
            }
            Role::Client if masked => return Err(Error::MaskedServerFrame),
            _ => {}
        }
        self.limits.check_frame_size(header.payload_len)
    }
}
