//! Limits, timeouts and buffer sizing for connections.

use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bounds on what a peer may make us buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Largest payload of a single frame. Default: 16 MiB.
    pub max_frame_size: usize,

    /// Largest reassembled message. Default: 64 MiB.
    pub max_message_size: usize,

    /// Most frames one message may be split into. Default: 128.
    pub max_fragment_count: usize,

    /// Largest HTTP upgrade head, request or response. Default: 8 KiB.
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            max_fragment_count: 128,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Tight limits for memory-constrained peers.
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_message_size: 256 * 1024,
            max_fragment_count: 16,
            max_handshake_size: 4096,
        }
    }

    /// Effectively unbounded limits, for trusted peers only.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_frame_size: usize::MAX,
            max_message_size: usize::MAX,
            max_fragment_count: usize::MAX,
            max_handshake_size: 64 * 1024,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds `max_frame_size`.
    pub const fn check_frame_size(&self, size: usize) -> Result<()> {
        if size > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds `max_message_size`.
    pub const fn check_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            return Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::TooManyFragments`] if `count` exceeds
    /// `max_fragment_count`.
    pub const fn check_fragment_count(&self, count: usize) -> Result<()> {
        if count > self.max_fragment_count {
            return Err(Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`] if `size` exceeds
    /// `max_handshake_size`.
    pub const fn check_handshake_size(&self, size: usize) -> Result<()> {
        if size > self.max_handshake_size {
            return Err(Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            });
        }
        Ok(())
    }
}

/// Bounded waits applied by the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed for the whole HTTP upgrade exchange. Default: 30 s.
    pub handshake: Duration,

    /// Time to wait for the peer's close echo before shutting the transport
    /// down unilaterally. Default: 5 s.
    pub close: Duration,

    /// Time a channel-mode read loop waits for room in a full channel before
    /// failing the connection with 1008. Default: 30 s.
    pub delivery: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(30),
            close: Duration::from_secs(5),
            delivery: Duration::from_secs(30),
        }
    }
}

/// Connection configuration.
///
/// Masking is not configured here: it follows from the role the connection
/// was opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Resource limits on incoming data.
    pub limits: Limits,

    /// Timeouts.
    pub timeouts: Timeouts,

    /// Outgoing data messages longer than this are sent as several frames.
    /// Default: 16 KiB.
    pub fragment_size: usize,

    /// Initial capacity of the read buffer. Default: 8 KiB.
    pub read_buffer_size: usize,

    /// Initial capacity of the write buffer. Default: 8 KiB.
    pub write_buffer_size: usize,

    /// Let a server accept unmasked client frames. Breaks RFC 6455; for
    /// testing against non-conforming peers only. Default: false.
    pub accept_unmasked_frames: bool,

    /// If set, a server only accepts upgrade requests whose `Origin` is in
    /// this list and answers others with 403. Default: `None`.
    pub allowed_origins: Option<Vec<String>>,

    /// `Origin` header a client sends. Default: `None`, meaning
    /// `http://<host>` of the target URL.
    pub origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            timeouts: Timeouts::default(),
            fragment_size: 16 * 1024,
            read_buffer_size: 8192,
            write_buffer_size: 8192,
            accept_unmasked_frames: false,
            allowed_origins: None,
            origin: None,
        }
    }
}

impl Config {
    /// Defaults for the dialing side.
    #[must_use]
    pub fn client() -> Self {
        Self::default()
    }

    /// Defaults for the accepting side.
    #[must_use]
    pub fn server() -> Self {
        Self {
            read_buffer_size: 16 * 1024,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the outgoing fragment size. Zero is treated as one byte.
    #[must_use]
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_accept_unmasked_frames(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Some(origins);
        self
    }

    /// Send `origin` as the client's `Origin` header.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}
