//! Which end of the connection we are.

use std::fmt;

/// Connection role. Decides masking in both directions (RFC 6455 §5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Dialed the connection; masks every outgoing frame.
    Client,
    /// Accepted the connection; never masks.
    Server,
}

impl Role {
    /// Whether outgoing frames carry a masking key.
    #[inline]
    #[must_use]
    pub const fn masks_outgoing(self) -> bool {
        matches!(self, Role::Client)
    }

    /// Whether incoming frames must carry a masking key.
    #[inline]
    #[must_use]
    pub const fn expects_masked(self) -> bool {
        matches!(self, Role::Server)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Client => "client",
            Role::Server => "server",
        })
    }
}
