//! Connection lifecycle.
//!
//! ```text
//! Handshaking -> Open -> Closing -> Closed
//!                  \_________________^
//! ```
//!
//! `Open -> Closed` happens directly when the transport fails or the peer
//! initiates the close and we echo it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// HTTP upgrade in progress.
    #[default]
    Handshaking,
    /// Messages flow in both directions.
    Open,
    /// We sent a close frame and are waiting for the echo.
    Closing,
    /// Transport released.
    Closed,
}

impl ConnectionState {
    /// Only an open connection accepts new outgoing messages.
    #[inline]
    #[must_use]
    pub const fn can_send(self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Frames are still read while waiting for the close echo.
    #[inline]
    #[must_use]
    pub const fn can_receive(self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }

    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    const fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Handshaking => 0,
            ConnectionState::Open => 1,
            ConnectionState::Closing => 2,
            ConnectionState::Closed => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Handshaking,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// State cell shared by the read and write halves of one connection.
#[cfg_attr(not(feature = "async-tokio"), allow(dead_code))]
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<AtomicU8>);

#[cfg_attr(not(feature = "async-tokio"), allow(dead_code))]
impl SharedState {
    pub(crate) fn new(state: ConnectionState) -> Self {
        SharedState(Arc::new(AtomicU8::new(state.to_u8())))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next`, returning the state it replaced.
    pub(crate) fn set(&self, next: ConnectionState) -> ConnectionState {
        let prev = ConnectionState::from_u8(self.0.swap(next.to_u8(), Ordering::AcqRel));
        if prev != next {
            log::debug!("connection state {prev} -> {next}");
        }
        prev
    }

    /// Move from `from` to `to` only if no one else moved first.
    pub(crate) fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let moved = self
            .0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            log::debug!("connection state {from} -> {to}");
        }
        moved
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Handshaking);
    }

    #[test]
    fn test_send_and_receive_by_state() {
        assert!(!ConnectionState::Handshaking.can_send());
        assert!(ConnectionState::Open.can_send());
        assert!(!ConnectionState::Closing.can_send());
        assert!(ConnectionState::Closing.can_receive());
        assert!(!ConnectionState::Closed.can_receive());
        assert!(ConnectionState::Closed.is_closed());
    }

    #[test]
    fn test_shared_state_transitions() {
        let state = SharedState::new(ConnectionState::Open);
        let other = state.clone();
        assert!(state.transition(ConnectionState::Open, ConnectionState::Closing));
        assert!(!other.transition(ConnectionState::Open, ConnectionState::Closing));
        assert_eq!(other.get(), ConnectionState::Closing);
        assert_eq!(other.set(ConnectionState::Closed), ConnectionState::Closing);
        assert!(state.get().is_closed());
    }
}
