//! Connections: the handshake drivers, frame I/O and the message state
//! machine on top of an async transport.
//!
//! ## Lifecycle
//!
//! 1. **Handshaking**: HTTP upgrade in progress
//! 2. **Open**: messages flow both ways; pings are answered automatically
//! 3. **Closing**: our close frame is out, waiting for the echo
//! 4. **Closed**: transport shut down
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsframe::{Config, Connection};
//!
//! # async fn serve(stream: tokio::net::TcpStream) -> wsframe::Result<()> {
//! let mut conn = Connection::accept(stream, Config::server()).await?;
//! while let Some(message) = conn.recv().await? {
//!     if !message.is_close() {
//!         conn.send(message).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod fragmenter;
mod role;
mod state;

pub use fragmenter::Fragmenter;
pub use role::Role;
pub use state::ConnectionState;

#[cfg(feature = "async-tokio")]
mod channel;
#[cfg(feature = "async-tokio")]
#[allow(clippy::module_inception)]
mod connection;
#[cfg(feature = "async-tokio")]
mod framed;
#[cfg(feature = "async-tokio")]
pub mod upgrade;

#[cfg(feature = "async-tokio")]
pub use channel::Incoming;
#[cfg(feature = "async-tokio")]
pub use connection::{Connection, MessageReader, MessageSender};
#[cfg(feature = "async-tokio")]
pub use upgrade::{client_handshake, read_http_head, server_handshake};
