//! # wsframe
//!
//! An RFC 6455 WebSocket implementation built on a cursor-based buffer
//! engine.
//!
//! - [`buffer`]: the [`Buffer`](buffer::Buffer) trait with a growable
//!   [`ByteBuffer`](buffer::ByteBuffer), zero-copy
//!   [`Slice`](buffer::Slice)/[`Duplicate`](buffer::Duplicate) views and a
//!   [`CompositeBuffer`](buffer::CompositeBuffer) that stitches several
//!   buffers into one index space
//! - [`protocol`]: frame encoding and decoding, masking, the opening
//!   handshake and message reassembly, all free of I/O
//! - [`connection`]: the handshake drivers and the message state machine
//!   over a tokio transport (feature `async-tokio`, on by default)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsframe::{Config, Connection, Message};
//!
//! # async fn run() -> wsframe::Result<()> {
//! let mut conn = Connection::connect("ws://127.0.0.1:9001/", Config::client()).await?;
//! conn.send(Message::text("Hello")).await?;
//! let reply = conn.recv().await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

pub use buffer::{Buffer, ByteBuffer, CompositeBuffer, Duplicate, Slice};
pub use config::{Config, Limits, Timeouts};
#[cfg(feature = "async-tokio")]
pub use connection::{Connection, Incoming, MessageReader, MessageSender};
pub use connection::{ConnectionState, Role};
pub use error::{Error, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{Frame, OpCode, WS_GUID, compute_accept_key};
