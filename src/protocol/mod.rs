//! RFC 6455 wire protocol: frames, masking, the opening handshake and
//! message reassembly. Nothing in here performs I/O.

pub mod assembler;
pub mod codec;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod validation;

pub use assembler::MessageAssembler;
pub use codec::{decode, decode_message, encode, encode_into};
pub use frame::{Frame, FrameHeader};
pub use handshake::{
    ClientRequest, HandshakeRequest, HandshakeResponse, HttpRequest, Rejection, WS_GUID,
    compute_accept_key, generate_key,
};
pub use mask::{apply_mask, apply_mask_fast, generate_mask};
pub use opcode::OpCode;
pub use validation::FrameValidator;
