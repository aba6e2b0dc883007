//! Reassembly of fragmented data messages.

use bytes::Bytes;

use crate::buffer::{Buffer, ByteBuffer, CompositeBuffer};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Collects data frames until FIN and turns them into a [`Message`].
///
/// Control frames are not this type's concern: pushing one leaves the
/// pending fragments untouched, so a ping may arrive between two fragments.
#[derive(Debug)]
pub struct MessageAssembler {
    limits: Limits,
    opcode: Option<OpCode>,
    fragments: Vec<Bytes>,
    total_len: usize,
}

impl MessageAssembler {
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            opcode: None,
            fragments: Vec::new(),
            total_len: 0,
        }
    }

    /// Whether a fragmented message is waiting for its final frame.
    #[inline]
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Number of fragments held so far.
    #[inline]
    #[must_use]
    pub fn pending_fragments(&self) -> usize {
        self.fragments.len()
    }

    /// Add a frame; returns the message once its final frame arrives.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidContinuation` for a continuation with no message
    ///   open, or a new text/binary frame while one is open
    /// - `Error::TooManyFragments` / `Error::MessageTooLarge` past the limits
    /// - `Error::InvalidUtf8` if a completed text message is not UTF-8
    ///
    /// The assembler is reset after any error.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }
        let result = self.accept(frame);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn accept(&mut self, frame: Frame) -> Result<Option<Message>> {
        match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => {
                return Err(Error::InvalidContinuation(
                    "continuation frame without a message in progress".into(),
                ));
            }
            (OpCode::Continuation, Some(_)) => {}
            (opcode, Some(open)) => {
                return Err(Error::InvalidContinuation(format!(
                    "{opcode} frame while a {open} message is incomplete"
                )));
            }
            (opcode, None) => self.opcode = Some(opcode),
        }

        self.limits.check_fragment_count(self.fragments.len() + 1)?;
        let total_len = self.total_len + frame.len();
        self.limits.check_message_size(total_len)?;
        self.total_len = total_len;

        let fin = frame.fin;
        self.fragments.push(frame.into_payload());
        if !fin {
            return Ok(None);
        }

        let opcode = self.opcode.take().unwrap_or(OpCode::Binary);
        let payload = self.stitch()?;
        Message::from_parts(opcode, payload).map(Some)
    }

    /// Concatenate the pending fragments and clear them.
    fn stitch(&mut self) -> Result<Vec<u8>> {
        self.total_len = 0;
        if self.fragments.len() == 1 {
            return Ok(self.fragments.pop().map(Vec::from).unwrap_or_default());
        }
        let composite = CompositeBuffer::from_buffers(
            self.fragments
                .drain(..)
                .map(|chunk| Box::new(ByteBuffer::wrap(Vec::from(chunk))) as Box<dyn Buffer>),
        );
        composite.readable_to_vec()
    }

    /// Drop any partial message.
    pub fn reset(&mut self) {
        self.opcode = None;
        self.fragments.clear();
        self.total_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(Limits::default())
    }

    #[test]
    fn test_single_frame_message() {
        let mut asm = assembler();
        let msg = asm.push(Frame::text("Hello")).unwrap();
        assert_eq!(msg, Some(Message::text("Hello")));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_three_fragment_text_message() {
        let mut asm = assembler();
        assert_eq!(asm.push(Frame::new(false, OpCode::Text, "Hel")).unwrap(), None);
        assert_eq!(asm.push(Frame::continuation(false, "lo, ")).unwrap(), None);
        assert_eq!(asm.pending_fragments(), 2);
        let msg = asm.push(Frame::continuation(true, "world")).unwrap();
        assert_eq!(msg, Some(Message::text("Hello, world")));
        assert_eq!(asm.pending_fragments(), 0);
    }

    #[test]
    fn test_control_frame_between_fragments() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Binary, vec![1, 2])).unwrap();
        assert_eq!(asm.push(Frame::ping("p")).unwrap(), None);
        assert!(asm.is_assembling());
        let msg = asm.push(Frame::continuation(true, vec![3])).unwrap();
        assert_eq!(msg, Some(Message::binary([1, 2, 3])));
    }

    #[test]
    fn test_unexpected_continuation() {
        let mut asm = assembler();
        assert!(matches!(
            asm.push(Frame::continuation(true, "x")),
            Err(Error::InvalidContinuation(_))
        ));
    }

    #[test]
    fn test_new_message_while_fragmented() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Text, "a")).unwrap();
        assert!(matches!(
            asm.push(Frame::binary("b")),
            Err(Error::InvalidContinuation(_))
        ));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_limits_enforced() {
        let limits = Limits {
            max_message_size: 4,
            max_fragment_count: 2,
            ..Limits::default()
        };
        let mut asm = MessageAssembler::new(limits.clone());
        asm.push(Frame::new(false, OpCode::Binary, vec![0; 3])).unwrap();
        assert_eq!(
            asm.push(Frame::continuation(true, vec![0; 2])),
            Err(Error::MessageTooLarge { size: 5, max: 4 })
        );

        let mut asm = MessageAssembler::new(limits);
        asm.push(Frame::new(false, OpCode::Binary, vec![0])).unwrap();
        asm.push(Frame::continuation(false, vec![0])).unwrap();
        assert_eq!(
            asm.push(Frame::continuation(true, vec![0])),
            Err(Error::TooManyFragments { count: 3, max: 2 })
        );
    }

    #[test]
    fn test_invalid_utf8_across_fragments() {
        let mut asm = assembler();
        // A two-byte sequence split across fragments is fine.
        asm.push(Frame::new(false, OpCode::Text, vec![0xC3])).unwrap();
        let msg = asm.push(Frame::continuation(true, vec![0xA9])).unwrap();
        assert_eq!(msg, Some(Message::text("é")));

        asm.push(Frame::new(false, OpCode::Text, vec![0xC3])).unwrap();
        assert_eq!(
            asm.push(Frame::continuation(true, vec![0x41])),
            Err(Error::InvalidUtf8)
        );
    }
}
