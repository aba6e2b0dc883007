//! Splitting outgoing data messages into frames.

use bytes::Bytes;

use crate::protocol::{Frame, OpCode};

/// Iterator over the frames of one outgoing message.
///
/// The first frame carries the message opcode, the rest are continuation
/// frames, and only the last has FIN set. Fragments share the payload's
/// storage. An empty payload still yields one (empty, final) frame.
#[derive(Debug, Clone)]
pub struct Fragmenter {
    payload: Bytes,
    opcode: OpCode,
    fragment_size: usize,
    offset: usize,
    started: bool,
}

impl Fragmenter {
    #[must_use]
    pub fn new(opcode: OpCode, payload: impl Into<Bytes>, fragment_size: usize) -> Self {
        Self {
            payload: payload.into(),
            opcode,
            fragment_size: fragment_size.max(1),
            offset: 0,
            started: false,
        }
    }

    /// Bytes not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.offset
    }
}

impl Iterator for Fragmenter {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.started && self.offset >= self.payload.len() {
            return None;
        }
        let end = self.payload.len().min(self.offset + self.fragment_size);
        let chunk = self.payload.slice(self.offset..end);
        self.offset = end;

        let opcode = if self.started {
            OpCode::Continuation
        } else {
            self.started = true;
            self.opcode
        };
        Some(Frame::new(end == self.payload.len(), opcode, chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.started {
            self.remaining().div_ceil(self.fragment_size)
        } else {
            self.payload.len().div_ceil(self.fragment_size).max(1)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Fragmenter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_message_is_one_frame() {
        let frames: Vec<_> = Fragmenter::new(OpCode::Text, "Hello", 1024).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert_eq!(frames[0].payload(), b"Hello");
    }

    #[test]
    fn test_uneven_split() {
        let frag = Fragmenter::new(OpCode::Binary, vec![0xCD; 25], 10);
        assert_eq!(frag.len(), 3);
        let frames: Vec<_> = frag.collect();
        let lens: Vec<_> = frames.iter().map(Frame::len).collect();
        assert_eq!(lens, [10, 10, 5]);
        let opcodes: Vec<_> = frames.iter().map(|f| f.opcode).collect();
        assert_eq!(
            opcodes,
            [OpCode::Binary, OpCode::Continuation, OpCode::Continuation]
        );
        let fins: Vec<_> = frames.iter().map(|f| f.fin).collect();
        assert_eq!(fins, [false, false, true]);
    }

    #[test]
    fn test_exact_multiple() {
        let frames: Vec<_> = Fragmenter::new(OpCode::Binary, vec![0; 30], 10).collect();
        assert_eq!(frames.len(), 3);
        assert!(frames[2].fin);
        assert_eq!(frames[2].len(), 10);
    }

    #[test]
    fn test_empty_payload_yields_final_frame() {
        let mut frag = Fragmenter::new(OpCode::Text, Bytes::new(), 10);
        assert_eq!(frag.len(), 1);
        let frame = frag.next().unwrap();
        assert!(frame.fin);
        assert!(frame.is_empty());
        assert!(frag.next().is_none());
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut frag = Fragmenter::new(OpCode::Binary, vec![0; 12], 5);
        assert_eq!(frag.remaining(), 12);
        frag.next();
        assert_eq!(frag.remaining(), 7);
        assert_eq!(frag.len(), 2);
        frag.next();
        frag.next();
        assert_eq!(frag.remaining(), 0);
        assert!(frag.next().is_none());
    }
}
