//! Translation between [`Frame`] values and bytes in a [`Buffer`].
//!
//! The codec encodes what it is given: whether a frame carries a masking
//! key is the connection's decision, not the codec's.

use bytes::Bytes;

use crate::buffer::{Buffer, ByteBuffer, require_writable};
use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::frame::{Frame, FrameHeader, check_control, header_len};
use crate::protocol::mask::{apply_mask_at, apply_mask_fast};

/// Encode `frame` into a fresh byte string.
///
/// # Errors
///
/// - `Error::ControlFrameTooLarge` if a control payload exceeds 125 bytes
/// - `Error::FragmentedControlFrame` if a control frame has FIN clear
pub fn encode(frame: &Frame) -> Result<Bytes> {
    let mut buf = ByteBuffer::new(frame.wire_size());
    encode_into(frame, &mut buf)?;
    Ok(Bytes::from(buf.into_readable()))
}

/// Append the encoding of `frame` at `buf`'s write cursor.
///
/// Nothing is written unless the whole frame fits. Returns the number of
/// bytes written.
///
/// # Errors
///
/// - `Error::InsufficientBytes` if the frame does not fit the writable space
/// - the control frame errors of [`encode`]
pub fn encode_into(frame: &Frame, buf: &mut dyn Buffer) -> Result<usize> {
    check_control(frame.opcode, frame.fin, frame.len())?;
    let total = frame.wire_size();
    require_writable(buf, total)?;

    let mut b0 = frame.opcode.as_u8();
    if frame.fin {
        b0 |= 0x80;
    }
    if frame.rsv1 {
        b0 |= 0x40;
    }
    if frame.rsv2 {
        b0 |= 0x20;
    }
    if frame.rsv3 {
        b0 |= 0x10;
    }
    buf.write_byte(b0)?;

    let mask_bit = if frame.mask.is_some() { 0x80 } else { 0x00 };
    let len = frame.len();
    match header_len(len, false) {
        2 => buf.write_byte(mask_bit | len as u8)?,
        4 => {
            buf.write_byte(mask_bit | 126)?;
            buf.write_u16(len as u16)?;
        }
        _ => {
            buf.write_byte(mask_bit | 127)?;
            buf.write_u64(len as u64)?;
        }
    }

    match frame.mask {
        Some(key) => {
            buf.write_bytes(&key)?;
            let start = buf.write_index();
            buf.write_bytes(frame.payload())?;
            mask_in_place(buf, start, len, key)?;
        }
        None => buf.write_bytes(frame.payload())?,
    }

    log::trace!(
        "encoded {} frame: fin={} len={} masked={}",
        frame.opcode,
        frame.fin,
        len,
        frame.mask.is_some()
    );
    Ok(total)
}

/// XOR `[start, start + len)` of `buf` with `key`, region by region.
fn mask_in_place(buf: &mut dyn Buffer, start: usize, len: usize, key: [u8; 4]) -> Result<()> {
    let mut done = 0;
    while done < len {
        let region = buf.chunk_mut(start + done, len - done)?;
        let n = region.len();
        apply_mask_at(region, key, done);
        done += n;
    }
    Ok(())
}

/// Decode one frame at the read cursor, consuming it.
///
/// The payload is returned unmasked; the masking key, if any, is kept on
/// the frame. On any error the read cursor is left where it was.
///
/// # Errors
///
/// - `Error::IncompleteFrame` if the frame is not fully buffered
/// - any header error of [`FrameHeader::parse`]
pub fn decode(buf: &mut dyn Buffer) -> Result<Frame> {
    let header = FrameHeader::peek(buf)?;
    let total = header.frame_len()?;
    let available = buf.readable_bytes();
    if available < total {
        return Err(Error::IncompleteFrame {
            needed: total - available,
        });
    }
    buf.skip_bytes(header.header_len)?;
    decode_body(&header, buf)
}

/// Read the payload described by an already consumed `header`.
pub(crate) fn decode_body(header: &FrameHeader, buf: &mut dyn Buffer) -> Result<Frame> {
    let mut payload = buf.read_bytes(header.payload_len)?;
    if let Some(key) = header.mask {
        apply_mask_fast(&mut payload, key);
    }
    log::trace!(
        "decoded {} frame: fin={} len={} masked={}",
        header.opcode,
        header.fin,
        header.payload_len,
        header.mask.is_some()
    );
    let mut frame = Frame::new(header.fin, header.opcode, payload);
    frame.mask = header.mask;
    Ok(frame)
}

/// Decode a complete message: a data frame followed by continuation frames
/// up to and including the first with FIN set.
///
/// All or nothing: on any error, including incomplete input, the read
/// cursor is restored.
///
/// # Errors
///
/// - `Error::InvalidContinuation` if the chain starts with a continuation
///   frame or any follower is not a continuation frame
/// - any error of [`decode`]
pub fn decode_message(buf: &mut dyn Buffer) -> Result<Vec<Frame>> {
    let start = buf.read_index();
    let result = decode_chain(buf);
    if result.is_err() {
        buf.set_read_index(start)?;
    }
    result
}

fn decode_chain(buf: &mut dyn Buffer) -> Result<Vec<Frame>> {
    let first = decode(buf)?;
    if !first.opcode.starts_message() {
        return Err(Error::InvalidContinuation(format!(
            "message cannot start with a {} frame",
            first.opcode
        )));
    }
    let mut fin = first.fin;
    let mut frames = vec![first];
    while !fin {
        let next = decode(buf)?;
        if next.opcode != OpCode::Continuation {
            return Err(Error::InvalidContinuation(format!(
                "expected continuation frame, got {}",
                next.opcode
            )));
        }
        fin = next.fin;
        frames.push(next);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CompositeBuffer;

    fn decode_bytes(raw: &[u8]) -> Result<Frame> {
        let mut buf = ByteBuffer::wrap(raw.to_vec());
        decode(&mut buf)
    }

    #[test]
    fn test_decode_unmasked_text() {
        let frame = decode_bytes(&[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']).unwrap();
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload(), b"Hello");
        assert!(frame.mask.is_none());
    }

    #[test]
    fn test_decode_masked_text() {
        let raw = [
            0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
        ];
        let frame = decode_bytes(&raw).unwrap();
        assert_eq!(frame.payload(), b"Hello");
        assert_eq!(frame.mask, Some([0x37, 0xfa, 0x21, 0x3d]));
    }

    #[test]
    fn test_decode_incomplete_payload_keeps_cursor() {
        let mut buf = ByteBuffer::wrap(vec![0x81, 0x05, b'H', b'e', b'l']);
        assert_eq!(decode(&mut buf), Err(Error::IncompleteFrame { needed: 2 }));
        assert_eq!(buf.read_index(), 0);
    }

    #[test]
    fn test_encode_unmasked_text() {
        let bytes = encode(&Frame::text("Hello")).unwrap();
        assert_eq!(&bytes[..], &[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn test_encode_masked_text() {
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let bytes = encode(&Frame::text("Hello").with_mask(key)).unwrap();
        assert_eq!(bytes[0], 0x81);
        assert_eq!(bytes[1], 0x85);
        assert_eq!(&bytes[2..6], &key);
        assert_eq!(&bytes[6..], &[0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_encode_length_tiers() {
        let bytes = encode(&Frame::binary(vec![0xAB; 256])).unwrap();
        assert_eq!(&bytes[..4], &[0x82, 0x7E, 0x01, 0x00]);
        assert_eq!(bytes.len(), 260);

        let bytes = encode(&Frame::binary(vec![0xCD; 65536])).unwrap();
        assert_eq!(bytes[1], 0x7F);
        assert_eq!(&bytes[2..10], &65536u64.to_be_bytes());
        assert_eq!(bytes.len(), 10 + 65536);
    }

    #[test]
    fn test_ping_payload_is_never_dropped() {
        let bytes = encode(&Frame::ping("are you there")).unwrap();
        assert_eq!(bytes[1], 13);
        assert_eq!(&bytes[2..], b"are you there");
        assert_eq!(&encode(&Frame::pong(Bytes::new())).unwrap()[..], &[0x8A, 0x00]);
    }

    #[test]
    fn test_oversized_control_frame_is_an_error() {
        assert_eq!(
            encode(&Frame::ping(vec![0u8; 126])),
            Err(Error::ControlFrameTooLarge(126))
        );
    }

    #[test]
    fn test_encode_into_checks_space_first() {
        let mut buf = ByteBuffer::new(4);
        let result = encode_into(&Frame::text("Hello"), &mut buf);
        assert_eq!(
            result,
            Err(Error::InsufficientBytes {
                requested: 7,
                available: 4
            })
        );
        assert_eq!(buf.write_index(), 0);
    }

    #[test]
    fn test_decode_across_composite_components() {
        let wire = encode(&Frame::binary(vec![7u8; 300]).with_mask([1, 2, 3, 4])).unwrap();
        let (head, tail) = wire.split_at(5);
        let mut composite = CompositeBuffer::new();
        composite.add_component(ByteBuffer::wrap(head.to_vec()));
        composite.add_component(ByteBuffer::wrap(tail.to_vec()));
        let frame = decode(&mut composite).unwrap();
        assert_eq!(frame.payload(), &[7u8; 300][..]);
        assert_eq!(composite.readable_bytes(), 0);
    }

    #[test]
    fn test_decode_message_reassembles_chain() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode(&Frame::new(false, OpCode::Text, "Hel")).unwrap());
        wire.extend_from_slice(&encode(&Frame::continuation(false, "lo, ")).unwrap());
        wire.extend_from_slice(&encode(&Frame::continuation(true, "world")).unwrap());
        let mut buf = ByteBuffer::wrap(wire);
        let frames = decode_message(&mut buf).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opcode, OpCode::Text);
        let joined: Vec<u8> = frames.iter().flat_map(|f| f.payload().to_vec()).collect();
        assert_eq!(joined, b"Hello, world");
    }

    #[test]
    fn test_decode_message_rejects_non_continuation_follower() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode(&Frame::new(false, OpCode::Text, "a")).unwrap());
        wire.extend_from_slice(&encode(&Frame::text("b")).unwrap());
        let mut buf = ByteBuffer::wrap(wire);
        assert!(matches!(
            decode_message(&mut buf),
            Err(Error::InvalidContinuation(_))
        ));
        assert_eq!(buf.read_index(), 0);
    }

    #[test]
    fn test_decode_message_rejects_leading_continuation() {
        let wire = encode(&Frame::continuation(true, "x")).unwrap();
        let mut buf = ByteBuffer::wrap(wire.to_vec());
        assert!(matches!(
            decode_message(&mut buf),
            Err(Error::InvalidContinuation(_))
        ));
    }

    #[test]
    fn test_decode_message_incomplete_restores_cursor() {
        let wire = encode(&Frame::new(false, OpCode::Binary, "part")).unwrap();
        let mut buf = ByteBuffer::wrap(wire.to_vec());
        assert!(matches!(
            decode_message(&mut buf),
            Err(Error::IncompleteFrame { .. })
        ));
        assert_eq!(buf.read_index(), 0);
    }
}
