//! Payload masking (RFC 6455 §5.3).
//!
//! Masking XORs byte `i` with `key[i % 4]`, so applying the same key twice
//! restores the input.

use crate::error::Result;

/// Byte-at-a-time masking.
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Word-at-a-time masking; same result as [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], key: [u8; 4]) {
    let word = u32::from_ne_bytes(key);
    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(chunk);
        chunk.copy_from_slice(&(u32::from_ne_bytes(raw) ^ word).to_ne_bytes());
    }
    for (byte, k) in chunks.into_remainder().iter_mut().zip(key) {
        *byte ^= k;
    }
}

/// Masking for a run that starts `offset` bytes into a masked payload.
///
/// Lets a payload that is split across buffer regions be unmasked piecewise.
#[inline]
pub fn apply_mask_at(data: &mut [u8], key: [u8; 4], offset: usize) {
    let rotated = [
        key[offset % 4],
        key[(offset + 1) % 4],
        key[(offset + 2) % 4],
        key[(offset + 3) % 4],
    ];
    apply_mask_fast(data, rotated);
}

/// Four fresh bytes from the operating system CSPRNG.
///
/// # Errors
///
/// Returns `Error::Random` if the random source fails.
pub fn generate_mask() -> Result<[u8; 4]> {
    let mut key = [0u8; 4];
    getrandom::getrandom(&mut key)?;
    Ok(key)
}
