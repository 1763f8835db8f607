//! # Frame Checksum
//!
//! Weighted multiply-XOR accumulator over the first 30 bytes of a frame,
//! taken as fifteen little-endian 16-bit words. Not a polynomial CRC.
//!
//! ```text
//! acc = 0
//! for each word w:
//!     acc = acc + w * 44111   (mod 2^16)
//!     acc = acc ^ (acc >> 8)
//! ```

use super::protocol::{Frame, CHECKSUM_OFFSET};
use crate::error::{Result, TelemetryLinkError};

/// Per-word multiplier
const CHECKSUM_WEIGHT: u16 = 44111;

/// Calculate the checksum of a byte slice taken as little-endian 16-bit words
///
/// A trailing odd byte is ignored; frames always checksum an even length.
///
/// # Examples
///
/// ```
/// use telemetry_link::packet::checksum::checksum;
///
/// assert_eq!(checksum(&[]), 0);
/// assert_ne!(checksum(&[0x01, 0x00]), 0);
/// ```
pub fn checksum(data: &[u8]) -> u16 {
    let mut acc: u16 = 0;

    for word in data.chunks_exact(2) {
        let w = u16::from_le_bytes([word[0], word[1]]);
        acc = acc.wrapping_add(w.wrapping_mul(CHECKSUM_WEIGHT));
        acc ^= acc >> 8;
    }

    acc
}

/// Compute and store the checksum of bytes 0..30 at offset 30
pub fn seal(frame: &mut Frame) {
    let sum = checksum(&frame[..CHECKSUM_OFFSET]);
    frame[CHECKSUM_OFFSET..].copy_from_slice(&sum.to_le_bytes());
}

/// Verify the stored checksum
///
/// # Errors
///
/// Returns `CorruptFrame` if the recomputed value differs from the stored one
pub fn verify(frame: &Frame) -> Result<()> {
    let expected = checksum(&frame[..CHECKSUM_OFFSET]);
    let received = u16::from_le_bytes([frame[CHECKSUM_OFFSET], frame[CHECKSUM_OFFSET + 1]]);

    if expected != received {
        return Err(TelemetryLinkError::CorruptFrame { expected, received });
    }

    Ok(())
}
