//! Checksum functions evaluated against each candidate.
//!
//! The search engine only relies on [`Checksum`] being deterministic and
//! producing a 32-bit value comparable by equality, so any checksum with that
//! shape can be plugged in. [`Crc32`] is the one ZIP archives record.

/// A pure 32-bit checksum over a byte sequence.
///
/// Implementations are shared by reference across every worker thread and
/// must not keep mutable state between calls.
///
/// # Example
///
/// ```
/// use crcrecover_core::Checksum;
///
/// /// Sum of all bytes, wrapping at 32 bits.
/// struct ByteSum;
///
/// impl Checksum for ByteSum {
///     fn checksum(&self, bytes: &[u8]) -> u32 {
///         bytes.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32))
///     }
/// }
///
/// assert_eq!(ByteSum.checksum(b"ab"), 97 + 98);
/// ```
pub trait Checksum: Send + Sync {
    /// Compute the checksum of `bytes`
    fn checksum(&self, bytes: &[u8]) -> u32;
}

/// CRC-32/IEEE, as stored in ZIP central directories
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32;

impl Checksum for Crc32 {
    #[inline]
    fn checksum(&self, bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }
}

impl<C: Checksum + ?Sized> Checksum for &C {
    #[inline]
    fn checksum(&self, bytes: &[u8]) -> u32 {
        (**self).checksum(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(Crc32.checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_crc32_empty() {
        assert_eq!(Crc32.checksum(b""), 0);
    }

    #[test]
    fn test_crc32_through_reference() {
        let by_ref: &dyn Checksum = &Crc32;
        assert_eq!(by_ref.checksum(b"ab"), Crc32.checksum(b"ab"));
    }
}
