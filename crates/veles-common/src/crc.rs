//! CRC32C hashing utilities.
//!
//! CRC32C (Castagnoli) is the hash behind the schema fingerprints: the
//! struct and enum tables are folded into a single seed-chained checksum in
//! declaration order.

/// Compute CRC32C hash of a byte slice.
///
/// Uses hardware acceleration when available (SSE4.2 on x86).
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Continue a previous CRC computation over more bytes.
#[inline]
pub fn hash_bytes_with_seed(data: &[u8], seed: u32) -> u32 {
    crc32c::crc32c_append(seed, data)
}

/// Compute CRC32C hash of a string.
#[inline]
pub fn hash_str(s: &str) -> u32 {
    hash_bytes(s.as_bytes())
}

/// Continue a previous CRC computation over a string.
#[inline]
pub fn hash_str_with_seed(s: &str, seed: u32) -> u32 {
    hash_bytes_with_seed(s.as_bytes(), seed)
}
