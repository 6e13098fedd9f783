//! The DataCore 16-byte record identifier.
//!
//! Record ids are 16-byte GUIDs with a byte ordering that differs from the
//! standard UUID text form. The same order table drives both formatting and
//! parsing so the two cannot drift.

use std::fmt;
use std::str::FromStr;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Error;

/// Storage-byte index for each of the 16 hex pairs of the text form,
/// in text order. Groups: 4-2-2-2-6.
const BYTE_ORDER: [usize; 16] = [7, 6, 5, 4, 3, 2, 1, 0, 15, 14, 13, 12, 11, 10, 9, 8];

/// Character offset of each hex pair in the 36-character text form.
const PAIR_OFFSETS: [usize; 16] = [0, 2, 4, 6, 9, 11, 14, 16, 19, 21, 24, 26, 28, 30, 32, 34];

/// A 16-byte record identifier.
///
/// Format: `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, rendered through the
/// archive's own byte ordering rather than standard UUID order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DcGuid {
    bytes: [u8; 16],
}

impl DcGuid {
    /// Empty GUID (all zeros), the null record id.
    pub const EMPTY: Self = Self { bytes: [0; 16] };

    /// Create a new DcGuid from raw storage bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Generate a random GUID.
    ///
    /// Uses a simple linear congruential generator seeded from system time.
    /// Suitable for unique ids, not for cryptographic purposes.
    #[inline]
    pub fn random() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

        let time_seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut state = time_seed
            .wrapping_add(counter)
            .wrapping_mul(6364136223846793005);

        let mut bytes = [0u8; 16];
        for chunk in bytes.chunks_exact_mut(8) {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            chunk.copy_from_slice(&state.to_le_bytes());
        }

        Self { bytes }
    }

    /// Get the raw storage bytes of the GUID.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Check if the GUID is empty (all zeros).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes == [0; 16]
    }
}

impl fmt::Debug for DcGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DcGuid({})", self)
    }
}

impl fmt::Display for DcGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &byte_index) in BYTE_ORDER.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", self.bytes[byte_index])?;
        }
        Ok(())
    }
}

impl FromStr for DcGuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 36 {
            return Err(Error::InvalidGuid(format!(
                "expected 36 characters, got {}",
                s.len()
            )));
        }

        let raw = s.as_bytes();
        if raw[8] != b'-' || raw[13] != b'-' || raw[18] != b'-' || raw[23] != b'-' {
            return Err(Error::InvalidGuid("invalid hyphen positions".into()));
        }

        let parse_pair = |at: usize| -> Result<u8, Error> {
            let pair = std::str::from_utf8(&raw[at..at + 2])
                .map_err(|_| Error::InvalidGuid(format!("invalid hex at position {}", at)))?;
            u8::from_str_radix(pair, 16)
                .map_err(|_| Error::InvalidGuid(format!("invalid hex at position {}", at)))
        };

        let mut bytes = [0u8; 16];
        for (pair, &byte_index) in BYTE_ORDER.iter().enumerate() {
            bytes[byte_index] = parse_pair(PAIR_OFFSETS[pair])?;
        }

        Ok(Self { bytes })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DcGuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DcGuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
