//! 32-byte public-input words
//!
//! every circuit input is a big-endian numeric word of 32 bytes. roots,
//! commitments and nullifiers are carried as-is; integers are right-aligned.

use mimble_mmr::Root;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldElement(#[serde(with = "hex32")] pub [u8; 32]);

impl FieldElement {
    pub const ZERO: Self = Self([0u8; 32]);
    pub const ONE: Self = Self::from_u64(1);

    pub const fn from_u64(value: u64) -> Self {
        let be = value.to_be_bytes();
        let mut bytes = [0u8; 32];
        let mut i = 0;
        while i < 8 {
            bytes[24 + i] = be[i];
            i += 1;
        }
        Self(bytes)
    }

    /// numeric value if it fits in 64 bits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut be = [0u8; 8];
        be.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(be))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Root> for FieldElement {
    fn from(root: Root) -> Self {
        Self(root.to_bytes())
    }
}

impl From<&Root> for FieldElement {
    fn from(root: &Root) -> Self {
        Self(root.to_bytes())
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_u64() {
            Some(n) => write!(f, "FieldElement({})", n),
            None => write!(f, "FieldElement(0x{})", hex::encode(self.0)),
        }
    }
}

impl std::fmt::Display for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// serde adapter: `[u8; 32]` as a hex string
pub(crate) mod hex32 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        raw.try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("expected 32 bytes, got {}", v.len())))
    }
}
