//! Self-describing content identifier

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Multicodec tag for BLAKE3 (256-bit output)
pub const BLAKE3_CODE: u64 = 0x1e;

/// Multicodec tag for SHA2-256, used by IPFS-style daemons
pub const SHA2_256_CODE: u64 = 0x12;

type Inner = ::multihash::Multihash<64>;

/// A content address: hash-function tag plus digest bytes
///
/// Local backends address nodes with BLAKE3. Remote daemons hand back
/// whatever their hash function is (usually SHA2-256); the tag keeps the
/// two apart. The text form is base58btc, as in `Qm...` identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Multihash(Inner);

impl Multihash {
    /// Hash arbitrary data with BLAKE3
    pub fn digest(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self::wrap(BLAKE3_CODE, hash.as_bytes()).expect("32-byte digest fits")
    }

    /// Hash multiple pieces of data with BLAKE3
    pub fn digest_many(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self::wrap(BLAKE3_CODE, hasher.finalize().as_bytes()).expect("32-byte digest fits")
    }

    /// Wrap an existing digest under the given hash-function tag
    pub fn wrap(code: u64, digest: &[u8]) -> Result<Self> {
        Inner::wrap(code, digest)
            .map(Multihash)
            .map_err(|e| Error::InvalidHash(e.to_string()))
    }

    /// Parse the binary multihash encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Inner::from_bytes(bytes)
            .map(Multihash)
            .map_err(|e| Error::InvalidHash(e.to_string()))
    }

    /// Binary multihash encoding: varint(code) ++ varint(len) ++ digest
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Hash-function tag
    pub fn code(&self) -> u64 {
        self.0.code()
    }

    /// Raw digest bytes
    pub fn digest_bytes(&self) -> &[u8] {
        self.0.digest()
    }

    /// Base58btc text form
    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    /// Parse the base58btc text form
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| Error::InvalidHash(format!("{}: {}", s, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Hex of the digest, handy for logs and file names
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest_bytes())
    }

    /// Short prefix for display (last 7 chars of the base58 form)
    ///
    /// The leading characters encode the tag and length and are the same
    /// for every hash of one kind, so the tail is the useful part.
    pub fn short(&self) -> String {
        let full = self.to_base58();
        full[full.len().saturating_sub(7)..].to_string()
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({:#x}:{})", self.code(), self.short())
    }
}

impl PartialOrd for Multihash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Multihash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code()
            .cmp(&other.code())
            .then_with(|| self.digest_bytes().cmp(other.digest_bytes()))
    }
}

impl FromStr for Multihash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for Multihash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Multihash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Multihash::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
