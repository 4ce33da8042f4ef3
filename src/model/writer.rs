//! Writer identity passed to mutating store operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque writer identity (typically a public key)
///
/// The store contract only carries it around; a backend that enforces
/// per-writer policy compares it against its own records.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriterKey(Vec<u8>);

impl WriterKey {
    /// Create a writer identity from raw key bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        WriterKey(bytes.into())
    }

    /// The null identity, for tools and tests that have no key
    pub fn null() -> Self {
        WriterKey(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Default for WriterKey {
    fn default() -> Self {
        WriterKey::null()
    }
}

impl fmt::Display for WriterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}", self.to_hex())
        }
    }
}

impl fmt::Debug for WriterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "WriterKey({})", &hex[..hex.len().min(8)])
    }
}

impl FromStr for WriterKey {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "null" {
            return Ok(WriterKey::null());
        }
        Ok(WriterKey(hex::decode(s)?))
    }
}
