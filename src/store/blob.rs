//! On-disk blob encoding for stored nodes

use crate::model::MerkleNode;
use crate::{Error, Result};

/// Payloads below this size are not worth compressing
const COMPRESS_THRESHOLD: usize = 64;

/// How the blob body is encoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    /// Canonical node bytes, stored as-is
    Raw,
    /// Canonical node bytes, zstd-compressed
    Zstd,
}

impl Codec {
    pub fn as_byte(&self) -> u8 {
        match self {
            Codec::Raw => 0,
            Codec::Zstd => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Codec::Raw),
            1 => Some(Codec::Zstd),
            _ => None,
        }
    }
}

/// A node's canonical bytes as written to the store file
#[derive(Clone, Debug)]
pub struct Blob {
    /// Canonical node encoding (uncompressed)
    pub data: Vec<u8>,
}

impl Blob {
    pub fn from_node(node: &MerkleNode) -> Self {
        Blob {
            data: node.to_bytes(),
        }
    }

    pub fn to_node(&self) -> Result<MerkleNode> {
        MerkleNode::from_bytes(&self.data)
    }

    /// Encode for storage: codec byte followed by the body
    pub fn compress(&self) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(self.data.len() + 1);
        if self.data.len() < COMPRESS_THRESHOLD {
            output.push(Codec::Raw.as_byte());
            output.extend_from_slice(&self.data);
            return Ok(output);
        }

        output.push(Codec::Zstd.as_byte());
        let compressed = zstd::encode_all(self.data.as_slice(), 3)?;
        output.extend(compressed);
        Ok(output)
    }

    /// Decode a blob read from storage
    pub fn decompress(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Corruption("Empty blob data".into()));
        }

        let codec = Codec::from_byte(data[0])
            .ok_or_else(|| Error::Corruption(format!("Invalid blob codec: {}", data[0])))?;

        let body = match codec {
            Codec::Raw => data[1..].to_vec(),
            Codec::Zstd => zstd::decode_all(&data[1..])?,
        };

        Ok(Blob { data: body })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}
