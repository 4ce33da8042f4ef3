//! Core data model types for dagstore

mod multihash;
mod node;
mod writer;

pub use self::multihash::{Multihash, BLAKE3_CODE, SHA2_256_CODE};
pub use node::MerkleNode;
pub use writer::WriterKey;
