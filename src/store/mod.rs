//! Content-addressed node storage
//!
//! This module defines the storage contract and the local backends.
//! Nodes are addressed by the multihash of their canonical encoding.

mod blob;
mod builder;
mod file_store;
mod memory;
mod traits;
mod walk;

pub use blob::{Blob, Codec};
pub use builder::NodeBuilder;
pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use traits::{validate_label, ContentAddressedStorage};
