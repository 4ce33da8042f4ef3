//! # dagstore
//!
//! A content-addressed object store with a Merkle-DAG data model.
//!
//! Every node is an opaque payload plus named links to other nodes, and is
//! addressed by the multihash of its content. Callers program against the
//! [`ContentAddressedStorage`] trait; backends are interchangeable.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: in-memory, optionally restricted to known writers
//! - [`FileStore`]: a single local file
//! - [`RemoteStore`]: an external object-store daemon over HTTP
//!   (feature `remote`, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use dagstore::{ContentAddressedStorage, MemoryStore, NodeBuilder, WriterKey};
//!
//! let store = MemoryStore::new();
//! let writer = WriterKey::null();
//! let leaf = NodeBuilder::new().data(b"hello".to_vec()).commit(&store, &writer).await?;
//! let dir = NodeBuilder::new().link("greeting", leaf)?.commit(&store, &writer).await?;
//! store.recursive_pin(&dir).await?;
//! ```

pub mod mime;
pub mod model;
pub mod remote;
pub mod store;

mod error;

pub use error::{Error, Result};
pub use model::{MerkleNode, Multihash, WriterKey};
#[cfg(feature = "remote")]
pub use remote::RemoteStore;
pub use remote::{Auth, RemoteConfig};
pub use store::{ContentAddressedStorage, FileStore, MemoryStore, NodeBuilder};

/// Store file version for format compatibility
pub const VERSION: u32 = 1;

/// Magic bytes for store file identification
pub const MAGIC: &[u8; 8] = b"DAGSTORE";
