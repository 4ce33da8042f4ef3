//! The storage contract every backend implements

use crate::model::{MerkleNode, Multihash, WriterKey};
use crate::{Error, Result};
use async_trait::async_trait;

/// Check a link label before it reaches a backend
///
/// Labels must be non-empty and may not contain `/` (path separator on
/// daemons that resolve links as paths) or NUL.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || label.contains('/') || label.contains('\0') {
        return Err(Error::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// Content-addressed storage of Merkle-DAG nodes
///
/// Implementations can be:
/// - In-memory maps (tests, caches)
/// - A single local file
/// - A remote object-store daemon
///
/// Every creating or mutating call takes the writer identity so that
/// backends with per-writer policy can refuse it with `Unauthorized`.
/// Reads report absence as `Ok(None)`; a backend that cannot be reached
/// reports `BackendUnavailable` and never pretends the object is missing.
#[async_trait]
pub trait ContentAddressedStorage: Send + Sync {
    /// Create the empty node and return its address
    async fn create_empty(&self, writer: &WriterKey) -> Result<Multihash>;

    /// Address of `base` with its payload replaced by `data`
    ///
    /// Links of `base` are kept.
    async fn set_data(&self, writer: &WriterKey, base: &Multihash, data: &[u8])
        -> Result<Multihash>;

    /// Address of `base` with `label -> target` added (or replaced)
    async fn add_link(
        &self,
        writer: &WriterKey,
        base: &Multihash,
        label: &str,
        target: &Multihash,
    ) -> Result<Multihash>;

    /// Resolve an address to its node
    async fn get_node(&self, hash: &Multihash) -> Result<Option<MerkleNode>>;

    /// Resolve an address to its payload only
    async fn get_data(&self, hash: &Multihash) -> Result<Option<Vec<u8>>> {
        Ok(self.get_node(hash).await?.map(|node| node.data))
    }

    /// Store a complete node
    ///
    /// The default runs the patch chain: create the empty node, set its
    /// data, then add each link to the result of the previous step.
    /// Backends that can write a node in one go override this; identity
    /// is a function of content, so both paths agree.
    async fn put(&self, writer: &WriterKey, node: &MerkleNode) -> Result<Multihash> {
        for label in node.links.keys() {
            validate_label(label)?;
        }

        let empty = self.create_empty(writer).await?;
        let mut current = self.set_data(writer, &empty, &node.data).await?;
        for (label, target) in &node.links {
            current = self.add_link(writer, &current, label, target).await?;
        }
        Ok(current)
    }

    /// Retain `hash` and everything reachable from it
    ///
    /// Returns whether the root ended up pinned.
    async fn recursive_pin(&self, hash: &Multihash) -> Result<bool>;

    /// Drop a recursive pin
    ///
    /// Returns whether the root was removed from the pin set.
    async fn recursive_unpin(&self, hash: &Multihash) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label() {
        assert!(validate_label("child").is_ok());
        assert!(validate_label("with space.txt").is_ok());
        assert!(matches!(validate_label(""), Err(Error::InvalidLabel(_))));
        assert!(matches!(validate_label("a/b"), Err(Error::InvalidLabel(_))));
        assert!(matches!(validate_label("nul\0"), Err(Error::InvalidLabel(_))));
    }
}
