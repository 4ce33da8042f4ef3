//! In-memory backend

use super::traits::{validate_label, ContentAddressedStorage};
use super::walk::reachable;
use crate::model::{MerkleNode, Multihash, WriterKey};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// A content-addressed store kept entirely in memory
///
/// Useful as a test double and as a scratch store. Optionally restricts
/// mutating calls to a set of writer identities.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Multihash, MerkleNode>>,
    pins: RwLock<BTreeSet<Multihash>>,
    /// `None` accepts any writer
    allowed_writers: Option<HashSet<WriterKey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept mutations from the given writers
    pub fn with_allowed_writers(writers: impl IntoIterator<Item = WriterKey>) -> Self {
        MemoryStore {
            allowed_writers: Some(writers.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Number of distinct objects held
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Check if an address is stored
    pub fn contains(&self, hash: &Multihash) -> bool {
        self.objects.read().contains_key(hash)
    }

    /// Whether `hash` is a recursive pin root
    pub fn is_pinned(&self, hash: &Multihash) -> bool {
        self.pins.read().contains(hash)
    }

    /// All recursive pin roots
    pub fn pins(&self) -> Vec<Multihash> {
        self.pins.read().iter().copied().collect()
    }

    fn authorize(&self, writer: &WriterKey) -> Result<()> {
        match &self.allowed_writers {
            Some(allowed) if !allowed.contains(writer) => {
                Err(Error::Unauthorized(format!("writer {} rejected", writer)))
            }
            _ => Ok(()),
        }
    }

    fn lookup(&self, hash: &Multihash) -> Result<MerkleNode> {
        self.objects
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::NotFound(hash.to_string()))
    }

    fn insert(&self, node: MerkleNode) -> Multihash {
        let hash = node.content_hash();
        self.objects.write().entry(hash).or_insert(node);
        hash
    }
}

#[async_trait]
impl ContentAddressedStorage for MemoryStore {
    async fn create_empty(&self, writer: &WriterKey) -> Result<Multihash> {
        self.authorize(writer)?;
        Ok(self.insert(MerkleNode::empty()))
    }

    async fn set_data(
        &self,
        writer: &WriterKey,
        base: &Multihash,
        data: &[u8],
    ) -> Result<Multihash> {
        self.authorize(writer)?;
        let node = self.lookup(base)?.with_data(data.to_vec());
        Ok(self.insert(node))
    }

    async fn add_link(
        &self,
        writer: &WriterKey,
        base: &Multihash,
        label: &str,
        target: &Multihash,
    ) -> Result<Multihash> {
        validate_label(label)?;
        self.authorize(writer)?;
        let node = self.lookup(base)?;
        if !self.contains(target) {
            return Err(Error::NotFound(target.to_string()));
        }
        Ok(self.insert(node.with_link(label, *target)))
    }

    async fn get_node(&self, hash: &Multihash) -> Result<Option<MerkleNode>> {
        Ok(self.objects.read().get(hash).cloned())
    }

    async fn put(&self, writer: &WriterKey, node: &MerkleNode) -> Result<Multihash> {
        for label in node.links.keys() {
            validate_label(label)?;
        }
        self.authorize(writer)?;
        if let Some(missing) = node.children().find(|h| !self.contains(h)) {
            return Err(Error::NotFound(missing.to_string()));
        }
        let hash = self.insert(node.clone());
        debug!(%hash, links = node.links.len(), "stored node in memory");
        Ok(hash)
    }

    async fn recursive_pin(&self, hash: &Multihash) -> Result<bool> {
        let objects = self.objects.read();
        if reachable(hash, |h| Ok(objects.get(h).cloned()))?.is_none() {
            return Ok(false);
        }
        drop(objects);

        self.pins.write().insert(*hash);
        Ok(true)
    }

    async fn recursive_unpin(&self, hash: &Multihash) -> Result<bool> {
        Ok(self.pins.write().remove(hash))
    }
}
