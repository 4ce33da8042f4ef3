//! Incremental node construction

use super::traits::{validate_label, ContentAddressedStorage};
use crate::model::{MerkleNode, Multihash, WriterKey};
use crate::Result;
use std::collections::BTreeMap;

/// Accumulates data and links locally, then stores the node in one `put`
///
/// Nothing touches the backend until [`NodeBuilder::commit`], so there are
/// no half-built intermediate objects on the store side.
#[derive(Clone, Debug, Default)]
pub struct NodeBuilder {
    data: Vec<u8>,
    links: BTreeMap<String, Multihash>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing node
    pub fn from_node(node: MerkleNode) -> Self {
        NodeBuilder {
            data: node.data,
            links: node.links,
        }
    }

    /// Set the payload
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Add (or replace) a link; the label is checked immediately
    pub fn link(mut self, label: impl Into<String>, target: Multihash) -> Result<Self> {
        let label = label.into();
        validate_label(&label)?;
        self.links.insert(label, target);
        Ok(self)
    }

    /// Remove a link if present
    pub fn unlink(mut self, label: &str) -> Self {
        self.links.remove(label);
        self
    }

    /// The node as built so far
    pub fn build(self) -> MerkleNode {
        MerkleNode {
            data: self.data,
            links: self.links,
        }
    }

    /// Store the node and return its address
    pub async fn commit<S>(self, store: &S, writer: &WriterKey) -> Result<Multihash>
    where
        S: ContentAddressedStorage + ?Sized,
    {
        let node = self.build();
        store.put(writer, &node).await
    }
}
