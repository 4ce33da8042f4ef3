//! MerkleNode - one unit of stored content

use super::Multihash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of the Merkle-DAG: an opaque payload plus labelled child links
///
/// Nodes are values. "Changing" a node means building another one, which
/// gets its own address. Links live in a `BTreeMap`, so the order they were
/// added in never leaks into the encoding or the hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleNode {
    /// Opaque payload (may be empty)
    pub data: Vec<u8>,

    /// Label → child address, labels unique per node
    pub links: BTreeMap<String, Multihash>,
}

impl MerkleNode {
    /// A node carrying `data` and no links
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        MerkleNode {
            data: data.into(),
            links: BTreeMap::new(),
        }
    }

    /// The canonical empty node: no data, no links
    pub fn empty() -> Self {
        MerkleNode::default()
    }

    /// A node with data and a full link map
    pub fn with_links(
        data: impl Into<Vec<u8>>,
        links: impl IntoIterator<Item = (String, Multihash)>,
    ) -> Self {
        MerkleNode {
            data: data.into(),
            links: links.into_iter().collect(),
        }
    }

    /// Add (or replace) a link
    pub fn with_link(mut self, label: impl Into<String>, target: Multihash) -> Self {
        self.links.insert(label.into(), target);
        self
    }

    /// Replace the payload
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Canonical byte encoding used for addressing and on-disk storage
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serialization should not fail")
    }

    /// Decode a node from its canonical encoding
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Compute the content address of this node
    pub fn content_hash(&self) -> Multihash {
        Multihash::digest(&self.to_bytes())
    }

    /// Check whether this is the empty node
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.links.is_empty()
    }

    /// Child addresses in label order
    pub fn children(&self) -> impl Iterator<Item = &Multihash> {
        self.links.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let child = Multihash::digest(b"child");
        let n1 = MerkleNode::new(b"payload".to_vec()).with_link("a", child);
        let n2 = MerkleNode::new(b"payload".to_vec()).with_link("a", child);
        assert_eq!(n1.content_hash(), n2.content_hash());

        let n3 = n2.clone().with_data(b"other".to_vec());
        assert_ne!(n1.content_hash(), n3.content_hash());
    }

    #[test]
    fn test_link_order_does_not_change_identity() {
        let x = Multihash::digest(b"x");
        let y = Multihash::digest(b"y");

        let forward = MerkleNode::empty().with_link("x", x).with_link("y", y);
        let backward = MerkleNode::empty().with_link("y", y).with_link("x", x);
        assert_eq!(forward.content_hash(), backward.content_hash());
    }

    #[test]
    fn test_links_change_identity() {
        let plain = MerkleNode::new(b"d".to_vec());
        let linked = plain.clone().with_link("c", Multihash::digest(b"c"));
        assert_ne!(plain.content_hash(), linked.content_hash());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let node = MerkleNode::with_links(
            vec![1, 2, 3],
            [("kid".to_string(), Multihash::digest(b"kid"))],
        );
        let back = MerkleNode::from_bytes(&node.to_bytes()).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn test_empty() {
        assert!(MerkleNode::empty().is_empty());
        assert!(!MerkleNode::new(vec![0]).is_empty());
    }
}
