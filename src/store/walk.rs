//! Reachability walks shared by the local backends

use crate::model::{MerkleNode, Multihash};
use crate::{Error, Result};
use std::collections::{BTreeSet, VecDeque};

/// Collect `root` and every address reachable from it
///
/// Returns `Ok(None)` when the root itself is unknown. A missing
/// descendant is an error: the graph below the root is incomplete.
/// Link cycles are tolerated.
pub(crate) fn reachable<F>(root: &Multihash, mut lookup: F) -> Result<Option<BTreeSet<Multihash>>>
where
    F: FnMut(&Multihash) -> Result<Option<MerkleNode>>,
{
    let root_node = match lookup(root)? {
        Some(node) => node,
        None => return Ok(None),
    };

    let mut seen = BTreeSet::new();
    seen.insert(*root);
    let mut queue: VecDeque<Multihash> = root_node.children().copied().collect();

    while let Some(hash) = queue.pop_front() {
        if !seen.insert(hash) {
            continue;
        }
        let node = lookup(&hash)?.ok_or_else(|| Error::NotFound(hash.to_string()))?;
        queue.extend(node.children().copied());
    }

    Ok(Some(seen))
}
