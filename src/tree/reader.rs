use std::sync::Arc;

use crate::cas::Cas;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::tree::node::{ChildRef, Node, Pair};

/// tree navigation: point lookup and full in-order iteration
pub struct TreeReader {
    cas: Arc<dyn Cas>,
}

impl TreeReader {
    pub fn new(cas: Arc<dyn Cas>) -> Self {
        Self { cas }
    }

    fn load(&self, hash: Hash) -> Result<Node> {
        let data = self.cas.read(hash)?;
        Node::decode(&data)
    }

    /// look up a key in the tree rooted at `root`. O(log n) node loads, each
    /// one object read plus a decode.
    pub fn get(&self, root: Hash, key: &[u8]) -> Result<Vec<u8>> {
        let mut node = self.load(root)?;

        loop {
            match node {
                Node::Internal(children) => {
                    let child = find_child(&children, key);
                    node = self.load(child)?;
                }
                Node::Leaf(pairs) => {
                    return match pairs.binary_search_by(|p| p.key.as_slice().cmp(key)) {
                        Ok(i) => Ok(pairs[i].value.clone()),
                        Err(_) => Err(Error::KeyNotFound),
                    };
                }
            }
        }
    }

    /// collect all pairs in the tree in sorted key order
    pub fn get_all(&self, root: Hash) -> Result<Vec<Pair>> {
        let node = self.load(root)?;
        let mut pairs = Vec::new();
        self.collect(&node, &mut pairs)?;
        Ok(pairs)
    }

    fn collect(&self, node: &Node, out: &mut Vec<Pair>) -> Result<()> {
        match node {
            Node::Leaf(pairs) => out.extend_from_slice(pairs),
            Node::Internal(children) => {
                for child in children {
                    let child_node = self.load(child.hash)?;
                    self.collect(&child_node, out)?;
                }
            }
        }
        Ok(())
    }
}

/// digest of the rightmost child whose minimum key is <= the search key.
/// keys below the first child's minimum fall into the first child, where the
/// leaf search will report them missing.
fn find_child(children: &[ChildRef], key: &[u8]) -> Hash {
    let i = children.partition_point(|c| c.key.as_slice() <= key);
    children[i.saturating_sub(1)].hash
}
