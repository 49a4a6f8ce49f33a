use std::sync::Arc;

use crate::cas::Cas;
use crate::chunker::Chunker;
use crate::error::Result;
use crate::hash::Hash;
use crate::tree::node::{ChildRef, Node, Pair};

/// constructs prolly trees from sorted pairs, writing every node through the
/// object store
pub struct TreeBuilder {
    cas: Arc<dyn Cas>,
    chunker: Chunker,
}

impl TreeBuilder {
    pub fn new(cas: Arc<dyn Cas>, chunker: Chunker) -> Self {
        Self { cas, chunker }
    }

    /// build a tree from sorted, key-unique pairs and return the root digest.
    ///
    /// bottom-up: chunk the pairs into leaves, then repeatedly chunk the
    /// resulting child references into internal layers until a single
    /// reference remains. an empty input produces the empty leaf node, whose
    /// digest is fixed.
    pub fn build(&self, pairs: &[Pair]) -> Result<Hash> {
        if pairs.is_empty() {
            return self.store(&Node::Leaf(Vec::new()));
        }

        let mut refs = Vec::new();
        for chunk in self.chunker.chunk(pairs) {
            let hash = self.store(&Node::Leaf(chunk.to_vec()))?;
            refs.push(ChildRef {
                key: chunk[0].key.clone(),
                hash,
            });
        }

        self.build_internal_layers(refs)
    }

    /// collapse child references into internal layers until one root remains
    fn build_internal_layers(&self, mut refs: Vec<ChildRef>) -> Result<Hash> {
        while refs.len() > 1 {
            // chunk the references with the same boundary rules as the
            // leaves, hashing each child's minimum key and digest; this keeps
            // upper layers history-independent too
            let as_pairs: Vec<Pair> = refs
                .iter()
                .map(|r| Pair {
                    key: r.key.clone(),
                    value: r.hash.as_bytes().to_vec(),
                })
                .collect();

            let mut parents = Vec::new();
            let mut consumed = 0;
            for chunk in self.chunker.chunk(&as_pairs) {
                let children = refs[consumed..consumed + chunk.len()].to_vec();
                consumed += chunk.len();

                let hash = self.store(&Node::Internal(children))?;
                parents.push(ChildRef {
                    key: chunk[0].key.clone(),
                    hash,
                });
            }

            refs = parents;
        }

        Ok(refs[0].hash)
    }

    fn store(&self, node: &Node) -> Result<Hash> {
        self.cas.write(&node.encode())
    }
}
