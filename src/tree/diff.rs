use std::cmp::Ordering;
use std::sync::Arc;

use crate::cas::Cas;
use crate::error::Result;
use crate::hash::Hash;
use crate::tree::node::{ChildRef, Node, Pair};

/// changes between two tree versions
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// keys present in the second tree but not the first
    pub added: Vec<Pair>,
    /// keys present in both trees with different values
    pub modified: Vec<Modified>,
    /// keys present in the first tree but not the second
    pub deleted: Vec<Vec<u8>>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// a key whose value changed between versions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Modified {
    pub key: Vec<u8>,
    pub old_value: Vec<u8>,
    pub new_value: Vec<u8>,
}

/// computes added/modified/deleted keys between two tree roots, pruning
/// subtrees whose digests match
pub struct DiffEngine {
    cas: Arc<dyn Cas>,
}

impl DiffEngine {
    pub fn new(cas: Arc<dyn Cas>) -> Self {
        Self { cas }
    }

    /// diff the trees rooted at `a` and `b`. equal roots return an empty
    /// result without loading a single node.
    pub fn diff(&self, a: Hash, b: Hash) -> Result<DiffResult> {
        let mut result = DiffResult::default();

        if a == b {
            return Ok(result);
        }

        let node_a = self.load(a)?;
        let node_b = self.load(b)?;
        self.diff_nodes(&node_a, &node_b, &mut result)?;

        Ok(result)
    }

    fn load(&self, hash: Hash) -> Result<Node> {
        let data = self.cas.read(hash)?;
        Node::decode(&data)
    }

    fn diff_nodes(&self, a: &Node, b: &Node, out: &mut DiffResult) -> Result<()> {
        match (a, b) {
            (Node::Leaf(pairs_a), Node::Leaf(pairs_b)) => {
                diff_pair_lists(pairs_a, pairs_b, out);
                Ok(())
            }
            (Node::Internal(children_a), Node::Internal(children_b)) => {
                self.diff_internal(children_a, children_b, out)
            }
            // the trees have different depths here; compare full pair lists
            _ => {
                let pairs_a = self.collect_pairs(a)?;
                let pairs_b = self.collect_pairs(b)?;
                diff_pair_lists(&pairs_a, &pairs_b, out);
                Ok(())
            }
        }
    }

    fn diff_internal(
        &self,
        children_a: &[ChildRef],
        children_b: &[ChildRef],
        out: &mut DiffResult,
    ) -> Result<()> {
        let aligned = children_a.len() == children_b.len()
            && children_a
                .iter()
                .zip(children_b)
                .all(|(x, y)| x.key == y.key);

        if aligned {
            for (x, y) in children_a.iter().zip(children_b) {
                if x.hash == y.hash {
                    // identical subtree, skip entirely
                    continue;
                }
                let node_a = self.load(x.hash)?;
                let node_b = self.load(y.hash)?;
                self.diff_nodes(&node_a, &node_b, out)?;
            }
            return Ok(());
        }

        // chunk boundaries shifted between versions, so children cannot be
        // compared position by position. fall back to collecting both sides
        // in full: the aligned path above is the optimization, this is the
        // correctness guarantee.
        let pairs_a = self.collect_from_children(children_a)?;
        let pairs_b = self.collect_from_children(children_b)?;
        diff_pair_lists(&pairs_a, &pairs_b, out);
        Ok(())
    }

    fn collect_pairs(&self, node: &Node) -> Result<Vec<Pair>> {
        let mut pairs = Vec::new();
        self.collect_into(node, &mut pairs)?;
        Ok(pairs)
    }

    fn collect_from_children(&self, children: &[ChildRef]) -> Result<Vec<Pair>> {
        let mut pairs = Vec::new();
        for child in children {
            let node = self.load(child.hash)?;
            self.collect_into(&node, &mut pairs)?;
        }
        Ok(pairs)
    }

    fn collect_into(&self, node: &Node, out: &mut Vec<Pair>) -> Result<()> {
        match node {
            Node::Leaf(pairs) => out.extend_from_slice(pairs),
            Node::Internal(children) => {
                for child in children {
                    let child_node = self.load(child.hash)?;
                    self.collect_into(&child_node, out)?;
                }
            }
        }
        Ok(())
    }
}

/// merge-walk two sorted pair lists, classifying each key
fn diff_pair_lists(a: &[Pair], b: &[Pair], out: &mut DiffResult) {
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].key.cmp(&b[j].key) {
            Ordering::Less => {
                out.deleted.push(a[i].key.clone());
                i += 1;
            }
            Ordering::Greater => {
                out.added.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                if a[i].value != b[j].value {
                    out.modified.push(Modified {
                        key: a[i].key.clone(),
                        old_value: a[i].value.clone(),
                        new_value: b[j].value.clone(),
                    });
                }
                i += 1;
                j += 1;
            }
        }
    }

    for pair in &a[i..] {
        out.deleted.push(pair.key.clone());
    }
    for pair in &b[j..] {
        out.added.push(pair.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::{FileCas, TrackingCas};
    use crate::chunker::{Chunker, ChunkerParams};
    use crate::tree::builder::TreeBuilder;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        tracking: Arc<TrackingCas>,
        builder: TreeBuilder,
        differ: DiffEngine,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let inner: Arc<dyn Cas> = Arc::new(FileCas::open(dir.path()).unwrap());
        let tracking = Arc::new(TrackingCas::new(inner));
        let cas: Arc<dyn Cas> = Arc::clone(&tracking) as Arc<dyn Cas>;

        let params = ChunkerParams {
            target_size: 64,
            min_size: 16,
            max_size: 256,
        };

        Fixture {
            _dir: dir,
            tracking,
            builder: TreeBuilder::new(Arc::clone(&cas), Chunker::new(params)),
            differ: DiffEngine::new(cas),
        }
    }

    fn make_pairs(n: usize) -> Vec<Pair> {
        (0..n)
            .map(|i| Pair::new(format!("key:{i:05}"), format!("value-{i}")))
            .collect()
    }

    #[test]
    fn test_equal_roots_empty_diff_zero_reads() {
        let fx = fixture();
        let root = fx.builder.build(&make_pairs(200)).unwrap();

        fx.tracking.reset_stats();
        let result = fx.differ.diff(root, root).unwrap();

        assert!(result.is_empty());
        assert_eq!(fx.tracking.stats().reads, 0);
    }

    #[test]
    fn test_diff_added_key() {
        let fx = fixture();
        let pairs = make_pairs(100);
        let root_a = fx.builder.build(&pairs).unwrap();

        let mut edited = pairs.clone();
        edited.push(Pair::new("zzz", "new"));
        let root_b = fx.builder.build(&edited).unwrap();

        let result = fx.differ.diff(root_a, root_b).unwrap();
        assert_eq!(result.added, vec![Pair::new("zzz", "new")]);
        assert!(result.modified.is_empty());
        assert!(result.deleted.is_empty());
    }

    #[test]
    fn test_diff_deleted_key() {
        let fx = fixture();
        let pairs = make_pairs(100);
        let root_a = fx.builder.build(&pairs).unwrap();

        let mut edited = pairs.clone();
        edited.remove(50);
        let root_b = fx.builder.build(&edited).unwrap();

        let result = fx.differ.diff(root_a, root_b).unwrap();
        assert!(result.added.is_empty());
        assert!(result.modified.is_empty());
        assert_eq!(result.deleted, vec![pairs[50].key.clone()]);
    }

    #[test]
    fn test_diff_modified_key() {
        let fx = fixture();
        let pairs = make_pairs(100);
        let root_a = fx.builder.build(&pairs).unwrap();

        let mut edited = pairs.clone();
        edited[30].value = b"changed".to_vec();
        let root_b = fx.builder.build(&edited).unwrap();

        let result = fx.differ.diff(root_a, root_b).unwrap();
        assert!(result.added.is_empty());
        assert!(result.deleted.is_empty());
        assert_eq!(
            result.modified,
            vec![Modified {
                key: pairs[30].key.clone(),
                old_value: pairs[30].value.clone(),
                new_value: b"changed".to_vec(),
            }]
        );
    }

    #[test]
    fn test_diff_matches_oracle() {
        let fx = fixture();

        // overlapping key ranges with disjoint edges and value changes in
        // the shared middle
        let a: Vec<Pair> = (0..300)
            .map(|i| Pair::new(format!("k:{i:04}"), format!("a-{i}")))
            .collect();
        let b: Vec<Pair> = (100..400)
            .map(|i| {
                let value = if i % 7 == 0 {
                    format!("b-{i}")
                } else {
                    format!("a-{i}")
                };
                Pair::new(format!("k:{i:04}"), value)
            })
            .collect();

        let root_a = fx.builder.build(&a).unwrap();
        let root_b = fx.builder.build(&b).unwrap();
        let result = fx.differ.diff(root_a, root_b).unwrap();

        // oracle by brute force over the raw pair lists
        let mut expected = DiffResult::default();
        diff_pair_lists(&a, &b, &mut expected);

        assert_eq!(result, expected);
        assert_eq!(result.deleted.len(), 100);
        assert_eq!(result.added.len(), 100);
        assert_eq!(result.modified.len(), (100..300).filter(|i| i % 7 == 0).count());
    }

    #[test]
    fn test_diff_symmetry() {
        let fx = fixture();

        let a = make_pairs(200);
        let mut b = a.clone();
        b[10].value = b"swapped".to_vec();
        b.remove(150);
        b.push(Pair::new("tail", "added"));

        let root_a = fx.builder.build(&a).unwrap();
        let root_b = fx.builder.build(&b).unwrap();

        let forward = fx.differ.diff(root_a, root_b).unwrap();
        let backward = fx.differ.diff(root_b, root_a).unwrap();

        let forward_added_keys: Vec<_> = forward.added.iter().map(|p| p.key.clone()).collect();
        assert_eq!(forward_added_keys, backward.deleted);

        let backward_added_keys: Vec<_> = backward.added.iter().map(|p| p.key.clone()).collect();
        assert_eq!(backward_added_keys, forward.deleted);

        assert_eq!(forward.modified.len(), backward.modified.len());
        for (f, b) in forward.modified.iter().zip(&backward.modified) {
            assert_eq!(f.key, b.key);
            assert_eq!(f.old_value, b.new_value);
            assert_eq!(f.new_value, b.old_value);
        }
    }

    #[test]
    fn test_diff_empty_vs_populated() {
        let fx = fixture();
        let pairs = make_pairs(50);

        let empty = fx.builder.build(&[]).unwrap();
        let full = fx.builder.build(&pairs).unwrap();

        let result = fx.differ.diff(empty, full).unwrap();
        assert_eq!(result.added, pairs);
        assert!(result.modified.is_empty());
        assert!(result.deleted.is_empty());
    }

    #[test]
    fn test_diff_mixed_depths() {
        let fx = fixture();

        // a single-leaf tree against a multi-level tree over the same range
        let small = vec![Pair::new("key:00000", "value-0")];
        let large = make_pairs(500);

        let root_small = fx.builder.build(&small).unwrap();
        let root_large = fx.builder.build(&large).unwrap();

        let result = fx.differ.diff(root_small, root_large).unwrap();
        assert_eq!(result.added.len(), 499);
        assert!(result.deleted.is_empty());
        assert!(result.modified.is_empty());
    }

    #[test]
    fn test_aligned_path_skips_shared_subtrees() {
        let fx = fixture();
        let cas: Arc<dyn Cas> = Arc::clone(&fx.tracking) as Arc<dyn Cas>;

        // two roots sharing their left child; only the right child differs
        let left = Node::Leaf(vec![Pair::new("a", "1"), Pair::new("b", "2")]);
        let right_a = Node::Leaf(vec![Pair::new("m", "old")]);
        let right_b = Node::Leaf(vec![Pair::new("m", "new")]);

        let left_hash = cas.write(&left.encode()).unwrap();
        let right_a_hash = cas.write(&right_a.encode()).unwrap();
        let right_b_hash = cas.write(&right_b.encode()).unwrap();

        let root_a = Node::Internal(vec![
            ChildRef {
                key: b"a".to_vec(),
                hash: left_hash,
            },
            ChildRef {
                key: b"m".to_vec(),
                hash: right_a_hash,
            },
        ]);
        let root_b = Node::Internal(vec![
            ChildRef {
                key: b"a".to_vec(),
                hash: left_hash,
            },
            ChildRef {
                key: b"m".to_vec(),
                hash: right_b_hash,
            },
        ]);
        let root_a_hash = cas.write(&root_a.encode()).unwrap();
        let root_b_hash = cas.write(&root_b.encode()).unwrap();

        fx.tracking.reset_stats();
        let result = fx.differ.diff(root_a_hash, root_b_hash).unwrap();

        assert_eq!(result.modified.len(), 1);
        assert_eq!(result.modified[0].key, b"m");
        // two roots plus the two differing children; the shared left subtree
        // is never loaded
        assert_eq!(fx.tracking.stats().reads, 4);
    }

    #[test]
    fn test_misaligned_fallback_is_correct() {
        let fx = fixture();
        let cas: Arc<dyn Cas> = Arc::clone(&fx.tracking) as Arc<dyn Cas>;

        // same pairs, different chunk boundaries: children do not align, so
        // the engine must fall back to full pair-list comparison
        let all = vec![
            Pair::new("a", "1"),
            Pair::new("b", "2"),
            Pair::new("c", "3"),
            Pair::new("d", "4"),
        ];

        let split_a = (
            Node::Leaf(all[..2].to_vec()),
            Node::Leaf(all[2..].to_vec()),
        );
        let split_b = (
            Node::Leaf(all[..1].to_vec()),
            Node::Leaf(all[1..].to_vec()),
        );

        let mut roots = Vec::new();
        for (left, right) in [split_a, split_b] {
            let left_key = match &left {
                Node::Leaf(pairs) => pairs[0].key.clone(),
                Node::Internal(_) => unreachable!(),
            };
            let right_key = match &right {
                Node::Leaf(pairs) => pairs[0].key.clone(),
                Node::Internal(_) => unreachable!(),
            };
            let root = Node::Internal(vec![
                ChildRef {
                    key: left_key,
                    hash: cas.write(&left.encode()).unwrap(),
                },
                ChildRef {
                    key: right_key,
                    hash: cas.write(&right.encode()).unwrap(),
                },
            ]);
            roots.push(cas.write(&root.encode()).unwrap());
        }

        let result = fx.differ.diff(roots[0], roots[1]).unwrap();
        assert!(result.is_empty(), "same pairs must diff empty: {result:?}");
    }
}
