//! prolly tree: bottom-up construction, traversal, and structural diff
//!
//! node boundaries come from content-defined chunking, so the tree's shape
//! depends only on its contents. identical pair sets always produce
//! identical root digests, which is what lets unchanged subtrees deduplicate
//! in storage and lets diffs skip them by digest equality.

pub mod builder;
pub mod diff;
pub mod node;
pub mod reader;

pub use builder::TreeBuilder;
pub use diff::{DiffEngine, DiffResult, Modified};
pub use node::{ChildRef, Node, Pair};
pub use reader::TreeReader;
