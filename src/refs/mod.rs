//! branch references and the HEAD pointer
//!
//! branches are mutable named pointers to commits, stored one file per
//! branch under `refs/heads/`. HEAD records the store's current position:
//! attached to a branch by name, or detached directly at a commit. all
//! updates go through the same atomic-rename discipline as the object store.

pub mod branch;
pub mod head;

pub use branch::{validate_branch_name, Branches};
pub use head::{Head, HeadFile, DEFAULT_BRANCH};
