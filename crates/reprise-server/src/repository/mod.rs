//! Recording repository.
//!
//! A flat namespace of `/`-separated keys (recordings and directory
//! placeholders) with a hierarchical, aggregate-counted tree view on top.
//!
//! # Module Structure
//!
//! - `store` - the namespace and its mutations (create, delete, move, copy, activate, save, import)
//! - `tree` - tree building and diff-minimal refresh
//! - `snapshot` - JSON mirror of the namespace
//! - `types` - outcomes and errors

mod snapshot;
mod store;
mod tree;
mod types;

pub use snapshot::{Snapshot, SnapshotEntry};
pub use store::{ActiveRecording, RecordingRepository, StoredRecording};
pub use tree::{aggregate, build as build_tree, Aggregate, NodeKind, RecordingTree, Refresh, TreeNode, TreeView};
pub use types::{ActivationSummary, MatchStatus, Relocation, RepositoryError, SaveOutcome};
