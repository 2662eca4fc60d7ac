//! Hierarchical view over the flat key namespace.
//!
//! The tree is rebuilt from a listing (`key -> activated`) and compared
//! structurally with the previous build, so callers redraw only when
//! something actually changed.

use crate::recording::key;
use serde::Serialize;
use std::collections::BTreeMap;

/// Recording counts below a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Aggregate {
    pub files: usize,
    pub activated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Root,
    Directory,
    /// A directory with nothing below it, drawn as a leaf.
    EmptyDirectory,
    Recording,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub text: String,
    pub kind: NodeKind,
    pub activated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingTree {
    pub root: TreeNode,
    pub aggregates: BTreeMap<String, Aggregate>,
}

/// Count recordings under every directory prefix, root included.
///
/// Only leaves are counted; directory keys contribute an entry with zero counts.
pub fn aggregate(listing: &BTreeMap<String, bool>) -> BTreeMap<String, Aggregate> {
    let mut aggregates: BTreeMap<String, Aggregate> = BTreeMap::new();
    aggregates.entry(String::new()).or_default();
    for (path, activated) in listing {
        if key::is_directory(path) {
            for dir in key::ancestors(path).chain(std::iter::once(path.as_str())) {
                aggregates.entry(dir.to_string()).or_default();
            }
            continue;
        }
        for dir in key::ancestors(path) {
            let entry = aggregates.entry(dir.to_string()).or_default();
            entry.files += 1;
            if *activated {
                entry.activated += 1;
            }
        }
    }
    aggregates
}

pub fn build(listing: &BTreeMap<String, bool>) -> RecordingTree {
    let aggregates = aggregate(listing);

    let mut keys: Vec<&str> = listing
        .keys()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));

    let total = aggregates.get("").copied().unwrap_or_default();
    let root = TreeNode {
        id: "/".to_string(),
        text: format!("root ({}/{})", total.activated, total.files),
        kind: NodeKind::Root,
        activated: total.activated > 0,
        children: build_children("", &keys, listing, &aggregates),
    };
    RecordingTree { root, aggregates }
}

enum Group<'a> {
    Directory { name: &'a str, keys: Vec<&'a str> },
    Leaf { name: &'a str, key: &'a str },
}

fn build_children(
    prefix: &str,
    keys: &[&str],
    listing: &BTreeMap<String, bool>,
    aggregates: &BTreeMap<String, Aggregate>,
) -> Vec<TreeNode> {
    let mut groups: Vec<Group> = Vec::new();
    for &full in keys {
        let rest = &full[prefix.len()..];
        if rest.is_empty() {
            continue;
        }
        match rest.find('/') {
            Some(idx) => {
                let name = &rest[..idx];
                let existing = groups.iter_mut().find_map(|g| match g {
                    Group::Directory { name: n, keys } if *n == name => Some(keys),
                    _ => None,
                });
                match existing {
                    Some(keys) => keys.push(full),
                    None => groups.push(Group::Directory {
                        name,
                        keys: vec![full],
                    }),
                }
            }
            None => groups.push(Group::Leaf {
                name: rest,
                key: full,
            }),
        }
    }

    groups
        .into_iter()
        .map(|group| match group {
            Group::Directory { name, keys } => {
                let id = format!("{prefix}{name}/");
                let counts = aggregates.get(&id).copied().unwrap_or_default();
                let children = build_children(&id, &keys, listing, aggregates);
                TreeNode {
                    text: format!("{name} ({}/{})", counts.activated, counts.files),
                    kind: if children.is_empty() {
                        NodeKind::EmptyDirectory
                    } else {
                        NodeKind::Directory
                    },
                    activated: counts.activated > 0,
                    children,
                    id,
                }
            }
            Group::Leaf { name, key } => TreeNode {
                id: key.to_string(),
                text: name.to_string(),
                kind: NodeKind::Recording,
                activated: listing.get(key).copied().unwrap_or(false),
                children: Vec::new(),
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Unchanged,
    Rebuilt,
}

/// Holds the last built tree and reports whether a rebuild changed it.
#[derive(Debug, Default)]
pub struct TreeView {
    current: Option<RecordingTree>,
}

impl TreeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, listing: &BTreeMap<String, bool>, force: bool) -> Refresh {
        let tree = build(listing);
        if !force && self.current.as_ref() == Some(&tree) {
            return Refresh::Unchanged;
        }
        self.current = Some(tree);
        Refresh::Rebuilt
    }

    pub fn current(&self) -> Option<&RecordingTree> {
        self.current.as_ref()
    }
}
