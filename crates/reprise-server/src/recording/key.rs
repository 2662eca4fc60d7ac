//! Hierarchical recording keys.
//!
//! Keys are `/`-separated paths relative to the repository root. A key ending
//! in `/` names a directory; the empty key is the root directory.

/// Drop leading slashes so `/a/b` and `a/b` name the same entry.
pub fn normalize(key: &str) -> &str {
    key.trim_start_matches('/')
}

pub fn is_directory(key: &str) -> bool {
    key.is_empty() || key.ends_with('/')
}

/// Last path component, without the trailing slash of a directory.
pub fn basename(key: &str) -> &str {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Directory containing the key, with trailing slash. The root's parent is the root.
pub fn parent(key: &str) -> &str {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..=idx],
        None => "",
    }
}

/// Every directory above the key, root first, excluding the key itself.
pub fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    std::iter::once("").chain(
        trimmed
            .match_indices('/')
            .map(move |(idx, _)| &trimmed[..=idx]),
    )
}

/// Key of `source` after a move or copy to `target`.
///
/// A target ending in `/` is a destination directory and receives the source
/// basename. Any other target is the new name. Directory sources keep their
/// trailing slash.
pub fn relocate(source: &str, target: &str) -> String {
    let target = normalize(target);
    let mut destination = if is_directory(target) {
        format!("{target}{}", basename(source))
    } else {
        target.to_string()
    };
    if is_directory(source) && !destination.ends_with('/') {
        destination.push('/');
    }
    destination
}

/// Reject keys with empty or dot segments.
pub fn check(key: &str) -> Result<(), &'static str> {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    if trimmed.is_empty() {
        return Ok(());
    }
    for segment in trimmed.split('/') {
        match segment {
            "" => return Err("empty path segment"),
            "." | ".." => return Err("relative path segment"),
            _ => {}
        }
    }
    Ok(())
}
