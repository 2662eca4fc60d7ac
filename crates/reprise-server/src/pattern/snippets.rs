//! Static registry of regex fragments offered by the editor.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Bumped whenever the snippet list changes, so clients can cache it.
pub const SNIPPET_REGISTRY_VERSION: u32 = 1;

/// Group name used for the named variant of each snippet.
pub const DEFAULT_GROUP_NAME: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub pattern: &'static str,
    pub description: &'static str,
}

pub const SNIPPETS: &[Snippet] = &[
    Snippet {
        pattern: r"\d+",
        description: "one or more digits",
    },
    Snippet {
        pattern: r"[^<]+",
        description: "XML element content",
    },
    Snippet {
        pattern: r#"[^"]+"#,
        description: "XML attribute value",
    },
    Snippet {
        pattern: r".*",
        description: "any characters",
    },
];

impl Snippet {
    /// The snippet wrapped in a named capture group.
    pub fn named(&self, group: &str) -> String {
        format!("(?<{group}>{})", self.pattern)
    }
}

/// Every plain snippet followed by every named variant.
pub fn completions() -> Vec<String> {
    SNIPPETS
        .iter()
        .map(|s| s.pattern.to_string())
        .chain(SNIPPETS.iter().map(|s| s.named(DEFAULT_GROUP_NAME)))
        .collect()
}

/// Snippets that fully match `text`, most specific first.
pub fn suggest(text: &str) -> Vec<&'static Snippet> {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    let compiled = COMPILED.get_or_init(|| {
        SNIPPETS
            .iter()
            .filter_map(|s| super::compile_field(s.pattern).ok())
            .collect()
    });
    SNIPPETS
        .iter()
        .zip(compiled)
        .filter(|(_, regex)| regex.is_match(text))
        .map(|(snippet, _)| snippet)
        .collect()
}
