//! Anchoring canonicalization.
//!
//! Stored and transmitted patterns are always `^body$`. Everything inside the
//! crate works with the bare body; these functions are the only place the
//! anchors are added or removed.

/// Wrap a pattern body in `^…$`.
pub fn anchor(body: &str) -> String {
    format!("^{body}$")
}

/// Strip one leading `^` and one trailing unescaped `$`.
///
/// Text without anchors is returned unchanged, so legacy documents holding
/// bare bodies load the same as anchored ones.
pub fn unanchor(text: &str) -> &str {
    let text = text.strip_prefix('^').unwrap_or(text);
    match text.strip_suffix('$') {
        Some(rest) if !ends_with_escape(rest) => rest,
        _ => text,
    }
}

/// Escape a literal captured value so it matches only itself.
pub fn escape_literal(text: &str) -> String {
    regex::escape(text)
}

fn ends_with_escape(text: &str) -> bool {
    let backslashes = text.bytes().rev().take_while(|b| *b == b'\\').count();
    backslashes % 2 == 1
}

/// Serde adapter for pattern bodies: serialize anchored, deserialize bare.
pub(crate) mod anchored {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(body: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::anchor(body))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(super::unanchor(&text).to_string())
    }
}
