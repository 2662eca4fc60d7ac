use super::anchor::{anchor, anchored, escape_literal};
use super::field::RequestField;
use crate::recording::CapturedRequest;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Eight regex bodies, one per request field.
///
/// Bodies are held without anchors; the serde adapter adds `^…$` on the
/// way out and strips it on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestPattern {
    #[serde(default, with = "anchored")]
    pub protocol: String,
    #[serde(default, with = "anchored")]
    pub host: String,
    #[serde(default, with = "anchored")]
    pub port: String,
    #[serde(default, with = "anchored")]
    pub path: String,
    #[serde(default, with = "anchored")]
    pub query: String,
    #[serde(default, with = "anchored")]
    pub method: String,
    #[serde(default, with = "anchored")]
    pub header: String,
    #[serde(default, with = "anchored")]
    pub content: String,
}

/// A field regex that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("invalid regex for field '{field}': {source}")]
pub struct PatternError {
    pub field: RequestField,
    #[source]
    pub source: regex::Error,
}

impl RequestPattern {
    pub fn get(&self, field: RequestField) -> &str {
        match field {
            RequestField::Protocol => &self.protocol,
            RequestField::Host => &self.host,
            RequestField::Port => &self.port,
            RequestField::Path => &self.path,
            RequestField::Query => &self.query,
            RequestField::Method => &self.method,
            RequestField::Header => &self.header,
            RequestField::Content => &self.content,
        }
    }

    pub fn set(&mut self, field: RequestField, body: impl Into<String>) {
        let slot = match field {
            RequestField::Protocol => &mut self.protocol,
            RequestField::Host => &mut self.host,
            RequestField::Port => &mut self.port,
            RequestField::Path => &mut self.path,
            RequestField::Query => &mut self.query,
            RequestField::Method => &mut self.method,
            RequestField::Header => &mut self.header,
            RequestField::Content => &mut self.content,
        };
        *slot = body.into();
    }

    /// Build a pattern that matches exactly the given request.
    ///
    /// Missing fields become empty bodies, which match only the empty string.
    pub fn from_request(request: &CapturedRequest) -> Self {
        let mut pattern = Self::default();
        for field in RequestField::ALL {
            pattern.set(field, escape_literal(request.get(field).unwrap_or("")));
        }
        pattern
    }

    pub fn compile(&self) -> Result<CompiledRequestPattern, PatternError> {
        let mut regexes = Vec::with_capacity(RequestField::ALL.len());
        for field in RequestField::ALL {
            let regex =
                compile_field(self.get(field)).map_err(|source| PatternError { field, source })?;
            regexes.push((field, regex));
        }
        Ok(CompiledRequestPattern { regexes })
    }
}

/// Compile a field body with full-match semantics and `.` matching newlines.
///
/// The body is grouped before anchoring so a top-level alternation cannot
/// escape the anchors.
pub fn compile_field(body: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&anchor(&format!("(?:{body})")))
        .dot_matches_new_line(true)
        .build()
}

/// A `RequestPattern` with all eight regexes compiled.
#[derive(Debug, Clone)]
pub struct CompiledRequestPattern {
    regexes: Vec<(RequestField, Regex)>,
}

impl CompiledRequestPattern {
    pub fn is_match(&self, request: &CapturedRequest) -> bool {
        self.regexes
            .iter()
            .all(|(field, regex)| regex.is_match(request.get(*field).unwrap_or("")))
    }

    /// Match every field and collect capture groups, or `None` if any field fails.
    pub fn captures(&self, request: &CapturedRequest) -> Option<RequestCaptures> {
        let mut fields = BTreeMap::new();
        for (field, regex) in &self.regexes {
            let caps = regex.captures(request.get(*field).unwrap_or(""))?;
            let positional = caps
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect();
            let named = regex
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
                .collect();
            fields.insert(*field, FieldCaptures { named, positional });
        }
        Some(RequestCaptures { fields })
    }
}

/// Capture groups of one field. Index 0 is the whole match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCaptures {
    named: HashMap<String, String>,
    positional: Vec<Option<String>>,
}

impl FieldCaptures {
    /// Look up a group by name, falling back to its ordinal.
    pub fn get(&self, group: &str) -> Option<&str> {
        if let Some(value) = self.named.get(group) {
            return Some(value);
        }
        let index: usize = group.parse().ok()?;
        self.positional.get(index)?.as_deref()
    }
}

/// Capture groups of a matched request, per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCaptures {
    fields: BTreeMap<RequestField, FieldCaptures>,
}

impl RequestCaptures {
    pub fn get(&self, field: RequestField, group: &str) -> Option<&str> {
        self.fields.get(&field)?.get(group)
    }

    /// First field, in `RequestField::ALL` order, that resolves the group.
    pub fn find(&self, group: &str) -> Option<&str> {
        RequestField::ALL
            .into_iter()
            .find_map(|field| self.get(field, group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CapturedRequest {
        CapturedRequest {
            protocol: Some("http".into()),
            host: Some("shop.local".into()),
            port: Some("8080".into()),
            path: Some("/orders/42".into()),
            query: None,
            method: Some("GET".into()),
            header: Some("Accept: */*".into()),
            content: None,
        }
    }

    fn open_pattern() -> RequestPattern {
        let mut pattern = RequestPattern::default();
        for field in RequestField::ALL {
            pattern.set(field, ".*");
        }
        pattern
    }

    #[test]
    fn test_serializes_anchored() {
        let mut pattern = RequestPattern::default();
        pattern.path = r"/orders/\d+".into();
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["path"], r"^/orders/\d+$");
        assert_eq!(json["query"], "^$");

        let back: RequestPattern = serde_json::from_value(json).unwrap();
        assert_eq!(back, pattern);
    }

    #[test]
    fn test_from_request_matches_only_that_request() {
        let original = request();
        let compiled = RequestPattern::from_request(&original).compile().unwrap();
        assert!(compiled.is_match(&original));

        let mut other = original.clone();
        other.path = Some("/orders/43".into());
        assert!(!compiled.is_match(&other));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let regex = compile_field("a|b").unwrap();
        assert!(regex.is_match("a"));
        assert!(regex.is_match("b"));
        assert!(!regex.is_match("ax"));
        assert!(!regex.is_match("xb"));
    }

    #[test]
    fn test_dot_matches_newline() {
        let regex = compile_field(".*").unwrap();
        assert!(regex.is_match("line one\nline two"));
    }

    #[test]
    fn test_compile_reports_field() {
        let mut pattern = open_pattern();
        pattern.header = "(unclosed".into();
        let err = pattern.compile().unwrap_err();
        assert_eq!(err.field, RequestField::Header);
    }

    #[test]
    fn test_captures_by_name_and_index() {
        let mut pattern = open_pattern();
        pattern.path = r"/orders/(?<id>\d+)".into();
        pattern.method = "(GET|POST)".into();
        let caps = pattern.compile().unwrap().captures(&request()).unwrap();

        assert_eq!(caps.get(RequestField::Path, "id"), Some("42"));
        assert_eq!(caps.get(RequestField::Path, "1"), Some("42"));
        assert_eq!(caps.get(RequestField::Method, "1"), Some("GET"));
        assert_eq!(caps.get(RequestField::Method, "2"), None);
        assert_eq!(caps.find("id"), Some("42"));
        assert_eq!(caps.find("missing"), None);
    }
}
