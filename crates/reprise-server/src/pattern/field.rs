use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight request fields a pattern matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestField {
    Protocol,
    Host,
    Port,
    Path,
    Query,
    Method,
    Header,
    Content,
}

impl RequestField {
    /// All fields in declaration order. Lookups that search every field use this order.
    pub const ALL: [RequestField; 8] = [
        RequestField::Protocol,
        RequestField::Host,
        RequestField::Port,
        RequestField::Path,
        RequestField::Query,
        RequestField::Method,
        RequestField::Header,
        RequestField::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestField::Protocol => "protocol",
            RequestField::Host => "host",
            RequestField::Port => "port",
            RequestField::Path => "path",
            RequestField::Query => "query",
            RequestField::Method => "method",
            RequestField::Header => "header",
            RequestField::Content => "content",
        }
    }

    /// Parse a field name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
