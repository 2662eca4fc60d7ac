//! Recording documents and captured interactions.

use crate::behaviors::{DelaySpec, DelayStrategy, ResponseStrategy};
use crate::pattern::{RequestField, RequestPattern};
use serde::{Deserialize, Serialize};

fn default_weight() -> i64 {
    1
}

/// One candidate response of a recording.
///
/// `code`, `header` and `content` are templates: `$$` is a literal dollar and
/// `$field:group$` is replaced by a capture group of the matched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTemplate {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default)]
    pub delay_strategy: DelayStrategy,
    #[serde(default)]
    pub delay_min: i64,
    #[serde(default)]
    pub delay_mean: i64,
    #[serde(default)]
    pub delay_max: i64,
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self {
            code: String::new(),
            header: String::new(),
            content: String::new(),
            weight: default_weight(),
            delay_strategy: DelayStrategy::None,
            delay_min: 0,
            delay_mean: 0,
            delay_max: 0,
        }
    }
}

impl ResponseTemplate {
    /// Weight as seen by the selection engine. Negative weights count as zero.
    pub fn effective_weight(&self) -> u64 {
        u64::try_from(self.weight).unwrap_or(0)
    }

    pub fn delay(&self) -> DelaySpec {
        DelaySpec::new(
            self.delay_strategy,
            self.delay_min,
            self.delay_mean,
            self.delay_max,
        )
    }
}

/// A stored request/response simulation rule.
///
/// Activation is not part of the document; the repository tracks it per key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub response_strategy: ResponseStrategy,
    #[serde(default)]
    pub request_pattern: RequestPattern,
    #[serde(default)]
    pub response_templates: Vec<ResponseTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_request: Option<CapturedRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_response: Option<CapturedResponse>,
}

impl Recording {
    /// A recording that matches only empty requests and returns one empty response.
    pub fn empty() -> Self {
        Self {
            response_templates: vec![ResponseTemplate::default()],
            ..Default::default()
        }
    }

    /// A recording that replays exactly one captured interaction.
    ///
    /// Request values are regex-escaped; response values have `$` doubled so
    /// they render back to themselves.
    pub fn from_interaction(request: CapturedRequest, response: CapturedResponse) -> Self {
        let template = ResponseTemplate {
            code: escape_template(&response.code),
            header: escape_template(&response.header),
            content: escape_template(&response.content),
            ..Default::default()
        };
        Self {
            comment: String::new(),
            response_strategy: ResponseStrategy::Sequential,
            request_pattern: RequestPattern::from_request(&request),
            response_templates: vec![template],
            original_request: Some(request),
            original_response: Some(response),
        }
    }

    pub fn weights(&self) -> Vec<u64> {
        self.response_templates
            .iter()
            .map(ResponseTemplate::effective_weight)
            .collect()
    }
}

/// Escape literal text for use in a response template.
pub fn escape_template(text: &str) -> String {
    text.replace('$', "$$")
}

/// The request a recording was created from. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapturedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CapturedRequest {
    pub fn get(&self, field: RequestField) -> Option<&str> {
        match field {
            RequestField::Protocol => self.protocol.as_deref(),
            RequestField::Host => self.host.as_deref(),
            RequestField::Port => self.port.as_deref(),
            RequestField::Path => self.path.as_deref(),
            RequestField::Query => self.query.as_deref(),
            RequestField::Method => self.method.as_deref(),
            RequestField::Header => self.header.as_deref(),
            RequestField::Content => self.content.as_deref(),
        }
    }
}

/// The response a recording was created from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapturedResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_recording() {
        let recording = Recording::empty();
        assert_eq!(recording.response_templates.len(), 1);
        assert_eq!(recording.response_templates[0].weight, 1);
        assert_eq!(recording.response_strategy, ResponseStrategy::Sequential);

        let json = serde_json::to_value(&recording).unwrap();
        assert_eq!(json["requestPattern"]["path"], "^$");
        assert!(json.get("originalRequest").is_none());
    }

    #[test]
    fn test_template_defaults_when_fields_missing() {
        let template: ResponseTemplate = serde_json::from_str(r#"{"code":"200"}"#).unwrap();
        assert_eq!(template.weight, 1);
        assert_eq!(template.delay_strategy, DelayStrategy::None);
        assert_eq!(template.header, "");
    }

    #[test]
    fn test_effective_weight_of_negative_is_zero() {
        let template = ResponseTemplate {
            weight: -3,
            ..Default::default()
        };
        assert_eq!(template.effective_weight(), 0);
    }

    #[test]
    fn test_from_interaction() {
        let request = CapturedRequest {
            path: Some("/price".into()),
            query: Some("currency=$".into()),
            method: Some("GET".into()),
            ..Default::default()
        };
        let response = CapturedResponse {
            code: "200".into(),
            header: "Content-Type: text/plain".into(),
            content: "cost: $5".into(),
        };
        let recording = Recording::from_interaction(request.clone(), response.clone());

        assert_eq!(recording.request_pattern.query, r"currency=\$");
        assert_eq!(recording.request_pattern.host, "");
        assert_eq!(recording.response_templates[0].content, "cost: $$5");
        assert_eq!(recording.original_request, Some(request.clone()));
        assert_eq!(recording.original_response, Some(response));
        assert!(recording
            .request_pattern
            .compile()
            .unwrap()
            .is_match(&request));
    }

    #[test]
    fn test_document_round_trip() {
        let json = r#"{
            "comment": "orders",
            "responseStrategy": "RANDOM",
            "requestPattern": {"method": "^GET$", "path": "^/orders/(?<id>\\d+)$"},
            "responseTemplates": [
                {"code": "200", "content": "order $path:id$", "weight": 3,
                 "delayStrategy": "NORMAL", "delayMin": 10, "delayMean": 20, "delayMax": 30}
            ]
        }"#;
        let recording: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(recording.response_strategy, ResponseStrategy::Random);
        assert_eq!(recording.request_pattern.path, r"/orders/(?<id>\d+)");
        assert_eq!(recording.response_templates[0].delay_strategy, DelayStrategy::Normal);

        let again: Recording =
            serde_json::from_str(&serde_json::to_string(&recording).unwrap()).unwrap();
        assert_eq!(again, recording);
    }
}
