//! Response template rendering.
//!
//! Response code, header and content are rendered against the capture groups
//! of the matched request.
//!
//! # Syntax
//!
//! - `$field:group$` - capture `group` (name or ordinal) of request `field`
//! - `$group$` - first field, in declaration order, that has the group
//! - `$$` - a literal `$`
//!
//! Field names are case-insensitive. Variables that do not resolve render as
//! empty text. A lone `$` with no closing `$` is kept as is.
//!
//! # Example
//!
//! ```text
//! pattern path: ^/orders/(?<id>\d+)$
//! template:     {"order": "$path:id$", "price": "$$10"}
//! rendered:     {"order": "42", "price": "$10"}
//! ```

use crate::pattern::{RequestCaptures, RequestField};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// `$$` or `$name$`, tried in that order at each position.
static VARIABLE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_variable_regex() -> &'static Regex {
    VARIABLE_REGEX.get_or_init(|| Regex::new(r"\$\$|\$([^$]*)\$").unwrap())
}

/// A variable reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVariable {
    /// Raw field name as written, if any.
    pub field: Option<String>,
    pub group: String,
}

impl TemplateVariable {
    fn parse(name: &str) -> Self {
        match name.split_once(':') {
            Some((field, group)) => Self {
                field: Some(field.to_string()),
                group: group.to_string(),
            },
            None => Self {
                field: None,
                group: name.to_string(),
            },
        }
    }

    fn resolve<'a>(&self, captures: &'a RequestCaptures) -> Option<&'a str> {
        match &self.field {
            Some(field) => captures.get(RequestField::parse(field)?, &self.group),
            None => captures.find(&self.group),
        }
    }
}

/// Substitute every variable in `template`.
pub fn render_template(template: &str, captures: &RequestCaptures) -> String {
    if !template.contains('$') {
        return template.to_string();
    }
    get_variable_regex()
        .replace_all(template, |caps: &Captures| match caps.get(1) {
            None => "$".to_string(),
            Some(name) => TemplateVariable::parse(name.as_str())
                .resolve(captures)
                .unwrap_or_default()
                .to_string(),
        })
        .into_owned()
}

/// Variable references in `template`, in order of appearance.
pub fn template_variables(template: &str) -> Vec<TemplateVariable> {
    get_variable_regex()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|name| TemplateVariable::parse(name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RequestPattern;
    use crate::recording::CapturedRequest;

    fn captures() -> RequestCaptures {
        let mut pattern = RequestPattern::default();
        for field in RequestField::ALL {
            pattern.set(field, ".*");
        }
        pattern.path = r"/orders/(?<id>\d+)".into();
        pattern.query = r"page=(\d+)".into();
        let request = CapturedRequest {
            path: Some("/orders/42".into()),
            query: Some("page=3".into()),
            ..Default::default()
        };
        pattern.compile().unwrap().captures(&request).unwrap()
    }

    #[test]
    fn test_render_field_variable() {
        let out = render_template(r#"{"order":"$path:id$"}"#, &captures());
        assert_eq!(out, r#"{"order":"42"}"#);
    }

    #[test]
    fn test_render_ordinal_and_case_insensitive_field() {
        assert_eq!(render_template("page $QUERY:1$", &captures()), "page 3");
    }

    #[test]
    fn test_render_fieldless_variable() {
        assert_eq!(render_template("id=$id$", &captures()), "id=42");
    }

    #[test]
    fn test_render_escaped_dollar() {
        assert_eq!(render_template("cost: $$10", &captures()), "cost: $10");
        assert_eq!(render_template("$$path:id$$", &captures()), "$path:id$");
    }

    #[test]
    fn test_unresolved_renders_empty() {
        assert_eq!(render_template("[$path:nope$]", &captures()), "[]");
        assert_eq!(render_template("[$body:id$]", &captures()), "[]");
    }

    #[test]
    fn test_lone_dollar_is_kept() {
        assert_eq!(render_template("costs $5", &captures()), "costs $5");
    }

    #[test]
    fn test_template_variables() {
        let vars = template_variables("$path:id$ $$ $name$");
        assert_eq!(
            vars,
            vec![
                TemplateVariable {
                    field: Some("path".into()),
                    group: "id".into()
                },
                TemplateVariable {
                    field: None,
                    group: "name".into()
                },
            ]
        );
    }
}
