use super::field::RequestField;
use super::request::{compile_field, RequestPattern};
use serde::Serialize;

/// A capture group that response templates can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub field: RequestField,
    /// Group name, or its ordinal when unnamed.
    pub group: String,
}

impl Variable {
    /// The `$field:group$` token that renders this variable.
    pub fn token(&self) -> String {
        format!("${}:{}$", self.field, self.group)
    }
}

/// Capture groups of every field, in field order then group order.
///
/// Fields whose regex does not compile contribute nothing.
pub fn extract_variables(pattern: &RequestPattern) -> Vec<Variable> {
    let mut variables = Vec::new();
    for field in RequestField::ALL {
        let Ok(regex) = compile_field(pattern.get(field)) else {
            continue;
        };
        for (index, name) in regex.capture_names().enumerate().skip(1) {
            let group = name.map_or_else(|| index.to_string(), str::to_string);
            variables.push(Variable { field, group });
        }
    }
    variables
}
