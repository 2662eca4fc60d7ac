//! Save-time validation of recording documents.

use super::types::Recording;
use crate::behaviors::MAX_DELAY_MS;
use crate::pattern::{compile_field, RequestField};
use crate::template::template_variables;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid regex for field '{field}': {message}")]
    InvalidPattern { field: RequestField, message: String },

    #[error("recording must have at least one response template")]
    NoResponseTemplates,

    #[error("response template {index}: weight must not be negative (got {weight})")]
    NegativeWeight { index: usize, weight: i64 },

    #[error("response template {index}: {name} must be between 0 and {MAX_DELAY_MS} ms (got {value})")]
    DelayOutOfRange {
        index: usize,
        name: &'static str,
        value: i64,
    },
}

impl Recording {
    /// Check everything that must hold before a document is stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in RequestField::ALL {
            if let Err(err) = compile_field(self.request_pattern.get(field)) {
                return Err(ValidationError::InvalidPattern {
                    field,
                    message: err.to_string(),
                });
            }
        }

        if self.response_templates.is_empty() {
            return Err(ValidationError::NoResponseTemplates);
        }

        let limit = i64::try_from(MAX_DELAY_MS).unwrap_or(i64::MAX);
        for (index, template) in self.response_templates.iter().enumerate() {
            if template.weight < 0 {
                return Err(ValidationError::NegativeWeight {
                    index,
                    weight: template.weight,
                });
            }
            for (name, value) in [
                ("delayMin", template.delay_min),
                ("delayMean", template.delay_mean),
                ("delayMax", template.delay_max),
            ] {
                if !(0..=limit).contains(&value) {
                    return Err(ValidationError::DelayOutOfRange { index, name, value });
                }
            }
        }
        Ok(())
    }

    /// Non-fatal configuration problems worth showing to the editor.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.response_templates.is_empty()
            && self.response_templates.iter().all(|t| t.weight == 0)
        {
            warnings.push(
                "all response weights are zero; the first response will always be returned"
                    .to_string(),
            );
        }
        for (index, template) in self.response_templates.iter().enumerate() {
            if template.delay_max < template.delay_min {
                warnings.push(format!(
                    "response template {index}: delayMax is below delayMin and is treated as delayMin"
                ));
            }
        }
        warnings.extend(self.unresolved_variables());
        warnings
    }

    /// Template variables that no capture group of the pattern can satisfy.
    fn unresolved_variables(&self) -> Vec<String> {
        let groups = self.capture_groups();
        let mut warnings = Vec::new();
        for (index, template) in self.response_templates.iter().enumerate() {
            for text in [&template.code, &template.header, &template.content] {
                for variable in template_variables(text) {
                    let resolved = match &variable.field {
                        Some(name) => RequestField::parse(name)
                            .and_then(|field| groups.get(&field))
                            .is_some_and(|names| names.contains(&variable.group)),
                        None => groups.values().any(|names| names.contains(&variable.group)),
                    };
                    if !resolved {
                        let token = match &variable.field {
                            Some(field) => format!("${field}:{}$", variable.group),
                            None => format!("${}$", variable.group),
                        };
                        warnings.push(format!(
                            "response template {index}: {token} does not match any capture group and renders empty"
                        ));
                    }
                }
            }
        }
        warnings
    }

    /// Group names and ordinals addressable in each field.
    fn capture_groups(&self) -> BTreeMap<RequestField, BTreeSet<String>> {
        let mut groups = BTreeMap::new();
        for field in RequestField::ALL {
            let Ok(regex) = compile_field(self.request_pattern.get(field)) else {
                continue;
            };
            let names: &mut BTreeSet<String> = groups.entry(field).or_default();
            // Ordinal 0 is the whole match.
            for (index, name) in regex.capture_names().enumerate() {
                names.insert(index.to_string());
                if let Some(name) = name {
                    names.insert(name.to_string());
                }
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::ResponseTemplate;

    #[test]
    fn test_empty_recording_is_valid() {
        assert_eq!(Recording::empty().validate(), Ok(()));
        assert!(Recording::empty().warnings().is_empty());
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let mut recording = Recording::empty();
        recording.request_pattern.query = "a=(".into();
        let err = recording.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidPattern {
                field: RequestField::Query,
                ..
            }
        ));
    }

    #[test]
    fn test_no_templates_is_rejected() {
        let mut recording = Recording::empty();
        recording.response_templates.clear();
        assert_eq!(recording.validate(), Err(ValidationError::NoResponseTemplates));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let mut recording = Recording::empty();
        recording.response_templates.push(ResponseTemplate {
            weight: -1,
            ..Default::default()
        });
        assert_eq!(
            recording.validate(),
            Err(ValidationError::NegativeWeight {
                index: 1,
                weight: -1
            })
        );
    }

    #[test]
    fn test_delay_bounds() {
        let mut recording = Recording::empty();
        recording.response_templates[0].delay_max = 3_600_000;
        assert_eq!(recording.validate(), Ok(()));

        recording.response_templates[0].delay_max = 3_600_001;
        assert!(matches!(
            recording.validate(),
            Err(ValidationError::DelayOutOfRange {
                name: "delayMax",
                ..
            })
        ));

        recording.response_templates[0].delay_max = 0;
        recording.response_templates[0].delay_min = -5;
        assert!(matches!(
            recording.validate(),
            Err(ValidationError::DelayOutOfRange {
                name: "delayMin",
                value: -5,
                ..
            })
        ));
    }

    #[test]
    fn test_all_zero_weights_warns() {
        let mut recording = Recording::empty();
        recording.response_templates[0].weight = 0;
        assert_eq!(recording.validate(), Ok(()));
        assert_eq!(recording.warnings().len(), 1);
    }

    #[test]
    fn test_unresolved_template_variables_warn() {
        let mut recording = Recording::empty();
        recording.request_pattern.path = r"/orders/(?<id>\d+)/(\w+)".into();
        recording.response_templates[0].content =
            "$path:id$ $path:2$ $id$ $$ $query:id$ $sku$ $nofield:id$".into();
        let warnings = recording.warnings();
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].contains("$query:id$"));
        assert!(warnings[1].contains("$sku$"));
        assert!(warnings[2].contains("$nofield:id$"));
    }
}
