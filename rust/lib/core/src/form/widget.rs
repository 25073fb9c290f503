//! Input widgets synthesized from [`ParameterSpec`]s.

use chrono::NaiveDateTime;

use crate::schema::{ParameterKind, ParameterSpec};
use crate::Error;

/// The concrete control a parameter renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetControl {
    Text,
    Number { step: String },
    /// Tri-state select: unset / 是 / 否, travelling as ""/"true"/"false".
    Boolean,
    DateTime,
    Select { options: Vec<String> },
}

/// One rendered parameter input. Values are always strings on the
/// wire, whatever the declared kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterWidget {
    pub spec: ParameterSpec,
    pub value: String,
}

impl ParameterWidget {
    /// Build a widget for a spec. A prior value (from the record being
    /// edited) wins over the spec default; the default applies only
    /// when no prior value exists.
    pub fn synthesize(spec: &ParameterSpec, prior: Option<&str>) -> ParameterWidget {
        let value = match prior {
            Some(v) => v.to_string(),
            None => spec.default_text().unwrap_or_default(),
        };
        ParameterWidget {
            spec: spec.clone(),
            value,
        }
    }

    /// Ad-hoc free-text widget for a key no definition declares.
    pub fn free_text(key: &str, value: &str) -> ParameterWidget {
        ParameterWidget {
            spec: ParameterSpec {
                key: key.to_string(),
                label: None,
                kind: ParameterKind::Text,
                unit: None,
                required: false,
                default: None,
                step: None,
                options: Vec::new(),
            },
            value: value.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.spec.key
    }

    /// Exhaustive kind → control mapping.
    pub fn control(&self) -> WidgetControl {
        match self.spec.kind {
            ParameterKind::Text => WidgetControl::Text,
            ParameterKind::Number => WidgetControl::Number {
                step: self.spec.step_text(),
            },
            ParameterKind::Boolean => WidgetControl::Boolean,
            ParameterKind::Datetime => WidgetControl::DateTime,
            ParameterKind::Select => WidgetControl::Select {
                options: self.spec.options.clone(),
            },
        }
    }

    /// Check the current value against the spec. Required widgets must
    /// be non-empty; typed widgets must parse when non-empty.
    pub fn validate(&self) -> Result<(), Error> {
        let label = self.spec.display_label();

        if self.value.is_empty() {
            if self.spec.required {
                return Err(Error::Validation(format!("参数 {label} 为必填项")));
            }
            return Ok(());
        }

        match self.spec.kind {
            ParameterKind::Text => Ok(()),
            ParameterKind::Number => self
                .value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| Error::Validation(format!("参数 {label} 需要数字"))),
            ParameterKind::Boolean => match self.value.as_str() {
                "true" | "false" => Ok(()),
                _ => Err(Error::Validation(format!(
                    "参数 {label} 仅接受 true/false"
                ))),
            },
            ParameterKind::Datetime => parse_local_datetime(&self.value)
                .map(|_| ())
                .ok_or_else(|| Error::Validation(format!("参数 {label} 的时间格式无效"))),
            ParameterKind::Select => {
                if self.spec.options.iter().any(|o| o == &self.value) {
                    Ok(())
                } else {
                    Err(Error::Validation(format!("参数 {label} 的选项无效")))
                }
            }
        }
    }
}

/// Parse the `datetime-local` shape, with or without seconds. Stored
/// records may carry a space separator instead of the `T`.
pub fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    for format in [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    None
}

/// Synthesize the widget list for an equipment definition, carrying
/// prior values through (used when re-rendering after a code change).
pub fn synthesize_all(
    specs: &[ParameterSpec],
    prior: &std::collections::BTreeMap<String, String>,
) -> Vec<ParameterWidget> {
    specs
        .iter()
        .map(|spec| ParameterWidget::synthesize(spec, prior.get(&spec.key).map(String::as_str)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn spec(json: &str) -> ParameterSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_control_per_kind() {
        let w = ParameterWidget::synthesize(&spec(r#"{"key": "k"}"#), None);
        assert_eq!(w.control(), WidgetControl::Text);

        let w = ParameterWidget::synthesize(
            &spec(r#"{"key": "k", "type": "number", "step": "0.1"}"#),
            None,
        );
        assert_eq!(
            w.control(),
            WidgetControl::Number {
                step: "0.1".to_string()
            }
        );

        let w = ParameterWidget::synthesize(&spec(r#"{"key": "k", "type": "boolean"}"#), None);
        assert_eq!(w.control(), WidgetControl::Boolean);

        let w = ParameterWidget::synthesize(&spec(r#"{"key": "k", "type": "datetime"}"#), None);
        assert_eq!(w.control(), WidgetControl::DateTime);

        let w = ParameterWidget::synthesize(
            &spec(r#"{"key": "k", "type": "select", "options": ["a", "b"]}"#),
            None,
        );
        assert_eq!(
            w.control(),
            WidgetControl::Select {
                options: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_prior_value_wins_over_default() {
        let s = spec(r#"{"key": "temp", "type": "number", "default": 20}"#);
        let w = ParameterWidget::synthesize(&s, Some("35.5"));
        assert_eq!(w.value, "35.5");

        let w = ParameterWidget::synthesize(&s, None);
        assert_eq!(w.value, "20");
    }

    #[test]
    fn test_required_empty_fails() {
        let s = spec(r#"{"key": "temp", "type": "number", "required": true}"#);
        let w = ParameterWidget::synthesize(&s, None);
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_optional_empty_passes() {
        let s = spec(r#"{"key": "temp", "type": "number"}"#);
        let w = ParameterWidget::synthesize(&s, None);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_number_validation() {
        let s = spec(r#"{"key": "temp", "type": "number"}"#);
        let mut w = ParameterWidget::synthesize(&s, Some("12.5"));
        assert!(w.validate().is_ok());
        w.value = "hot".to_string();
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_boolean_tri_state() {
        let s = spec(r#"{"key": "auto", "type": "boolean"}"#);
        for value in ["", "true", "false"] {
            let w = ParameterWidget {
                spec: s.clone(),
                value: value.to_string(),
            };
            assert!(w.validate().is_ok(), "value {value:?} should pass");
        }
        let w = ParameterWidget {
            spec: s.clone(),
            value: "yes".to_string(),
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_datetime_validation() {
        let s = spec(r#"{"key": "at", "type": "datetime"}"#);
        let w = ParameterWidget {
            spec: s.clone(),
            value: "2025-03-01T08:30".to_string(),
        };
        assert!(w.validate().is_ok());
        let w = ParameterWidget {
            spec: s,
            value: "March 1st".to_string(),
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_select_rejects_unknown_option() {
        let s = spec(r#"{"key": "mode", "type": "select", "options": ["高速", "低速"]}"#);
        let w = ParameterWidget {
            spec: s.clone(),
            value: "高速".to_string(),
        };
        assert!(w.validate().is_ok());
        let w = ParameterWidget {
            spec: s,
            value: "中速".to_string(),
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_synthesize_all_carries_prior_values() {
        let specs = vec![
            spec(r#"{"key": "temperature", "type": "number", "default": 20}"#),
            spec(r#"{"key": "pressure", "type": "number"}"#),
        ];
        let mut prior = BTreeMap::new();
        prior.insert("pressure".to_string(), "1.5".to_string());

        let widgets = synthesize_all(&specs, &prior);
        assert_eq!(widgets[0].value, "20");
        assert_eq!(widgets[1].value, "1.5");
    }
}
