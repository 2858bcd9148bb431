//! Props processing: validation and coercion of caller input.
//!
//! [`apply_processors_and_validators`] turns an untrusted raw input bag
//! into either a normalized processed bag or a per-field error set. All
//! field errors are aggregated — the caller sees every invalid field in
//! one round trip, never just the first.
//!
//! The function is pure: same raw input and schema always yield the same
//! result, and the raw bag is never mutated.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use flowdeck_types::{AUTHENTICATION_PROPERTY_NAME, InputBag};

use crate::props::{InputPropertyMap, PieceAuthProperty, PieceProperty, PropertyType};

/// Per-field validation errors, keyed by field name.
///
/// A non-empty set is terminal for the request: execution never starts.
pub type ValidationErrorSet = BTreeMap<String, Vec<String>>;

/// Options for props processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorOptions {
    /// Report raw fields that are not declared in the schema as errors
    /// instead of silently dropping them.
    pub strict_unknown_fields: bool,
}

/// Result of processing a raw input bag against a schema.
#[derive(Debug, Clone, Default)]
pub struct ProcessedProps {
    /// Normalized bag containing every declared field that resolved.
    pub processed_input: InputBag,
    /// Per-field errors; empty on success.
    pub errors: ValidationErrorSet,
}

impl ProcessedProps {
    /// Whether the input passed validation.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate and coerce a raw input bag against an action's schema.
///
/// For every declared field: read the raw value (missing falls back to
/// the declared default, then to a type default or omission), coerce it
/// to the declared type, and record an error when coercion fails or a
/// required value is absent. When `require_auth` is set and the piece
/// declares an auth property, the reserved `auth` key is treated as an
/// additional required field.
///
/// Validation problems never surface as `Err` anywhere — they land in
/// the returned error set.
pub fn apply_processors_and_validators(
    raw: &InputBag,
    props: &InputPropertyMap,
    auth: Option<&PieceAuthProperty>,
    require_auth: bool,
    options: &ProcessorOptions,
) -> ProcessedProps {
    let mut processed = InputBag::new();
    let mut errors = ValidationErrorSet::new();

    for (name, prop) in props {
        let raw_value = raw
            .get(name)
            .filter(|v| !v.is_null())
            .cloned()
            .or_else(|| prop.default_value.clone());

        match coerce_field(raw_value, prop) {
            FieldOutcome::Value(value) => {
                processed.insert(name.clone(), value);
            }
            FieldOutcome::Omitted => {}
            FieldOutcome::Invalid(field_errors) => {
                errors.insert(name.clone(), field_errors);
            }
        }
    }

    // The credential rides in the raw bag under the reserved key, injected
    // by the orchestrating service when a connection was resolved.
    if auth.is_some() {
        match raw.get(AUTHENTICATION_PROPERTY_NAME).filter(|v| !v.is_null()) {
            Some(value) => {
                processed.insert(AUTHENTICATION_PROPERTY_NAME.to_string(), value.clone());
            }
            None if require_auth => {
                errors.insert(
                    AUTHENTICATION_PROPERTY_NAME.to_string(),
                    vec!["required".to_string()],
                );
            }
            None => {}
        }
    }

    if options.strict_unknown_fields {
        for name in raw.keys() {
            if !props.contains_key(name) && name != AUTHENTICATION_PROPERTY_NAME {
                errors
                    .entry(name.clone())
                    .or_default()
                    .push("unknown field".to_string());
            }
        }
    }

    ProcessedProps {
        processed_input: processed,
        errors,
    }
}

enum FieldOutcome {
    /// The field resolved to this processed value.
    Value(Value),
    /// Optional field with no value; left out of the processed bag.
    Omitted,
    /// The field failed validation.
    Invalid(Vec<String>),
}

fn coerce_field(raw: Option<Value>, prop: &PieceProperty) -> FieldOutcome {
    let Some(value) = raw else {
        return missing_field(prop);
    };

    match &prop.property_type {
        PropertyType::ShortText | PropertyType::LongText | PropertyType::SecretText => {
            coerce_text(value, prop)
        }
        PropertyType::Number => coerce_number(value),
        PropertyType::Checkbox => coerce_checkbox(value),
        PropertyType::Json => coerce_json(value, |_| true, "invalid JSON"),
        PropertyType::Array => coerce_json(value, Value::is_array, "expected an array"),
        PropertyType::Object => coerce_json(value, Value::is_object, "expected an object"),
        PropertyType::StaticDropdown { options } => {
            if options.contains(&value) {
                FieldOutcome::Value(value)
            } else {
                FieldOutcome::Invalid(vec!["is not a valid option".to_string()])
            }
        }
    }
}

fn missing_field(prop: &PieceProperty) -> FieldOutcome {
    if prop.required {
        return FieldOutcome::Invalid(vec!["required".to_string()]);
    }
    // Optional checkboxes materialize as false so actions never see a
    // tri-state boolean.
    match prop.property_type {
        PropertyType::Checkbox => FieldOutcome::Value(Value::Bool(false)),
        _ => FieldOutcome::Omitted,
    }
}

fn coerce_text(value: Value, prop: &PieceProperty) -> FieldOutcome {
    let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return FieldOutcome::Invalid(vec!["expected text".to_string()]),
    };
    if prop.required && text.is_empty() {
        return FieldOutcome::Invalid(vec!["required".to_string()]);
    }
    FieldOutcome::Value(Value::String(text))
}

fn coerce_number(value: Value) -> FieldOutcome {
    match value {
        Value::Number(n) => FieldOutcome::Value(Value::Number(n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return FieldOutcome::Value(Value::Number(Number::from(i)));
            }
            if let Ok(f) = trimmed.parse::<f64>()
                && let Some(n) = Number::from_f64(f)
            {
                return FieldOutcome::Value(Value::Number(n));
            }
            FieldOutcome::Invalid(vec!["must be a number".to_string()])
        }
        _ => FieldOutcome::Invalid(vec!["must be a number".to_string()]),
    }
}

fn coerce_checkbox(value: Value) -> FieldOutcome {
    match value {
        Value::Bool(b) => FieldOutcome::Value(Value::Bool(b)),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => FieldOutcome::Value(Value::Bool(true)),
            "false" => FieldOutcome::Value(Value::Bool(false)),
            _ => FieldOutcome::Invalid(vec!["must be a boolean".to_string()]),
        },
        _ => FieldOutcome::Invalid(vec!["must be a boolean".to_string()]),
    }
}

fn coerce_json(value: Value, accepts: fn(&Value) -> bool, message: &str) -> FieldOutcome {
    let candidate = match value {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed) => parsed,
            Err(_) => return FieldOutcome::Invalid(vec![message.to_string()]),
        },
        other => other,
    };
    if accepts(&candidate) {
        FieldOutcome::Value(candidate)
    } else {
        FieldOutcome::Invalid(vec![message.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::AuthScheme;
    use serde_json::json;

    fn bag(value: Value) -> InputBag {
        value.as_object().cloned().unwrap_or_default()
    }

    fn number_schema() -> InputPropertyMap {
        let mut props = InputPropertyMap::new();
        props.insert(
            "amount".to_string(),
            PieceProperty::new("Amount", PropertyType::Number, true),
        );
        props
    }

    #[test]
    fn missing_required_field_reports_required() {
        let result = apply_processors_and_validators(
            &InputBag::new(),
            &number_schema(),
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(result.errors.get("amount"), Some(&vec!["required".to_string()]));
        assert!(!result.is_valid());
    }

    #[test]
    fn numeric_string_is_coerced() {
        let result = apply_processors_and_validators(
            &bag(json!({"amount": "42"})),
            &number_schema(),
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert!(result.is_valid());
        assert_eq!(result.processed_input.get("amount"), Some(&json!(42)));
    }

    #[test]
    fn float_string_is_coerced() {
        let result = apply_processors_and_validators(
            &bag(json!({"amount": "3.5"})),
            &number_schema(),
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(result.processed_input.get("amount"), Some(&json!(3.5)));
    }

    #[test]
    fn non_numeric_value_is_an_error_not_a_panic() {
        let result = apply_processors_and_validators(
            &bag(json!({"amount": [1, 2]})),
            &number_schema(),
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(
            result.errors.get("amount"),
            Some(&vec!["must be a number".to_string()])
        );
    }

    #[test]
    fn all_invalid_fields_are_aggregated() {
        let mut props = number_schema();
        props.insert(
            "note".to_string(),
            PieceProperty::new("Note", PropertyType::ShortText, true),
        );
        let result = apply_processors_and_validators(
            &bag(json!({"amount": "nope", "note": ""})),
            &props,
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.contains_key("amount"));
        assert!(result.errors.contains_key("note"));
    }

    #[test]
    fn optional_checkbox_defaults_to_false() {
        let mut props = InputPropertyMap::new();
        props.insert(
            "notify".to_string(),
            PieceProperty::new("Notify", PropertyType::Checkbox, false),
        );
        let result = apply_processors_and_validators(
            &InputBag::new(),
            &props,
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(result.processed_input.get("notify"), Some(&json!(false)));
    }

    #[test]
    fn declared_default_fills_missing_optional_field() {
        let mut props = InputPropertyMap::new();
        props.insert(
            "limit".to_string(),
            PieceProperty::new("Limit", PropertyType::Number, false).with_default(json!(10)),
        );
        let result = apply_processors_and_validators(
            &InputBag::new(),
            &props,
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(result.processed_input.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn json_string_is_parsed() {
        let mut props = InputPropertyMap::new();
        props.insert(
            "payload".to_string(),
            PieceProperty::new("Payload", PropertyType::Object, true),
        );
        let result = apply_processors_and_validators(
            &bag(json!({"payload": "{\"a\": 1}"})),
            &props,
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(result.processed_input.get("payload"), Some(&json!({"a": 1})));
    }

    #[test]
    fn dropdown_rejects_values_outside_options() {
        let mut props = InputPropertyMap::new();
        props.insert(
            "mode".to_string(),
            PieceProperty::new(
                "Mode",
                PropertyType::StaticDropdown {
                    options: vec![json!("fast"), json!("slow")],
                },
                true,
            ),
        );
        let result = apply_processors_and_validators(
            &bag(json!({"mode": "medium"})),
            &props,
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(
            result.errors.get("mode"),
            Some(&vec!["is not a valid option".to_string()])
        );
    }

    #[test]
    fn unknown_fields_are_dropped_by_default() {
        let result = apply_processors_and_validators(
            &bag(json!({"amount": 1, "extra": "x"})),
            &number_schema(),
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert!(result.is_valid());
        assert!(!result.processed_input.contains_key("extra"));
    }

    #[test]
    fn missing_auth_is_required_only_when_action_requires_it() {
        let auth = PieceAuthProperty::new("API Key", AuthScheme::SecretText);

        let without = apply_processors_and_validators(
            &bag(json!({"amount": 1})),
            &number_schema(),
            Some(&auth),
            true,
            &ProcessorOptions::default(),
        );
        assert_eq!(
            without.errors.get(AUTHENTICATION_PROPERTY_NAME),
            Some(&vec!["required".to_string()])
        );

        let optional = apply_processors_and_validators(
            &bag(json!({"amount": 1})),
            &number_schema(),
            Some(&auth),
            false,
            &ProcessorOptions::default(),
        );
        assert!(optional.is_valid());
    }

    #[test]
    fn supplied_auth_is_carried_through_under_reserved_key() {
        let auth = PieceAuthProperty::new("API Key", AuthScheme::SecretText);
        let result = apply_processors_and_validators(
            &bag(json!({"amount": 1, "auth": {"token": "s3cr3t"}})),
            &number_schema(),
            Some(&auth),
            true,
            &ProcessorOptions::default(),
        );
        assert!(result.is_valid());
        assert_eq!(
            result.processed_input.get(AUTHENTICATION_PROPERTY_NAME),
            Some(&json!({"token": "s3cr3t"}))
        );
    }

    #[test]
    fn processing_is_idempotent() {
        let raw = bag(json!({"amount": "42"}));
        let schema = number_schema();
        let once = apply_processors_and_validators(
            &raw,
            &schema,
            None,
            false,
            &ProcessorOptions::default(),
        );
        let twice = apply_processors_and_validators(
            &raw,
            &schema,
            None,
            false,
            &ProcessorOptions::default(),
        );
        assert_eq!(once.processed_input, twice.processed_input);
        assert_eq!(once.errors, twice.errors);
    }
}
