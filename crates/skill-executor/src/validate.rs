//! Argument validation and coercion against a tool's declared parameter
//! schema: required-field presence, primitive type coercion (e.g.
//! string→integer when the string parses cleanly), defaults for omitted
//! optional fields. Extra caller-supplied fields pass through untouched.

use serde_json::{Map, Value};
use skill_types::{Parameter, ParameterType};

/// The first parameter that failed validation, named so the caller can
/// report a precise `INVALID_ARGUMENT`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    /// A required parameter was not supplied and has no default.
    #[error("missing required argument '{0}'")]
    Missing(String),
    /// A supplied value could not be coerced to the declared type.
    #[error("argument '{0}' could not be coerced to {1:?}")]
    Coercion(String, ParameterType),
}

/// Validates and coerces `raw_arguments` (expected to be a JSON object)
/// against `parameters`, returning the cleaned argument object.
pub fn coerce_arguments(parameters: &[Parameter], raw_arguments: Value) -> Result<Value, ValidationError> {
    let mut input = match raw_arguments {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };

    let mut cleaned = Map::new();

    for param in parameters {
        match input.remove(&param.name) {
            Some(value) => {
                let coerced = coerce_value(&param.param_type, value)
                    .ok_or_else(|| ValidationError::Coercion(param.name.clone(), param.param_type))?;
                cleaned.insert(param.name.clone(), coerced);
            }
            None => {
                if let Some(default) = &param.default_value {
                    let parsed = serde_json::from_str(default)
                        .unwrap_or_else(|_| Value::String(default.clone()));
                    cleaned.insert(param.name.clone(), parsed);
                } else if param.required {
                    return Err(ValidationError::Missing(param.name.clone()));
                }
            }
        }
    }

    // Extra arguments not named in the schema pass through unchanged.
    for (key, value) in input {
        cleaned.insert(key, value);
    }

    Ok(Value::Object(cleaned))
}

fn coerce_value(expected: &ParameterType, value: Value) -> Option<Value> {
    match (expected, &value) {
        (ParameterType::String, Value::String(_)) => Some(value),
        (ParameterType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParameterType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ParameterType::Number, Value::Number(_)) => Some(value),
        (ParameterType::Number, Value::String(s)) => {
            s.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number)
        }

        (ParameterType::Boolean, Value::Bool(_)) => Some(value),
        (ParameterType::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(Value::Bool(true)),
            "false" | "0" | "no" => Some(Value::Bool(false)),
            _ => None,
        },

        (ParameterType::Json, _) => Some(value),

        (ParameterType::Array, Value::Array(_)) => Some(value),
        (ParameterType::Array, Value::String(s)) => {
            serde_json::from_str::<Value>(s).ok().filter(|v| v.is_array())
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, param_type: ParameterType, required: bool) -> Parameter {
        Parameter {
            name: name.to_string(),
            param_type,
            description: String::new(),
            required,
            default_value: None,
        }
    }

    #[test]
    fn missing_required_argument_errors() {
        let params = vec![param("namespace", ParameterType::String, true)];
        let result = coerce_arguments(&params, serde_json::json!({}));
        assert!(matches!(result, Err(ValidationError::Missing(name)) if name == "namespace"));
    }

    #[test]
    fn string_to_number_coercion() {
        let params = vec![param("replicas", ParameterType::Number, true)];
        let result = coerce_arguments(&params, serde_json::json!({"replicas": "3"})).unwrap();
        assert_eq!(result["replicas"], serde_json::json!(3.0));
    }

    #[test]
    fn optional_missing_uses_default() {
        let mut params = vec![param("timeout", ParameterType::Number, false)];
        params[0].default_value = Some("30".to_string());
        let result = coerce_arguments(&params, serde_json::json!({})).unwrap();
        assert_eq!(result["timeout"], serde_json::json!(30));
    }

    #[test]
    fn extra_arguments_pass_through() {
        let params = vec![param("name", ParameterType::String, true)];
        let result = coerce_arguments(&params, serde_json::json!({"name": "x", "extra": 1})).unwrap();
        assert_eq!(result["extra"], serde_json::json!(1));
    }

    #[test]
    fn bad_boolean_coercion_fails() {
        let params = vec![param("dry_run", ParameterType::Boolean, true)];
        let result = coerce_arguments(&params, serde_json::json!({"dry_run": "maybe"}));
        assert!(result.is_err());
    }
}
