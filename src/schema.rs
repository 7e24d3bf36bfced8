//! Input and output contract of the `env_echo` tool.
//!
//! Arguments arrive as a loose JSON object. They are normalised, checked
//! against [`EchoArgs`] and resolved into an [`EchoRequest`] before the echo
//! operation runs; nothing downstream sees the raw object.

use crate::echo::EchoOutput;
use crate::env::DEFAULT_KEYS;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

pub type JsonObject = Map<String, Value>;

/// Key that wraps the real arguments when a caller sends a combined object.
const ENVELOPE_KEY: &str = "arguments";
/// Call metadata that may sit next to [`ENVELOPE_KEY`] in a combined object.
const ENVELOPE_METADATA: [&str; 3] = ["_meta", "sessionId", "requestId"];

/// Name of an environment variable, as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableName(pub String);

impl JsonSchema for VariableName {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> Cow<'static, str> {
        "VariableName".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "minLength": 1,
            "description": "Name of an environment variable to echo."
        })
    }
}

/// Wire shape of the tool arguments. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EchoArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "List of environment variables to read. Defaults to PWD and WORKSPACE_SLUG.",
        length(min = 1)
    )]
    pub keys: Option<Vec<VariableName>>,

    #[serde(default, rename = "omitNull", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "When true, variables with no value are excluded from the result.")]
    pub omit_null: Option<bool>,
}

/// Validated request with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub keys: Vec<String>,
    pub omit_null: bool,
}

impl Default for EchoRequest {
    fn default() -> Self {
        Self {
            keys: DEFAULT_KEYS.iter().map(|key| key.to_string()).collect(),
            omit_null: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    Malformed(String),
    #[error("keys: Array must contain at least 1 variable name.")]
    EmptyKeyList,
    #[error("keys[{index}]: Environment variable names must be at least one character.")]
    EmptyKeyName { index: usize },
}

/// Tool parameters exactly as received.
///
/// Publishes the [`EchoArgs`] schema but defers parsing, so a bad payload
/// becomes an error result instead of a protocol error.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawArguments(pub JsonObject);

impl JsonSchema for RawArguments {
    fn schema_name() -> Cow<'static, str> {
        EchoArgs::schema_name()
    }

    fn schema_id() -> Cow<'static, str> {
        EchoArgs::schema_id()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        EchoArgs::json_schema(generator)
    }
}

impl RawArguments {
    /// Collapse both calling conventions into the plain argument object.
    ///
    /// Some clients send `{ "arguments": { .. }, "sessionId": .. }` instead of
    /// the arguments themselves.
    pub fn normalize(self) -> JsonObject {
        let mut object = self.0;
        let is_envelope = matches!(object.get(ENVELOPE_KEY), Some(Value::Object(_)))
            && object
                .keys()
                .all(|key| key == ENVELOPE_KEY || ENVELOPE_METADATA.contains(&key.as_str()));

        if is_envelope {
            if let Some(Value::Object(inner)) = object.remove(ENVELOPE_KEY) {
                return inner;
            }
        }
        object
    }
}

/// Parse and check a normalised argument object.
pub fn validate(arguments: JsonObject) -> Result<EchoRequest, ValidationError> {
    let args: EchoArgs = serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let defaults = EchoRequest::default();
    let keys = match args.keys {
        None => defaults.keys,
        Some(keys) if keys.is_empty() => return Err(ValidationError::EmptyKeyList),
        Some(keys) => {
            if let Some(index) = keys.iter().position(|key| key.0.is_empty()) {
                return Err(ValidationError::EmptyKeyName { index });
            }
            keys.into_iter().map(|key| key.0).collect()
        }
    };

    Ok(EchoRequest {
        keys,
        omit_null: args.omit_null.unwrap_or(defaults.omit_null),
    })
}

fn schema_object(schema: Schema) -> Arc<JsonObject> {
    match serde_json::to_value(schema) {
        Ok(Value::Object(object)) => Arc::new(object),
        _ => Arc::new(JsonObject::new()),
    }
}

/// JSON Schema advertised for the tool arguments.
pub fn input_schema() -> Arc<JsonObject> {
    schema_object(schemars::schema_for!(EchoArgs))
}

/// JSON Schema advertised for the structured result.
pub fn output_schema() -> Arc<JsonObject> {
    schema_object(schemars::schema_for!(EchoOutput))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn empty_arguments_resolve_to_defaults() {
        let request = validate(JsonObject::new()).unwrap();

        assert_eq!(request.keys, vec!["PWD".to_string(), "WORKSPACE_SLUG".to_string()]);
        assert!(!request.omit_null);
    }

    #[test]
    fn explicit_arguments_are_kept() {
        let request = validate(object(json!({ "keys": ["HOME", "HOME"], "omitNull": true }))).unwrap();

        assert_eq!(request.keys, vec!["HOME".to_string(), "HOME".to_string()]);
        assert!(request.omit_null);
    }

    #[test]
    fn null_fields_count_as_absent() {
        let request = validate(object(json!({ "keys": null, "omitNull": null }))).unwrap();

        assert_eq!(request, EchoRequest::default());
    }

    #[test]
    fn empty_key_list_is_rejected() {
        let err = validate(object(json!({ "keys": [] }))).unwrap_err();

        assert_eq!(err, ValidationError::EmptyKeyList);
    }

    #[test]
    fn empty_key_name_is_rejected_with_position() {
        let err = validate(object(json!({ "keys": ["PWD", ""] }))).unwrap_err();

        assert_eq!(err, ValidationError::EmptyKeyName { index: 1 });
        assert!(err.to_string().contains("at least one character"));
    }

    #[test]
    fn wrong_types_and_unknown_fields_are_malformed() {
        for payload in [
            json!({ "keys": "PWD" }),
            json!({ "keys": [1, 2] }),
            json!({ "omitNull": "yes" }),
            json!({ "extra": true }),
        ] {
            let err = validate(object(payload.clone())).unwrap_err();
            assert!(matches!(err, ValidationError::Malformed(_)), "{payload} gave {err:?}");
        }
    }

    #[test]
    fn combined_envelope_is_unwrapped() {
        let raw = RawArguments(object(json!({
            "arguments": { "keys": ["HOME"] },
            "sessionId": "abc",
        })));

        assert_eq!(raw.normalize(), object(json!({ "keys": ["HOME"] })));
    }

    #[test]
    fn plain_arguments_pass_through_normalization() {
        let plain = object(json!({ "keys": ["HOME"], "omitNull": false }));

        assert_eq!(RawArguments(plain.clone()).normalize(), plain);
        assert_eq!(RawArguments::default().normalize(), JsonObject::new());
    }

    #[test]
    fn envelope_with_foreign_keys_is_left_for_validation() {
        let raw = object(json!({ "arguments": {}, "keys": ["HOME"] }));

        let normalized = RawArguments(raw.clone()).normalize();

        assert_eq!(normalized, raw);
        assert!(validate(normalized).is_err());
    }

    #[test]
    fn input_schema_documents_constraints() {
        let schema = Value::Object(input_schema().as_ref().clone());
        let keys = schema["properties"]["keys"].to_string();

        assert_eq!(schema["additionalProperties"], json!(false));
        assert!(keys.contains(r#""minItems":1"#), "{keys}");
        assert!(keys.contains(r#""minLength":1"#), "{keys}");
        assert!(schema["properties"]["omitNull"].is_object());
    }

    #[test]
    fn output_schema_describes_tag_and_variables() {
        let schema = Value::Object(output_schema().as_ref().clone());
        let rendered = schema.to_string();

        assert!(schema["properties"]["variables"].is_object());
        assert!(rendered.contains("env_echo"));
    }
}
