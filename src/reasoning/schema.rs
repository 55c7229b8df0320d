use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    reasoning::{
        error::{ReasoningError, schema_mismatch},
        types::ReasoningResponse,
    },
    types::Confidence,
};

/// JSON schema for a structured reasoning result, derived from its Rust shape.
pub fn output_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}))
}

pub fn validate_result(schema: &Value, result: &Value) -> Result<(), ReasoningError> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|err| schema_mismatch(format!("output schema does not compile: {err}")))?;

    if let Err(errors) = compiled.validate(result) {
        let messages = errors.map(|err| err.to_string()).collect::<Vec<_>>();
        return Err(schema_mismatch(format!(
            "result does not match schema: {}",
            messages.join("; ")
        )));
    }

    Ok(())
}

pub fn validate_response(
    schema: &Value,
    response: ReasoningResponse,
) -> Result<(Value, Confidence), ReasoningError> {
    let confidence = Confidence::new(response.confidence)
        .map_err(|err| schema_mismatch(format!("reasoning confidence rejected: {err}")))?;
    validate_result(schema, &response.result)?;
    Ok((response.result, confidence))
}

pub fn decode<T: DeserializeOwned>(result: Value) -> Result<T, ReasoningError> {
    serde_json::from_value(result)
        .map_err(|err| schema_mismatch(format!("result cannot be decoded: {err}")))
}
