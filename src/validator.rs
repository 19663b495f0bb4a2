use jsonschema::JSONSchema;
use serde_json::Value;

use crate::schema::classification_schema;
use crate::types::ClassificationResult;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("model output is not JSON: {0}")]
    Malformed(String),

    #[error("model output does not match the classification schema: {0}")]
    SchemaViolation(String),

    #[error("probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),
}

/// Checks model output against the classification contract instead of
/// trusting the upstream generation constraint.
pub struct ResponseValidator {
    schema: JSONSchema,
}

impl ResponseValidator {
    pub fn new() -> anyhow::Result<Self> {
        let schema = JSONSchema::compile(&classification_schema())
            .map_err(|e| anyhow::anyhow!("failed to compile classification schema: {e}"))?;
        Ok(Self { schema })
    }

    pub fn validate(&self, raw: &str) -> Result<ClassificationResult, ValidationError> {
        let value: Value = serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;

        if let Err(errors) = self.schema.validate(&value) {
            let messages: Vec<String> = errors.map(|error| error.to_string()).collect();
            return Err(ValidationError::SchemaViolation(messages.join("; ")));
        }

        let result: ClassificationResult = serde_json::from_value(value)
            .map_err(|e| ValidationError::SchemaViolation(e.to_string()))?;

        if !result.probability.is_finite() || !(0.0..=1.0).contains(&result.probability) {
            return Err(ValidationError::ProbabilityOutOfRange(result.probability));
        }

        Ok(result)
    }
}

/// Models occasionally wrap JSON in a Markdown fence despite the mime type.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
