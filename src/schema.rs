//! Output contract the model is asked to honour.
//!
//! The same schema is sent upstream as the generation constraint and compiled
//! locally by [`crate::validator`], so a model that ignores the constraint is
//! still caught before anything reaches the caller.

use serde_json::{Value, json};

pub const REQUIRED_FIELDS: [&str; 5] = [
    "category",
    "suggested_response",
    "purpose",
    "probability",
    "justification",
];

pub const CATEGORIES: [&str; 2] = ["Productive", "Unproductive"];

pub fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": {
                "type": "string",
                "enum": CATEGORIES,
                "description": "The category of the email."
            },
            "suggested_response": {
                "type": "string",
                "description": "The suggested response for the email."
            },
            "purpose": {
                "type": "string",
                "description": "The main purpose of the email."
            },
            "probability": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "description": "The probability from 0.0 to 1.0 that the email is productive."
            },
            "justification": {
                "type": "string",
                "description": "The justification for the productivity score."
            }
        },
        "required": REQUIRED_FIELDS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_property_is_required() {
        let schema = classification_schema();
        let properties = schema["properties"].as_object().unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();

        assert_eq!(properties.len(), REQUIRED_FIELDS.len());
        assert_eq!(required, REQUIRED_FIELDS);
        for field in REQUIRED_FIELDS {
            assert!(properties.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn category_is_a_two_value_enum() {
        let schema = classification_schema();
        assert_eq!(
            schema["properties"]["category"]["enum"],
            json!(["Productive", "Unproductive"])
        );
    }
}
