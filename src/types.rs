use serde::{Deserialize, Serialize};

pub const LIVENESS_MESSAGE: &str = "Hello from the Python backend!";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassificationRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl ClassificationRequest {
    /// The email body, if one was sent and it has visible content.
    pub fn email_text(&self) -> Option<&str> {
        self.email.as_deref().filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Productive,
    Unproductive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationResult {
    pub category: Category,
    pub suggested_response: String,
    pub purpose: String,
    pub probability: f64,
    pub justification: String,
}

/// Text returned by the model before it has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelOutput {
    pub text: String,
}

impl RawModelOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_has_no_text() {
        let missing: ClassificationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.email_text(), None);

        let empty: ClassificationRequest = serde_json::from_str(r#"{"email": ""}"#).unwrap();
        assert_eq!(empty.email_text(), None);

        let spaces: ClassificationRequest = serde_json::from_str(r#"{"email": "  \n"}"#).unwrap();
        assert_eq!(spaces.email_text(), None);

        let null: ClassificationRequest = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(null.email_text(), None);
    }

    #[test]
    fn email_text_is_not_trimmed() {
        let request: ClassificationRequest =
            serde_json::from_str(r#"{"email": " Hello team "}"#).unwrap();
        assert_eq!(request.email_text(), Some(" Hello team "));
    }

    #[test]
    fn category_uses_exact_names() {
        assert_eq!(
            serde_json::to_string(&Category::Productive).unwrap(),
            r#""Productive""#
        );
        assert!(serde_json::from_str::<Category>(r#""productive""#).is_err());
    }
}
