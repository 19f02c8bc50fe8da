use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Success envelope: the payload lives under `data`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub data: JsonValue,
}

/// Failure envelope. Either a structured `error` object or a bare
/// top-level `message`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<ErrorPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<JsonValue>,
}

impl ErrorBody {
    /// Parses an error body, tolerating non-JSON payloads.
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    /// Best available human-readable message, else `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        if let Some(error) = &self.error {
            return error.message.clone();
        }
        match &self.message {
            Some(message) if !message.is_empty() => message.clone(),
            _ => fallback.to_owned(),
        }
    }

    /// Returns `(message, code, detail)` when the body is an
    /// application-level failure, i.e. carries both a message and a code.
    pub fn business_parts(self) -> Option<(String, String, JsonValue)> {
        let error = self.error?;
        let code = error.code?;
        Some((
            error.message,
            code,
            error.detail.unwrap_or(JsonValue::Null),
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ErrorBody;

    #[test]
    fn parse_tolerates_non_json_body() {
        let body = ErrorBody::parse("<html>bad gateway</html>");
        assert!(body.error.is_none());
        assert_eq!(body.message_or("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn structured_error_wins_over_bare_message() {
        let body = ErrorBody::parse(
            &json!({"error": {"message": "nope", "code": "denied"}, "message": "other"})
                .to_string(),
        );
        assert_eq!(body.message_or("fallback"), "nope");
    }

    #[test]
    fn business_parts_require_code() {
        let without_code = ErrorBody::parse(&json!({"error": {"message": "nope"}}).to_string());
        assert!(without_code.business_parts().is_none());

        let with_code = ErrorBody::parse(
            &json!({"error": {"message": "nope", "code": "denied", "detail": {"field": "name"}}})
                .to_string(),
        );
        let (message, code, detail) = with_code.business_parts().expect("must classify");
        assert_eq!(message, "nope");
        assert_eq!(code, "denied");
        assert_eq!(detail, json!({"field": "name"}));
    }
}
