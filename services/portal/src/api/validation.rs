//! Request body parsing and field validation.
//!
//! Bodies arrive as raw bytes and are decoded inside the handler, after the
//! role gate has run, so an unauthorized caller gets 401/403 rather than a
//! parse error. Both decode failures and semantic checks answer 400 with
//! field-level details.
use crate::api::error::{ApiError, api_validation};
use crate::api::types::FieldIssue;
use axum::body::Bytes;
use serde::de::DeserializeOwned;

pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        let message = err.to_string();
        let field = message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
            .unwrap_or("body")
            .to_string();
        api_validation(vec![FieldIssue::new(field, message)])
    })
}

/// Collects field issues and fails once at the end.
#[derive(Debug, Default)]
pub struct Issues(Vec<FieldIssue>);

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldIssue::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn non_empty(&mut self, field: &str, value: &str) {
        self.check(!value.trim().is_empty(), field, "must not be empty");
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(api_validation(self.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Probe {
        title: String,
        count: u32,
    }

    #[test]
    fn missing_field_is_named() {
        let err = parse_json::<Probe>(&Bytes::from_static(br#"{"count": 1}"#)).expect_err("missing");
        let details = err.body.details.expect("details");
        assert_eq!(details[0].field, "title");
    }

    #[test]
    fn malformed_json_points_at_body() {
        let err = parse_json::<Probe>(&Bytes::from_static(b"{not json")).expect_err("malformed");
        assert_eq!(err.body.error, "Invalid input");
        assert_eq!(err.body.details.expect("details")[0].field, "body");
    }

    #[test]
    fn issues_accumulate() {
        let mut issues = Issues::new();
        issues.non_empty("title", "  ");
        issues.check(false, "port", "must be positive");
        issues.non_empty("name", "ok");
        let err = issues.finish().expect_err("issues");
        let fields: Vec<_> = err
            .body
            .details
            .expect("details")
            .into_iter()
            .map(|issue| issue.field)
            .collect();
        assert_eq!(fields, vec!["title", "port"]);
    }

    #[test]
    fn empty_issues_pass() {
        assert!(Issues::new().finish().is_ok());
    }
}
