//! services/api/src/web/params.rs
//!
//! Parsing helpers applied at the API edge so that handlers only ever see
//! normalised values.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query},
    http::request::Parts,
    Json,
};
use chrono::{DateTime, NaiveDate};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer};

use crate::error::{ApiError, ApiResult};

/// Unwraps a JSON body, reporting malformed payloads as validation errors.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| ApiError::Validation {
        message: rejection.body_text(),
        fields: Vec::new(),
    })
}

/// `Path` extractor whose rejections render as validation errors.
pub struct ValidPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection| ApiError::Validation {
                message: rejection.body_text(),
                fields: Vec::new(),
            })
    }
}

/// `Query` extractor whose rejections render as validation errors.
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ApiError::Validation {
                message: rejection.body_text(),
                fields: Vec::new(),
            })
    }
}

/// Parses the textual boolean forms clients send: `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseBool {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Deserializes an optional boolean sent as a JSON boolean, a 0/1 number or a string.
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LooseBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseBool::Bool(b)) => Ok(Some(b)),
        Some(LooseBool::Int(0)) => Ok(Some(false)),
        Some(LooseBool::Int(1)) => Ok(Some(true)),
        Some(LooseBool::Int(n)) => Err(de::Error::custom(format!("{} is not a boolean", n))),
        Some(LooseBool::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(LooseBool::Text(s)) => parse_bool(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("'{}' is not a boolean", s))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

/// Deserializes an optional number sent either as a JSON number or a numeric string.
pub fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LooseNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseNumber::Number(n)) => Ok(Some(n)),
        Some(LooseNumber::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(LooseNumber::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("'{}' is not a number", s))),
    }
}

/// Reads a calendar day from either `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Returns the trimmed value if it is present and non-blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Collects the names of missing or invalid request fields.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<&'static str>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` as invalid when `value` is `None`.
    pub fn check<T>(&mut self, field: &'static str, value: &Option<T>) {
        if value.is_none() {
            self.reject(field);
        }
    }

    pub fn reject(&mut self, field: &'static str) {
        if !self.0.contains(&field) {
            self.0.push(field);
        }
    }

    pub fn into_error(self) -> ApiError {
        ApiError::invalid_fields(self.0)
    }

    /// Fails with a validation error listing every recorded field.
    pub fn finish(self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Deserialize)]
    struct Flag {
        #[serde(default, deserialize_with = "flexible_bool")]
        flag: Option<bool>,
    }

    #[rstest]
    #[case(r#"{"flag": true}"#, Some(true))]
    #[case(r#"{"flag": false}"#, Some(false))]
    #[case(r#"{"flag": "true"}"#, Some(true))]
    #[case(r#"{"flag": "FALSE"}"#, Some(false))]
    #[case(r#"{"flag": 1}"#, Some(true))]
    #[case(r#"{"flag": "0"}"#, Some(false))]
    #[case(r#"{"flag": ""}"#, None)]
    #[case(r#"{"flag": null}"#, None)]
    #[case(r#"{}"#, None)]
    fn booleans_are_normalised(#[case] body: &str, #[case] expected: Option<bool>) {
        let parsed: Flag = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.flag, expected);
    }

    #[test]
    fn nonsense_booleans_are_rejected() {
        assert!(serde_json::from_str::<Flag>(r#"{"flag": "maybe"}"#).is_err());
        assert!(serde_json::from_str::<Flag>(r#"{"flag": 2}"#).is_err());
    }

    #[derive(Deserialize)]
    struct Amount {
        #[serde(default, deserialize_with = "flexible_f64")]
        value: Option<f64>,
    }

    #[test]
    fn numbers_may_arrive_as_strings() {
        let parsed: Amount = serde_json::from_str(r#"{"value": "55.5"}"#).unwrap();
        assert_eq!(parsed.value, Some(55.5));
        let parsed: Amount = serde_json::from_str(r#"{"value": 42}"#).unwrap();
        assert_eq!(parsed.value, Some(42.0));
        assert!(serde_json::from_str::<Amount>(r#"{"value": "fast"}"#).is_err());
    }

    #[test]
    fn calendar_days_accept_dates_and_timestamps() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        assert_eq!(parse_calendar_day("2026-11-02"), Some(day));
        assert_eq!(parse_calendar_day("2026-11-02T00:00:00.000Z"), Some(day));
        assert_eq!(parse_calendar_day("next tuesday"), None);
    }

    #[test]
    fn secrets_must_match_exactly() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cret", "s3cre"));
        assert!(!secrets_match("s3creT", "s3cret"));
    }

    #[test]
    fn field_errors_collect_every_missing_field() {
        let mut errors = FieldErrors::new();
        errors.check("title", &None::<String>);
        errors.check("link", &Some("https://meet".to_string()));
        errors.reject("date");
        match errors.finish() {
            Err(ApiError::Validation { fields, .. }) => {
                assert_eq!(fields, vec!["title", "date"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
