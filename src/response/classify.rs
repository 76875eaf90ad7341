//! Classification of un-tagged response literals.
//!
//! Manifest files declare responses as plain JSON objects with no explicit
//! tag: `{"text": "..."}`, `{"json": {...}}`, `{"path": "..."}`,
//! `{"redirectTo": "..."}`. Which variant such a literal means is decided
//! by a fixed total order of shape predicates:
//!
//! > async-custom → custom → text → json → page → redirect
//!
//! The order makes classification deterministic for literals that would
//! satisfy more than one predicate (an object carrying both `text` and
//! `json` is a text response, full stop). Handler-bearing shapes require a
//! function-typed field, which JSON cannot express, so literals only ever
//! classify into the four data variants; custom and async responses are
//! constructor-only.
//!
//! Classification checks *shape*. Building an actual
//! [`ResponseDescriptor`] from a literal additionally validates field
//! values (status range, delay sign, header value types) and fails loudly:
//! a literal that classifies as nothing is a configuration error, never
//! something to recover from at request time.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::ResponseDescriptor;

/// The closed set of response variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Async,
    Custom,
    Text,
    Json,
    Page,
    Redirect,
}

/// Total predicate order used to classify un-tagged literals.
pub const CLASSIFICATION_ORDER: [Kind; 6] = [
    Kind::Async,
    Kind::Custom,
    Kind::Text,
    Kind::Json,
    Kind::Page,
    Kind::Redirect,
];

impl Kind {
    /// Whether `value` satisfies this variant's shape predicate.
    ///
    /// Every predicate first requires [`is_base_valid`], then the presence
    /// of a correctly-typed distinguishing field.
    pub fn matches(self, value: &Value) -> bool {
        if !is_base_valid(value) {
            return false;
        }
        let Some(object) = value.as_object() else {
            return false;
        };
        match self {
            // Handler fields must be functions; JSON has no function type,
            // so these shapes never match a literal.
            Kind::Async | Kind::Custom => false,
            Kind::Text => object.get("text").is_some_and(Value::is_string),
            Kind::Json => object
                .get("json")
                .is_some_and(|json| json.is_object() || json.is_array()),
            Kind::Page => object.get("path").is_some_and(Value::is_string),
            Kind::Redirect => object.get("redirectTo").is_some_and(Value::is_string),
        }
    }
}

/// Validate the base fields shared by every variant: `headers` must be a
/// mapping, `status` an integer, `delay` a number. Absent fields are always
/// valid.
pub fn is_base_valid(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    let headers_ok = object.get("headers").map_or(true, Value::is_object);
    let status_ok = object
        .get("status")
        .map_or(true, |status| status.is_i64() || status.is_u64());
    let delay_ok = object.get("delay").map_or(true, Value::is_number);

    headers_ok && status_ok && delay_ok
}

/// Classify an un-tagged literal into the first matching variant, or `None`
/// when no predicate matches (a malformed literal).
pub fn classify(value: &Value) -> Option<Kind> {
    CLASSIFICATION_ORDER
        .iter()
        .copied()
        .find(|kind| kind.matches(value))
}

/// Errors produced while building a descriptor from a literal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("value does not match any response shape")]
    Unclassifiable,

    #[error("handler responses cannot be declared as literals")]
    HandlerInLiteral,

    #[error("status code {0} is outside the valid HTTP range")]
    StatusOutOfRange(u64),

    #[error("header '{0}' must map to a string value")]
    HeaderValueNotString(String),

    #[error("delay must be a finite, non-negative millisecond count")]
    InvalidDelay,

    #[error("page data must be a mapping")]
    PageDataNotMapping,
}

/// Build a tagged descriptor from an un-tagged literal.
pub fn descriptor_from_value(value: &Value) -> Result<ResponseDescriptor, ClassifyError> {
    let kind = classify(value).ok_or(ClassifyError::Unclassifiable)?;
    let object = value.as_object().ok_or(ClassifyError::Unclassifiable)?;

    let descriptor = match kind {
        Kind::Async | Kind::Custom => return Err(ClassifyError::HandlerInLiteral),
        Kind::Text => {
            let text = object
                .get("text")
                .and_then(Value::as_str)
                .ok_or(ClassifyError::Unclassifiable)?;
            ResponseDescriptor::text(text)
        }
        Kind::Json => {
            let json = object.get("json").ok_or(ClassifyError::Unclassifiable)?;
            ResponseDescriptor::json(json.clone())
        }
        Kind::Page => {
            let path = object
                .get("path")
                .and_then(Value::as_str)
                .ok_or(ClassifyError::Unclassifiable)?;
            let data = match object.get("data") {
                None | Some(Value::Null) => None,
                Some(data) if data.is_object() => Some(data.clone()),
                Some(_) => return Err(ClassifyError::PageDataNotMapping),
            };
            ResponseDescriptor::page(path, data)
        }
        Kind::Redirect => {
            let to = object
                .get("redirectTo")
                .and_then(Value::as_str)
                .ok_or(ClassifyError::Unclassifiable)?;
            ResponseDescriptor::redirect(to)
        }
    };

    apply_base_fields(descriptor, object)
}

fn apply_base_fields(
    mut descriptor: ResponseDescriptor,
    object: &serde_json::Map<String, Value>,
) -> Result<ResponseDescriptor, ClassifyError> {
    if let Some(headers) = object.get("headers").and_then(Value::as_object) {
        for (name, value) in headers {
            let value = value
                .as_str()
                .ok_or_else(|| ClassifyError::HeaderValueNotString(name.clone()))?;
            descriptor = descriptor.with_header(name, value);
        }
    }

    if let Some(status) = object.get("status") {
        let code = status
            .as_u64()
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| ClassifyError::StatusOutOfRange(status.as_u64().unwrap_or(0)))?;
        descriptor = descriptor.with_status(code);
    }

    if let Some(delay) = object.get("delay") {
        let millis = delay.as_f64().ok_or(ClassifyError::InvalidDelay)?;
        if !millis.is_finite() || millis < 0.0 {
            return Err(ClassifyError::InvalidDelay);
        }
        descriptor = descriptor.with_delay(Duration::from_secs_f64(millis / 1000.0));
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_variant_literals_classify_unambiguously() {
        assert_eq!(classify(&json!({"text": "hi"})), Some(Kind::Text));
        assert_eq!(classify(&json!({"json": {"a": 1}})), Some(Kind::Json));
        assert_eq!(classify(&json!({"json": [1, 2]})), Some(Kind::Json));
        assert_eq!(classify(&json!({"path": "index.html"})), Some(Kind::Page));
        assert_eq!(classify(&json!({"redirectTo": "/x"})), Some(Kind::Redirect));
    }

    #[test]
    fn ambiguous_literals_resolve_to_the_first_predicate_in_order() {
        assert_eq!(
            classify(&json!({"text": "hi", "json": {"a": 1}})),
            Some(Kind::Text)
        );
        assert_eq!(
            classify(&json!({"json": {}, "path": "p.html"})),
            Some(Kind::Json)
        );
        assert_eq!(
            classify(&json!({"path": "p.html", "redirectTo": "/x"})),
            Some(Kind::Page)
        );
    }

    #[test]
    fn handler_shapes_never_match_literals() {
        // Nothing JSON can carry in "handler" is a function.
        assert_eq!(
            classify(&json!({"handler": "not-a-function", "text": "hi"})),
            Some(Kind::Text)
        );
        assert_eq!(classify(&json!({"handler": 5})), None);
        assert_eq!(classify(&json!({"asyncHandler": {}})), None);
    }

    #[test]
    fn malformed_base_fields_fail_every_predicate() {
        assert_eq!(classify(&json!({"text": "hi", "headers": "nope"})), None);
        assert_eq!(classify(&json!({"text": "hi", "status": "200"})), None);
        assert_eq!(classify(&json!({"text": "hi", "status": 200.5})), None);
        assert_eq!(classify(&json!({"text": "hi", "delay": "soon"})), None);
        assert_eq!(classify(&json!("just a string")), None);
        assert_eq!(classify(&json!({"body": "hi"})), None);
    }

    #[test]
    fn wrongly_typed_distinguishing_fields_do_not_match() {
        assert_eq!(classify(&json!({"text": 42})), None);
        assert_eq!(classify(&json!({"json": "string"})), None);
        assert_eq!(classify(&json!({"json": null})), None);
        assert_eq!(classify(&json!({"redirectTo": 1})), None);
    }

    #[test]
    fn descriptor_from_value_carries_base_fields() {
        let descriptor = descriptor_from_value(&json!({
            "text": "hello",
            "status": 201,
            "headers": {"x-a": "1"},
            "delay": 50
        }))
        .unwrap();

        assert_eq!(descriptor.kind(), Kind::Text);
        assert_eq!(descriptor.status(), Some(StatusCode::CREATED));
        assert_eq!(descriptor.headers().unwrap()["x-a"], "1");
        let delay = descriptor.delay().expect("expected a delay");
        assert_eq!(delay.duration(), Duration::from_millis(50));
    }

    #[test]
    fn descriptor_from_value_rejects_bad_values() {
        assert_eq!(
            descriptor_from_value(&json!({"text": "hi", "status": 99})).unwrap_err(),
            ClassifyError::StatusOutOfRange(99)
        );
        assert_eq!(
            descriptor_from_value(&json!({"text": "hi", "headers": {"x-a": 1}})).unwrap_err(),
            ClassifyError::HeaderValueNotString("x-a".to_string())
        );
        assert_eq!(
            descriptor_from_value(&json!({"text": "hi", "delay": -5})).unwrap_err(),
            ClassifyError::InvalidDelay
        );
        assert_eq!(
            descriptor_from_value(&json!({"path": "p.html", "data": [1, 2]})).unwrap_err(),
            ClassifyError::PageDataNotMapping
        );
        assert_eq!(
            descriptor_from_value(&json!({"nope": true})).unwrap_err(),
            ClassifyError::Unclassifiable
        );
    }
}
