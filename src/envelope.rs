//! Response envelope handling
//!
//! Every SmarterMail response carries `success` and, on failure, a
//! `message`. The payload is only decoded once `success` is true.

use crate::error::{Error, Result};
use crate::json::truthy;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Check the envelope and decode the payload into `T`.
pub fn open<T: DeserializeOwned>(value: Value) -> Result<T> {
    check(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Check the envelope without decoding a payload.
pub fn check(value: &Value) -> Result<()> {
    if is_success(value) {
        Ok(())
    } else {
        Err(Error::api(message(value)))
    }
}

/// Whether the envelope reports success. Missing means failure.
pub fn is_success(value: &Value) -> bool {
    value.get("success").is_some_and(truthy)
}

fn message(value: &Value) -> String {
    match value.get("message") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => "Request was not successful".to_string(),
        Some(other) => other.to_string(),
    }
}
