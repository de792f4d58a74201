// routes/api/mod.rs
// JSON API: every response is wrapped as { "success": bool, "data"?: ..., "message"?: ... }.

use std::str::FromStr;

use axum::Json;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};

pub mod domains;
pub mod payments;
pub mod prices;
pub mod services;

pub use domains::my_domains;
pub use payments::{create_payment, list_payments, method_not_allowed, update_payment};
pub use prices::derive_prices;
pub use services::{create_service, list_services};

/// `{ "success": true, "data": data }`
pub fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// `{ "success": true }` for writes without a body.
pub fn success_empty() -> Json<Value> {
    Json(json!({ "success": true }))
}

pub(crate) fn parse_id(raw: &str, field: &str) -> ApiResult<ObjectId> {
    ObjectId::from_str(raw.trim())
        .map_err(|_| ApiError::Validation(format!("{field}: invalid id {raw}")))
}

pub(crate) fn parse_optional_id(raw: Option<&str>, field: &str) -> ApiResult<Option<ObjectId>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_id(raw, field).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_id_is_none() {
        assert_eq!(parse_optional_id(Some("  "), "company").unwrap(), None);
        assert!(parse_optional_id(Some("nope"), "company").is_err());
        let id = ObjectId::new();
        assert_eq!(
            parse_optional_id(Some(&id.to_hex()), "company").unwrap(),
            Some(id)
        );
    }
}
