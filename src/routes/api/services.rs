// routes/api/services.rs
// GET /api/services?domain&street and POST /api/services (admins).

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_id, parse_optional_id, success};
use crate::error::{ApiError, ApiResult};
use crate::models::Service;
use crate::session::SessionUser;
use crate::state::{self, AppState, can_bill_in_domain, find_service_for_month, parse_month};

#[derive(Debug, Default, Deserialize)]
pub struct ServiceFilter {
    pub domain: Option<String>,
    pub street: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    pub id: Option<String>,
    pub domain: Option<String>,
    pub street: Option<String>,
    /// `YYYY-MM`
    pub month: String,
    pub rent_price: Option<f64>,
    pub electricity_price: Option<f64>,
    pub water_price: Option<f64>,
    pub water_price_total: Option<f64>,
    pub inflicion_price: Option<f64>,
    pub garbage_collector_price: Option<f64>,
    pub description: Option<String>,
}

impl From<Service> for ServiceView {
    fn from(s: Service) -> Self {
        ServiceView {
            id: s.id.map(|id| id.to_hex()),
            domain: s.domain.map(|id| id.to_hex()),
            street: s.street.map(|id| id.to_hex()),
            month: s.date.to_chrono().format("%Y-%m").to_string(),
            rent_price: s.rent_price,
            electricity_price: s.electricity_price,
            water_price: s.water_price,
            water_price_total: s.water_price_total,
            inflicion_price: s.inflicion_price,
            garbage_collector_price: s.garbage_collector_price,
            description: s.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBody {
    pub domain: String,
    pub street: String,
    /// `YYYY-MM` or any date within the month.
    pub month: String,
    pub rent_price: Option<f64>,
    pub electricity_price: Option<f64>,
    pub water_price: Option<f64>,
    pub water_price_total: Option<f64>,
    pub inflicion_price: Option<f64>,
    pub garbage_collector_price: Option<f64>,
    pub description: Option<String>,
}

pub async fn list_services(
    _session: SessionUser,
    State(state): State<Arc<AppState>>,
    filter: Result<Query<ServiceFilter>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(filter) = filter.map_err(|e| ApiError::Validation(e.body_text()))?;
    let domain = parse_optional_id(filter.domain.as_deref(), "domain")?;
    let street = parse_optional_id(filter.street.as_deref(), "street")?;

    let services = state::list_services(&state, domain.as_ref(), street.as_ref()).await?;
    let data: Vec<ServiceView> = services.into_iter().map(ServiceView::from).collect();
    Ok(success(data))
}

pub async fn create_service(
    session: SessionUser,
    State(state): State<Arc<AppState>>,
    body: Result<Json<ServiceBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let domain = parse_id(&body.domain, "domain")?;
    let street = parse_id(&body.street, "street")?;
    let month = parse_month(&body.month)
        .ok_or_else(|| ApiError::Validation(format!("month: invalid month {}", body.month)))?;

    if !can_bill_in_domain(&state, session.identity(), &domain).await? {
        return Err(ApiError::Forbidden);
    }
    if find_service_for_month(&state, &domain, &street, month)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation(format!(
            "service for {} already exists",
            month.format("%Y-%m")
        )));
    }

    let service = Service {
        domain: Some(domain),
        street: Some(street),
        rent_price: body.rent_price,
        electricity_price: body.electricity_price,
        water_price: body.water_price,
        water_price_total: body.water_price_total,
        inflicion_price: body.inflicion_price,
        garbage_collector_price: body.garbage_collector_price,
        description: body.description.filter(|d| !d.trim().is_empty()),
        ..Service::for_month(DateTime::from_chrono(month))
    };
    let id = state::create_service(&state, service).await?;
    tracing::info!(service = %id, month = %month.format("%Y-%m"), "service created");
    Ok(success(serde_json::json!({ "id": id.to_hex() })))
}
