// routes/api/payments.rs
// GET/POST /api/payments and PUT /api/payments/{id}.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};
use chrono::{DateTime as ChronoDateTime, NaiveDate, SecondsFormat, Utc};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_id, parse_optional_id, success, success_empty};
use crate::error::{ApiError, ApiResult};
use crate::models::{LineItem, Payment, Provider, Receiver};
use crate::payment_query::{PaymentQuery, PaymentQueryParams};
use crate::pricing::check_readings;
use crate::session::SessionUser;
use crate::state::{self, AppState, can_bill_in_domain};

/// Payment as exposed over JSON: ids as hex strings, dates as RFC 3339.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: Option<String>,
    pub domain: String,
    pub street: Option<String>,
    pub company: String,
    pub month_service: Option<String>,
    pub invoice_number: i64,
    pub invoice_creation_date: String,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub invoice: Vec<LineItem>,
    pub general_sum: f64,
    pub provider: Option<Provider>,
    #[serde(rename = "reciever")]
    pub receiver: Option<Receiver>,
}

impl From<Payment> for PaymentView {
    fn from(p: Payment) -> Self {
        PaymentView {
            id: p.id.map(|id| id.to_hex()),
            domain: p.domain.to_hex(),
            street: p.street.map(|id| id.to_hex()),
            company: p.company.to_hex(),
            month_service: p.month_service.map(|id| id.to_hex()),
            invoice_number: p.invoice_number,
            invoice_creation_date: p
                .invoice_creation_date
                .to_chrono()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            payment_type: p.payment_type,
            invoice: p.invoice,
            general_sum: p.general_sum,
            provider: p.provider,
            receiver: p.receiver,
        }
    }
}

/// Body of POST /api/payments and PUT /api/payments/{id}. Sums sent by the
/// client are ignored and recomputed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub domain: String,
    #[serde(default)]
    pub street: Option<String>,
    pub company: String,
    #[serde(default)]
    pub month_service: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<i64>,
    #[serde(default)]
    pub invoice_creation_date: Option<String>,
    #[serde(rename = "type", default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub invoice: Vec<LineItem>,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(rename = "reciever", default)]
    pub receiver: Option<Receiver>,
}

impl PaymentBody {
    fn into_payment(self) -> ApiResult<Payment> {
        let invoice_creation_date = match self.invoice_creation_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_date(raw)?,
            _ => DateTime::now(),
        };
        check_readings(&self.invoice).map_err(ApiError::Validation)?;
        Ok(Payment {
            id: None,
            domain: parse_id(&self.domain, "domain")?,
            street: parse_optional_id(self.street.as_deref(), "street")?,
            company: parse_id(&self.company, "company")?,
            month_service: parse_optional_id(self.month_service.as_deref(), "monthService")?,
            invoice_number: self.invoice_number.unwrap_or(0),
            invoice_creation_date,
            payment_type: self
                .payment_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "debit".to_string()),
            invoice: self.invoice,
            general_sum: 0.0,
            provider: self.provider,
            receiver: self.receiver,
        })
    }
}

fn parse_date(raw: &str) -> ApiResult<DateTime> {
    let raw = raw.trim();
    if let Ok(date) = ChronoDateTime::parse_from_rfc3339(raw) {
        return Ok(DateTime::from_chrono(date.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| DateTime::from_chrono(d.and_utc()))
        .ok_or_else(|| ApiError::Validation(format!("invoiceCreationDate: invalid date {raw}")))
}

/// The billed company must exist and sit in the payment's domain.
async fn check_company(state: &AppState, payment: &Payment) -> ApiResult<()> {
    let company = state::get_company_by_id(state, &payment.company)
        .await?
        .ok_or_else(|| ApiError::NotFound("company".into()))?;
    if company.domain.is_some_and(|d| d != payment.domain) {
        return Err(ApiError::Validation(
            "company does not belong to the payment's domain".into(),
        ));
    }
    Ok(())
}

/// GET /api/payments?limit&companyIds&domainIds&year&month&quarter
pub async fn list_payments(
    session: SessionUser,
    State(state): State<Arc<AppState>>,
    params: Result<Query<PaymentQueryParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let query = PaymentQuery::parse(params).map_err(ApiError::Validation)?;

    let payments = state::find_payments(&state, session.identity(), &query).await?;
    tracing::debug!(
        email = %session.identity().email,
        count = payments.len(),
        "payments listed"
    );
    let data: Vec<PaymentView> = payments.into_iter().map(PaymentView::from).collect();
    Ok(success(data))
}

/// POST /api/payments
pub async fn create_payment(
    session: SessionUser,
    State(state): State<Arc<AppState>>,
    body: Result<Json<PaymentBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let payment = body.into_payment()?;

    if !can_bill_in_domain(&state, session.identity(), &payment.domain).await? {
        return Err(ApiError::Forbidden);
    }
    check_company(&state, &payment).await?;

    state::insert_payment(&state, payment).await?;
    Ok(success_empty())
}

/// PUT /api/payments/{id}
pub async fn update_payment(
    session: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<PaymentBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "id")?;
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let existing = state::get_payment_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("payment".into()))?;
    if !can_bill_in_domain(&state, session.identity(), &existing.domain).await? {
        return Err(ApiError::Forbidden);
    }

    let mut payment = body.into_payment()?;
    if payment.domain != existing.domain
        && !can_bill_in_domain(&state, session.identity(), &payment.domain).await?
    {
        return Err(ApiError::Forbidden);
    }
    check_company(&state, &payment).await?;
    payment.provider = payment.provider.or(existing.provider);
    payment.receiver = payment.receiver.or(existing.receiver);

    let updated = state::update_payment(&state, &id, payment).await?;
    Ok(success(PaymentView::from(updated)))
}

/// Any method other than those routed on a payments path.
pub async fn method_not_allowed() -> impl IntoResponse {
    ApiError::MethodNotAllowed
}
