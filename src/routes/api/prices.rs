// routes/api/prices.rs
// POST /api/payments/prices: runs the pricing engine over an invoice draft.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_optional_id, success};
use crate::error::{ApiError, ApiResult};
use crate::models::{LineItem, LineItemType};
use crate::pricing::{DerivationMode, price_editable, price_lines};
use crate::session::SessionUser;
use crate::state::{AppState, load_pricing_inputs};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub month_service: Option<String>,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub lines: Vec<LineDraft>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDraft {
    #[serde(rename = "type")]
    pub kind: LineItemType,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub last_amount: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    #[serde(flatten)]
    pub line: LineItem,
    pub price_editable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedInvoice {
    pub lines: Vec<PricedLine>,
    pub general_sum: f64,
}

pub async fn derive_prices(
    _session: SessionUser,
    State(state): State<Arc<AppState>>,
    body: Result<Json<PriceRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let company_id = parse_optional_id(req.company.as_deref(), "company")?;
    let service_id = parse_optional_id(req.month_service.as_deref(), "monthService")?;
    let mode = if req.edit {
        DerivationMode::Edit
    } else {
        DerivationMode::Create
    };

    let inputs = load_pricing_inputs(&state, company_id.as_ref(), service_id.as_ref()).await?;
    let mut lines: Vec<LineItem> = req
        .lines
        .into_iter()
        .map(|draft| LineItem {
            kind: draft.kind,
            amount: draft.amount,
            last_amount: draft.last_amount,
            price: draft.price,
            sum: 0.0,
        })
        .collect();

    if state.config.debug_pricing {
        tracing::debug!(
            company = ?company_id,
            service = ?service_id,
            inflation = ?inputs.inflation,
            ?mode,
            "pricing invoice draft"
        );
    }
    let general_sum = price_lines(&mut lines, &inputs.context(mode));

    let company = inputs.company.as_ref();
    let lines = lines
        .into_iter()
        .map(|line| PricedLine {
            price_editable: price_editable(line.kind, company, mode),
            line,
        })
        .collect();

    Ok(success(PricedInvoice { lines, general_sum }))
}
