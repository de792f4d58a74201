// routes/api/domains.rs
// GET /api/domains/my -> domains visible to the caller.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::Value;

use super::success;
use crate::error::ApiResult;
use crate::session::SessionUser;
use crate::state::{AppState, domains_for_identity};

#[derive(Debug, Serialize)]
pub struct DomainOption {
    pub id: String,
    pub name: String,
}

pub async fn my_domains(
    session: SessionUser,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Value>> {
    let options: Vec<DomainOption> = domains_for_identity(&state, session.identity())
        .await?
        .into_iter()
        .filter_map(|d| {
            d.id.map(|id| DomainOption {
                id: id.to_hex(),
                name: d.name,
            })
        })
        .collect();
    Ok(success(options))
}
