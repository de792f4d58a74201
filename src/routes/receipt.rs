// routes/receipt.rs
// GET /payments/{id}/receipt -> printable invoice for one payment.

use std::{str::FromStr, sync::Arc};

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use chrono::Duration;
use mongodb::bson::oid::ObjectId;

#[allow(unused_imports)]
use crate::filters;

use crate::{
    models::{LineItemType, Payment},
    payment_query::{AccessScope, PaymentQuery, filter_payments},
    pricing::displayed_quantity,
    session::SessionUser,
    state::{AppState, get_payment_by_id, get_service_by_id, list_companies, list_domains},
};

/// Days between invoice creation and payment due date.
const PAYMENT_TERM_DAYS: i64 = 5;

#[derive(Template)]
#[template(path = "payments/receipt.html")]
struct ReceiptTemplate {
    invoice_number: i64,
    created: String,
    due: String,
    provider: String,
    receiver_name: String,
    receiver_description: String,
    receiver_emails: Vec<String>,
    rows: Vec<ReceiptRow>,
    total: f64,
}

#[derive(Debug, PartialEq)]
struct ReceiptRow {
    number: usize,
    label: String,
    quantity: f64,
    price: f64,
    sum: f64,
}

fn receipt_rows(payment: &Payment, month: &str) -> Vec<ReceiptRow> {
    payment
        .invoice
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let label = if line.kind == LineItemType::Inflation || month.is_empty() {
                line.kind.label().to_string()
            } else {
                format!("{} ({month})", line.kind.label())
            };
            ReceiptRow {
                number: idx + 1,
                label,
                quantity: displayed_quantity(line),
                price: line.price.unwrap_or(0.0),
                sum: line.sum,
            }
        })
        .collect()
}

pub async fn payment_receipt(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let object_id = ObjectId::from_str(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let payment = get_payment_by_id(&state, &object_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let domains = list_domains(&state)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let companies = list_companies(&state)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let scope = AccessScope {
        domains: &domains,
        companies: &companies,
    };
    let visible = filter_payments(
        std::slice::from_ref(&payment),
        session_user.identity(),
        &PaymentQuery::default(),
        scope,
    );
    if visible.is_empty() {
        return Err(StatusCode::FORBIDDEN);
    }

    let service_date = match &payment.month_service {
        Some(service_id) => get_service_by_id(&state, service_id)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .map(|s| s.date),
        None => None,
    };
    let month = service_date
        .unwrap_or(payment.invoice_creation_date)
        .to_chrono()
        .format("%m.%Y")
        .to_string();

    let created = payment.invoice_creation_date.to_chrono();
    let receiver = payment.receiver.clone().unwrap_or_default();
    let tpl = ReceiptTemplate {
        invoice_number: payment.invoice_number,
        created: created.format("%d.%m.%Y").to_string(),
        due: (created + Duration::days(PAYMENT_TERM_DAYS))
            .format("%d.%m.%Y")
            .to_string(),
        provider: payment
            .provider
            .as_ref()
            .map(|p| p.description.clone())
            .unwrap_or_default(),
        receiver_name: receiver.company_name,
        receiver_description: receiver.description,
        receiver_emails: receiver.admin_emails,
        rows: receipt_rows(&payment, &month),
        total: payment.general_sum,
    };
    tpl.render()
        .map(Html)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use mongodb::bson::DateTime;

    fn line(kind: LineItemType, amount: Option<f64>, last: Option<f64>, price: f64, sum: f64) -> LineItem {
        LineItem {
            kind,
            amount,
            last_amount: last,
            price: Some(price),
            sum,
        }
    }

    #[test]
    fn rows_show_consumption_and_month() {
        let payment = Payment {
            id: None,
            domain: ObjectId::new(),
            street: None,
            company: ObjectId::new(),
            month_service: None,
            invoice_number: 12,
            invoice_creation_date: DateTime::now(),
            payment_type: "debit".into(),
            invoice: vec![
                line(LineItemType::Electricity, Some(1100.0), Some(1000.0), 4.0, 400.0),
                line(LineItemType::Placing, Some(20.0), None, 95.0, 1900.0),
                line(LineItemType::Inflation, None, None, 12.5, 12.5),
            ],
            general_sum: 2312.5,
            provider: None,
            receiver: None,
        };
        let rows = receipt_rows(&payment, "03.2023");
        assert_eq!(rows[0].quantity, 100.0);
        assert_eq!(rows[0].label, "За електропостачання (03.2023)");
        assert_eq!(rows[1].quantity, 20.0);
        assert_eq!(rows[2].label, "Індекс інфляції");
        assert_eq!(rows[2].number, 3);
    }
}
