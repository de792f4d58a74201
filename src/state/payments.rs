use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};

use crate::models::{Company, Identity, LineItemType, Payment, Provider, Receiver, Service};
use crate::payment_query::{AccessScope, PaymentQuery, filter_payments};
use crate::pricing::{
    DerivationMode, InflationInputs, PricingContext, check_readings, finalize_lines,
};

use super::services::{find_previous_service, get_service_by_id};
use super::{AppState, get_company_by_id, get_domain_by_id, list_companies, list_domains};

/// Records the pricing engine reads for one company and service-month.
#[derive(Debug, Clone, Default)]
pub struct PricingInputs {
    pub company: Option<Company>,
    pub service: Option<Service>,
    pub inflation: Option<InflationInputs>,
}

impl PricingInputs {
    pub fn context(&self, mode: DerivationMode) -> PricingContext<'_> {
        PricingContext {
            company: self.company.as_ref(),
            service: self.service.as_ref(),
            inflation: self.inflation,
            mode,
        }
    }
}

/// All payments in insertion order.
pub async fn list_payments(state: &AppState) -> Result<Vec<Payment>> {
    let mut cursor = state.payments.find(doc! {}).sort(doc! { "_id": 1 }).await?;
    let mut payments = Vec::new();
    while let Some(payment) = cursor.try_next().await? {
        payments.push(payment);
    }
    Ok(payments)
}

/// Payments visible to `identity` that match `query`.
pub async fn find_payments(
    state: &AppState,
    identity: &Identity,
    query: &PaymentQuery,
) -> Result<Vec<Payment>> {
    let payments = list_payments(state).await?;
    let domains = list_domains(state).await?;
    let companies = list_companies(state).await?;
    let scope = AccessScope {
        domains: &domains,
        companies: &companies,
    };
    Ok(filter_payments(&payments, identity, query, scope))
}

pub async fn get_payment_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Payment>> {
    state
        .payments
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

/// Highest stored invoice number plus one; the first invoice is number 1.
pub async fn next_invoice_number(state: &AppState) -> Result<i64> {
    let last = state
        .payments
        .find_one(doc! {})
        .sort(doc! { "invoiceNumber": -1 })
        .await?;
    Ok(last.map(|p| p.invoice_number.max(0)).unwrap_or(0) + 1)
}

/// Stores a new invoice. Line sums and the general sum are recomputed, a
/// missing invoice number is assigned, and provider/receiver default to the
/// domain and company records.
pub async fn insert_payment(state: &AppState, mut payment: Payment) -> Result<Payment> {
    let company = get_company_by_id(state, &payment.company)
        .await?
        .with_context(|| format!("company {} not found", payment.company))?;
    if company.domain.is_some_and(|d| d != payment.domain) {
        bail!("company does not belong to the payment's domain");
    }
    check_readings(&payment.invoice).map_err(anyhow::Error::msg)?;

    if payment.invoice_number <= 0 {
        payment.invoice_number = next_invoice_number(state).await?;
    }
    if payment.street.is_none() {
        payment.street = company.street;
    }
    if payment.receiver.is_none() {
        payment.receiver = Some(Receiver {
            company_name: company.company_name.clone(),
            description: company.description.clone().unwrap_or_default(),
            admin_emails: company.admin_emails.clone(),
        });
    }
    if payment.provider.is_none() {
        if let Some(domain) = get_domain_by_id(state, &payment.domain).await? {
            payment.provider = Some(Provider {
                description: domain.description.unwrap_or(domain.name),
            });
        }
    }
    payment.general_sum = finalize_lines(&mut payment.invoice);

    let res = state
        .payments
        .insert_one(Payment {
            id: None,
            ..payment.clone()
        })
        .await?;
    payment.id = Some(
        res.inserted_id
            .as_object_id()
            .context("payment insert missing _id")?,
    );
    tracing::info!(
        invoice = payment.invoice_number,
        company = %payment.company,
        general_sum = payment.general_sum,
        "payment created"
    );
    Ok(payment)
}

/// Replaces the stored lines and metadata of an invoice, keeping its id.
pub async fn update_payment(state: &AppState, id: &ObjectId, mut payment: Payment) -> Result<Payment> {
    let existing = get_payment_by_id(state, id)
        .await?
        .with_context(|| format!("payment {id} not found"))?;
    check_readings(&payment.invoice).map_err(anyhow::Error::msg)?;
    if payment.invoice_number <= 0 {
        payment.invoice_number = existing.invoice_number;
    }
    payment.general_sum = finalize_lines(&mut payment.invoice);
    payment.id = Some(*id);

    let mut fields = match to_bson(&payment)? {
        mongodb::bson::Bson::Document(doc) => doc,
        _ => bail!("payment did not serialize to a document"),
    };
    fields.remove("_id");
    state
        .payments
        .update_one(doc! { "_id": id }, doc! { "$set": fields })
        .await?;
    Ok(payment)
}

/// Placing price billed to `company` for `service`; falls back to the
/// company's price per meter when no such invoice exists.
pub async fn previous_placing_price(
    state: &AppState,
    company: &Company,
    service: &Service,
) -> Result<f64> {
    let fallback = company.price_per_meter.unwrap_or(0.0);
    let (Some(company_id), Some(service_id)) = (company.id, service.id) else {
        return Ok(fallback);
    };
    let payment = state
        .payments
        .find_one(doc! { "company": company_id, "monthService": service_id })
        .sort(doc! { "_id": -1 })
        .await?;
    Ok(payment
        .and_then(|p| {
            p.invoice
                .iter()
                .find(|line| line.kind == LineItemType::Placing)
                .and_then(|line| line.price)
        })
        .unwrap_or(fallback))
}

/// Loads company, service-month and inflation inputs for price derivation.
pub async fn load_pricing_inputs(
    state: &AppState,
    company_id: Option<&ObjectId>,
    service_id: Option<&ObjectId>,
) -> Result<PricingInputs> {
    let company = match company_id {
        Some(id) => get_company_by_id(state, id).await?,
        None => None,
    };
    let service = match service_id {
        Some(id) => get_service_by_id(state, id).await?,
        None => None,
    };

    let mut inflation = None;
    if let (Some(company), Some(service)) = (&company, &service) {
        let domain = service.domain.or(company.domain);
        let street = service.street.or(company.street);
        if let (Some(domain), Some(street)) = (domain, street) {
            let previous = find_previous_service(state, &domain, &street, service.date).await?;
            if let Some(previous) = previous {
                inflation = Some(InflationInputs {
                    previous_placing_price: previous_placing_price(state, company, &previous)
                        .await?,
                    previous_index: previous.inflicion_price,
                });
            }
        }
    }

    Ok(PricingInputs {
        company,
        service,
        inflation,
    })
}
