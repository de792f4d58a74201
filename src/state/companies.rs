use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};

use crate::models::Company;
use crate::pricing::normalize_discount;

use super::AppState;

pub async fn list_companies(state: &AppState) -> Result<Vec<Company>> {
    let mut cursor = state
        .companies
        .find(doc! {})
        .sort(doc! { "companyName": 1 })
        .await?;
    let mut companies = Vec::new();
    while let Some(company) = cursor.try_next().await? {
        companies.push(company);
    }
    Ok(companies)
}

pub async fn list_companies_in_domains(
    state: &AppState,
    domains: &[ObjectId],
) -> Result<Vec<Company>> {
    let mut cursor = state
        .companies
        .find(doc! { "domain": { "$in": domains.to_vec() } })
        .sort(doc! { "companyName": 1 })
        .await?;
    let mut companies = Vec::new();
    while let Some(company) = cursor.try_next().await? {
        companies.push(company);
    }
    Ok(companies)
}

pub async fn get_company_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Company>> {
    state
        .companies
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn create_company(state: &AppState, company: Company) -> Result<ObjectId> {
    let company = normalized(company)?;
    let res = state
        .companies
        .insert_one(Company { id: None, ..company })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("company insert missing _id")
}

pub async fn update_company(state: &AppState, id: &ObjectId, company: Company) -> Result<()> {
    let company = normalized(company)?;
    let mut fields = match to_bson(&Company { id: None, ..company })? {
        mongodb::bson::Bson::Document(doc) => doc,
        _ => bail!("company did not serialize to a document"),
    };
    fields.remove("_id");

    let res = state
        .companies
        .update_one(doc! { "_id": id }, doc! { "$set": fields })
        .await?;
    if res.matched_count == 0 {
        bail!("company {id} not found");
    }
    Ok(())
}

/// Companies with invoices on record cannot be removed.
pub async fn delete_company(state: &AppState, id: &ObjectId) -> Result<()> {
    let has_payments = state
        .payments
        .find_one(doc! { "company": id })
        .await?
        .is_some();
    if has_payments {
        bail!("company has payments and cannot be deleted");
    }
    state.companies.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

/// Companies whose admin list contains `email`. Stored emails are lowercase.
pub async fn companies_for_email(state: &AppState, email: &str) -> Result<Vec<Company>> {
    let mut cursor = state
        .companies
        .find(doc! { "adminEmails": email.trim().to_lowercase() })
        .await?;
    let mut companies = Vec::new();
    while let Some(company) = cursor.try_next().await? {
        companies.push(company);
    }
    Ok(companies)
}

pub(super) fn normalized(mut company: Company) -> Result<Company> {
    company.company_name = company.company_name.trim().to_string();
    if company.company_name.is_empty() {
        bail!("company name is required");
    }
    company.discount = normalize_discount(company.discount);
    company.admin_emails = company
        .admin_emails
        .iter()
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect();
    Ok(company)
}
