use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use slug::slugify;

use crate::models::{Domain, Identity, Street, UserRole};

use super::AppState;
use super::companies::companies_for_email;

pub async fn list_domains(state: &AppState) -> Result<Vec<Domain>> {
    let mut cursor = state.domains.find(doc! {}).sort(doc! { "name": 1 }).await?;
    let mut domains = Vec::new();
    while let Some(domain) = cursor.try_next().await? {
        domains.push(domain);
    }
    Ok(domains)
}

pub async fn get_domain_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Domain>> {
    state
        .domains
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn create_domain(
    state: &AppState,
    name: &str,
    admin_emails: &[String],
    description: Option<String>,
) -> Result<ObjectId> {
    let name = name.trim();
    if name.is_empty() {
        bail!("domain name is required");
    }
    let slug = slugify(name);
    if state.domains.find_one(doc! { "slug": &slug }).await?.is_some() {
        bail!("domain {slug} already exists");
    }
    let res = state
        .domains
        .insert_one(Domain {
            id: None,
            name: name.to_string(),
            slug,
            admin_emails: admin_emails
                .iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            description,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("domain insert missing _id")
}

/// Domains the identity may bill in or read from.
pub async fn domains_for_identity(state: &AppState, identity: &Identity) -> Result<Vec<Domain>> {
    let domains = list_domains(state).await?;
    match identity.role {
        UserRole::GlobalAdmin => Ok(domains),
        UserRole::DomainAdmin => Ok(domains
            .into_iter()
            .filter(|d| {
                d.admin_emails
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(&identity.email))
            })
            .collect()),
        UserRole::User => {
            let owned: Vec<ObjectId> = companies_for_email(state, &identity.email)
                .await?
                .into_iter()
                .filter_map(|c| c.domain)
                .collect();
            Ok(domains
                .into_iter()
                .filter(|d| d.id.is_some_and(|id| owned.contains(&id)))
                .collect())
        }
    }
}

/// Whether the identity may create or change invoices in `domain`.
pub async fn can_bill_in_domain(
    state: &AppState,
    identity: &Identity,
    domain: &ObjectId,
) -> Result<bool> {
    match identity.role {
        UserRole::GlobalAdmin => Ok(true),
        UserRole::DomainAdmin => Ok(get_domain_by_id(state, domain).await?.is_some_and(|d| {
            d.admin_emails
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&identity.email))
        })),
        UserRole::User => Ok(false),
    }
}

pub async fn list_streets(state: &AppState, domain: Option<&ObjectId>) -> Result<Vec<Street>> {
    let filter = match domain {
        Some(domain) => doc! { "domain": domain },
        None => doc! {},
    };
    let mut cursor = state.streets.find(filter).sort(doc! { "address": 1 }).await?;
    let mut streets = Vec::new();
    while let Some(street) = cursor.try_next().await? {
        streets.push(street);
    }
    Ok(streets)
}

pub async fn create_street(
    state: &AppState,
    domain: &ObjectId,
    address: &str,
    city: Option<String>,
) -> Result<ObjectId> {
    let address = address.trim();
    if address.is_empty() {
        bail!("street address is required");
    }
    get_domain_by_id(state, domain)
        .await?
        .with_context(|| format!("domain {domain} not found"))?;
    let res = state
        .streets
        .insert_one(Street {
            id: None,
            domain: *domain,
            address: address.to_string(),
            city,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("street insert missing _id")
}
