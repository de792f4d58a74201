use anyhow::{Context, Result};
use mongodb::{
    Database,
    bson::{DateTime, oid::ObjectId},
};
use serde::Deserialize;
use slug::slugify;
use std::fs;

use crate::models::{Company, Domain, Service, Street, User, UserRole};
use super::companies::normalized;
use super::services::parse_month;

const COLLECTIONS: [&str; 7] = [
    "users",
    "sessions",
    "domains",
    "streets",
    "companies",
    "services",
    "payments",
];

/// Seed file layout: domains own streets, streets own companies and services.
#[derive(Debug, Deserialize)]
pub(super) struct SeedData {
    #[serde(default)]
    pub domains: Vec<SeedDomain>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SeedDomain {
    pub name: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub streets: Vec<SeedStreet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SeedStreet {
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub services: Vec<SeedService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SeedService {
    /// `YYYY-MM`
    pub month: String,
    pub rent_price: Option<f64>,
    pub electricity_price: Option<f64>,
    pub water_price: Option<f64>,
    pub water_price_total: Option<f64>,
    pub inflicion_price: Option<f64>,
    pub garbage_collector_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SeedUser {
    pub email: String,
    pub secret: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

pub(super) async fn is_database_empty(db: &Database) -> Result<bool> {
    let users_coll = db.collection::<User>("users");
    let count = users_coll.estimated_document_count().await?;
    Ok(count == 0)
}

pub(super) fn load_seed(path: &str) -> Result<Option<SeedData>> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Ok(None);
    };
    let data = serde_json::from_str::<SeedData>(&contents)
        .with_context(|| format!("invalid seed file {path}"))?;
    Ok(Some(data))
}

pub(super) async fn ensure_collections(db: &Database) -> Result<()> {
    let existing = db.list_collection_names().await?;
    for name in COLLECTIONS {
        if !existing.iter().any(|existing| existing == name) {
            db.create_collection(name).await?;
        }
    }
    Ok(())
}

pub(super) async fn apply_seed(db: &Database, data: &SeedData) -> Result<()> {
    let domains = db.collection::<Domain>("domains");
    let streets = db.collection::<Street>("streets");
    let companies = db.collection::<Company>("companies");
    let services = db.collection::<Service>("services");

    for seed_domain in &data.domains {
        let domain_id = insert_id(
            domains
                .insert_one(Domain {
                    id: None,
                    name: seed_domain.name.clone(),
                    slug: slugify(&seed_domain.name),
                    admin_emails: seed_domain
                        .admin_emails
                        .iter()
                        .map(|e| e.trim().to_lowercase())
                        .collect(),
                    description: seed_domain.description.clone(),
                })
                .await?
                .inserted_id
                .as_object_id(),
            "domain",
        )?;

        for seed_street in &seed_domain.streets {
            let street_id = insert_id(
                streets
                    .insert_one(Street {
                        id: None,
                        domain: domain_id,
                        address: seed_street.address.clone(),
                        city: seed_street.city.clone(),
                    })
                    .await?
                    .inserted_id
                    .as_object_id(),
                "street",
            )?;

            for company in &seed_street.companies {
                let mut company = normalized(company.clone())?;
                company.id = None;
                company.domain = Some(domain_id);
                company.street = Some(street_id);
                companies.insert_one(company).await?;
            }

            for seed_service in &seed_street.services {
                let date = parse_month(&seed_service.month)
                    .with_context(|| format!("invalid seed month {}", seed_service.month))?;
                services
                    .insert_one(Service {
                        id: None,
                        domain: Some(domain_id),
                        street: Some(street_id),
                        date: DateTime::from_chrono(date),
                        rent_price: seed_service.rent_price,
                        electricity_price: seed_service.electricity_price,
                        water_price: seed_service.water_price,
                        water_price_total: seed_service.water_price_total,
                        inflicion_price: seed_service.inflicion_price,
                        garbage_collector_price: seed_service.garbage_collector_price,
                        description: None,
                    })
                    .await?;
            }
        }
    }

    let users = db.collection::<User>("users");
    for seed_user in &data.users {
        let mut roles = seed_user.roles.clone();
        if !roles.contains(&seed_user.role) {
            roles.push(seed_user.role);
        }
        users
            .insert_one(User {
                id: None,
                email: seed_user.email.to_lowercase(),
                secret: seed_user.secret.clone(),
                role: seed_user.role,
                roles,
            })
            .await?;
    }

    tracing::info!(
        domains = data.domains.len(),
        users = data.users.len(),
        "seeded empty database"
    );
    Ok(())
}

fn insert_id(id: Option<ObjectId>, what: &str) -> Result<ObjectId> {
    id.with_context(|| format!("{what} insert missing _id"))
}
