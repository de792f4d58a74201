// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use mongodb::{Client, Collection};

use crate::config::AppConfig;
use crate::models::{Company, Domain, Payment, Service, Session, Street, User};

mod companies;
mod domains;
mod payments;
mod seed;
mod services;
mod users;

pub use companies::*;
pub use domains::*;
pub use payments::*;
pub use services::*;
pub use users::*;

pub const SESSION_TTL_SECONDS: u64 = 60 * 60 * 24; // 1 day

#[derive(Clone)]
pub struct AppState {
    pub users: Collection<User>,
    pub sessions: Collection<Session>,
    pub domains: Collection<Domain>,
    pub streets: Collection<Street>,
    pub companies: Collection<Company>,
    pub services: Collection<Service>,
    pub payments: Collection<Payment>,
    pub config: AppConfig,
}

pub async fn init_state(config: &AppConfig) -> Result<AppState> {
    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = client.database(&config.mongodb_db);

    seed::ensure_collections(&db).await?;

    // Only seed when the database is effectively empty (no users).
    if seed::is_database_empty(&db).await? {
        match seed::load_seed(&config.seed_file)? {
            Some(data) => seed::apply_seed(&db, &data).await?,
            None => tracing::info!(path = %config.seed_file, "no seed file, starting empty"),
        }
    }

    Ok(AppState {
        users: db.collection::<User>("users"),
        sessions: db.collection::<Session>("sessions"),
        domains: db.collection::<Domain>("domains"),
        streets: db.collection::<Street>("streets"),
        companies: db.collection::<Company>("companies"),
        services: db.collection::<Service>("services"),
        payments: db.collection::<Payment>("payments"),
        config: config.clone(),
    })
}
