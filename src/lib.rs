// lib.rs
// Library surface shared by the server binary and the integration tests.

pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod payment_query;
pub mod pricing;
pub mod routes;
pub mod session;
pub mod state;
pub mod totp;
