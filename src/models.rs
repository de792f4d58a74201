// models.rs
// Domain models for the seed file and the MongoDB collections.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// User roles for authorization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    GlobalAdmin,
    DomainAdmin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::GlobalAdmin => "GlobalAdmin",
            UserRole::DomainAdmin => "DomainAdmin",
            UserRole::User => "User",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::GlobalAdmin | UserRole::DomainAdmin)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

/// Billable component of an invoice. Serialized names match the stored documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LineItemType {
    #[serde(rename = "maintenancePrice")]
    Maintenance,
    #[serde(rename = "placingPrice")]
    Placing,
    #[serde(rename = "electricityPrice")]
    Electricity,
    #[serde(rename = "waterPrice")]
    Water,
    #[serde(rename = "garbageCollectorPrice")]
    GarbageCollector,
    #[serde(rename = "inflicionPrice")]
    Inflation,
    #[serde(rename = "discount")]
    Discount,
    #[serde(rename = "waterPart")]
    WaterPart,
}

impl LineItemType {
    pub const ALL: [LineItemType; 8] = [
        LineItemType::Maintenance,
        LineItemType::Placing,
        LineItemType::Electricity,
        LineItemType::Water,
        LineItemType::GarbageCollector,
        LineItemType::Inflation,
        LineItemType::Discount,
        LineItemType::WaterPart,
    ];

    /// Metered lines carry a current and a previous reading.
    pub fn is_metered(&self) -> bool {
        matches!(self, LineItemType::Electricity | LineItemType::Water)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LineItemType::Maintenance => "Утримання",
            LineItemType::Placing => "Розміщення",
            LineItemType::Electricity => "За електропостачання",
            LineItemType::Water => "За водопостачання",
            LineItemType::GarbageCollector => "За вивіз ТПВ",
            LineItemType::Inflation => "Індекс інфляції",
            LineItemType::Discount => "Знижка",
            LineItemType::WaterPart => "За водопостачання (без лічильника)",
        }
    }
}

/// Top-level grouping of streets and companies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Street {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub domain: ObjectId,
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Real-estate company billed for utilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub domain: Option<ObjectId>,
    pub street: Option<ObjectId>,
    pub company_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub total_area: Option<f64>,
    #[serde(default)]
    pub price_per_meter: Option<f64>,
    #[serde(default)]
    pub service_price_per_meter: Option<f64>,
    #[serde(default)]
    pub rent_part: Option<f64>,
    #[serde(default)]
    pub water_part: Option<f64>,
    /// Always <= 0.
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub inflicion: bool,
    #[serde(default)]
    pub garbage_collector: bool,
    #[serde(default)]
    pub public_electric_utility: bool,
    #[serde(default)]
    pub cleaning: Option<f64>,
}

/// Monthly snapshot of utility unit prices for a domain/street.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub domain: Option<ObjectId>,
    pub street: Option<ObjectId>,
    pub date: DateTime,
    #[serde(default)]
    pub rent_price: Option<f64>,
    #[serde(default)]
    pub electricity_price: Option<f64>,
    #[serde(default)]
    pub water_price: Option<f64>,
    #[serde(default)]
    pub water_price_total: Option<f64>,
    #[serde(default)]
    pub inflicion_price: Option<f64>,
    #[serde(default)]
    pub garbage_collector_price: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Service {
    /// Empty snapshot for the given month; prices are filled by the caller.
    pub fn for_month(date: DateTime) -> Self {
        Service {
            id: None,
            domain: None,
            street: None,
            date,
            rent_price: None,
            electricity_price: None,
            water_price: None,
            water_price_total: None,
            inflicion_price: None,
            garbage_collector_price: None,
            description: None,
        }
    }
}

/// One billable row of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "type")]
    pub kind: LineItemType,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub last_amount: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub sum: f64,
}

impl LineItem {
    pub fn new(kind: LineItemType) -> Self {
        LineItem {
            kind,
            amount: None,
            last_amount: None,
            price: None,
            sum: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

/// Invoice for one company and one service-month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub domain: ObjectId,
    #[serde(default)]
    pub street: Option<ObjectId>,
    pub company: ObjectId,
    pub month_service: Option<ObjectId>,
    pub invoice_number: i64,
    pub invoice_creation_date: DateTime,
    #[serde(rename = "type", default = "default_payment_type")]
    pub payment_type: String,
    #[serde(default)]
    pub invoice: Vec<LineItem>,
    #[serde(default)]
    pub general_sum: f64,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(rename = "reciever", default)]
    pub receiver: Option<Receiver>,
}

fn default_payment_type() -> String {
    "debit".to_string()
}

/// User document; `role` is the active role, `roles` every role granted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub secret: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

/// Session document stored in MongoDB linking a token to a user and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub user_email: String,
    pub expires_at: DateTime,
}

/// Current caller as resolved from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub role: UserRole,
    pub roles: Vec<UserRole>,
}

impl Identity {
    pub fn new(email: impl Into<String>, role: UserRole) -> Self {
        Identity {
            email: email.into(),
            role,
            roles: vec![role],
        }
    }
}
