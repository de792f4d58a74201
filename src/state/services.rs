use anyhow::{Context, Result, bail};
use chrono::{DateTime as ChronoDateTime, Datelike, NaiveDate, TimeZone, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};

use crate::models::Service;

use super::AppState;

/// First instant (UTC) of the month containing `date`.
pub fn month_start(date: ChronoDateTime<Utc>) -> ChronoDateTime<Utc> {
    Utc.with_ymd_and_hms(date.year(), date.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(date)
}

/// Parses `YYYY-MM` (or a full `YYYY-MM-DD`) into the month's first instant.
pub fn parse_month(value: &str) -> Option<ChronoDateTime<Utc>> {
    let value = value.trim();
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d"))
        .ok()?;
    Utc.with_ymd_and_hms(date.year(), date.month(), 1, 0, 0, 0)
        .single()
}

pub async fn list_services(
    state: &AppState,
    domain: Option<&ObjectId>,
    street: Option<&ObjectId>,
) -> Result<Vec<Service>> {
    let mut filter = Document::new();
    if let Some(domain) = domain {
        filter.insert("domain", domain);
    }
    if let Some(street) = street {
        filter.insert("street", street);
    }
    let mut cursor = state.services.find(filter).sort(doc! { "date": -1 }).await?;
    let mut items = Vec::new();
    while let Some(service) = cursor.try_next().await? {
        items.push(service);
    }
    Ok(items)
}

pub async fn get_service_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Service>> {
    state
        .services
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn find_service_for_month(
    state: &AppState,
    domain: &ObjectId,
    street: &ObjectId,
    date: ChronoDateTime<Utc>,
) -> Result<Option<Service>> {
    let start = month_start(date);
    state
        .services
        .find_one(doc! {
            "domain": domain,
            "street": street,
            "date": DateTime::from_chrono(start),
        })
        .await
        .map_err(Into::into)
}

/// Latest service-month strictly before `before` for the same domain/street.
pub async fn find_previous_service(
    state: &AppState,
    domain: &ObjectId,
    street: &ObjectId,
    before: DateTime,
) -> Result<Option<Service>> {
    state
        .services
        .find_one(doc! {
            "domain": domain,
            "street": street,
            "date": { "$lt": before },
        })
        .sort(doc! { "date": -1 })
        .await
        .map_err(Into::into)
}

/// Inserts a month snapshot. One service per domain/street/month.
pub async fn create_service(state: &AppState, service: Service) -> Result<ObjectId> {
    let domain = service.domain.context("service requires a domain")?;
    let street = service.street.context("service requires a street")?;
    let start = month_start(service.date.to_chrono());

    if find_service_for_month(state, &domain, &street, start)
        .await?
        .is_some()
    {
        bail!("service for {} already exists", start.format("%Y-%m"));
    }

    let res = state
        .services
        .insert_one(Service {
            id: None,
            date: DateTime::from_chrono(start),
            ..service
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("service insert missing _id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_months() {
        let march = parse_month("2023-03").unwrap();
        assert_eq!((march.year(), march.month(), march.day()), (2023, 3, 1));
        let from_day = parse_month("2023-03-17").unwrap();
        assert_eq!(from_day, march);
        assert!(parse_month("march").is_none());
    }

    #[test]
    fn month_start_truncates() {
        let date = Utc.with_ymd_and_hms(2024, 2, 29, 18, 30, 0).unwrap();
        assert_eq!(
            month_start(date),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
    }
}
