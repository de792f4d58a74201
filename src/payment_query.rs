// payment_query.rs
// Read-path filtering of payments: role scoping first, then the optional query
// narrowing, then the limit. Order-preserving and side-effect free.

use std::{collections::HashSet, str::FromStr};

use chrono::Datelike;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::models::{Company, Domain, Identity, Payment, UserRole};

/// Raw query string of `GET /api/payments`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQueryParams {
    pub limit: Option<usize>,
    pub company_ids: Option<String>,
    pub domain_ids: Option<String>,
    pub year: Option<i32>,
    /// Calendar month, 1..=12.
    pub month: Option<u32>,
    /// Calendar quarter, 1..=4.
    pub quarter: Option<u32>,
}

/// Validated narrowing options; every present field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentQuery {
    pub company_ids: Option<HashSet<ObjectId>>,
    pub domain_ids: Option<HashSet<ObjectId>>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub quarter: Option<u32>,
    pub limit: Option<usize>,
}

impl PaymentQuery {
    pub fn parse(params: PaymentQueryParams) -> Result<Self, String> {
        if let Some(month) = params.month {
            if !(1..=12).contains(&month) {
                return Err(format!("month must be between 1 and 12, got {month}"));
            }
        }
        if let Some(quarter) = params.quarter {
            if !(1..=4).contains(&quarter) {
                return Err(format!("quarter must be between 1 and 4, got {quarter}"));
            }
        }

        Ok(PaymentQuery {
            company_ids: parse_id_list(params.company_ids.as_deref(), "companyIds")?,
            domain_ids: parse_id_list(params.domain_ids.as_deref(), "domainIds")?,
            year: params.year,
            month: params.month,
            quarter: params.quarter,
            // 0 means unlimited
            limit: params.limit.filter(|&n| n > 0),
        })
    }

    fn matches(&self, payment: &Payment) -> bool {
        if let Some(ids) = &self.company_ids {
            if !ids.contains(&payment.company) {
                return false;
            }
        }
        if let Some(ids) = &self.domain_ids {
            if !ids.contains(&payment.domain) {
                return false;
            }
        }

        let created = payment.invoice_creation_date.to_chrono();
        if self.year.is_some_and(|year| created.year() != year) {
            return false;
        }
        if self.month.is_some_and(|month| created.month() != month) {
            return false;
        }
        if self
            .quarter
            .is_some_and(|quarter| quarter_of(created.month0()) != quarter)
        {
            return false;
        }
        true
    }
}

/// 1-based quarter of a 0-based month.
pub fn quarter_of(month0: u32) -> u32 {
    month0 / 3 + 1
}

fn parse_id_list(raw: Option<&str>, label: &str) -> Result<Option<HashSet<ObjectId>>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|id| ObjectId::from_str(id).map_err(|_| format!("{label}: invalid id {id}")))
        .collect::<Result<HashSet<_>, _>>()
        .map(Some)
}

/// Who administers what: the records role scoping is checked against.
#[derive(Debug, Clone, Copy)]
pub struct AccessScope<'a> {
    pub domains: &'a [Domain],
    pub companies: &'a [Company],
}

impl AccessScope<'_> {
    fn visible_domains(&self, email: &str) -> HashSet<ObjectId> {
        self.domains
            .iter()
            .filter(|d| contains_email(&d.admin_emails, email))
            .filter_map(|d| d.id)
            .collect()
    }

    fn visible_companies(&self, email: &str) -> HashSet<ObjectId> {
        self.companies
            .iter()
            .filter(|c| contains_email(&c.admin_emails, email))
            .filter_map(|c| c.id)
            .collect()
    }
}

fn contains_email(list: &[String], email: &str) -> bool {
    list.iter().any(|e| e.eq_ignore_ascii_case(email))
}

/// Payments the identity may see that match the query, in input order.
pub fn filter_payments(
    payments: &[Payment],
    identity: &Identity,
    query: &PaymentQuery,
    scope: AccessScope<'_>,
) -> Vec<Payment> {
    let role_filter: Box<dyn Fn(&Payment) -> bool> = match identity.role {
        UserRole::GlobalAdmin => Box::new(|_: &Payment| true),
        UserRole::DomainAdmin => {
            let domains = scope.visible_domains(&identity.email);
            Box::new(move |p: &Payment| domains.contains(&p.domain))
        }
        UserRole::User => {
            let companies = scope.visible_companies(&identity.email);
            Box::new(move |p: &Payment| companies.contains(&p.company))
        }
    };

    payments
        .iter()
        .filter(|p| role_filter(p))
        .filter(|p| query.matches(p))
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mongodb::bson::DateTime;

    struct Fixture {
        domains: Vec<Domain>,
        companies: Vec<Company>,
        payments: Vec<Payment>,
    }

    fn domain(name: &str, admins: &[&str]) -> Domain {
        Domain {
            id: Some(ObjectId::new()),
            name: name.into(),
            slug: name.to_lowercase(),
            admin_emails: admins.iter().map(|s| s.to_string()).collect(),
            description: None,
        }
    }

    fn company(domain: &Domain, admins: &[&str]) -> Company {
        Company {
            id: Some(ObjectId::new()),
            domain: domain.id,
            company_name: "Компанія".into(),
            admin_emails: admins.iter().map(|s| s.to_string()).collect(),
            ..Company::default()
        }
    }

    fn payment(company: &Company, number: i64, y: i32, m: u32) -> Payment {
        Payment {
            id: Some(ObjectId::new()),
            domain: company.domain.unwrap(),
            street: None,
            company: company.id.unwrap(),
            month_service: None,
            invoice_number: number,
            invoice_creation_date: DateTime::from_chrono(
                Utc.with_ymd_and_hms(y, m, 10, 12, 0, 0).unwrap(),
            ),
            payment_type: "debit".into(),
            invoice: Vec::new(),
            general_sum: 0.0,
            provider: None,
            receiver: None,
        }
    }

    fn fixture() -> Fixture {
        let d1 = domain("Житомир", &["domain@admin.com"]);
        let d2 = domain("Київ", &["other@admin.com"]);
        let c1 = company(&d1, &["user@company.com"]);
        let c2 = company(&d1, &[]);
        let c3 = company(&d2, &["user@company.com"]);
        let payments = vec![
            payment(&c1, 1, 2023, 2),
            payment(&c2, 2, 2023, 5),
            payment(&c3, 3, 2022, 4),
            payment(&c1, 4, 2024, 6),
            payment(&c3, 5, 2023, 11),
        ];
        Fixture {
            domains: vec![d1, d2],
            companies: vec![c1, c2, c3],
            payments,
        }
    }

    fn numbers(list: &[Payment]) -> Vec<i64> {
        list.iter().map(|p| p.invoice_number).collect()
    }

    fn run(f: &Fixture, identity: &Identity, params: PaymentQueryParams) -> Vec<i64> {
        let query = PaymentQuery::parse(params).unwrap();
        let scope = AccessScope {
            domains: &f.domains,
            companies: &f.companies,
        };
        numbers(&filter_payments(&f.payments, identity, &query, scope))
    }

    #[test]
    fn global_admin_sees_everything() {
        let f = fixture();
        let admin = Identity::new("root@admin.com", UserRole::GlobalAdmin);
        assert_eq!(run(&f, &admin, PaymentQueryParams::default()), vec![1, 2, 3, 4, 5]);

        let limited = PaymentQueryParams {
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, limited), vec![1, 2]);

        let zero = PaymentQueryParams {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, zero), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn domain_admin_sees_own_domains() {
        let f = fixture();
        let admin = Identity::new("domain@admin.com", UserRole::DomainAdmin);
        assert_eq!(run(&f, &admin, PaymentQueryParams::default()), vec![1, 2, 4]);
    }

    #[test]
    fn user_sees_own_companies() {
        let f = fixture();
        let user = Identity::new("user@company.com", UserRole::User);
        assert_eq!(run(&f, &user, PaymentQueryParams::default()), vec![1, 3, 4, 5]);

        let by_company = PaymentQueryParams {
            company_ids: Some(f.companies[0].id.unwrap().to_hex()),
            ..Default::default()
        };
        assert_eq!(run(&f, &user, by_company), vec![1, 4]);
    }

    #[test]
    fn narrows_by_domain_list() {
        let f = fixture();
        let admin = Identity::new("root@admin.com", UserRole::GlobalAdmin);
        let ids = format!(
            "{}, {}",
            f.domains[1].id.unwrap().to_hex(),
            ObjectId::new().to_hex()
        );
        let params = PaymentQueryParams {
            domain_ids: Some(ids),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, params), vec![3, 5]);
    }

    #[test]
    fn narrows_by_dates() {
        let f = fixture();
        let admin = Identity::new("root@admin.com", UserRole::GlobalAdmin);

        let year = PaymentQueryParams {
            year: Some(2023),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, year), vec![1, 2, 5]);

        let month = PaymentQueryParams {
            month: Some(2),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, month), vec![1]);

        let quarter = PaymentQueryParams {
            quarter: Some(2),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, quarter), vec![2, 3, 4]);

        let combined = PaymentQueryParams {
            year: Some(2023),
            quarter: Some(2),
            ..Default::default()
        };
        assert_eq!(run(&f, &admin, combined), vec![2]);
    }

    #[test]
    fn rejects_bad_input() {
        let bad_id = PaymentQueryParams {
            company_ids: Some("not-an-id".into()),
            ..Default::default()
        };
        assert!(PaymentQuery::parse(bad_id).is_err());

        let bad_month = PaymentQueryParams {
            month: Some(0),
            ..Default::default()
        };
        assert!(PaymentQuery::parse(bad_month).is_err());

        let bad_quarter = PaymentQueryParams {
            quarter: Some(5),
            ..Default::default()
        };
        assert!(PaymentQuery::parse(bad_quarter).is_err());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let f = fixture();
        let admin = Identity::new("domain@admin.com", UserRole::DomainAdmin);
        let first = run(&f, &admin, PaymentQueryParams::default());
        let second = run(&f, &admin, PaymentQueryParams::default());
        assert_eq!(first, second);
    }

    #[test]
    fn quarters_are_one_based() {
        assert_eq!(quarter_of(0), 1);
        assert_eq!(quarter_of(3), 2);
        assert_eq!(quarter_of(5), 2);
        assert_eq!(quarter_of(11), 4);
    }
}
