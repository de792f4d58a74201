#[path = "common/mod.rs"]
mod common;

use chrono::{TimeZone, Utc};
use mongodb::bson::{DateTime, oid::ObjectId};

use spacehub::models::{Company, LineItem, LineItemType, Payment, Service};
use spacehub::pricing::{DerivationMode, price_lines};
use spacehub::state::{
    AppState, companies_for_email, create_company, create_domain, create_service, create_street, delete_company,
    find_previous_service, get_company_by_id, insert_payment, load_pricing_inputs,
    next_invoice_number, update_company,
};

struct Fixture {
    domain: ObjectId,
    street: ObjectId,
}

async fn fixture(state: &AppState) -> Fixture {
    let domain = create_domain(state, "Центр", &["boss@spacehub.local".to_string()], None)
        .await
        .unwrap();
    let street = create_street(state, &domain, "вул. Хрещатик, 10", None)
        .await
        .unwrap();
    Fixture { domain, street }
}

async fn service(state: &AppState, f: &Fixture, year: i32, month: u32, index: f64) -> ObjectId {
    let date = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap();
    let mut service = Service::for_month(DateTime::from_chrono(date));
    service.domain = Some(f.domain);
    service.street = Some(f.street);
    service.rent_price = Some(10.0);
    service.electricity_price = Some(4.0);
    service.inflicion_price = Some(index);
    create_service(state, service).await.unwrap()
}

fn draft(f: &Fixture, company: ObjectId, service: ObjectId, lines: Vec<LineItem>) -> Payment {
    Payment {
        id: None,
        domain: f.domain,
        street: Some(f.street),
        company,
        month_service: Some(service),
        invoice_number: 0,
        invoice_creation_date: DateTime::now(),
        payment_type: "debit".into(),
        invoice: lines,
        general_sum: 0.0,
        provider: None,
        receiver: None,
    }
}

#[tokio::test]
async fn company_crud_normalizes_and_guards_delete() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let f = fixture(&state).await;

    let id = create_company(
        &state,
        Company {
            domain: Some(f.domain),
            street: Some(f.street),
            company_name: "Сонечко".into(),
            discount: 150.0,
            price_per_meter: Some(95.0),
            ..Company::default()
        },
    )
    .await
    .unwrap();

    let stored = get_company_by_id(&state, &id).await.unwrap().unwrap();
    assert_eq!(stored.discount, -150.0, "positive discount stored negated");

    update_company(
        &state,
        &id,
        Company {
            price_per_meter: Some(100.0),
            ..stored.clone()
        },
    )
    .await
    .unwrap();
    let updated = get_company_by_id(&state, &id).await.unwrap().unwrap();
    assert_eq!(updated.price_per_meter, Some(100.0));
    assert_eq!(updated.company_name, "Сонечко");

    let bdzhilka = create_company(
        &state,
        Company {
            domain: Some(f.domain),
            company_name: "Бджілка".into(),
            admin_emails: vec![" Office@Bdzhilka.UA ".into()],
            ..Company::default()
        },
    )
    .await
    .unwrap();
    let found = companies_for_email(&state, "OFFICE@bdzhilka.ua").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, Some(bdzhilka));
    assert!(
        companies_for_email(&state, "office@bdzhilka.u")
            .await
            .unwrap()
            .is_empty()
    );

    // A company with an invoice cannot be removed.
    let month = service(&state, &f, 2023, 1, 100.0).await;
    insert_payment(&state, draft(&f, id, month, vec![]))
        .await
        .unwrap();
    assert!(delete_company(&state, &id).await.is_err());
    assert!(get_company_by_id(&state, &id).await.unwrap().is_some());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn services_are_unique_per_month_and_ordered() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let f = fixture(&state).await;

    let jan = service(&state, &f, 2023, 1, 100.5).await;
    let _mar = service(&state, &f, 2023, 3, 101.0).await;

    let date = Utc.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap();
    let mut duplicate = Service::for_month(DateTime::from_chrono(date));
    duplicate.domain = Some(f.domain);
    duplicate.street = Some(f.street);
    assert!(create_service(&state, duplicate).await.is_err());

    let march = DateTime::from_chrono(Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap());
    let previous = find_previous_service(&state, &f.domain, &f.street, march)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(previous.id, Some(jan), "gap months are skipped");

    let january = DateTime::from_chrono(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    assert!(
        find_previous_service(&state, &f.domain, &f.street, january)
            .await
            .unwrap()
            .is_none()
    );

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn payments_get_sequential_numbers_and_recomputed_sums() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let f = fixture(&state).await;
    let company = create_company(
        &state,
        Company {
            domain: Some(f.domain),
            street: Some(f.street),
            company_name: "Бджілка".into(),
            admin_emails: vec!["office@bdzhilka.ua".into()],
            ..Company::default()
        },
    )
    .await
    .unwrap();
    let month = service(&state, &f, 2023, 2, 100.0).await;

    assert_eq!(next_invoice_number(&state).await.unwrap(), 1);

    let mut electricity = LineItem::new(LineItemType::Electricity);
    electricity.amount = Some(100.0);
    electricity.last_amount = Some(40.0);
    electricity.price = Some(2.5);
    electricity.sum = 1.0; // ignored
    let mut discount = LineItem::new(LineItemType::Discount);
    discount.price = Some(50.0);

    let first = insert_payment(&state, draft(&f, company, month, vec![electricity, discount]))
        .await
        .unwrap();
    assert_eq!(first.invoice_number, 1);
    assert_eq!(first.invoice[0].sum, 150.0);
    assert_eq!(first.invoice[1].price, Some(-50.0));
    assert_eq!(first.general_sum, 100.0);
    assert_eq!(
        first.receiver.as_ref().map(|r| r.company_name.as_str()),
        Some("Бджілка")
    );

    let mut water = LineItem::new(LineItemType::Water);
    water.amount = Some(-5.0);
    water.last_amount = Some(10.0);
    water.price = Some(30.0);
    assert!(
        insert_payment(&state, draft(&f, company, month, vec![water]))
            .await
            .is_err()
    );

    let second = insert_payment(&state, draft(&f, company, month, vec![]))
        .await
        .unwrap();
    assert_eq!(second.invoice_number, 2);
    assert_eq!(next_invoice_number(&state).await.unwrap(), 3);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn inflation_uses_previous_month_placing_price() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let f = fixture(&state).await;
    let company = create_company(
        &state,
        Company {
            domain: Some(f.domain),
            street: Some(f.street),
            company_name: "Бджілка".into(),
            price_per_meter: Some(100.0),
            inflicion: true,
            ..Company::default()
        },
    )
    .await
    .unwrap();

    let jan = service(&state, &f, 2023, 1, 102.0).await;
    let feb = service(&state, &f, 2023, 2, 101.0).await;

    // First month: nothing to inflate from.
    let inputs = load_pricing_inputs(&state, Some(&company), Some(&jan))
        .await
        .unwrap();
    assert!(inputs.inflation.is_none());
    let mut lines = vec![LineItem::new(LineItemType::Placing)];
    price_lines(&mut lines, &inputs.context(DerivationMode::Create));
    assert_eq!(lines[0].price, None);

    // January was billed at 120 per meter.
    let mut placing = LineItem::new(LineItemType::Placing);
    placing.amount = Some(10.0);
    placing.price = Some(120.0);
    insert_payment(&state, draft(&f, company, jan, vec![placing]))
        .await
        .unwrap();

    let inputs = load_pricing_inputs(&state, Some(&company), Some(&feb))
        .await
        .unwrap();
    let inflation = inputs.inflation.unwrap();
    assert_eq!(inflation.previous_placing_price, 120.0);
    assert_eq!(inflation.previous_index, Some(102.0));

    let mut lines = vec![
        LineItem::new(LineItemType::Placing),
        LineItem::new(LineItemType::Inflation),
    ];
    price_lines(&mut lines, &inputs.context(DerivationMode::Create));
    assert_eq!(lines[0].price, Some(122.4));
    assert_eq!(lines[1].price, Some(2.4));

    common::teardown(Some(ctx)).await;
}
