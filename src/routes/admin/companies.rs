use std::{str::FromStr, sync::Arc};

use askama::Template;
use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

#[allow(unused_imports)]
use crate::filters;

use crate::{
    models::{Company, UserRole},
    session::SessionUser,
    state::{
        AppState, create_company, delete_company, domains_for_identity, get_company_by_id,
        list_companies, list_companies_in_domains, list_streets, update_company,
    },
};

fn render<T: Template>(tpl: T) -> Result<Html<String>, StatusCode> {
    tpl.render()
        .map(Html)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Template)]
#[template(path = "admin/companies/index.html")]
struct CompaniesIndexTemplate {
    companies: Vec<CompanyRow>,
    error: Option<String>,
}

struct CompanyRow {
    id: String,
    name: String,
    street: String,
    total_area: f64,
    price_per_meter: f64,
    discount: f64,
    inflicion: bool,
}

#[derive(Template)]
#[template(path = "admin/companies/form.html")]
struct CompanyFormTemplate {
    action: String,
    form: CompanyFormData,
    streets: Vec<StreetOption>,
    is_edit: bool,
    errors: Option<String>,
}

struct StreetOption {
    id: String,
    label: String,
    selected: bool,
}

/// Form fields as submitted: numeric inputs arrive as possibly empty strings.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompanyFormData {
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    street: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    admin_emails: String,
    #[serde(default)]
    total_area: String,
    #[serde(default)]
    price_per_meter: String,
    #[serde(default)]
    service_price_per_meter: String,
    #[serde(default)]
    rent_part: String,
    #[serde(default)]
    water_part: String,
    #[serde(default)]
    discount: String,
    #[serde(default)]
    cleaning: String,
    #[serde(default)]
    inflicion: bool,
    #[serde(default)]
    garbage_collector: bool,
    #[serde(default)]
    public_electric_utility: bool,
}

impl CompanyFormData {
    fn from_company(c: &Company) -> Self {
        let num = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        CompanyFormData {
            company_name: c.company_name.clone(),
            street: c.street.map(|id| id.to_hex()).unwrap_or_default(),
            description: c.description.clone().unwrap_or_default(),
            admin_emails: c.admin_emails.join(", "),
            total_area: num(c.total_area),
            price_per_meter: num(c.price_per_meter),
            service_price_per_meter: num(c.service_price_per_meter),
            rent_part: num(c.rent_part),
            water_part: num(c.water_part),
            // Shown as entered: a positive amount.
            discount: num((c.discount != 0.0).then_some(c.discount.abs())),
            cleaning: num(c.cleaning),
            inflicion: c.inflicion,
            garbage_collector: c.garbage_collector,
            public_electric_utility: c.public_electric_utility,
        }
    }

    /// Builds the company record; `domain` comes from the selected street.
    fn to_company(&self, domain: Option<ObjectId>) -> Result<Company, String> {
        let name = self.company_name.trim();
        if name.is_empty() {
            return Err("Назва компанії обов'язкова".into());
        }
        let street = match self.street.trim() {
            "" => return Err("Оберіть вулицю".into()),
            raw => ObjectId::from_str(raw).map_err(|_| "Невірна вулиця".to_string())?,
        };
        let text = |v: &str| Some(v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Company {
            id: None,
            domain,
            street: Some(street),
            company_name: name.to_string(),
            description: text(&self.description),
            admin_emails: self
                .admin_emails
                .split([',', ';', '\n'])
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
            total_area: parse_number(&self.total_area, "Площа")?,
            price_per_meter: parse_number(&self.price_per_meter, "Ціна за м²")?,
            service_price_per_meter: parse_number(&self.service_price_per_meter, "Утримання за м²")?,
            rent_part: parse_number(&self.rent_part, "Частка оренди")?,
            water_part: parse_number(&self.water_part, "Частка води")?,
            discount: parse_number(&self.discount, "Знижка")?.unwrap_or(0.0),
            inflicion: self.inflicion,
            garbage_collector: self.garbage_collector,
            public_electric_utility: self.public_electric_utility,
            cleaning: parse_number(&self.cleaning, "Прибирання")?,
        })
    }
}

fn parse_number(raw: &str, label: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim().replace(',', ".");
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| format!("{label}: невірне число"))
}

/// Domains the session administers; `None` means every domain.
async fn managed_domains(
    state: &AppState,
    session_user: &SessionUser,
) -> Result<Option<Vec<ObjectId>>, StatusCode> {
    if session_user.role() == UserRole::GlobalAdmin {
        return Ok(None);
    }
    let domains = domains_for_identity(state, session_user.identity())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Some(domains.into_iter().filter_map(|d| d.id).collect()))
}

fn can_manage(scope: &Option<Vec<ObjectId>>, domain: Option<ObjectId>) -> bool {
    match scope {
        None => true,
        Some(ids) => domain.is_some_and(|d| ids.contains(&d)),
    }
}

async fn street_options(
    state: &AppState,
    scope: &Option<Vec<ObjectId>>,
    selected: &str,
) -> Result<(Vec<StreetOption>, Vec<(ObjectId, ObjectId)>), StatusCode> {
    let domains = list_domain_names(state).await?;
    let streets = list_streets(state, None)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut options = Vec::new();
    let mut street_domains = Vec::new();
    for street in streets {
        let Some(id) = street.id else { continue };
        if !can_manage(scope, Some(street.domain)) {
            continue;
        }
        let domain_name = domains
            .iter()
            .find(|(d, _)| *d == street.domain)
            .map(|(_, name)| name.as_str())
            .unwrap_or("");
        let hex = id.to_hex();
        options.push(StreetOption {
            selected: hex == selected,
            label: format!("{domain_name} / {}", street.address),
            id: hex,
        });
        street_domains.push((id, street.domain));
    }
    Ok((options, street_domains))
}

async fn list_domain_names(state: &AppState) -> Result<Vec<(ObjectId, String)>, StatusCode> {
    Ok(crate::state::list_domains(state)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .filter_map(|d| d.id.map(|id| (id, d.name)))
        .collect())
}

pub async fn companies_index(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, StatusCode> {
    render_index(&state, &session_user, None).await
}

async fn render_index(
    state: &AppState,
    session_user: &SessionUser,
    error: Option<String>,
) -> Result<Html<String>, StatusCode> {
    if !session_user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let scope = managed_domains(state, session_user).await?;
    let companies = match &scope {
        None => list_companies(state).await,
        Some(ids) => list_companies_in_domains(state, ids).await,
    }
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let streets = list_streets(state, None)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let companies = companies
        .into_iter()
        .filter_map(|company| {
            let street = streets
                .iter()
                .find(|s| s.id.is_some() && s.id == company.street)
                .map(|s| s.address.clone())
                .unwrap_or_default();
            company.id.map(|id| CompanyRow {
                id: id.to_hex(),
                name: company.company_name,
                street,
                total_area: company.total_area.unwrap_or(0.0),
                price_per_meter: company.price_per_meter.unwrap_or(0.0),
                discount: company.discount,
                inflicion: company.inflicion,
            })
        })
        .collect();

    render(CompaniesIndexTemplate { companies, error })
}

pub async fn companies_new(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, StatusCode> {
    if !session_user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    let scope = managed_domains(&state, &session_user).await?;
    let (streets, _) = street_options(&state, &scope, "").await?;

    render(CompanyFormTemplate {
        action: "/admin/companies".into(),
        form: CompanyFormData::default(),
        streets,
        is_edit: false,
        errors: None,
    })
}

pub async fn companies_create(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<CompanyFormData>,
) -> Response {
    save_company(&state, &session_user, None, form).await
}

pub async fn companies_edit(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    if !session_user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let object_id = ObjectId::from_str(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let company = get_company_by_id(&state, &object_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let scope = managed_domains(&state, &session_user).await?;
    if !can_manage(&scope, company.domain) {
        return Err(StatusCode::FORBIDDEN);
    }

    let form = CompanyFormData::from_company(&company);
    let (streets, _) = street_options(&state, &scope, &form.street).await?;
    render(CompanyFormTemplate {
        action: format!("/admin/companies/{}/update", id),
        form,
        streets,
        is_edit: true,
        errors: None,
    })
}

pub async fn companies_update(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<CompanyFormData>,
) -> Response {
    let object_id = match ObjectId::from_str(&id) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    save_company(&state, &session_user, Some(object_id), form).await
}

async fn save_company(
    state: &AppState,
    session_user: &SessionUser,
    id: Option<ObjectId>,
    form: CompanyFormData,
) -> Response {
    if !session_user.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }
    let scope = match managed_domains(state, session_user).await {
        Ok(scope) => scope,
        Err(status) => return status.into_response(),
    };

    if let Some(id) = &id {
        match get_company_by_id(state, id).await {
            Ok(Some(existing)) if can_manage(&scope, existing.domain) => {}
            Ok(Some(_)) => return StatusCode::FORBIDDEN.into_response(),
            Ok(None) => return StatusCode::NOT_FOUND.into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    let (streets, street_domains) = match street_options(state, &scope, form.street.trim()).await
    {
        Ok(options) => options,
        Err(status) => return status.into_response(),
    };
    let domain = ObjectId::from_str(form.street.trim()).ok().and_then(|street| {
        street_domains
            .iter()
            .find(|(s, _)| *s == street)
            .map(|(_, d)| *d)
    });

    let action = match &id {
        Some(id) => format!("/admin/companies/{}/update", id.to_hex()),
        None => "/admin/companies".to_string(),
    };
    let company = match form.to_company(domain) {
        Ok(_) if domain.is_none() => Err("Оберіть вулицю".to_string()),
        other => other,
    };
    let company = match company {
        Ok(company) => company,
        Err(message) => {
            return render(CompanyFormTemplate {
                action,
                form,
                streets,
                is_edit: id.is_some(),
                errors: Some(message),
            })
            .map(IntoResponse::into_response)
            .unwrap_or_else(|status| status.into_response());
        }
    };

    let result = match &id {
        Some(id) => update_company(state, id, company).await,
        None => create_company(state, company).await.map(|_| ()),
    };
    match result {
        Ok(()) => Redirect::to("/admin/companies").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "company save failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn companies_delete(
    session_user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    if !session_user.is_admin() {
        return StatusCode::FORBIDDEN.into_response();
    }

    let object_id = match ObjectId::from_str(&id) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let scope = match managed_domains(&state, &session_user).await {
        Ok(scope) => scope,
        Err(status) => return status.into_response(),
    };
    match get_company_by_id(&state, &object_id).await {
        Ok(Some(company)) if can_manage(&scope, company.domain) => {}
        Ok(Some(_)) => return StatusCode::FORBIDDEN.into_response(),
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }

    match delete_company(&state, &object_id).await {
        Ok(()) => Redirect::to("/admin/companies").into_response(),
        Err(e) => {
            tracing::warn!(company = %object_id, error = %e, "company delete refused");
            render_index(&state, &session_user, Some(e.to_string()))
                .await
                .map(|html| (StatusCode::CONFLICT, html).into_response())
                .unwrap_or_else(|status| status.into_response())
        }
    }
}
