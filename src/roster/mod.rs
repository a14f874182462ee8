//! Uniform list / search / filter / create / update / delete over the admin
//! managed entity types.
//!
//! Each entity type implements [`RosterEntity`], supplying a [`RosterConfig`]
//! (list query, search columns, filters, option sets) and its validators. The
//! generic [`display`] and [`mutate`] handlers are mounted once per type.

pub mod options;
pub mod page;

use std::collections::{BTreeMap, HashMap};

use actix_web::{HttpResponse, ResponseError, web};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::api::Notice;
use crate::error::AppError;
use crate::model::role::Role;
use crate::utils::db_utils::{SqlValue, WhereClause, bind_as, bind_scalar};
use crate::utils::validation::{FieldErrors, Form, INVALID_CHOICE, parse_form};
use options::{Choice, OptionSet};
use page::Paginator;

pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Numeric foreign key.
    Id,
    /// One of the [`Role`] names.
    Role,
}

/// A query parameter that narrows the list to rows where `column` equals it.
#[derive(Debug, Clone, Copy)]
pub struct FilterParam {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, Copy)]
pub struct RosterConfig {
    /// Human name used in notices, e.g. "Department".
    pub label: &'static str,
    /// Table rows are deleted from.
    pub table: &'static str,
    /// Alias of `table` inside `select`.
    pub alias: &'static str,
    /// `SELECT ... FROM ... [JOIN ...]` without WHERE or ORDER BY.
    pub select: &'static str,
    /// Restricts the base collection, e.g. to one role.
    pub base_filter: Option<&'static str>,
    pub search_fields: &'static [&'static str],
    pub filters: &'static [FilterParam],
    pub options: &'static [OptionSet],
}

/// An entity type managed through the roster handlers.
#[allow(async_fn_in_trait)]
pub trait RosterEntity: 'static {
    const CONFIG: RosterConfig;

    type Row: for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Unpin;
    type CreateForm: Form;
    type UpdateForm: Form;

    async fn insert(
        pool: &SqlitePool,
        clean: <Self::CreateForm as Form>::Clean,
    ) -> Result<i64, AppError>;

    async fn update(
        pool: &SqlitePool,
        id: i64,
        clean: <Self::UpdateForm as Form>::Clean,
    ) -> Result<(), AppError>;
}

/// Search text, requested page and filters taken from the query string.
#[derive(Debug, Default)]
pub struct RosterParams {
    pub search: String,
    pub page: Option<String>,
    filters: Vec<(&'static str, SqlValue)>,
    echo: BTreeMap<String, String>,
}

impl RosterParams {
    pub fn parse(config: &RosterConfig, query: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut params = RosterParams {
            search: query
                .get("search")
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            page: query.get("page").cloned(),
            ..Default::default()
        };

        for filter in config.filters {
            let Some(raw) = query.get(filter.param).map(|v| v.trim()) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let value = match filter.kind {
                FilterKind::Id => raw.parse::<i64>().map(SqlValue::I64).ok(),
                FilterKind::Role => raw
                    .parse::<Role>()
                    .ok()
                    .map(|role| SqlValue::String(role.to_string())),
            }
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {} filter", filter.param)))?;

            params.filters.push((filter.column, value));
            params.echo.insert(filter.param.to_string(), raw.to_string());
        }

        Ok(params)
    }

    fn where_clause(&self, config: &RosterConfig) -> WhereClause {
        let mut clause = WhereClause::new();
        if let Some(base) = config.base_filter {
            clause.raw(base);
        }
        for (column, value) in &self.filters {
            clause.eq(column, value.clone());
        }
        if !self.search.is_empty() {
            clause.contains_any(config.search_fields, &self.search);
        }
        clause
    }
}

#[derive(Debug, Serialize)]
pub struct RosterPage<R> {
    pub items: Vec<R>,
    pub page: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub total: i64,
    pub search: String,
    pub filters: BTreeMap<String, String>,
    pub options: BTreeMap<&'static str, Vec<Choice>>,
}

/// A roster page plus whatever the last mutation left behind.
#[derive(Debug, Serialize)]
pub struct RosterView<R> {
    #[serde(flatten)]
    pub page: RosterPage<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub errors: FieldErrors,
    pub show_add_modal: bool,
    pub show_update_modal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_instance: Option<R>,
}

impl<R> RosterView<R> {
    fn plain(page: RosterPage<R>, notice: Option<Notice>) -> Self {
        Self {
            page,
            notice,
            errors: FieldErrors::new(),
            show_add_modal: false,
            show_update_modal: false,
            update_instance: None,
        }
    }
}

pub async fn load_page<E: RosterEntity>(
    pool: &SqlitePool,
    params: &RosterParams,
) -> Result<RosterPage<E::Row>, AppError> {
    let config = E::CONFIG;
    let clause = params.where_clause(&config);
    let where_sql = clause.to_sql();

    let count_sql = format!("SELECT COUNT(*) FROM ({} {where_sql}) AS roster", config.select);
    debug!(entity = config.label, sql = %count_sql, values = ?clause.values, "Counting roster");
    let total: i64 = bind_scalar(sqlx::query_scalar(&count_sql), &clause.values)
        .fetch_one(pool)
        .await?;

    let paginator = Paginator::new(total, PAGE_SIZE);
    let page = paginator.resolve(params.page.as_deref());

    let data_sql = format!(
        "{} {where_sql} ORDER BY {}.id LIMIT ? OFFSET ?",
        config.select, config.alias
    );
    debug!(entity = config.label, sql = %data_sql, page, "Fetching roster page");
    let items = bind_as(sqlx::query_as::<_, E::Row>(&data_sql), &clause.values)
        .bind(PAGE_SIZE)
        .bind(paginator.offset(page))
        .fetch_all(pool)
        .await?;

    Ok(RosterPage {
        items,
        page,
        num_pages: paginator.num_pages(),
        per_page: PAGE_SIZE,
        total,
        search: params.search.clone(),
        filters: params.echo.clone(),
        options: options::load_all(pool, config.options).await?,
    })
}

/// One row of the base collection, or `None` if `id` lies outside it.
pub async fn fetch_row<E: RosterEntity>(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<E::Row>, AppError> {
    let config = E::CONFIG;
    let mut clause = WhereClause::new();
    if let Some(base) = config.base_filter {
        clause.raw(base);
    }
    clause.eq(&format!("{}.id", config.alias), SqlValue::I64(id));

    let sql = format!("{} {}", config.select, clause.to_sql());
    Ok(bind_as(sqlx::query_as::<_, E::Row>(&sql), &clause.values)
        .fetch_optional(pool)
        .await?)
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Update(i64),
    Delete(i64),
    Add,
}

fn id_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Action {
    /// First of `update_id`, `delete_id`, `add` present in the body wins.
    fn from_payload(payload: &Value, label: &str) -> Result<Self, AppError> {
        let not_found = || AppError::not_found(label);
        if let Some(raw) = payload.get("update_id") {
            return id_value(raw).map(Action::Update).ok_or_else(not_found);
        }
        if let Some(raw) = payload.get("delete_id") {
            return id_value(raw).map(Action::Delete).ok_or_else(not_found);
        }
        if payload.get("add").is_some() {
            return Ok(Action::Add);
        }
        Err(AppError::BadRequest("Invalid request".into()))
    }
}

enum Modal<R> {
    Add,
    Update(R),
}

/// Answers a failed create or update with the current page and the errors,
/// provided the failure is one a form can show.
async fn rerender<E: RosterEntity>(
    pool: &SqlitePool,
    params: &RosterParams,
    err: AppError,
    modal: Modal<E::Row>,
) -> Result<HttpResponse, AppError> {
    let Some(errors) = err.as_field_errors() else {
        return Err(err);
    };
    debug!(entity = E::CONFIG.label, ?errors, "Roster form rejected");

    let page = load_page::<E>(pool, params).await?;
    let mut view = RosterView::plain(page, Some(Notice::error(err.to_string())));
    view.errors = errors;
    match modal {
        Modal::Add => view.show_add_modal = true,
        Modal::Update(instance) => {
            view.show_update_modal = true;
            view.update_instance = Some(instance);
        }
    }
    Ok(HttpResponse::build(err.status_code()).json(view))
}

/// Lists one page of the entity's base collection.
pub async fn display<E: RosterEntity>(
    pool: web::Data<SqlitePool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let params = RosterParams::parse(&E::CONFIG, &query)?;
    let page = load_page::<E>(pool.get_ref(), &params).await?;
    Ok(HttpResponse::Ok().json(RosterView::plain(page, None)))
}

/// Creates, updates or deletes one entity, then lists the page again.
pub async fn mutate<E: RosterEntity>(
    pool: web::Data<SqlitePool>,
    query: web::Query<HashMap<String, String>>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let config = E::CONFIG;
    let pool = pool.get_ref();
    let params = RosterParams::parse(&config, &query)?;

    let notice = match Action::from_payload(&payload, config.label)? {
        Action::Update(id) => {
            let instance = fetch_row::<E>(pool, id)
                .await?
                .ok_or_else(|| AppError::not_found(config.label))?;
            let result = match parse_form::<E::UpdateForm>(&payload) {
                Ok(clean) => E::update(pool, id, clean).await,
                Err(errors) => Err(errors.into()),
            };
            if let Err(e) = result {
                return rerender::<E>(pool, &params, e, Modal::Update(instance)).await;
            }
            info!(entity = config.label, id, "Updated");
            Notice::success(format!("{} updated successfully.", config.label))
        }
        Action::Delete(id) => {
            fetch_row::<E>(pool, id)
                .await?
                .ok_or_else(|| AppError::not_found(config.label))?;
            sqlx::query(&format!("DELETE FROM {} WHERE id = ?", config.table))
                .bind(id)
                .execute(pool)
                .await?;
            info!(entity = config.label, id, "Deleted");
            Notice::success(format!("{} deleted successfully.", config.label))
        }
        Action::Add => {
            let result = match parse_form::<E::CreateForm>(&payload) {
                Ok(clean) => E::insert(pool, clean).await,
                Err(errors) => Err(errors.into()),
            };
            match result {
                Ok(id) => {
                    info!(entity = config.label, id, "Created");
                    Notice::success(format!("{} created successfully.", config.label))
                }
                Err(e) => return rerender::<E>(pool, &params, e, Modal::Add).await,
            }
        }
    };

    let page = load_page::<E>(pool, &params).await?;
    Ok(HttpResponse::Ok().json(RosterView::plain(page, Some(notice))))
}

/// A foreign key a form refers to, optionally required to be a person of
/// a given role.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub field: &'static str,
    pub table: &'static str,
    pub id: i64,
    pub role: Option<Role>,
}

impl Reference {
    pub fn row(field: &'static str, table: &'static str, id: i64) -> Self {
        Self {
            field,
            table,
            id,
            role: None,
        }
    }

    pub fn person(field: &'static str, id: i64, role: Role) -> Self {
        Self {
            field,
            table: "users",
            id,
            role: Some(role),
        }
    }
}

/// Every reference that points nowhere (or at the wrong kind of person) is
/// reported against its own field.
pub async fn check_refs<'c, X>(executor: X, refs: &[Reference]) -> Result<(), AppError>
where
    X: sqlx::Acquire<'c, Database = sqlx::Sqlite>,
{
    let mut conn = executor.acquire().await?;
    let mut errors = FieldErrors::new();
    for reference in refs {
        let found: i64 = match reference.role {
            Some(role) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ? AND role = ?")
                    .bind(reference.id)
                    .bind(role)
                    .fetch_one(&mut *conn)
                    .await?
            }
            None => {
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE id = ?", reference.table))
                    .bind(reference.id)
                    .fetch_one(&mut *conn)
                    .await?
            }
        };
        if found == 0 {
            errors.add(reference.field, INVALID_CHOICE);
        }
    }
    errors.finish(()).map_err(AppError::from)
}
