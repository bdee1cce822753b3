//! Common list parameters: pagination, filtering, sorting, search and
//! date-range presets shared by every list endpoint.
//!
//! The query string grammar is
//!
//! ```text
//! filters = "field-op-value field-op-value ..."   op: eq | ge
//! periods = "created_at-ge-past_week ..."         past_day | past_week | past_month | past_year | all
//! sorters = "field-asc field-desc ..."
//! query   = "field-op-value"                      field: all | author | <column>
//! ```
//!
//! Fields are resolved against the listed entity's own columns, so a query
//! can never reach a table it was not meant to.

use crate::error::ServiceError;
use crate::orm::users;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, ColumnType, Condition, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Value,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const DEFAULT_MAX_PER_PAGE: u64 = 100;

/// Raw list parameters as they arrive in the query string.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct CommonParameters {
    #[validate(range(min = 1, max = 2147483646))]
    pub page: u64,
    #[validate(range(min = 1, max = 50))]
    pub per_page: u64,
    #[validate(range(min = 1, max = 100))]
    pub max_per_page: u64,
    pub filters: Option<String>,
    pub sorters: Option<String>,
    pub periods: Option<String>,
    pub query: Option<String>,
}

impl Default for CommonParameters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
            filters: None,
            sorters: None,
            periods: None,
            query: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ge,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterExpr {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortExpr {
    pub field: String,
    pub descending: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchField {
    /// Title, content and author nickname.
    All,
    /// Author nickname.
    Author,
    Column(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub field: SearchField,
    pub value: String,
}

/// Named `created_at` lower bounds offered by the date filter menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatePreset {
    PastDay,
    PastWeek,
    PastMonth,
    PastYear,
    All,
}

impl DatePreset {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "past_day" => Some(DatePreset::PastDay),
            "past_week" => Some(DatePreset::PastWeek),
            "past_month" => Some(DatePreset::PastMonth),
            "past_year" => Some(DatePreset::PastYear),
            "all" => Some(DatePreset::All),
            _ => None,
        }
    }

    /// Resolves the preset against `today`. `All` has no bound.
    pub fn since(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        let days = match self {
            DatePreset::PastDay => 0,
            DatePreset::PastWeek => 7,
            DatePreset::PastMonth => 30,
            DatePreset::PastYear => 365,
            DatePreset::All => return None,
        };
        (today - Duration::days(days)).and_hms_opt(0, 0, 0)
    }
}

/// Parsed and bounds-checked list parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub per_page: u64,
    pub filters: Vec<FilterExpr>,
    pub sorters: Vec<SortExpr>,
    pub search: Option<SearchQuery>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            filters: Vec::new(),
            sorters: Vec::new(),
            search: None,
        }
    }
}

fn parse_filter(raw: &str) -> Result<FilterExpr, ServiceError> {
    let mut parts = raw.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(op), Some(value)) if !field.is_empty() => {
            let op = match op {
                "eq" => FilterOp::Eq,
                "ge" => FilterOp::Ge,
                other => {
                    return Err(ServiceError::validation(format!(
                        "Unknown filter operator `{}`",
                        other
                    )))
                }
            };
            Ok(FilterExpr {
                field: field.to_owned(),
                op,
                value: value.to_owned(),
            })
        }
        _ => Err(ServiceError::validation(format!(
            "Filter `{}` is not of the form field-op-value",
            raw
        ))),
    }
}

fn parse_sorter(raw: &str) -> Result<SortExpr, ServiceError> {
    match raw.rsplit_once('-') {
        Some((field, "asc")) if !field.is_empty() => Ok(SortExpr {
            field: field.to_owned(),
            descending: false,
        }),
        Some((field, "desc")) if !field.is_empty() => Ok(SortExpr {
            field: field.to_owned(),
            descending: true,
        }),
        _ => Err(ServiceError::validation(format!(
            "Sorter `{}` is not of the form field-asc or field-desc",
            raw
        ))),
    }
}

fn parse_search(raw: &str) -> Result<SearchQuery, ServiceError> {
    let mut parts = raw.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(_op), Some(value)) if !field.is_empty() => Ok(SearchQuery {
            field: match field {
                "all" => SearchField::All,
                "author" => SearchField::Author,
                column => SearchField::Column(column.to_owned()),
            },
            value: value.to_owned(),
        }),
        _ => Err(ServiceError::validation(format!(
            "Query `{}` is not of the form field-op-value",
            raw
        ))),
    }
}

impl CommonParameters {
    /// Validates bounds and parses every expression.
    pub fn parse(&self) -> Result<ListQuery, ServiceError> {
        self.validate()?;

        let mut filters = Vec::new();
        for raw in self
            .filters
            .iter()
            .chain(self.periods.iter())
            .flat_map(|s| s.split_whitespace())
        {
            filters.push(parse_filter(raw)?);
        }

        let sorters = self
            .sorters
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(parse_sorter)
            .collect::<Result<Vec<_>, _>>()?;

        let search = match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Some(parse_search(q)?),
            _ => None,
        };

        Ok(ListQuery {
            page: self.page,
            per_page: self.per_page.min(self.max_per_page),
            filters,
            sorters,
            search,
        })
    }
}

/// An entity that can be listed through [`ListQuery`].
pub trait Listable: EntityTrait {
    /// Column the stable default order is built on.
    fn created_at() -> Self::Column;

    /// Columns searched by `all-...` queries.
    fn text_columns() -> Vec<Self::Column>;

    /// Column holding the author's user id, if the entity has one.
    fn author_column() -> Option<Self::Column> {
        None
    }
}

fn resolve_column<E: EntityTrait>(name: &str) -> Result<E::Column, ServiceError> {
    E::Column::from_str(name)
        .map_err(|_| ServiceError::validation(format!("Unknown field `{}`", name)))
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Converts a raw filter value into the column's type. `Ok(None)` means the
/// filter imposes no bound (the `all` date preset).
fn convert_value(
    column_type: &ColumnType,
    raw: &str,
    today: NaiveDate,
) -> Result<Option<Value>, ServiceError> {
    let invalid = || ServiceError::validation(format!("Invalid filter value `{}`", raw));

    let value = match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger => Value::from(raw.parse::<i64>().map_err(|_| invalid())?),
        ColumnType::Boolean => Value::from(raw.eq_ignore_ascii_case("true")),
        ColumnType::DateTime
        | ColumnType::Timestamp
        | ColumnType::TimestampWithTimeZone
        | ColumnType::Date => match DatePreset::parse(raw) {
            Some(preset) => match preset.since(today) {
                Some(since) => Value::from(since),
                None => return Ok(None),
            },
            None => Value::from(parse_datetime(raw).ok_or_else(invalid)?),
        },
        _ => Value::from(raw.to_owned()),
    };
    Ok(Some(value))
}

fn author_matches<E: Listable>(value: &str) -> Result<Condition, ServiceError> {
    let column = E::author_column()
        .ok_or_else(|| ServiceError::validation("This list cannot be searched by author"))?;
    Ok(Condition::all().add(
        column.in_subquery(
            Query::select()
                .column(users::Column::Id)
                .from(users::Entity)
                .and_where(Expr::col(users::Column::Nickname).like(format!("%{}%", value)))
                .to_owned(),
        ),
    ))
}

impl ListQuery {
    /// Applies search, filters and sorters, then the default `created_at`
    /// order in `default_order` direction.
    pub fn apply<E: Listable>(
        &self,
        mut select: Select<E>,
        default_order: Order,
    ) -> Result<Select<E>, ServiceError> {
        let today = Utc::now().date_naive();

        if let Some(search) = &self.search {
            let cond = match &search.field {
                SearchField::All => {
                    let mut any = Condition::any();
                    for col in E::text_columns() {
                        any = any.add(col.contains(search.value.as_str()));
                    }
                    if E::author_column().is_some() {
                        any = any.add(author_matches::<E>(&search.value)?);
                    }
                    any
                }
                SearchField::Author => author_matches::<E>(&search.value)?,
                SearchField::Column(name) => {
                    let col = resolve_column::<E>(name)?;
                    Condition::all().add(col.contains(search.value.as_str()))
                }
            };
            select = select.filter(cond);
        }

        for filter in &self.filters {
            let col = resolve_column::<E>(&filter.field)?;
            let def = col.def();
            let value = match convert_value(def.get_column_type(), &filter.value, today)? {
                Some(value) => value,
                None => continue,
            };
            select = match filter.op {
                FilterOp::Eq => select.filter(col.eq(value)),
                FilterOp::Ge => select.filter(col.gte(value)),
            };
        }

        for sorter in &self.sorters {
            let col = resolve_column::<E>(&sorter.field)?;
            let order = if sorter.descending {
                Order::Desc
            } else {
                Order::Asc
            };
            select = select.order_by(col, order);
        }

        Ok(select.order_by(E::created_at(), default_order))
    }

    /// Applies the query and fetches one page.
    pub async fn fetch<E>(
        &self,
        db: &DatabaseConnection,
        select: Select<E>,
        default_order: Order,
    ) -> Result<Page<E::Model>, ServiceError>
    where
        E: Listable,
        E::Model: Send + Sync,
    {
        let select = self.apply(select, default_order)?;
        let paginator = select.paginate(db, self.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(self.page - 1).await?;

        Ok(Page::new(items, total, self.page, self.per_page))
    }
}

/// One page of a list.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let pages = if per_page == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            items,
            total,
            page,
            per_page,
            pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            pages: self.pages,
        }
    }
}
