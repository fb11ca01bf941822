//! INSERT / ON DUPLICATE KEY UPDATE planning over field mappings.

use crate::{FieldMap, PlanError, SqlValue};

/// Table descriptor: the conflict key and the ordered allow-list of columns an
/// upsert may overwrite on conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub key_column: String,
    pub mutable_columns: Vec<String>,
}

/// Column set of `spp_crawl_route`, `id` first.
pub const CRAWL_ROUTE_COLUMNS: &[&str] = &[
    "id",
    "route_name",
    "partner_id",
    "platform_name",
    "service_area_id",
    "disable_date",
    "start_place_name_manual",
    "start_place_lat",
    "start_place_lng",
    "start_place_google_place_id",
    "start_place_type",
    "end_place_name_manual",
    "end_place_lat",
    "end_place_lng",
    "end_place_google_place_id",
    "end_place_type",
    "ctrip_flight_no",
    "remark",
    "active",
    "batch",
    "route_type",
    "route_zone_str",
];

/// Columns of `spp_crawl_route_purchasing` the upsert may overwrite. Place
/// ids and place types are written on insert only.
pub const PURCHASING_MUTABLE_COLUMNS: &[&str] = &[
    "route_name",
    "partner_id",
    "platform_name",
    "service_area_id",
    "disable_date",
    "start_place_name_manual",
    "start_place_lat",
    "start_place_lng",
    "end_place_name_manual",
    "end_place_lat",
    "end_place_lng",
    "ctrip_flight_no",
    "remark",
    "active",
    "batch",
    "route_type",
    "route_zone_str2",
];

impl TableSchema {
    pub fn new(table: impl Into<String>, key_column: impl Into<String>, mutable_columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
            mutable_columns: mutable_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// `spp_crawl_route`: every persisted column except `id` may be overwritten.
    pub fn crawl_route() -> Self {
        Self::new("spp_crawl_route", "id", &CRAWL_ROUTE_COLUMNS[1..])
    }

    pub fn crawl_route_purchasing() -> Self {
        Self::new("spp_crawl_route_purchasing", "id", PURCHASING_MUTABLE_COLUMNS)
    }

    pub fn is_mutable(&self, column: &str) -> bool {
        self.mutable_columns.iter().any(|c| c == column)
    }
}

/// Column list, placeholder group(s), and parameters of an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub columns: String,
    pub placeholders: String,
    pub params: Vec<SqlValue>,
}

/// Complete upsert statement with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub update_columns: Vec<String>,
}

/// Plans the VALUES part of an INSERT. Every row must share the first row's
/// column set. Columns listed in `inner_columns` are written as literal SQL
/// instead of a placeholder.
pub fn plan_insert(rows: &[FieldMap], inner_columns: &[&str]) -> Result<InsertPlan, PlanError> {
    let first = rows.first().ok_or(PlanError::Empty)?;
    if first.is_empty() {
        return Err(PlanError::Empty);
    }
    let columns: Vec<&str> = first.columns().collect();

    let mut params = Vec::new();
    let mut groups = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if row.len() != columns.len() || !columns.iter().all(|c| row.contains(c)) {
            return Err(PlanError::MismatchedColumns { row: index });
        }
        let mut slots = Vec::with_capacity(columns.len());
        for column in &columns {
            let Some(value) = row.get(column) else {
                return Err(PlanError::MismatchedColumns { row: index });
            };
            if inner_columns.contains(column) {
                slots.push(value.as_raw_sql());
            } else {
                params.push(value.clone());
                slots.push("?".to_string());
            }
        }
        groups.push(format!("({})", slots.join(",")));
    }

    Ok(InsertPlan {
        columns: columns.join(","),
        placeholders: groups.join(","),
        params,
    })
}

/// Plans `insert ... on duplicate key update ...` for `schema`. The update
/// clause covers only input columns on the schema's allow-list; other columns
/// are inserted but never overwritten.
pub fn plan_upsert(
    schema: &TableSchema,
    rows: &[FieldMap],
    inner_columns: &[&str],
) -> Result<UpsertStatement, PlanError> {
    let insert = plan_insert(rows, inner_columns)?;
    let mut params = insert.params;

    let first = &rows[0];
    let update_columns: Vec<String> = first
        .columns()
        .filter(|c| *c != schema.key_column && schema.is_mutable(c))
        .map(str::to_string)
        .collect();

    let assignments = if update_columns.is_empty() {
        // MySQL rejects an empty update list; re-assigning the key leaves the row untouched.
        format!("{key}={key}", key = schema.key_column)
    } else if rows.len() > 1 {
        update_columns
            .iter()
            .map(|c| format!("{c}=VALUES({c})"))
            .collect::<Vec<_>>()
            .join(",")
    } else {
        let mut lines = Vec::with_capacity(update_columns.len());
        for column in &update_columns {
            let value = first.get(column).cloned().unwrap_or(SqlValue::Null);
            if inner_columns.contains(&column.as_str()) {
                lines.push(format!("{column}={}", value.as_raw_sql()));
            } else {
                lines.push(format!("{column}=?"));
                params.push(value);
            }
        }
        lines.join(",")
    };

    let sql = format!(
        "insert into {}({}) values{} on duplicate key update {}",
        schema.table, insert.columns, insert.placeholders, assignments
    );
    Ok(UpsertStatement {
        sql,
        params,
        update_columns,
    })
}
