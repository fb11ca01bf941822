//! SQL planning and MySQL store access for route crawl sync.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

mod error;
mod predicate;
mod selection;
mod store;
mod tables;
mod upsert;

pub use error::{PlanError, StoreError};
pub use predicate::{build_condition, Condition, Criterion, Operators};
pub use selection::Selection;
pub use store::{crawl_route_fields, ExecMode, FieldCoverage, RouteStore, StoreConfig, UpsertOutcome};
pub use tables::{RouteTables, SyncTarget};
pub use upsert::{plan_insert, plan_upsert, InsertPlan, TableSchema, UpsertStatement};

pub const CRATE_NAME: &str = "rcs-storage";

/// Dynamically typed bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Literal SQL text for values passed through unparameterized (e.g. `NOW()`).
    pub fn as_raw_sql(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            SqlValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(s) => write!(f, "{s:?}"),
            SqlValue::Date(d) => write!(f, "{d}"),
            SqlValue::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Insertion-ordered column mapping; inserting an existing column replaces its value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping<V> {
    entries: Vec<(String, V)>,
}

/// Column -> value mapping consumed by the upsert planner.
pub type FieldMap = Mapping<SqlValue>;
/// Column -> scalar-or-list mapping consumed by the predicate builder.
pub type Criteria = Mapping<Criterion>;

impl<V> Default for Mapping<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Mapping<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<V>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<V>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&V> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Mapping<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (column, value) in iter {
            mapping.insert(column, value);
        }
        mapping
    }
}

/// Renders bound parameters for audit logging.
pub fn display_params(params: &[SqlValue]) -> String {
    let rendered = params.iter().map(ToString::to_string).collect::<Vec<_>>();
    format!("({})", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_replaces_in_place_and_keeps_order() {
        let mut fields = FieldMap::new();
        fields.insert("id", 1_i64);
        fields.insert("route_name", "LAX-Downtown");
        fields.insert("id", 2_i64);
        assert_eq!(fields.columns().collect::<Vec<_>>(), vec!["id", "route_name"]);
        assert_eq!(fields.get("id"), Some(&SqlValue::Int(2)));
    }

    #[test]
    fn option_values_become_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3_i64)), SqlValue::Int(3));
    }

    #[test]
    fn raw_sql_and_audit_rendering() {
        assert_eq!(SqlValue::from("NOW()").as_raw_sql(), "NOW()");
        assert_eq!(SqlValue::Null.as_raw_sql(), "NULL");
        assert_eq!(
            display_params(&[SqlValue::Int(7), SqlValue::from("JFK"), SqlValue::Null]),
            "(7, \"JFK\", NULL)"
        );
    }
}
