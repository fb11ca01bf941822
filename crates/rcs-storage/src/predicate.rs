//! WHERE-fragment construction from column -> value mappings.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::{Criteria, SqlValue};

/// Right-hand side of one predicate column.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    One(SqlValue),
    Many(Vec<SqlValue>),
}

impl From<SqlValue> for Criterion {
    fn from(value: SqlValue) -> Self {
        Criterion::One(value)
    }
}

impl From<i64> for Criterion {
    fn from(value: i64) -> Self {
        Criterion::One(value.into())
    }
}

impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        Criterion::One(value.into())
    }
}

impl From<String> for Criterion {
    fn from(value: String) -> Self {
        Criterion::One(value.into())
    }
}

impl From<NaiveDateTime> for Criterion {
    fn from(value: NaiveDateTime) -> Self {
        Criterion::One(value.into())
    }
}

impl From<Vec<SqlValue>> for Criterion {
    fn from(values: Vec<SqlValue>) -> Self {
        Criterion::Many(values)
    }
}

impl From<Vec<i64>> for Criterion {
    fn from(values: Vec<i64>) -> Self {
        Criterion::Many(values.into_iter().map(SqlValue::from).collect())
    }
}

impl From<Vec<&str>> for Criterion {
    fn from(values: Vec<&str>) -> Self {
        Criterion::Many(values.into_iter().map(SqlValue::from).collect())
    }
}

impl From<Vec<String>> for Criterion {
    fn from(values: Vec<String>) -> Self {
        Criterion::Many(values.into_iter().map(SqlValue::from).collect())
    }
}

/// Per-column comparison operators plus an optional connector replacing `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operators {
    per_column: HashMap<String, String>,
    connector: Option<String>,
}

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, operator: impl Into<String>) -> Self {
        self.per_column.insert(column.into(), operator.into());
        self
    }

    pub fn connector(mut self, connector: impl Into<String>) -> Self {
        self.connector = Some(connector.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.per_column.get(column).map(String::as_str)
    }
}

/// Boolean SQL fragment and the parameters for its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Builds a WHERE fragment. Operator strings are not validated; a bad one fails
/// when the statement executes. Callers guard against empty criteria.
pub fn build_condition(criteria: &Criteria, operators: &Operators) -> Condition {
    let mut params = Vec::new();
    let mut fragments = Vec::with_capacity(criteria.len());

    for (column, criterion) in criteria.iter() {
        match criterion {
            Criterion::One(value) => {
                params.push(value.clone());
                match operators.get(column) {
                    Some(op) => fragments.push(format!("{column} {op} ?")),
                    None => fragments.push(format!("{column}=?")),
                }
            }
            Criterion::Many(values) => {
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(",");
                match operators.get(column) {
                    Some(op) if op.eq_ignore_ascii_case("like") => {
                        let alternatives = vec![format!("{column} like ?"); values.len()];
                        fragments.push(format!("({})", alternatives.join(" or ")));
                    }
                    Some(op) => fragments.push(format!("{column} {op} ({placeholders})")),
                    None => fragments.push(format!("{column} in ({placeholders})")),
                }
            }
        }
    }

    let sql = match &operators.connector {
        Some(connector) => fragments.join(&format!(" {connector} ")),
        None => fragments.join(" and "),
    };
    Condition { sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scalar_without_operator_is_equality() {
        let criteria = Criteria::new().with("code3", "LAX").with("active", 1_i64);
        let cond = build_condition(&criteria, &Operators::new());
        assert_eq!(cond.sql, "code3=? and active=?");
        assert_eq!(cond.params, vec![SqlValue::from("LAX"), SqlValue::Int(1)]);
    }

    #[test]
    fn scalar_with_operator() {
        let criteria = Criteria::new().with("srt.id", 120_i64);
        let cond = build_condition(&criteria, &Operators::new().with("srt.id", ">"));
        assert_eq!(cond.sql, "srt.id > ?");
    }

    #[test]
    fn list_without_operator_is_in_list() {
        let criteria = Criteria::new().with("srt.id", vec![3_i64, 5, 8]);
        let cond = build_condition(&criteria, &Operators::new());
        assert_eq!(cond.sql, "srt.id in (?,?,?)");
        assert_eq!(cond.params.len(), 3);
    }

    #[test]
    fn list_with_like_is_or_chain() {
        let criteria = Criteria::new().with("name", vec!["%Hotel%", "%酒店%"]);
        let cond = build_condition(&criteria, &Operators::new().with("name", "like"));
        assert_eq!(cond.sql, "(name like ? or name like ?)");
        assert_eq!(cond.params, vec![SqlValue::from("%Hotel%"), SqlValue::from("%酒店%")]);
    }

    #[test]
    fn list_with_other_operator() {
        let criteria = Criteria::new().with("partner_id", vec![1_i64, 2]);
        let cond = build_condition(&criteria, &Operators::new().with("partner_id", "not in"));
        assert_eq!(cond.sql, "partner_id not in (?,?)");
    }

    #[test]
    fn connector_overrides_whole_fragment() {
        let criteria = Criteria::new()
            .with("from_place", "JFK")
            .with("to_place", "JFK")
            .with("batch", "b1");
        let cond = build_condition(&criteria, &Operators::new().connector("or"));
        assert_eq!(cond.sql, "from_place=? or to_place=? or batch=?");
    }

    proptest! {
        #[test]
        fn scalar_params_match_placeholders(values in proptest::collection::vec(any::<i64>(), 1..8)) {
            let criteria: Criteria = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("c{i}"), Criterion::from(*v)))
                .collect();
            let cond = build_condition(&criteria, &Operators::new());

            prop_assert_eq!(cond.sql.matches('?').count(), cond.params.len());
            let fragments: Vec<&str> = cond.sql.split(" and ").collect();
            prop_assert_eq!(fragments.len(), values.len());
            for (i, (fragment, value)) in fragments.iter().zip(&cond.params).enumerate() {
                prop_assert_eq!(fragment.to_string(), format!("c{i}=?"));
                prop_assert_eq!(value, &SqlValue::Int(values[i]));
            }
        }

        #[test]
        fn list_params_match_list_length(len in 1_usize..20) {
            let ids: Vec<i64> = (0..len as i64).collect();
            let criteria = Criteria::new().with("srt.id", ids);
            let cond = build_condition(&criteria, &Operators::new());

            prop_assert!(cond.sql.starts_with("srt.id in ("));
            prop_assert_eq!(cond.params.len(), len);
            prop_assert_eq!(cond.sql.matches('?').count(), len);
        }
    }
}
