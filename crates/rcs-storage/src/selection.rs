use chrono::NaiveDateTime;

use crate::{Criteria, Operators, PlanError};

/// Which `spp_route` rows a sync run drains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Ids(Vec<i64>),
    UpdatedSince(NaiveDateTime),
    AfterId(i64),
    /// Resolved to `AfterId` (or `All` on an empty crawl table) before querying.
    AfterLastCrawled,
}

impl Selection {
    /// Predicate mapping over the `srt` alias of `spp_route`. `All` yields an
    /// empty mapping, which the store guards with `1 = 1`.
    pub fn to_criteria(&self) -> Result<(Criteria, Operators), PlanError> {
        let selected = match self {
            Selection::All => (Criteria::new(), Operators::new()),
            Selection::Ids(ids) if ids.is_empty() => return Err(PlanError::EmptyIdList),
            Selection::Ids(ids) => (Criteria::new().with("srt.id", ids.clone()), Operators::new()),
            Selection::UpdatedSince(cutoff) => (
                Criteria::new().with("srt.last_updated_at", *cutoff),
                Operators::new().with("srt.last_updated_at", ">="),
            ),
            Selection::AfterId(id) => (
                Criteria::new().with("srt.id", *id),
                Operators::new().with("srt.id", ">"),
            ),
            Selection::AfterLastCrawled => return Err(PlanError::UnresolvedSelection),
        };
        Ok(selected)
    }

    /// True when the selection cannot match any row.
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Ids(ids) if ids.is_empty())
    }

    /// Replaces `AfterLastCrawled` given the highest crawled id, if any.
    pub fn resolve_last_crawled(self, last_crawled_id: Option<i64>) -> Self {
        match (self, last_crawled_id) {
            (Selection::AfterLastCrawled, Some(id)) => Selection::AfterId(id),
            (Selection::AfterLastCrawled, None) => Selection::All,
            (other, _) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_condition, SqlValue};
    use chrono::NaiveDate;

    #[test]
    fn empty_id_list_never_reaches_sql() {
        let selection = Selection::Ids(Vec::new());
        assert!(selection.is_empty());
        assert_eq!(selection.to_criteria().unwrap_err(), PlanError::EmptyIdList);
        assert!(!Selection::All.is_empty());
    }

    #[test]
    fn single_id_is_still_an_in_list() {
        let (criteria, ops) = Selection::Ids(vec![777]).to_criteria().unwrap();
        let cond = build_condition(&criteria, &ops);
        assert_eq!(cond.sql, "srt.id in (?)");
        assert_eq!(cond.params, vec![SqlValue::Int(777)]);
    }

    #[test]
    fn cutoff_uses_greater_or_equal() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let (criteria, ops) = Selection::UpdatedSince(cutoff).to_criteria().unwrap();
        assert_eq!(build_condition(&criteria, &ops).sql, "srt.last_updated_at >= ?");
    }

    #[test]
    fn last_crawled_must_be_resolved() {
        assert_eq!(
            Selection::AfterLastCrawled.to_criteria(),
            Err(PlanError::UnresolvedSelection)
        );
        assert_eq!(
            Selection::AfterLastCrawled.resolve_last_crawled(Some(3247)),
            Selection::AfterId(3247)
        );
        assert_eq!(Selection::AfterLastCrawled.resolve_last_crawled(None), Selection::All);
        assert_eq!(Selection::Ids(vec![1]).resolve_last_crawled(Some(9)), Selection::Ids(vec![1]));
    }
}
