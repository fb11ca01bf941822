use rcs_storage::{ExecMode, FieldCoverage, UpsertOutcome};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::{CrawlSink, CrawlSource, SyncError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationSummary {
    pub requested: usize,
    pub found: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Copies crawl rows by id into another store, every column included.
pub async fn replicate_crawl_routes(
    from: &dyn CrawlSource,
    to: &dyn CrawlSink,
    ids: &[i64],
) -> Result<ReplicationSummary, SyncError> {
    async {
        let rows = from.crawl_routes(ids).await?;
        let mut summary = ReplicationSummary {
            requested: ids.len(),
            found: rows.len(),
            ..ReplicationSummary::default()
        };
        if rows.len() < ids.len() {
            let missing: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !rows.iter().any(|r| r.id == *id))
                .collect();
            warn!(?missing, "crawl rows not found for replication");
        }

        for row in &rows {
            match to
                .write_crawl_route(row, FieldCoverage::Complete, ExecMode::Transaction)
                .await?
            {
                UpsertOutcome::Inserted { .. } => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
                UpsertOutcome::NoOp => summary.unchanged += 1,
            }
        }
        info!(
            found = summary.found,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "replication finished"
        );
        Ok(summary)
    }
    .instrument(info_span!("replicate", requested = ids.len()))
    .await
}
