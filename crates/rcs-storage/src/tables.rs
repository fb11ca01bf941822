use std::str::FromStr;

use crate::TableSchema;

/// A source route table and the crawl table it syncs into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTables {
    pub source_table: String,
    /// Source column carrying the timezone identifier.
    pub tz_column: String,
    /// Crawl column the timezone identifier is written to.
    pub zone_column: String,
    pub crawl: TableSchema,
}

impl RouteTables {
    pub fn crawl() -> Self {
        Self {
            source_table: "spp_route".to_string(),
            tz_column: "tz".to_string(),
            zone_column: "route_zone_str".to_string(),
            crawl: TableSchema::crawl_route(),
        }
    }

    pub fn purchasing() -> Self {
        Self {
            source_table: "spp_route_purchasing".to_string(),
            tz_column: "tz_id".to_string(),
            zone_column: "route_zone_str2".to_string(),
            crawl: TableSchema::crawl_route_purchasing(),
        }
    }
}

impl Default for RouteTables {
    fn default() -> Self {
        Self::crawl()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncTarget {
    #[default]
    Crawl,
    Purchasing,
}

impl SyncTarget {
    pub fn tables(self) -> RouteTables {
        match self {
            SyncTarget::Crawl => RouteTables::crawl(),
            SyncTarget::Purchasing => RouteTables::purchasing(),
        }
    }
}

impl FromStr for SyncTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "crawl" => Ok(SyncTarget::Crawl),
            "purchasing" => Ok(SyncTarget::Purchasing),
            other => Err(format!("unknown sync target `{other}` (expected crawl or purchasing)")),
        }
    }
}
