//! Seams between the sync pipeline and the stores it reads and writes.

use async_trait::async_trait;
use rcs_core::{AirportRecord, FlightRecord, HourWindow, SourceRoute, TargetRoute};
use rcs_storage::{ExecMode, FieldCoverage, RouteStore, Selection, StoreError, UpsertOutcome};

#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn source_routes(&self, selection: &Selection) -> Result<Vec<SourceRoute>, StoreError>;
}

#[async_trait]
pub trait AirportLookup: Send + Sync {
    async fn airport_by_code(&self, code: &str) -> Result<Option<AirportRecord>, StoreError>;
}

#[async_trait]
pub trait FlightLookup: Send + Sync {
    /// Flights landing at `to_airport`; `window` restricts the scheduled arrival hour.
    async fn arriving_flights(
        &self,
        to_airport: &str,
        window: Option<HourWindow>,
    ) -> Result<Vec<FlightRecord>, StoreError>;
}

#[async_trait]
pub trait CrawlSource: Send + Sync {
    async fn crawl_routes(&self, ids: &[i64]) -> Result<Vec<TargetRoute>, StoreError>;
}

#[async_trait]
pub trait CrawlSink: Send + Sync {
    async fn write_crawl_route(
        &self,
        route: &TargetRoute,
        coverage: FieldCoverage,
        mode: ExecMode,
    ) -> Result<UpsertOutcome, StoreError>;
}

#[async_trait]
impl RouteSource for RouteStore {
    async fn source_routes(&self, selection: &Selection) -> Result<Vec<SourceRoute>, StoreError> {
        self.fetch_source_routes(selection).await
    }
}

#[async_trait]
impl AirportLookup for RouteStore {
    async fn airport_by_code(&self, code: &str) -> Result<Option<AirportRecord>, StoreError> {
        self.find_airport(code).await
    }
}

#[async_trait]
impl FlightLookup for RouteStore {
    async fn arriving_flights(
        &self,
        to_airport: &str,
        window: Option<HourWindow>,
    ) -> Result<Vec<FlightRecord>, StoreError> {
        self.find_flights(to_airport, window).await
    }
}

#[async_trait]
impl CrawlSource for RouteStore {
    async fn crawl_routes(&self, ids: &[i64]) -> Result<Vec<TargetRoute>, StoreError> {
        self.fetch_crawl_routes(ids).await
    }
}

#[async_trait]
impl CrawlSink for RouteStore {
    async fn write_crawl_route(
        &self,
        route: &TargetRoute,
        coverage: FieldCoverage,
        mode: ExecMode,
    ) -> Result<UpsertOutcome, StoreError> {
        self.upsert_crawl_route(route, coverage, mode).await
    }
}
