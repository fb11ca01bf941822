//! Sync orchestration: select source routes, classify and enrich each one,
//! upsert the crawl record, then report anomalies once per run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rcs_core::{
    AlternateFlight, EndpointRecord, FlightRecord, HourWindow, PlaceCoordinates, RemarkPayload,
    RouteAttributes, RouteType, SourceRoute, TargetRoute,
};
use rcs_storage::{ExecMode, FieldCoverage, Selection, UpsertOutcome};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::{check_cost_fields, Classification, CostCheck, EndpointClass};
use crate::flights::alternates;
use crate::{
    AirportLookup, AirportResolver, ClassificationPrecedence, CrawlSink, FlightLookup, FlightMatcher,
    Notifier, PartnerFeatures, RouteClassifier, RouteSource, SyncError,
};

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub flight_window: HourWindow,
    pub flight_fallback: bool,
    pub precedence: ClassificationPrecedence,
    pub partners: PartnerFeatures,
}

pub struct Collaborators {
    pub source: Arc<dyn RouteSource>,
    pub airports: Arc<dyn AirportLookup>,
    pub flights: Arc<dyn FlightLookup>,
    pub sink: Arc<dyn CrawlSink>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub selected: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub anomalous_ids: Vec<i64>,
}

enum RouteOutcome {
    Written(UpsertOutcome),
    Anomalous,
}

pub struct SyncPipeline {
    collaborators: Collaborators,
    settings: PipelineSettings,
}

impl SyncPipeline {
    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub async fn run_once(&self, selection: &Selection) -> Result<SyncRunSummary, SyncError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);
        self.run(run_id, selection).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, selection: &Selection) -> Result<SyncRunSummary, SyncError> {
        let started_at = Utc::now();
        let routes = self.collaborators.source.source_routes(selection).await?;
        info!(selected = routes.len(), ?selection, "source routes selected");

        let mut airports = AirportResolver::new(self.collaborators.airports.as_ref());
        let matcher = FlightMatcher::new(
            self.collaborators.flights.as_ref(),
            self.settings.flight_window,
            self.settings.flight_fallback,
        );
        let classifier = RouteClassifier::new(self.settings.precedence);

        let mut summary = SyncRunSummary {
            run_id,
            started_at,
            finished_at: started_at,
            selected: routes.len(),
            inserted: 0,
            updated: 0,
            unchanged: 0,
            anomalous_ids: Vec::new(),
        };

        for route in &routes {
            match self.sync_route(route, &classifier, &mut airports, &matcher).await? {
                RouteOutcome::Anomalous => summary.anomalous_ids.push(route.id),
                RouteOutcome::Written(UpsertOutcome::Inserted { .. }) => summary.inserted += 1,
                RouteOutcome::Written(UpsertOutcome::Updated) => summary.updated += 1,
                RouteOutcome::Written(UpsertOutcome::NoOp) => summary.unchanged += 1,
            }
        }

        if !summary.anomalous_ids.is_empty() {
            self.report_anomalies(&summary.anomalous_ids).await;
        }

        summary.finished_at = Utc::now();
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            anomalous = summary.anomalous_ids.len(),
            airport_lookups = airports.lookups(),
            "sync run finished"
        );
        Ok(summary)
    }

    async fn sync_route(
        &self,
        route: &SourceRoute,
        classifier: &RouteClassifier,
        airports: &mut AirportResolver<'_>,
        matcher: &FlightMatcher<'_>,
    ) -> Result<RouteOutcome, SyncError> {
        let attributes = route_attributes(route);
        let classification = classifier.classify(route, airports).await?;

        match check_cost_fields(classification.route_type, &attributes) {
            CostCheck::Anomalous => {
                warn!(route_id = route.id, "route direction undetermined and no cost field present; skipped");
                return Ok(RouteOutcome::Anomalous);
            }
            CostCheck::Mismatch => {
                warn!(
                    route_id = route.id,
                    route_type = ?classification.route_type,
                    "cost field does not match route direction; skipped"
                );
                return Ok(RouteOutcome::Anomalous);
            }
            CostCheck::Consistent => {}
        }

        let flights = match (&classification.route_type, &classification.start.airport) {
            (RouteType::Pickup, Some(airport))
                if self.settings.partners.flight_enrichment_enabled(route.partner_id) =>
            {
                matcher.find(&airport.code, true).await?
            }
            _ => Vec::new(),
        };

        let target = build_target_route(route, &classification, &flights)?;
        let outcome = self
            .collaborators
            .sink
            .write_crawl_route(&target, FieldCoverage::Derived, ExecMode::Autocommit)
            .await?;
        debug!(route_id = route.id, ?outcome, "crawl route written");
        Ok(RouteOutcome::Written(outcome))
    }

    async fn report_anomalies(&self, ids: &[i64]) {
        let message = anomaly_message(ids);
        if let Err(err) = self.collaborators.notifier.notify(&message).await {
            error!(error = %err, "failed to deliver anomaly notification");
        }
    }
}

pub fn anomaly_message(ids: &[i64]) -> String {
    format!("spp_route anomalies found while writing spp_crawl_route: {ids:?}")
}

/// Builds the crawl record for a classified route. `flights` is the deduped
/// match list; its head becomes the primary flight.
pub fn build_target_route(
    route: &SourceRoute,
    classification: &Classification,
    flights: &[FlightRecord],
) -> Result<TargetRoute, serde_json::Error> {
    let mut target = TargetRoute {
        id: route.id,
        route_name: route.route_name.clone(),
        partner_id: route.partner_id,
        platform_name: route.platform_name.clone().unwrap_or_default(),
        service_area_id: route.service_area_id,
        disable_date: route.disable_date,
        start: endpoint_record(
            route.id,
            route.from_address.as_deref(),
            route.from_place_lat_lng.as_deref(),
            &classification.start,
        ),
        end: endpoint_record(
            route.id,
            route.to_address.as_deref(),
            route.to_place_lat_lng.as_deref(),
            &classification.end,
        ),
        ctrip_flight_no: None,
        remark: None,
        active: active_flag(route),
        batch: route.batch.clone(),
        route_type: classification.route_type,
        route_zone_str: route.tz.clone(),
    };

    let mut remark = RemarkPayload {
        zone_name: classification.zone_name.clone(),
        ..RemarkPayload::default()
    };
    match classification.route_type {
        RouteType::Pickup => {
            if let Some(primary) = flights.first() {
                target.ctrip_flight_no = Some(primary.flight_no());
                remark.from_airport = Some(primary.from_airport.clone());
                remark.to_airport = Some(primary.to_airport.clone());
                remark.ctrip_flight_list = Some(alternates(flights).iter().map(AlternateFlight::from).collect());
            }
            target.remark = Some(remark.to_json()?);
        }
        RouteType::DropOff => target.remark = Some(remark.to_json()?),
        RouteType::Unclassified => {}
    }
    Ok(target)
}

fn endpoint_record(
    route_id: i64,
    address: Option<&str>,
    lat_lng: Option<&str>,
    class: &EndpointClass,
) -> EndpointRecord {
    let coordinates = place_coordinates(route_id, lat_lng);
    EndpointRecord {
        name_manual: class
            .airport
            .as_ref()
            .map(|a| a.code.clone())
            .or_else(|| address.map(str::to_string)),
        lat: coordinates.lat,
        lng: coordinates.lng,
        google_place_id: class.airport.as_ref().and_then(|a| a.google_place_id.clone()),
        place_type: class.place_type,
    }
}

/// 0 for deactivated routes, 2 while the route is in crawl state 2, else 1.
pub fn active_flag(route: &SourceRoute) -> i64 {
    if route.crawl_state == Some(2) {
        2
    } else if route.is_active.is_some_and(|v| v < 0) {
        0
    } else {
        1
    }
}

fn place_coordinates(route_id: i64, text: Option<&str>) -> PlaceCoordinates {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return PlaceCoordinates::default();
    };
    PlaceCoordinates::from_json(text).unwrap_or_else(|err| {
        info!(route_id, error = %err, "unreadable coordinates; treating as empty");
        PlaceCoordinates::default()
    })
}

fn route_attributes(route: &SourceRoute) -> RouteAttributes {
    let Some(text) = route.route_json.as_deref().filter(|t| !t.trim().is_empty()) else {
        return RouteAttributes::default();
    };
    RouteAttributes::from_json(text).unwrap_or_else(|err| {
        info!(route_id = route.id, error = %err, "unreadable route attributes; treating as empty");
        RouteAttributes::default()
    })
}
