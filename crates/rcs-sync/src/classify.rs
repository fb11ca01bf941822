use std::str::FromStr;

use rcs_core::{is_airport_code, AirportRecord, PlaceType, RouteAttributes, RouteType, SourceRoute};
use rcs_storage::StoreError;
use tracing::warn;

use crate::AirportResolver;

/// How a route whose endpoints both resolve to airports is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationPrecedence {
    /// The destination is evaluated last and wins: airport-to-airport is a drop-off.
    #[default]
    LastEvaluatedWins,
    /// The origin wins: airport-to-airport is a pickup.
    FirstMatchWins,
}

impl FromStr for ClassificationPrecedence {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-evaluated" | "last_evaluated" => Ok(Self::LastEvaluatedWins),
            "first-match" | "first_match" => Ok(Self::FirstMatchWins),
            other => Err(format!("unknown classification precedence `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EndpointClass {
    pub airport: Option<AirportRecord>,
    pub place_type: Option<PlaceType>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub route_type: RouteType,
    pub start: EndpointClass,
    pub end: EndpointClass,
    pub zone_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteClassifier {
    precedence: ClassificationPrecedence,
}

impl RouteClassifier {
    pub fn new(precedence: ClassificationPrecedence) -> Self {
        Self { precedence }
    }

    pub async fn classify(
        &self,
        route: &SourceRoute,
        airports: &mut AirportResolver<'_>,
    ) -> Result<Classification, StoreError> {
        let start = classify_endpoint(&route.from_place, route.from_address.as_deref(), airports).await?;
        let end = classify_endpoint(&route.to_place, route.to_address.as_deref(), airports).await?;

        let from_is_airport = start.airport.is_some();
        let to_is_airport = end.airport.is_some();
        if from_is_airport && to_is_airport {
            warn!(
                route_id = route.id,
                precedence = ?self.precedence,
                "both endpoints resolve to airports"
            );
        }
        let route_type = self.route_type(from_is_airport, to_is_airport);

        Ok(Classification {
            route_type,
            start,
            end,
            zone_name: zone_name(route_type, route),
        })
    }

    pub fn route_type(&self, from_is_airport: bool, to_is_airport: bool) -> RouteType {
        match (from_is_airport, to_is_airport) {
            (true, true) => match self.precedence {
                ClassificationPrecedence::LastEvaluatedWins => RouteType::DropOff,
                ClassificationPrecedence::FirstMatchWins => RouteType::Pickup,
            },
            (true, false) => RouteType::Pickup,
            (false, true) => RouteType::DropOff,
            (false, false) => RouteType::Unclassified,
        }
    }
}

async fn classify_endpoint(
    place: &str,
    address: Option<&str>,
    airports: &mut AirportResolver<'_>,
) -> Result<EndpointClass, StoreError> {
    let airport = airports.resolve(place).await?;
    let place_type = if airport.is_some() {
        Some(PlaceType::Airport)
    } else if address.is_some_and(mentions_hotel) {
        Some(PlaceType::Hotel)
    } else {
        None
    };
    Ok(EndpointClass { airport, place_type })
}

pub fn mentions_hotel(address: &str) -> bool {
    address.contains("酒店") || address.to_lowercase().contains("hotel")
}

/// A pickup is zoned by its destination place, a drop-off by its origin,
/// unless the far-side address is already a bare airport code.
pub fn zone_name(route_type: RouteType, route: &SourceRoute) -> Option<String> {
    let (address, place) = match route_type {
        RouteType::Pickup => (route.to_address.as_deref(), &route.to_place),
        RouteType::DropOff => (route.from_address.as_deref(), &route.from_place),
        RouteType::Unclassified => return None,
    };
    if address.is_some_and(is_airport_code) || place.is_empty() {
        return None;
    }
    Some(place.clone())
}

/// Agreement between the derived route type and the cost fields present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostCheck {
    Consistent,
    /// Classified, but the matching cost field is absent; the route is not written.
    Mismatch,
    /// Unclassified with no cost field at all; the route is not written.
    Anomalous,
}

pub fn check_cost_fields(route_type: RouteType, attributes: &RouteAttributes) -> CostCheck {
    let attributes = attributes.without_conflicting_cost();
    match route_type {
        RouteType::Pickup if attributes.has_pickup_cost() => CostCheck::Consistent,
        RouteType::DropOff if attributes.has_drop_off_cost() => CostCheck::Consistent,
        RouteType::Pickup | RouteType::DropOff => CostCheck::Mismatch,
        RouteType::Unclassified => {
            if attributes.has_pickup_cost() || attributes.has_drop_off_cost() {
                CostCheck::Consistent
            } else {
                CostCheck::Anomalous
            }
        }
    }
}
