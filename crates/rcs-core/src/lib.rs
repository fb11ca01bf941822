//! Core domain model for route crawl sync.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub const CRATE_NAME: &str = "rcs-core";

/// Attributes-blob key holding the pickup routing cost.
pub const PICKUP_COST_KEY: &str = "p_amt";
/// Attributes-blob key holding the drop-off routing cost.
pub const DROP_OFF_COST_KEY: &str = "d_amt";

/// Alternates kept in the remark payload after the primary flight.
pub const MAX_ALTERNATE_FLIGHTS: usize = 10;

/// True when `value` is exactly three ASCII letters, the shape of an IATA airport code.
pub fn is_airport_code(value: &str) -> bool {
    value.chars().count() == 3 && value.chars().all(|c| c.is_ascii_alphabetic())
}

/// Direction of a route relative to the airport it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Pickup,
    DropOff,
    #[default]
    Unclassified,
}

impl RouteType {
    /// Label stored in the crawl table; unclassified routes persist as NULL.
    pub fn db_label(self) -> Option<&'static str> {
        match self {
            RouteType::Pickup => Some("接机"),
            RouteType::DropOff => Some("送机"),
            RouteType::Unclassified => None,
        }
    }

    pub fn from_db_label(label: Option<&str>) -> Self {
        match label {
            Some("接机") => RouteType::Pickup,
            Some("送机") => RouteType::DropOff,
            _ => RouteType::Unclassified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Airport,
    Hotel,
}

impl PlaceType {
    pub fn db_label(self) -> &'static str {
        match self {
            PlaceType::Airport => "机场",
            PlaceType::Hotel => "酒店",
        }
    }

    pub fn from_db_label(label: &str) -> Option<Self> {
        match label {
            "机场" => Some(PlaceType::Airport),
            "酒店" => Some(PlaceType::Hotel),
            _ => None,
        }
    }
}

/// Route record as read from the partner-managed `spp_route` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SourceRoute {
    pub id: i64,
    pub route_name: Option<String>,
    pub partner_id: Option<i64>,
    pub platform_name: Option<String>,
    pub service_area_id: Option<i64>,
    pub from_place: String,
    pub to_place: String,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    /// JSON text, e.g. `{"lat": 34.05, "lng": -118.24}`; may be malformed.
    pub from_place_lat_lng: Option<String>,
    pub to_place_lat_lng: Option<String>,
    /// Routing cost config keyed by direction (`p_amt` / `d_amt`); may be malformed.
    pub route_json: Option<String>,
    pub is_active: Option<i64>,
    pub crawl_state: Option<i64>,
    pub batch: Option<String>,
    pub disable_date: Option<NaiveDate>,
    pub tz: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub code: String,
    pub name: Option<String>,
    pub google_place_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub from_airport: String,
    pub to_airport: String,
    pub flight_code: String,
    pub flight_number: String,
}

impl FlightRecord {
    /// Carrier code and number joined, e.g. `CA` + `983` -> `CA983`.
    pub fn flight_no(&self) -> String {
        format!("{}{}", self.flight_code, self.flight_number)
    }
}

/// Inclusive arrival-hour window applied to the linked flight schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for HourWindow {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
        }
    }
}

/// Entry of the alternate flight list carried in the remark payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateFlight {
    pub from_airport: String,
    pub to_airport: String,
    pub flight_no: String,
}

impl From<&FlightRecord> for AlternateFlight {
    fn from(flight: &FlightRecord) -> Self {
        Self {
            from_airport: flight.from_airport.clone(),
            to_airport: flight.to_airport.clone(),
            flight_no: flight.flight_no(),
        }
    }
}

/// Auxiliary JSON stored in `spp_crawl_route.remark`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemarkPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_airport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_airport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrip_flight_list: Option<Vec<AlternateFlight>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

impl RemarkPayload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Latitude/longitude pair decoded from a coordinate JSON column.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceCoordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl PlaceCoordinates {
    /// Numbers and numeric strings are both accepted for each axis.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let object: Map<String, JsonValue> = serde_json::from_str(text)?;
        Ok(Self {
            lat: object.get("lat").and_then(json_as_f64),
            lng: object.get("lng").and_then(json_as_f64),
        })
    }
}

fn json_as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Routing attributes blob of a source route.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteAttributes {
    values: Map<String, JsonValue>,
}

impl RouteAttributes {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let values: Map<String, JsonValue> = serde_json::from_str(text)?;
        Ok(Self { values })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn has_pickup_cost(&self) -> bool {
        self.contains(PICKUP_COST_KEY)
    }

    pub fn has_drop_off_cost(&self) -> bool {
        self.contains(DROP_OFF_COST_KEY)
    }

    /// Drops `p_amt` when `d_amt` is also present; the drop-off cost wins.
    pub fn without_conflicting_cost(&self) -> Self {
        let mut values = self.values.clone();
        if self.has_pickup_cost() && self.has_drop_off_cost() {
            values.remove(PICKUP_COST_KEY);
        }
        Self { values }
    }
}

/// One endpoint of a crawl record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub name_manual: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub google_place_id: Option<String>,
    pub place_type: Option<PlaceType>,
}

/// Normalized row of the `spp_crawl_route` table, keyed 1:1 by the source route id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetRoute {
    pub id: i64,
    pub route_name: Option<String>,
    pub partner_id: Option<i64>,
    pub platform_name: String,
    pub service_area_id: Option<i64>,
    pub disable_date: Option<NaiveDate>,
    pub start: EndpointRecord,
    pub end: EndpointRecord,
    pub ctrip_flight_no: Option<String>,
    /// Encoded remark JSON; absent for unclassified routes.
    pub remark: Option<String>,
    pub active: i64,
    pub batch: Option<String>,
    pub route_type: RouteType,
    pub route_zone_str: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airport_code_shape() {
        assert!(is_airport_code("LAX"));
        assert!(is_airport_code("pvg"));
        assert!(!is_airport_code("LA1"));
        assert!(!is_airport_code("LAXX"));
        assert!(!is_airport_code("浦东机"));
        assert!(!is_airport_code(""));
    }

    #[test]
    fn coordinates_accept_numbers_and_strings() {
        let coords = PlaceCoordinates::from_json(r#"{"lat": 31.15, "lng": "121.80"}"#).unwrap();
        assert_eq!(coords.lat, Some(31.15));
        assert_eq!(coords.lng, Some(121.80));

        let partial = PlaceCoordinates::from_json(r#"{"lat": null}"#).unwrap();
        assert_eq!(partial, PlaceCoordinates::default());

        assert!(PlaceCoordinates::from_json("not json").is_err());
    }

    #[test]
    fn conflicting_pickup_cost_is_dropped() {
        let attrs = RouteAttributes::from_json(r#"{"p_amt": 10, "d_amt": 12, "car": "suv"}"#).unwrap();
        let filtered = attrs.without_conflicting_cost();
        assert!(!filtered.has_pickup_cost());
        assert!(filtered.has_drop_off_cost());
        assert!(filtered.contains("car"));

        let pickup_only = RouteAttributes::from_json(r#"{"p_amt": 10}"#).unwrap();
        assert!(pickup_only.without_conflicting_cost().has_pickup_cost());
    }

    #[test]
    fn remark_omits_absent_fields_and_keeps_unicode() {
        let remark = RemarkPayload {
            zone_name: Some("浦东香格里拉酒店".into()),
            ..Default::default()
        };
        assert_eq!(remark.to_json().unwrap(), r#"{"zone_name":"浦东香格里拉酒店"}"#);
        assert_eq!(RemarkPayload::default().to_json().unwrap(), "{}");
    }

    #[test]
    fn labels_round_trip_through_db_strings() {
        assert_eq!(RouteType::from_db_label(RouteType::Pickup.db_label()), RouteType::Pickup);
        assert_eq!(RouteType::from_db_label(None), RouteType::Unclassified);
        assert_eq!(PlaceType::from_db_label("酒店"), Some(PlaceType::Hotel));
        assert_eq!(PlaceType::from_db_label("other"), None);
    }
}
