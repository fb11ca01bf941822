use std::collections::HashSet;

use rcs_core::{FlightRecord, HourWindow, MAX_ALTERNATE_FLIGHTS};
use rcs_storage::StoreError;
use tracing::debug;

use crate::FlightLookup;

pub struct FlightMatcher<'a> {
    lookup: &'a dyn FlightLookup,
    window: HourWindow,
    fallback_unwindowed: bool,
}

impl<'a> FlightMatcher<'a> {
    pub fn new(lookup: &'a dyn FlightLookup, window: HourWindow, fallback_unwindowed: bool) -> Self {
        Self {
            lookup,
            window,
            fallback_unwindowed,
        }
    }

    /// Flights landing at `destination`, at most one per origin airport. An
    /// empty windowed search is retried without the window when fallback is on.
    pub async fn find(&self, destination: &str, time_windowed: bool) -> Result<Vec<FlightRecord>, StoreError> {
        let window = time_windowed.then_some(self.window);
        let mut flights = self.lookup.arriving_flights(destination, window).await?;
        if flights.is_empty() && time_windowed && self.fallback_unwindowed {
            debug!(destination, "no flights inside the arrival window; searching unwindowed");
            flights = self.lookup.arriving_flights(destination, None).await?;
        }
        Ok(dedup_by_origin(flights))
    }
}

/// Keeps the first flight seen for each origin airport, preserving order.
pub fn dedup_by_origin(flights: Vec<FlightRecord>) -> Vec<FlightRecord> {
    let mut seen = HashSet::new();
    flights
        .into_iter()
        .filter(|flight| seen.insert(flight.from_airport.clone()))
        .collect()
}

/// Everything after the primary flight, capped at the alternate-list size.
pub fn alternates(flights: &[FlightRecord]) -> &[FlightRecord] {
    let end = flights.len().min(MAX_ALTERNATE_FLIGHTS + 1);
    flights.get(1..end).unwrap_or(&[])
}
