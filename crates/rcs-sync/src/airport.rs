use std::collections::HashMap;

use rcs_core::{is_airport_code, AirportRecord};
use rcs_storage::StoreError;
use tracing::debug;

use crate::AirportLookup;

/// Airport lookups memoized for one sync run. Misses are cached too; the run
/// treats airport reference data as static, so nothing is ever invalidated.
pub struct AirportResolver<'a> {
    lookup: &'a dyn AirportLookup,
    cache: HashMap<String, Option<AirportRecord>>,
    lookups: usize,
}

impl<'a> AirportResolver<'a> {
    pub fn new(lookup: &'a dyn AirportLookup) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
            lookups: 0,
        }
    }

    /// Anything but three ASCII letters is not an airport and skips the lookup.
    pub async fn resolve(&mut self, code: &str) -> Result<Option<AirportRecord>, StoreError> {
        if !is_airport_code(code) {
            return Ok(None);
        }
        let key = code.to_ascii_uppercase();
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let record = self.lookup.airport_by_code(code).await?;
        self.lookups += 1;
        debug!(code = %key, found = record.is_some(), "airport lookup");
        self.cache.insert(key, record.clone());
        Ok(record)
    }

    /// Underlying store lookups issued so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AirportLookup for CountingLookup {
        async fn airport_by_code(&self, code: &str) -> Result<Option<AirportRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((code.eq_ignore_ascii_case("LAX")).then(|| AirportRecord {
                code: "LAX".into(),
                name: Some("Los Angeles International".into()),
                google_place_id: Some("ChIJtU-yE9KwwoAR8a2LaVd7qHc".into()),
            }))
        }
    }

    #[tokio::test]
    async fn repeated_codes_hit_the_store_once() {
        let lookup = CountingLookup { calls: AtomicUsize::new(0) };
        let mut resolver = AirportResolver::new(&lookup);

        let first = resolver.resolve("LAX").await.unwrap();
        let second = resolver.resolve("lax").await.unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.lookups(), 1);
    }

    #[tokio::test]
    async fn misses_are_memoized() {
        let lookup = CountingLookup { calls: AtomicUsize::new(0) };
        let mut resolver = AirportResolver::new(&lookup);

        assert!(resolver.resolve("ZZZ").await.unwrap().is_none());
        assert!(resolver.resolve("ZZZ").await.unwrap().is_none());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_codes_short_circuit() {
        let lookup = CountingLookup { calls: AtomicUsize::new(0) };
        let mut resolver = AirportResolver::new(&lookup);

        for place in ["LA1", "上海市", "Downtown LA", ""] {
            assert!(resolver.resolve(place).await.unwrap().is_none());
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }
}
