use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;

/// Partner whose pickup routes carry flight suggestions when no
/// `partners.yaml` is present.
pub const DEFAULT_FLIGHT_PARTNER: i64 = 2621;

#[derive(Debug, Clone, Deserialize)]
struct PartnerRegistry {
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    partners: Vec<PartnerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct PartnerEntry {
    partner_id: i64,
    #[serde(default)]
    flight_enrichment: bool,
}

/// Per-partner feature flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerFeatures {
    flight_enrichment: BTreeSet<i64>,
}

impl Default for PartnerFeatures {
    fn default() -> Self {
        Self::with_flight_enrichment([DEFAULT_FLIGHT_PARTNER])
    }
}

impl PartnerFeatures {
    pub fn with_flight_enrichment(partner_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            flight_enrichment: partner_ids.into_iter().collect(),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let registry: PartnerRegistry = serde_yaml::from_str(text).context("parsing partner registry")?;
        Ok(Self::with_flight_enrichment(
            registry
                .partners
                .into_iter()
                .filter(|p| p.flight_enrichment)
                .map(|p| p.partner_id),
        ))
    }

    /// Reads `partners.yaml` under `workspace_root`, or the built-in default
    /// when the file does not exist.
    pub async fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join("partners.yaml");
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn flight_enrichment_enabled(&self, partner_id: Option<i64>) -> bool {
        partner_id.is_some_and(|id| self.flight_enrichment.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_one_partner() {
        let features = PartnerFeatures::default();
        assert!(features.flight_enrichment_enabled(Some(2621)));
        assert!(!features.flight_enrichment_enabled(Some(1000)));
        assert!(!features.flight_enrichment_enabled(None));
    }

    #[test]
    fn yaml_lists_partners() {
        let features = PartnerFeatures::from_yaml_str(
            "version: 1\npartners:\n  - partner_id: 7\n    flight_enrichment: true\n  - partner_id: 2621\n    flight_enrichment: false\n",
        )
        .unwrap();
        assert!(features.flight_enrichment_enabled(Some(7)));
        assert!(!features.flight_enrichment_enabled(Some(2621)));
    }

    #[tokio::test]
    async fn load_reads_workspace_file_or_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(PartnerFeatures::load(dir.path()).await.unwrap(), PartnerFeatures::default());

        std::fs::write(
            dir.path().join("partners.yaml"),
            "version: 1\npartners:\n  - partner_id: 42\n    flight_enrichment: true\n",
        )
        .unwrap();
        let loaded = PartnerFeatures::load(dir.path()).await.unwrap();
        assert!(loaded.flight_enrichment_enabled(Some(42)));
        assert!(!loaded.flight_enrichment_enabled(Some(2621)));
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("partners.yaml"), "partners: [[[").unwrap();
        assert!(PartnerFeatures::load(dir.path()).await.is_err());
    }
}
