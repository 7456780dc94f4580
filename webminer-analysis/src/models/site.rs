//! Site restrictions and their weights

use serde::{Deserialize, Serialize};
use webminer_common::{Error, Result};

/// Separator between a site address and its weight in the textual form
pub const WEIGHT_SEPARATOR: &str = " <WEIGHT> ";

/// Marker for an unrestricted search in the textual form
pub const WHOLE_NETWORK: &str = "<WHOLE_NETWORK>";

/// A query restriction to one domain (or none) with a manual weight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRestriction {
    /// Domain to restrict to; `None` searches the whole network
    pub domain: Option<String>,
    /// Raw weight before scaling
    pub weight: f64,
}

impl SiteRestriction {
    pub fn whole_network() -> Self {
        Self {
            domain: None,
            weight: 1.0,
        }
    }

    pub fn new(domain: Option<&str>, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Site weight must be a non-negative number, got {}",
                weight
            )));
        }
        let domain = domain
            .map(|d| d.replace(' ', ""))
            .filter(|d| !d.is_empty() && d != WHOLE_NETWORK);
        Ok(Self { domain, weight })
    }

    /// Parse `"allmusic.com <WEIGHT> 2.5"` or `"<WHOLE_NETWORK>"`
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.splitn(2, WEIGHT_SEPARATOR);
        let address = parts.next().unwrap_or_default().trim();
        let weight = match parts.next() {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                Error::InvalidInput(format!("Invalid weight '{}' for site '{}'", raw.trim(), address))
            })?,
            None => 1.0,
        };
        Self::new(Some(address), weight)
    }

    /// Display name for reports and logs
    pub fn display_name(&self) -> &str {
        self.domain.as_deref().unwrap_or("whole network")
    }
}

/// How raw site weights become effective weights
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightScaling {
    /// Divide each raw weight by the number of sites; raising one site's
    /// weight never changes the others' effective weights
    #[default]
    SiteCount,
    /// Divide each raw weight by the sum of all raw weights, so the
    /// effective weights sum to 1
    TotalWeight,
}

impl WeightScaling {
    pub fn effective_weights(&self, sites: &[SiteRestriction]) -> Vec<f64> {
        let divisor = match self {
            WeightScaling::SiteCount => sites.len() as f64,
            WeightScaling::TotalWeight => sites.iter().map(|s| s.weight).sum(),
        };
        sites
            .iter()
            .map(|s| if divisor == 0.0 { 0.0 } else { s.weight / divisor })
            .collect()
    }
}
