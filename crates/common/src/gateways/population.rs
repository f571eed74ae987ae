//! Pedestrian-traffic gateway
//!
//! Resolves a neighborhood to its 8-digit dong id via the address master
//! file (loaded once at startup), then looks the id up in the Seoul
//! transit passenger-count dataset. Any failure degrades to an absent
//! record.

use crate::config::DataApiConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// One row of the passenger-count dataset
///
/// The counts arrive as numeral strings or numbers depending on the
/// upstream serializer; both forms are normalized to strings here. The
/// hourly breakdown and any other fields are carried opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PassengerRecord {
    #[serde(rename = "DONG_ID", default)]
    pub dong_id: String,

    #[serde(rename = "PSNG_NO", default, deserialize_with = "string_or_number")]
    pub total_passengers: Option<String>,

    #[serde(rename = "RIDE_PASGR_NUM", default, deserialize_with = "string_or_number")]
    pub ride_passengers: Option<String>,

    #[serde(rename = "ALIGHT_PASGR_NUM", default, deserialize_with = "string_or_number")]
    pub alight_passengers: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PassengerRecord {
    /// Total pedestrian count as display text, or the absent marker
    pub fn total_display(&self) -> &str {
        self.total_passengers.as_deref().unwrap_or("정보 없음")
    }
}

/// Accept a JSON string or number and normalize to an optional string
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

#[derive(Debug, Deserialize)]
struct AddressMaster {
    #[serde(rename = "DATA")]
    data: Vec<AddressEntry>,
}

#[derive(Debug, Deserialize)]
struct AddressEntry {
    cgg_nm: String,
    dong_nm: String,
    #[serde(default)]
    dong_id: String,
}

#[derive(Debug, Deserialize)]
struct PassengerEnvelope {
    #[serde(rename = "tpssPassengerCnt")]
    dataset: Option<PassengerDataset>,
}

#[derive(Debug, Deserialize)]
struct PassengerDataset {
    #[serde(default)]
    row: Vec<PassengerRecord>,
}

/// Pedestrian-traffic gateway
pub struct PopulationGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    addresses: Vec<AddressEntry>,
}

impl PopulationGateway {
    /// Create the gateway, loading the address master from disk
    pub fn new(config: &DataApiConfig) -> Result<Self> {
        let api_key = config
            .population_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "data.population_key is required".to_string(),
            })?;

        let raw = std::fs::read_to_string(&config.address_master_path).map_err(|e| {
            AppError::Configuration {
                message: format!("Failed to read {}: {}", config.address_master_path, e),
            }
        })?;
        let master: AddressMaster =
            serde_json::from_str(&raw).map_err(|e| AppError::Configuration {
                message: format!("Failed to parse {}: {}", config.address_master_path, e),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.population_url.trim_end_matches('/').to_string(),
            api_key,
            addresses: master.data,
        })
    }

    /// Resolve the 8-digit dong id for a gu/dong pair
    fn resolve_dong_id(&self, gu: &str, dong: &str) -> Option<&str> {
        self.addresses
            .iter()
            .find(|entry| {
                entry.cgg_nm == gu && entry.dong_nm == dong && entry.dong_id.len() == 8
            })
            .map(|entry| entry.dong_id.as_str())
    }

    /// Look up the passenger record for a neighborhood
    ///
    /// Unknown neighborhoods and upstream failures yield None.
    pub async fn record_by_dong(&self, gu: &str, dong: &str) -> Option<PassengerRecord> {
        let Some(target_id) = self.resolve_dong_id(gu, dong) else {
            warn!(gu, dong, "Neighborhood not found in address master");
            return None;
        };

        match self.fetch_rows().await {
            Ok(rows) => {
                metrics::record_gateway("population", false);
                rows.into_iter().find(|row| row.dong_id == target_id)
            }
            Err(e) => {
                warn!(error = %e, "Passenger API request failed");
                metrics::record_gateway("population", true);
                None
            }
        }
    }

    async fn fetch_rows(&self) -> Result<Vec<PassengerRecord>> {
        let url = format!(
            "{}/{}/json/tpssPassengerCnt/1/1000",
            self.base_url, self.api_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::Upstream {
                service: "population".to_string(),
                message: format!("Request failed: {}", e),
            }
        })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream {
                service: "population".to_string(),
                message: format!("API error {}", response.status()),
            });
        }

        let envelope: PassengerEnvelope =
            response.json().await.map_err(|e| AppError::Upstream {
                service: "population".to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(envelope.dataset.map(|d| d.row).unwrap_or_default())
    }
}
