//! Place-search gateway (Kakao local API)
//!
//! Estimates competing-business counts via keyword search and resolves
//! neighborhoods to coordinates via address search. Failures degrade to
//! a zero count with a descriptive sentence, or an absent coordinate.

use crate::config::DataApiConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Competing-business estimate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimilarBusiness {
    pub description: String,
    pub count: u64,
}

/// A resolved map coordinate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct KeywordSearchResponse {
    meta: Option<KeywordMeta>,
}

#[derive(Debug, Deserialize)]
struct KeywordMeta {
    #[serde(default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct AddressSearchResponse {
    #[serde(default)]
    documents: Vec<AddressDocument>,
}

#[derive(Debug, Deserialize)]
struct AddressDocument {
    x: String,
    y: String,
}

/// Place-search gateway
pub struct PlacesGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PlacesGateway {
    /// Create the gateway from configuration
    pub fn new(config: &DataApiConfig) -> Result<Self> {
        let api_key = config
            .kakao_rest_api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "data.kakao_rest_api_key is required".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.kakao_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Estimate the number of businesses matching "{gu} {dong} {type}"
    ///
    /// Failure yields a zero count with the error described in the
    /// description field.
    pub async fn similar_business(&self, gu: &str, dong: &str, business_type: &str) -> SimilarBusiness {
        let query = format!("{} {} {}", gu, dong, business_type);

        match self.keyword_count(&query).await {
            Ok(count) => {
                metrics::record_gateway("places", false);
                SimilarBusiness {
                    description: format!(
                        "카카오 API 기준 '{query}' 관련 업종 수는 약 {count}건으로 확인됩니다."
                    ),
                    count,
                }
            }
            Err(e) => {
                warn!(error = %e, query = %query, "Keyword search failed");
                metrics::record_gateway("places", true);
                SimilarBusiness {
                    description: format!("카카오 API 호출 오류: {e}"),
                    count: 0,
                }
            }
        }
    }

    async fn keyword_count(&self, query: &str) -> Result<u64> {
        let url = format!("{}/v2/local/search/keyword.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "places".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream {
                service: "places".to_string(),
                message: format!("API error {}", response.status()),
            });
        }

        let payload: KeywordSearchResponse =
            response.json().await.map_err(|e| AppError::Upstream {
                service: "places".to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(payload.meta.map(|m| m.total_count).unwrap_or(0))
    }

    /// Resolve a neighborhood to coordinates via address search
    pub async fn coordinates(&self, gu: &str, dong: &str) -> Option<Coordinates> {
        let address = format!("서울특별시 {} {}", gu, dong);

        match self.address_search(&address).await {
            Ok(Some(coords)) => {
                metrics::record_gateway("geocode", false);
                Some(coords)
            }
            Ok(None) => {
                warn!(address = %address, "Address search returned no documents");
                metrics::record_gateway("geocode", false);
                None
            }
            Err(e) => {
                warn!(error = %e, address = %address, "Address search failed");
                metrics::record_gateway("geocode", true);
                None
            }
        }
    }

    async fn address_search(&self, address: &str) -> Result<Option<Coordinates>> {
        let url = format!("{}/v2/local/search/address.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("query", address)])
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "places".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream {
                service: "places".to_string(),
                message: format!("API error {}", response.status()),
            });
        }

        let payload: AddressSearchResponse =
            response.json().await.map_err(|e| AppError::Upstream {
                service: "places".to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        let Some(doc) = payload.documents.first() else {
            return Ok(None);
        };

        let lat = doc.y.parse::<f64>().map_err(|e| AppError::Upstream {
            service: "places".to_string(),
            message: format!("Bad latitude '{}': {}", doc.y, e),
        })?;
        let lng = doc.x.parse::<f64>().map_err(|e| AppError::Upstream {
            service: "places".to_string(),
            message: format!("Bad longitude '{}': {}", doc.x, e),
        })?;

        Ok(Some(Coordinates { lat, lng }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_response_parsing() {
        let json = r#"{"meta": {"total_count": 42, "pageable_count": 42}, "documents": []}"#;
        let payload: KeywordSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.meta.unwrap().total_count, 42);
    }

    #[test]
    fn test_keyword_response_without_meta() {
        let payload: KeywordSearchResponse = serde_json::from_str(r#"{"documents": []}"#).unwrap();
        assert!(payload.meta.is_none());
    }

    #[test]
    fn test_address_response_parsing() {
        let json = r#"{"documents": [{"x": "127.0016985", "y": "37.5642135"}]}"#;
        let payload: AddressSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.documents.len(), 1);
        assert_eq!(payload.documents[0].y, "37.5642135");
    }

    #[test]
    fn test_description_shape() {
        let similar = SimilarBusiness {
            description: "카카오 API 기준 '용산구 한남동 카페' 관련 업종 수는 약 12건으로 확인됩니다."
                .to_string(),
            count: 12,
        };
        assert!(similar.description.contains("약 12건"));
    }
}
