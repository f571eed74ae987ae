//! Real-estate transaction gateway
//!
//! Queries the national RTMS deal API month by month over a trailing
//! window, keeps deals in the requested neighborhood, and returns the
//! most recent ones. A failed month is skipped; total failure degrades
//! to an empty list.

use crate::config::DataApiConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// A single real-estate transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EstateDeal {
    #[serde(rename = "dealAmount")]
    pub deal_amount: String,
    #[serde(rename = "dealYear")]
    pub deal_year: i32,
    #[serde(rename = "dealMonth")]
    pub deal_month: u32,
    #[serde(rename = "dealDay")]
    pub deal_day: u32,
    #[serde(rename = "buildingType")]
    pub building_type: String,
}

impl EstateDeal {
    /// Parse the formatted amount, stripping thousands separators.
    /// Returns None for the "N/A" sentinel or anything unparseable.
    pub fn amount(&self) -> Option<i64> {
        if self.deal_amount == "N/A" {
            return None;
        }
        self.deal_amount.replace(',', "").trim().parse().ok()
    }
}

// Wire format of the RTMS XML payload

#[derive(Debug, Deserialize)]
struct RtmsResponse {
    body: Option<RtmsBody>,
}

#[derive(Debug, Deserialize)]
struct RtmsBody {
    items: Option<RtmsItems>,
}

#[derive(Debug, Default, Deserialize)]
struct RtmsItems {
    #[serde(default, rename = "item")]
    item: Vec<RtmsItem>,
}

#[derive(Debug, Deserialize)]
struct RtmsItem {
    #[serde(default, rename = "dealAmount")]
    deal_amount: Option<String>,
    #[serde(default, rename = "dealYear")]
    deal_year: Option<i32>,
    #[serde(default, rename = "dealMonth")]
    deal_month: Option<u32>,
    #[serde(default, rename = "dealDay")]
    deal_day: Option<u32>,
    #[serde(default, rename = "umdNm")]
    umd_nm: Option<String>,
    #[serde(default, rename = "buildingType")]
    building_type: Option<String>,
}

/// Real-estate gateway
pub struct EstateGateway {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    gu_codes: HashMap<String, String>,
    months: u32,
    max_deals: usize,
}

impl EstateGateway {
    /// Create the gateway, loading the gu -> district-code map from disk
    pub fn new(config: &DataApiConfig) -> Result<Self> {
        let service_key = config
            .real_estate_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "data.real_estate_key is required".to_string(),
            })?;

        let raw = std::fs::read_to_string(&config.gu_code_path).map_err(|e| {
            AppError::Configuration {
                message: format!("Failed to read {}: {}", config.gu_code_path, e),
            }
        })?;
        let gu_codes: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| AppError::Configuration {
                message: format!("Failed to parse {}: {}", config.gu_code_path, e),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.real_estate_url.clone(),
            service_key,
            gu_codes,
            months: config.deal_months,
            max_deals: config.max_deals,
        })
    }

    /// Fetch recent deals in a neighborhood, newest first
    ///
    /// Unknown gu or upstream failure yields an empty list, never an error.
    pub async fn deals_by_dong(&self, gu: &str, dong: &str) -> Vec<EstateDeal> {
        let Some(lawd_cd) = self.gu_codes.get(gu) else {
            warn!(gu, "Unknown district, no deal lookup");
            return Vec::new();
        };

        let mut deals = Vec::new();
        let mut degraded = false;

        for yyyymm in month_window(Local::now().date_naive(), self.months) {
            match self.fetch_month(lawd_cd, &yyyymm).await {
                Ok(items) => deals.extend(filter_items(items, dong)),
                Err(e) => {
                    warn!(error = %e, month = %yyyymm, "Deal API request failed, skipping month");
                    degraded = true;
                }
            }
        }

        metrics::record_gateway("real_estate", degraded);

        deals.sort_by(|a, b| {
            (b.deal_year, b.deal_month, b.deal_day).cmp(&(a.deal_year, a.deal_month, a.deal_day))
        });
        deals.truncate(self.max_deals);
        deals
    }

    async fn fetch_month(&self, lawd_cd: &str, yyyymm: &str) -> Result<Vec<RtmsItem>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("serviceKey", self.service_key.as_str()),
                ("LAWD_CD", lawd_cd),
                ("DEAL_YMD", yyyymm),
                ("pageNo", "1"),
                ("numOfRows", "100"),
                ("type", "xml"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "real_estate".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream {
                service: "real_estate".to_string(),
                message: format!("API error {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| AppError::Upstream {
            service: "real_estate".to_string(),
            message: format!("Failed to read response: {}", e),
        })?;

        let parsed: RtmsResponse =
            quick_xml::de::from_str(&body).map_err(|e| AppError::Upstream {
                service: "real_estate".to_string(),
                message: format!("Failed to parse XML: {}", e),
            })?;

        Ok(parsed
            .body
            .and_then(|b| b.items)
            .unwrap_or_default()
            .item)
    }
}

/// Keep items whose neighborhood contains `dong`, with source defaults
fn filter_items(items: Vec<RtmsItem>, dong: &str) -> Vec<EstateDeal> {
    items
        .into_iter()
        .filter(|item| item.umd_nm.as_deref().unwrap_or("N/A").contains(dong))
        .map(|item| EstateDeal {
            deal_amount: item.deal_amount.unwrap_or_else(|| "N/A".to_string()),
            deal_year: item.deal_year.unwrap_or(0),
            deal_month: item.deal_month.unwrap_or(0),
            deal_day: item.deal_day.unwrap_or(0),
            building_type: item.building_type.unwrap_or_else(|| "N/A".to_string()),
        })
        .collect()
}

/// The `months` most recent months as YYYYMM strings, current month first
fn month_window(today: NaiveDate, months: u32) -> Vec<String> {
    let mut window = Vec::with_capacity(months as usize);
    let mut year = today.year();
    let mut month = today.month();

    for _ in 0..months {
        window.push(format!("{:04}{:02}", year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }

    window
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <header><resultCode>000</resultCode></header>
  <body>
    <items>
      <item>
        <dealAmount>100,000</dealAmount>
        <dealYear>2026</dealYear>
        <dealMonth>7</dealMonth>
        <dealDay>15</dealDay>
        <umdNm>한남동</umdNm>
        <buildingType>오피스텔</buildingType>
      </item>
      <item>
        <dealAmount>85,000</dealAmount>
        <dealYear>2026</dealYear>
        <dealMonth>7</dealMonth>
        <dealDay>20</dealDay>
        <umdNm>이태원동</umdNm>
        <buildingType>상가</buildingType>
      </item>
      <item>
        <dealYear>2026</dealYear>
        <dealMonth>6</dealMonth>
        <dealDay>1</dealDay>
        <umdNm>한남동</umdNm>
      </item>
    </items>
  </body>
</response>"#;

    #[test]
    fn test_parse_and_filter_by_dong() {
        let parsed: RtmsResponse = quick_xml::de::from_str(SAMPLE_XML).unwrap();
        let items = parsed.body.unwrap().items.unwrap().item;
        assert_eq!(items.len(), 3);

        let deals = filter_items(items, "한남동");
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].deal_amount, "100,000");
        // Missing fields pick up the source defaults.
        assert_eq!(deals[1].deal_amount, "N/A");
        assert_eq!(deals[1].building_type, "N/A");
    }

    #[test]
    fn test_empty_items() {
        let xml = "<response><body><items></items></body></response>";
        let parsed: RtmsResponse = quick_xml::de::from_str(xml).unwrap();
        let items = parsed.body.unwrap().items.unwrap().item;
        assert!(items.is_empty());
    }

    #[test]
    fn test_missing_body() {
        let xml = "<response><header><resultCode>99</resultCode></header></response>";
        let parsed: RtmsResponse = quick_xml::de::from_str(xml).unwrap();
        assert!(parsed.body.is_none());
    }

    #[test]
    fn test_amount_parsing() {
        let deal = EstateDeal {
            deal_amount: "100,000".to_string(),
            deal_year: 2026,
            deal_month: 7,
            deal_day: 1,
            building_type: "상가".to_string(),
        };
        assert_eq!(deal.amount(), Some(100_000));

        let missing = EstateDeal {
            deal_amount: "N/A".to_string(),
            ..deal.clone()
        };
        assert_eq!(missing.amount(), None);

        let garbage = EstateDeal {
            deal_amount: "백만".to_string(),
            ..deal
        };
        assert_eq!(garbage.amount(), None);
    }

    #[test]
    fn test_month_window_rolls_over_year() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        let window = month_window(today, 6);
        assert_eq!(
            window,
            vec!["202602", "202601", "202512", "202511", "202510", "202509"]
        );
    }

    #[test]
    fn test_sort_newest_first() {
        let mut deals = vec![
            EstateDeal {
                deal_amount: "1".to_string(),
                deal_year: 2025,
                deal_month: 12,
                deal_day: 31,
                building_type: "상가".to_string(),
            },
            EstateDeal {
                deal_amount: "2".to_string(),
                deal_year: 2026,
                deal_month: 1,
                deal_day: 2,
                building_type: "상가".to_string(),
            },
        ];
        deals.sort_by(|a, b| {
            (b.deal_year, b.deal_month, b.deal_day).cmp(&(a.deal_year, a.deal_month, a.deal_day))
        });
        assert_eq!(deals[0].deal_amount, "2");
    }
}
