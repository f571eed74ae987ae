//! Analysis over caller-supplied data

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::AppState;
use sangkwon_common::{
    analysis::AnalysisOutcome,
    errors::{AppError, Result},
    gateways::{estate::EstateDeal, population::PassengerRecord},
    metrics::RequestMetrics,
};

/// Analysis request carrying pre-fetched data
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub gu: Option<String>,
    pub dong: Option<String>,
    pub item: Option<String>,

    /// Pedestrian-traffic record, when the caller already has one
    pub population: Option<PassengerRecord>,

    /// Recent transactions, when the caller already has them
    #[serde(default)]
    pub estate: Vec<EstateDeal>,
}

/// Score and analyze a location with the supplied data
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisOutcome>> {
    let tracker = RequestMetrics::start("POST", "/analyze");

    let (Some(gu), Some(dong), Some(item)) = (
        request.gu.as_deref().filter(|v| !v.is_empty()),
        request.dong.as_deref().filter(|v| !v.is_empty()),
        request.item.as_deref().filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::Validation {
            message: "필수 입력 값(gu, dong, item)이 부족합니다.".to_string(),
            field: None,
        });
    };

    let outcome = state
        .analyzer
        .analyze_supplied(gu, dong, item, request.population.as_ref(), &request.estate)
        .await?;

    tracker.finish(200);
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_only_keys() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"gu": "용산구", "dong": "한남동", "item": "카페"}"#,
        )
        .unwrap();
        assert_eq!(request.gu.as_deref(), Some("용산구"));
        assert!(request.population.is_none());
        assert!(request.estate.is_empty());
    }

    #[test]
    fn test_request_accepts_supplied_data() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{
                "gu": "용산구",
                "dong": "한남동",
                "item": "카페",
                "population": {"DONG_ID": "11030510", "RIDE_PASGR_NUM": "3000", "ALIGHT_PASGR_NUM": "2500"},
                "estate": [{"dealAmount": "100000", "dealYear": 2026, "dealMonth": 7, "dealDay": 1, "buildingType": "상가"}]
            }"#,
        )
        .unwrap();
        assert_eq!(request.estate.len(), 1);
        assert_eq!(
            request.population.unwrap().ride_passengers.as_deref(),
            Some("3000")
        );
    }
}
