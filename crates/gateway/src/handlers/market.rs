//! Data and composite-report handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use sangkwon_common::{
    analysis::MarketReport,
    errors::{AppError, Result},
    gateways::places::SimilarBusiness,
    metrics::RequestMetrics,
};

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub gu: Option<String>,
    pub dong: Option<String>,
    pub business_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AreaParams {
    pub gu: Option<String>,
    pub dong: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarketParams {
    pub gu: Option<String>,
    pub dong: Option<String>,
    pub item: Option<String>,
}

fn require<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation {
            message: message.to_string(),
            field: None,
        })
}

/// Estimate competing businesses around a neighborhood
pub async fn similar_business_info(
    State(state): State<AppState>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<SimilarBusiness>> {
    const MESSAGE: &str = "gu, dong, and business_type parameters are required.";
    let gu = require(&params.gu, MESSAGE)?;
    let dong = require(&params.dong, MESSAGE)?;
    let business_type = require(&params.business_type, MESSAGE)?;

    let similar = state.places.similar_business(gu, dong, business_type).await;
    Ok(Json(similar))
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub recommendation: String,
}

/// Recommend promising business types for a neighborhood
pub async fn recommend_business(
    State(state): State<AppState>,
    Query(params): Query<AreaParams>,
) -> Result<Json<RecommendResponse>> {
    const MESSAGE: &str = "gu and dong parameters are required.";
    let gu = require(&params.gu, MESSAGE)?;
    let dong = require(&params.dong, MESSAGE)?;

    let (population, estate) = tokio::join!(
        state.population.record_by_dong(gu, dong),
        state.estate.deals_by_dong(gu, dong),
    );

    let recommendation = state
        .analyzer
        .recommend_business(gu, dong, population.as_ref(), &estate)
        .await?;

    Ok(Json(RecommendResponse { recommendation }))
}

#[derive(Serialize)]
pub struct LocationAnalysisResponse {
    pub location_analysis: String,
}

/// Assess a business type's viability in a neighborhood
pub async fn location_analysis(
    State(state): State<AppState>,
    Query(params): Query<MarketParams>,
) -> Result<Json<LocationAnalysisResponse>> {
    const MESSAGE: &str = "gu, dong, and item parameters are required.";
    let gu = require(&params.gu, MESSAGE)?;
    let dong = require(&params.dong, MESSAGE)?;
    let item = require(&params.item, MESSAGE)?;

    let (population, estate, similar) = tokio::join!(
        state.population.record_by_dong(gu, dong),
        state.estate.deals_by_dong(gu, dong),
        state.places.similar_business(gu, dong, item),
    );

    let location_analysis = state
        .analyzer
        .location_analysis(gu, dong, item, population.as_ref(), &estate, &similar.description)
        .await?;

    Ok(Json(LocationAnalysisResponse { location_analysis }))
}

/// Build the full composite market report
pub async fn analyze_market(
    State(state): State<AppState>,
    Query(params): Query<MarketParams>,
) -> Result<Json<MarketReport>> {
    const MESSAGE: &str = "gu, dong, and item parameters are required.";
    let gu = require(&params.gu, MESSAGE)?;
    let dong = require(&params.dong, MESSAGE)?;
    let item = require(&params.item, MESSAGE)?;

    let tracker = RequestMetrics::start("GET", "/analyze_market");
    let report = state.analyzer.analyze_market(gu, dong, item).await?;
    tracker.finish(200);

    Ok(Json(report))
}

#[derive(Serialize)]
pub struct GeocodeResponse {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Resolve a neighborhood to map coordinates
///
/// Unresolvable addresses yield null coordinates, not an error.
pub async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<AreaParams>,
) -> Result<Json<GeocodeResponse>> {
    const MESSAGE: &str = "gu and dong parameters are required.";
    let gu = require(&params.gu, MESSAGE)?;
    let dong = require(&params.dong, MESSAGE)?;

    let coordinates = state.places.coordinates(gu, dong).await;

    Ok(Json(GeocodeResponse {
        lat: coordinates.map(|c| c.lat),
        lng: coordinates.map(|c| c.lng),
    }))
}
