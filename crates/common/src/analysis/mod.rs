//! Analysis orchestration
//!
//! Sequences the data gateways, the suitability scorer, and the query
//! resolution engine into the composite market report. The three data
//! lookups are independent and run concurrently; the two model-backed
//! analyses run after them.

use crate::errors::Result;
use crate::gateways::estate::{EstateDeal, EstateGateway};
use crate::gateways::places::{PlacesGateway, SimilarBusiness};
use crate::gateways::population::{PassengerRecord, PopulationGateway};
use crate::metrics;
use crate::rag::QueryEngine;
use crate::scoring;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The composite market report
#[derive(Debug, Clone, Serialize)]
pub struct MarketReport {
    pub gu: String,
    pub dong: String,
    pub item: String,
    pub population: Option<PassengerRecord>,
    pub estate: Vec<EstateDeal>,
    pub similar: SimilarBusiness,
    pub score: String,
    pub recommendation: String,
    pub location_analysis: String,
}

/// Result of an analysis over caller-supplied data
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub score: String,
    pub recommendation: String,
    pub location_analysis: String,
    pub similar: SimilarBusiness,
}

fn population_display(population: Option<&PassengerRecord>) -> String {
    population
        .map(|record| record.total_display().to_string())
        .unwrap_or_else(|| "정보 없음".to_string())
}

/// Context paragraph for the business-type recommendation
fn recommendation_context(
    gu: &str,
    dong: &str,
    population: Option<&PassengerRecord>,
    deal_count: usize,
) -> String {
    let pop = population_display(population);
    format!(
        "\n'{gu} {dong}' 지역은 상업 및 주거 기능이 복합된 지역으로 파악됩니다. 해당 지역의 유동인구는 약 {pop}명이며,\n최근 부동산 거래는 {deal_count}건 발생했습니다. 유동인구가 꾸준하고 상업 활동이 활발한 지역에서는 카페, 음식점, 편의점, 미용실 등\n생활 밀착형 업종이 안정적으로 운영될 가능성이 높습니다.\n\n또한 경쟁 업체 수, 임대료 수준, 상권 접근성, 고객 선호도 등의 요소를 종합적으로 고려하여 업종을 선택하는 것이 중요합니다.\n"
    )
}

/// Context paragraph for the location analysis
fn location_context(
    gu: &str,
    dong: &str,
    item: &str,
    population: Option<&PassengerRecord>,
    deal_count: usize,
    similar_desc: &str,
) -> String {
    let pop = population_display(population);
    format!(
        "\n서울시 {gu} {dong} 지역에서 '{item}' 업종의 입지 분석을 요청하였습니다.\n- 유동인구: {pop}명\n- 부동산 거래 건수: {deal_count}건\n- 유사 업종 정보: {similar_desc}\n\n이 정보를 바탕으로 '{item}' 업종이 이 지역에서 창업하기에 적합한지 구체적으로 평가해주세요.\n"
    )
}

/// The analysis orchestrator
pub struct MarketAnalyzer {
    engine: Arc<QueryEngine>,
    estate: Arc<EstateGateway>,
    population: Arc<PopulationGateway>,
    places: Arc<PlacesGateway>,
}

impl MarketAnalyzer {
    pub fn new(
        engine: Arc<QueryEngine>,
        estate: Arc<EstateGateway>,
        population: Arc<PopulationGateway>,
        places: Arc<PlacesGateway>,
    ) -> Self {
        Self {
            engine,
            estate,
            population,
            places,
        }
    }

    /// Recommend promising business types for a neighborhood
    ///
    /// This analysis always uses direct inference; the context paragraph
    /// is supplied for the engine's fallback path.
    pub async fn recommend_business(
        &self,
        gu: &str,
        dong: &str,
        population: Option<&PassengerRecord>,
        estate: &[EstateDeal],
    ) -> Result<String> {
        let fallback = recommendation_context(gu, dong, population, estate.len());
        let question = format!(
            "{gu} {dong} 지역의 상권 데이터를 바탕으로 유망한 창업 업종을 추천하고, 그 이유를 구체적으로 설명해주세요."
        );

        let envelope = self.engine.ask(&question, &fallback, true).await?;
        Ok(envelope.render())
    }

    /// Assess how suitable a neighborhood is for a given business type
    pub async fn location_analysis(
        &self,
        gu: &str,
        dong: &str,
        item: &str,
        population: Option<&PassengerRecord>,
        estate: &[EstateDeal],
        similar_desc: &str,
    ) -> Result<String> {
        let fallback = location_context(gu, dong, item, population, estate.len(), similar_desc);
        let question = format!("{gu} {dong} 지역에서 '{item}' 업종의 창업 가능성을 분석해주세요.");

        let envelope = self.engine.ask(&question, &fallback, true).await?;
        Ok(envelope.render())
    }

    /// Analyze with caller-supplied population and estate data
    pub async fn analyze_supplied(
        &self,
        gu: &str,
        dong: &str,
        item: &str,
        population: Option<&PassengerRecord>,
        estate: &[EstateDeal],
    ) -> Result<AnalysisOutcome> {
        let similar = self.places.similar_business(gu, dong, item).await;
        let verdict = scoring::evaluate(population, estate, similar.count);

        let recommendation = self.recommend_business(gu, dong, population, estate).await?;
        let location_analysis = self
            .location_analysis(gu, dong, item, population, estate, &similar.description)
            .await?;

        Ok(AnalysisOutcome {
            score: verdict.label().to_string(),
            recommendation,
            location_analysis,
            similar,
        })
    }

    /// Build the full composite report, fetching all data
    pub async fn analyze_market(&self, gu: &str, dong: &str, item: &str) -> Result<MarketReport> {
        let start = Instant::now();

        // The three lookups are independent; fan them out.
        let (estate, population, similar) = tokio::join!(
            self.estate.deals_by_dong(gu, dong),
            self.population.record_by_dong(gu, dong),
            self.places.similar_business(gu, dong, item),
        );

        let verdict = scoring::evaluate(population.as_ref(), &estate, similar.count);

        let recommendation = self
            .recommend_business(gu, dong, population.as_ref(), &estate)
            .await?;
        let location_analysis = self
            .location_analysis(gu, dong, item, population.as_ref(), &estate, &similar.description)
            .await?;

        metrics::record_market_analysis(start.elapsed().as_secs_f64());
        info!(
            gu,
            dong,
            item,
            deals = estate.len(),
            similar = similar.count,
            score = verdict.score,
            latency_ms = start.elapsed().as_millis() as u64,
            "Market analysis completed"
        );

        Ok(MarketReport {
            gu: gu.to_string(),
            dong: dong.to_string(),
            item: item.to_string(),
            population,
            estate,
            similar,
            score: verdict.label().to_string(),
            recommendation,
            location_analysis,
        })
    }
}
