//! Suitability scoring
//!
//! Combines three independent signals (pedestrian traffic, price level,
//! competitor density) into a three-tier verdict. Pure and deterministic;
//! a missing or unparseable input contributes a false signal, never an
//! error.

use crate::gateways::estate::EstateDeal;
use crate::gateways::population::PassengerRecord;
use serde::Serialize;

/// Pedestrian-traffic threshold: boarding + alighting per day
const TRAFFIC_THRESHOLD: i64 = 5000;

/// Mean deal-amount threshold (unit as supplied by the data source)
const PRICE_THRESHOLD: f64 = 120_000.0;

/// Competitor-count threshold
const COMPETITION_THRESHOLD: u64 = 10;

/// Verdict band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuitabilityBand {
    HighlySuitable,
    Acceptable,
    Unfavorable,
}

impl SuitabilityBand {
    /// User-facing verdict text
    pub fn label(&self) -> &'static str {
        match self {
            SuitabilityBand::HighlySuitable => "✅ 매우 적합한 입지예요! 👍",
            SuitabilityBand::Acceptable => "⚠️ 나쁘지는 않지만 경쟁을 고려하세요.",
            SuitabilityBand::Unfavorable => "❌ 다소 불리한 입지입니다.",
        }
    }
}

/// Scoring result: satisfied-signal count and its band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuitabilityVerdict {
    pub score: u8,
    pub band: SuitabilityBand,
}

impl SuitabilityVerdict {
    fn from_score(score: u8) -> Self {
        // Scores 0 and 1 share the unfavorable band.
        let band = match score {
            3 => SuitabilityBand::HighlySuitable,
            2 => SuitabilityBand::Acceptable,
            _ => SuitabilityBand::Unfavorable,
        };
        Self { score, band }
    }

    pub fn label(&self) -> &'static str {
        self.band.label()
    }
}

/// Traffic signal: boarding + alighting counts sum above the threshold
fn traffic_signal(population: Option<&PassengerRecord>) -> bool {
    let Some(record) = population else {
        return false;
    };

    let parse = |value: Option<&str>| value.unwrap_or("0").trim().parse::<i64>();

    match (
        parse(record.ride_passengers.as_deref()),
        parse(record.alight_passengers.as_deref()),
    ) {
        (Ok(ride), Ok(alight)) => ride + alight > TRAFFIC_THRESHOLD,
        _ => false,
    }
}

/// Price signal: mean of parseable deal amounts below the threshold
fn price_signal(deals: &[EstateDeal]) -> bool {
    let amounts: Vec<i64> = deals.iter().filter_map(|deal| deal.amount()).collect();

    if amounts.is_empty() {
        return false;
    }

    let mean = amounts.iter().sum::<i64>() as f64 / amounts.len() as f64;
    mean < PRICE_THRESHOLD
}

/// Competition signal: fewer similar businesses than the threshold
fn competition_signal(similar_count: u64) -> bool {
    similar_count < COMPETITION_THRESHOLD
}

/// Evaluate the three signals and map the count to a verdict
pub fn evaluate(
    population: Option<&PassengerRecord>,
    deals: &[EstateDeal],
    similar_count: u64,
) -> SuitabilityVerdict {
    let signals = [
        traffic_signal(population),
        price_signal(deals),
        competition_signal(similar_count),
    ];

    let score = signals.iter().filter(|&&s| s).count() as u8;
    SuitabilityVerdict::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(ride: &str, alight: &str) -> PassengerRecord {
        PassengerRecord {
            dong_id: "11030510".to_string(),
            total_passengers: None,
            ride_passengers: Some(ride.to_string()),
            alight_passengers: Some(alight.to_string()),
            extra: Default::default(),
        }
    }

    fn deal(amount: &str) -> EstateDeal {
        EstateDeal {
            deal_amount: amount.to_string(),
            deal_year: 2026,
            deal_month: 7,
            deal_day: 1,
            building_type: "오피스텔".to_string(),
        }
    }

    #[test]
    fn test_all_signals_true() {
        let pop = population("3000", "2500");
        let deals = vec![deal("100000")];
        let verdict = evaluate(Some(&pop), &deals, 5);
        assert_eq!(verdict.score, 3);
        assert_eq!(verdict.band, SuitabilityBand::HighlySuitable);
    }

    #[test]
    fn test_all_signals_false() {
        let verdict = evaluate(None, &[], 15);
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.band, SuitabilityBand::Unfavorable);
    }

    #[test]
    fn test_score_one_shares_unfavorable_band() {
        // Only the competition signal fires.
        let verdict = evaluate(None, &[], 5);
        assert_eq!(verdict.score, 1);
        assert_eq!(verdict.band, SuitabilityBand::Unfavorable);
    }

    #[test]
    fn test_score_two_is_acceptable() {
        let pop = population("4000", "2000");
        let verdict = evaluate(Some(&pop), &[], 5);
        assert_eq!(verdict.score, 2);
        assert_eq!(verdict.band, SuitabilityBand::Acceptable);
    }

    #[test]
    fn test_traffic_exactly_at_threshold_is_false() {
        let pop = population("2500", "2500");
        let verdict = evaluate(Some(&pop), &[], 15);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_malformed_counts_never_raise() {
        let pop = population("많음", "2500");
        let verdict = evaluate(Some(&pop), &[], 15);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_missing_counts_default_to_zero() {
        let pop = PassengerRecord {
            dong_id: "11030510".to_string(),
            total_passengers: None,
            ride_passengers: None,
            alight_passengers: None,
            extra: Default::default(),
        };
        // 0 + 0 is below the threshold, not an error.
        let verdict = evaluate(Some(&pop), &[], 15);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_unavailable_amounts_excluded_from_mean() {
        let deals = vec![deal("N/A"), deal("100,000"), deal("110,000")];
        let verdict = evaluate(None, &deals, 15);
        // Mean of 100000 and 110000 is under the threshold.
        assert_eq!(verdict.score, 1);
    }

    #[test]
    fn test_only_unavailable_amounts_is_false() {
        let deals = vec![deal("N/A"), deal("N/A")];
        let verdict = evaluate(None, &deals, 15);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_expensive_mean_is_false() {
        let deals = vec![deal("200,000"), deal("300,000")];
        let verdict = evaluate(None, &deals, 15);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_determinism() {
        let pop = population("3000", "2500");
        let deals = vec![deal("100000")];
        let first = evaluate(Some(&pop), &deals, 5);
        let second = evaluate(Some(&pop), &deals, 5);
        assert_eq!(first, second);
    }
}
