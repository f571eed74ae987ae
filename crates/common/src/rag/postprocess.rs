//! Answer post-processing
//!
//! One narrow cosmetic normalization: the model occasionally emits
//! time-of-day ranges as a four-digit run before the hour marker
//! ("1415시"); rewrite those to the range form ("14~15시").

use regex_lite::Regex;

/// Rewrite "HHMM시" digit pairs into "HH~HH시" ranges
pub fn normalize_time_ranges(text: &str) -> String {
    let pattern = Regex::new(r"(\d{2})(\d{2})시").unwrap();
    pattern.replace_all(text, "$1~$2시").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_time_range() {
        assert_eq!(normalize_time_ranges("1415시"), "14~15시");
        assert_eq!(
            normalize_time_ranges("피크는 1821시 입니다"),
            "피크는 18~21시 입니다"
        );
    }

    #[test]
    fn test_unrelated_text_unchanged() {
        assert_eq!(normalize_time_ranges("14시에 만나요"), "14시에 만나요");
        assert_eq!(normalize_time_ranges("유동인구 5000명"), "유동인구 5000명");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_time_ranges("1415시");
        let twice = normalize_time_ranges(&once);
        assert_eq!(once, twice);
    }
}
