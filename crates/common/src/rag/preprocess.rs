//! Query rewriting for retrieval
//!
//! Deterministic text transform, no model call. The rewritten text is used
//! only as the retrieval query; the original question is what reaches the
//! chat model.

use regex_lite::Regex;

/// Domain keywords that get emphasized before keyword extraction
const EMPHASIS_KEYWORDS: &[&str] = &[
    "상권",
    "입지",
    "분석",
    "업종",
    "추천",
    "창업",
    "유동인구",
    "시간대",
    "연령대",
    "혼잡도",
];

/// Append an emphasis phrase for each domain keyword present in the question
fn emphasize_keywords(question: &str) -> String {
    let mut emphasized = question.to_string();
    for kw in EMPHASIS_KEYWORDS {
        if question.contains(kw) {
            emphasized.push_str(&format!(" {kw} 관련 정보 {kw} 분석"));
        }
    }
    emphasized
}

/// Extract maximal runs of Hangul word characters longer than one character
/// and join them with single spaces
fn extract_keywords(text: &str) -> String {
    let hangul_run = Regex::new(r"[가-힣]+").unwrap();
    hangul_run
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|run| run.chars().count() > 1)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the first neighborhood name (a Hangul run ending in 동) in the question
fn find_dong_name(question: &str) -> Option<&str> {
    let dong = Regex::new(r"([가-힣]+동)").unwrap();
    dong.captures(question)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rewrite a question into its search-oriented form
pub fn rewrite_for_search(question: &str) -> String {
    let emphasized = emphasize_keywords(question);
    let keywords = extract_keywords(&emphasized);

    if let Some(dong_name) = find_dong_name(question) {
        return format!(
            "\n'{dong_name}' 지역에 대해 유동인구, 업종, 상권, 창업, 시간대 분석과 관련된 문서를 찾고자 합니다.\n핵심 키워드: {keywords}\n원 질문: {question}\n"
        );
    }

    format!("{keywords}\n\n원 질문: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_extraction_drops_single_syllables() {
        assert_eq!(extract_keywords("이 카페 와 상권"), "카페 상권");
    }

    #[test]
    fn test_keyword_extraction_ignores_non_hangul() {
        assert_eq!(extract_keywords("hello 상권 분석 123"), "상권 분석");
    }

    #[test]
    fn test_emphasis_appends_for_present_keywords() {
        let emphasized = emphasize_keywords("상권 어때요");
        assert!(emphasized.contains("상권 관련 정보 상권 분석"));
        assert!(!emphasized.contains("입지 관련 정보"));
    }

    #[test]
    fn test_dong_question_uses_template() {
        let rewritten = rewrite_for_search("한남동 카페 창업 어때요?");
        assert!(rewritten.contains("'한남동' 지역에 대해"));
        assert!(rewritten.contains("핵심 키워드:"));
        assert!(rewritten.contains("원 질문: 한남동 카페 창업 어때요?"));
    }

    #[test]
    fn test_non_dong_question_concatenates() {
        let rewritten = rewrite_for_search("카페 창업 어때요?");
        assert!(!rewritten.contains("지역에 대해"));
        assert!(rewritten.starts_with("카페 창업 어때요"));
        assert!(rewritten.contains("\n\n원 질문: 카페 창업 어때요?"));
    }

    #[test]
    fn test_first_dong_name_wins() {
        assert_eq!(find_dong_name("성수동 말고 한남동"), Some("성수동"));
        assert_eq!(find_dong_name("강남역 근처"), None);
    }
}
