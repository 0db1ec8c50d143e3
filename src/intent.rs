use regex::Regex;

use crate::models::{Intent, QueryContext};

const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "is", "are", "was", "were", "a", "an", "and", "or", "but", "in", "on", "at", "to",
    "for", "of", "with", "by", "what", "how", "where", "when", "why", "there", "here", "this",
    "that", "these", "those",
];

const WARRANTY_TERMS: &[&str] = &["warranty", "claim", "guarantee", "repair", "replace"];
const OFFER_TERMS: &[&str] = &["offer", "discount", "coupon", "deal", "sale", "promo"];
const SEARCH_TERMS: &[&str] = &[
    "find", "search", "looking", "want", "need", "show", "tell", "about", "info",
];
const COMPARISON_TERMS: &[&str] = &["compare", "vs", "versus", "difference", "better"];
const PRICING_TERMS: &[&str] = &["price", "cost", "expensive", "cheap", "budget"];
const AVAILABILITY_TERMS: &[&str] = &["stock", "available", "inventory", "in stock"];

const BRANDS: &[&str] = &[
    "bose",
    "apple",
    "samsung",
    "lenovo",
    "hp",
    "asus",
    "oneplus",
    "xiaomi",
    "jbl",
    "sennheiser",
    "garmin",
    "fitbit",
];
const CATEGORIES: &[&str] = &["laptop", "smartphone", "headphones", "smartwatch"];

/// Extract meaningful search terms from a message: lowercase whitespace
/// tokens longer than two characters that are not stopwords. First-occurrence
/// order is kept and duplicates are retained; punctuation stays attached to
/// its token.
pub fn extract_keywords(message: &str) -> Vec<String> {
    extract_keywords_with(message, DEFAULT_STOPWORDS)
}

pub fn extract_keywords_with(message: &str, stopwords: &[&str]) -> Vec<String> {
    message
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() > 2 && !stopwords.contains(word))
        .map(str::to_string)
        .collect()
}

/// Map a message to its intent set plus retrieval context. Rules are additive
/// and evaluated in a fixed order; matching is substring containment on the
/// lowered message, so "offering" matches "offer".
pub fn classify(message: &str) -> (Vec<Intent>, QueryContext) {
    let msg_lower = message.to_lowercase();

    let mut intents = Vec::new();
    let mut context = QueryContext::default();

    if msg_lower.contains("product id") || msg_lower.contains("product-id") {
        intents.push(Intent::ProductIdLookup);
        context.product_id = extract_product_id(&msg_lower);
    }

    if contains_any(&msg_lower, WARRANTY_TERMS) {
        intents.push(Intent::Warranty);
    }
    if contains_any(&msg_lower, OFFER_TERMS) {
        intents.push(Intent::Offer);
    }
    if contains_any(&msg_lower, SEARCH_TERMS) {
        intents.push(Intent::ProductSearch);
    }
    if contains_any(&msg_lower, COMPARISON_TERMS) {
        intents.push(Intent::Comparison);
    }
    if contains_any(&msg_lower, PRICING_TERMS) {
        intents.push(Intent::Pricing);
    }
    if contains_any(&msg_lower, AVAILABILITY_TERMS) {
        intents.push(Intent::Availability);
    }

    // Bare product mentions still count as a search.
    if intents.is_empty()
        && (contains_any(&msg_lower, BRANDS)
            || contains_any(&msg_lower, CATEGORIES)
            || msg_lower.contains("model"))
    {
        intents.push(Intent::ProductSearch);
    }

    if intents.is_empty() {
        intents.push(Intent::General);
    }

    // Digit check runs on the original-case message.
    context.is_specific_model =
        msg_lower.contains("model") && message.chars().any(|c| c.is_ascii_digit());
    context.has_brand = contains_any(&msg_lower, BRANDS);
    context.has_category = contains_any(&msg_lower, CATEGORIES);

    (intents, context)
}

fn contains_any(msg_lower: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| msg_lower.contains(term))
}

fn extract_product_id(msg_lower: &str) -> Option<i64> {
    let re = Regex::new(r"product.?id.?(\d+)").unwrap_or_else(|_| Regex::new("^$").unwrap());
    re.captures(msg_lower)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopword_only_message_yields_no_keywords() {
        let keywords = extract_keywords("what is the and or but");
        assert!(keywords.is_empty());
    }

    #[test]
    fn keywords_keep_order_and_duplicates() {
        let keywords = extract_keywords("Bose headphones bose speakers");
        assert_eq!(keywords, vec!["bose", "headphones", "bose", "speakers"]);
    }

    #[test]
    fn trailing_punctuation_stays_attached() {
        let keywords = extract_keywords("any laptops?");
        assert_eq!(keywords, vec!["any", "laptops?"]);
    }

    #[test]
    fn every_message_gets_an_intent() {
        for msg in ["", "hello", "asdf qwer", "Tell me about Bose"] {
            let (intents, _) = classify(msg);
            assert!(!intents.is_empty(), "no intent for {msg:?}");
        }
    }

    #[test]
    fn unmatched_message_defaults_to_general() {
        let (intents, _) = classify("hello");
        assert_eq!(intents, vec![Intent::General]);
    }

    #[test]
    fn product_indicator_defaults_to_search() {
        let (intents, _) = classify("bose qc45");
        assert_eq!(intents, vec![Intent::ProductSearch]);
    }

    #[test]
    fn warranty_on_product_id_extracts_both() {
        let (intents, context) = classify("What's the warranty on product id 42?");
        assert!(intents.contains(&Intent::Warranty));
        assert!(intents.contains(&Intent::ProductIdLookup));
        assert_eq!(context.product_id, Some(42));
    }

    #[test]
    fn product_id_capture_uses_first_match_only() {
        let (_, context) = classify("product id 7 or product id 9?");
        assert_eq!(context.product_id, Some(7));
    }

    #[test]
    fn specific_model_needs_a_digit_somewhere() {
        let (_, with_digit) = classify("Tell me about Bose headphones model QC45");
        assert!(with_digit.is_specific_model);
        assert!(with_digit.has_brand);
        assert!(with_digit.has_category);

        let (_, without_digit) = classify("Tell me about this model");
        assert!(!without_digit.is_specific_model);
    }

    #[test]
    fn substring_matching_is_intentionally_naive() {
        // "offering" contains "offer"; preserved false positive.
        let (intents, _) = classify("what are you offering");
        assert!(intents.contains(&Intent::Offer));
    }

    #[test]
    fn classification_is_case_insensitive() {
        let (upper_intents, upper_ctx) = classify("BOSE HEADPHONES");
        let (lower_intents, lower_ctx) = classify("bose headphones");
        assert_eq!(upper_intents, lower_intents);
        assert_eq!(upper_ctx.has_brand, lower_ctx.has_brand);
        assert_eq!(
            extract_keywords("BOSE HEADPHONES"),
            extract_keywords("bose headphones")
        );
    }

    #[test]
    fn classify_and_extract_are_pure() {
        let msg = "Any discount on Samsung smartphones?";
        assert_eq!(classify(msg), classify(msg));
        assert_eq!(extract_keywords(msg), extract_keywords(msg));
    }

    #[test]
    fn multi_intent_order_follows_rule_sequence() {
        let (intents, _) = classify("compare warranty and price for laptops, show me");
        let positions: Vec<usize> = [Intent::Warranty, Intent::ProductSearch, Intent::Comparison]
            .iter()
            .map(|intent| intents.iter().position(|i| i == intent).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
