use crate::models::QueryContext;

/// Filler words dropped before a precise model-number match.
const MODEL_FILLER_WORDS: &[&str] = &["model", "tell", "about", "me", "info", "information"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every keyword must match at least one field (conjunction).
    All,
    /// Any keyword matching any field is enough (disjunction).
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Name,
    Category,
    Description,
}

impl ProductField {
    pub fn column(self) -> &'static str {
        match self {
            ProductField::Name => "name",
            ProductField::Category => "category",
            ProductField::Description => "description",
        }
    }
}

/// Retrieval spec the fact assembler hands to the store: which keywords to
/// match, against which fields, how, and how many rows to take. An empty
/// keyword list means "no filter".
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub keywords: Vec<String>,
    pub fields: Vec<ProductField>,
    pub mode: MatchMode,
    pub limit: i64,
    /// Set by the assembler when a warranty duration phrase was detected;
    /// the store narrows via a join on the warranty period.
    pub warranty_period: Option<String>,
}

impl ProductQuery {
    fn unfiltered(limit: i64) -> Self {
        Self {
            keywords: vec![],
            fields: vec![],
            mode: MatchMode::Any,
            limit,
            warranty_period: None,
        }
    }
}

/// Pick a retrieval strategy from the extracted keywords and context.
/// First matching branch wins; matching is case-insensitive substring
/// containment per keyword per field.
pub fn build_product_query(keywords: &[String], context: &QueryContext) -> ProductQuery {
    if keywords.is_empty() {
        return ProductQuery::unfiltered(5);
    }

    // Precise model queries: AND-match the distinctive tokens on name only.
    if context.is_specific_model {
        let model_keywords: Vec<String> = keywords
            .iter()
            .filter(|kw| !MODEL_FILLER_WORDS.contains(&kw.as_str()))
            .cloned()
            .collect();
        if !model_keywords.is_empty() {
            return ProductQuery {
                keywords: model_keywords,
                fields: vec![ProductField::Name],
                mode: MatchMode::All,
                limit: 3,
                warranty_period: None,
            };
        }
        // All filler: fall through to the broader strategies.
    }

    if context.has_brand && context.has_category {
        return ProductQuery {
            keywords: keywords.to_vec(),
            fields: vec![ProductField::Name, ProductField::Category],
            mode: MatchMode::Any,
            limit: 5,
            warranty_period: None,
        };
    }

    ProductQuery {
        keywords: keywords.to_vec(),
        fields: vec![
            ProductField::Name,
            ProductField::Category,
            ProductField::Description,
        ],
        mode: MatchMode::Any,
        limit: 8,
        warranty_period: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn empty_keywords_take_first_five_unfiltered() {
        let query = build_product_query(&[], &QueryContext::default());
        assert!(query.keywords.is_empty());
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn specific_model_uses_conjunctive_name_match() {
        let context = QueryContext {
            is_specific_model: true,
            has_brand: true,
            has_category: true,
            ..Default::default()
        };
        let query = build_product_query(&kw(&["tell", "about", "bose", "model", "qc45"]), &context);
        assert_eq!(query.keywords, kw(&["bose", "qc45"]));
        assert_eq!(query.fields, vec![ProductField::Name]);
        assert_eq!(query.mode, MatchMode::All);
        assert_eq!(query.limit, 3);
    }

    #[test]
    fn all_filler_model_query_falls_through() {
        let context = QueryContext {
            is_specific_model: true,
            ..Default::default()
        };
        let query = build_product_query(&kw(&["tell", "model", "info"]), &context);
        assert_eq!(query.mode, MatchMode::Any);
        assert_eq!(query.limit, 8);
        assert_eq!(query.fields.len(), 3);
    }

    #[test]
    fn brand_plus_category_matches_name_or_category() {
        let context = QueryContext {
            has_brand: true,
            has_category: true,
            ..Default::default()
        };
        let query = build_product_query(&kw(&["bose", "headphones"]), &context);
        assert_eq!(query.mode, MatchMode::Any);
        assert_eq!(
            query.fields,
            vec![ProductField::Name, ProductField::Category]
        );
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn general_search_spans_all_fields_limit_eight() {
        let context = QueryContext {
            has_brand: true,
            ..Default::default()
        };
        let query = build_product_query(&kw(&["bose", "speakers"]), &context);
        assert_eq!(query.mode, MatchMode::Any);
        assert_eq!(query.fields.len(), 3);
        assert_eq!(query.limit, 8);
    }
}
