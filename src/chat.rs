use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::db::Database;
use crate::gemini::GeminiClient;
use crate::intent::{classify, extract_keywords};
use crate::models::{ChatTurnRequest, ChatTurnResponse, Intent, QueryContext, StructuredFacts};
use crate::query::build_product_query;

const FALLBACK_REPLY: &str = "Sorry, I couldn't contact the AI service right now.";

/// Most products a comparison answer should cover.
const COMPARISON_LIMIT: usize = 4;

#[derive(Clone)]
pub struct ChatService {
    config: AppConfig,
    db: Database,
    gemini: GeminiClient,
    generation_limit: Arc<Semaphore>,
}

impl ChatService {
    pub fn new(
        config: AppConfig,
        db: Database,
        gemini: GeminiClient,
        generation_limit: Arc<Semaphore>,
    ) -> Self {
        Self {
            config,
            db,
            gemini,
            generation_limit,
        }
    }

    /// Run one chat turn: classify, gather facts, ask the model, persist.
    /// An unreachable model never fails the turn; the customer gets a fixed
    /// apology and the exchange is still recorded.
    pub async fn answer(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse> {
        let (intents, context) = classify(&request.message);
        let facts = self
            .gather_facts(&request.message, &intents, &context)
            .await?;

        let prompt = build_sales_prompt(&intents, &facts, &request.message);

        let _permit = self.generation_limit.acquire().await?;
        let reply = match self.gemini.generate(&self.config.gemini_model, &prompt).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("llm generation failed: {err}");
                FALLBACK_REPLY.to_string()
            }
        };

        self.db
            .save_chat(request.user_id, &request.message, &reply)
            .await?;

        Ok(ChatTurnResponse { reply, facts })
    }

    /// Assemble the intent-shaped facts for a message. Steps run in a fixed
    /// order and later steps see earlier results; store failures propagate.
    pub async fn gather_facts(
        &self,
        message: &str,
        intents: &[Intent],
        context: &QueryContext,
    ) -> Result<StructuredFacts> {
        let mut facts = StructuredFacts::default();
        let mut products = Vec::new();

        if let Some(product_id) = context
            .product_id
            .filter(|_| intents.contains(&Intent::ProductIdLookup))
        {
            match self.db.find_product(product_id).await? {
                Some(product) => {
                    facts.products = Some(vec![product.clone()]);
                    products.push(product);
                }
                None => {
                    facts.error = Some(format!("Product ID {product_id} not found"));
                }
            }
        } else if intents.contains(&Intent::ProductSearch) || intents.contains(&Intent::General) {
            let keywords = extract_keywords(message);
            let mut query = build_product_query(&keywords, context);
            if intents.contains(&Intent::Warranty) {
                query.warranty_period = detect_warranty_period(message).map(str::to_string);
            }

            products = self.db.search_products(&query).await?;

            if intents.len() == 1 && intents[0] == Intent::ProductSearch {
                facts.products = Some(products.clone());
            } else if !products.is_empty() {
                // Mixed intents: products inform the answer without becoming
                // a top-level result list.
                facts.product_context = Some(products.clone());
            }
        }

        if intents.contains(&Intent::Warranty) {
            facts.warranty = Some(if products.is_empty() {
                self.db.sample_warranties(5).await?
            } else {
                let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
                self.db.warranties_for_products(&ids).await?
            });
        }

        if intents.contains(&Intent::Offer) {
            if products.is_empty() {
                let offers = self.db.sample_offers(5).await?;
                let offer_product_ids: Vec<i64> =
                    offers.iter().map(|offer| offer.product_id).collect();
                facts.offer_products = Some(self.db.products_by_ids(&offer_product_ids).await?);
                facts.offers = Some(offers);
            } else {
                let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
                facts.offers = Some(self.db.offers_for_products(&ids).await?);
                facts.offer_products = Some(products.clone());
            }
        }

        // Pricing and availability add no facts of their own; the product
        // records already carry price and stock, the intents only steer
        // the prompt.

        if intents.contains(&Intent::Comparison) && products.len() > COMPARISON_LIMIT {
            products.truncate(COMPARISON_LIMIT);
            truncate_for_comparison(&mut facts);
        }

        Ok(facts)
    }
}

/// Trim the product lists to a comparable handful. Offers and warranties
/// fetched earlier are left untouched.
fn truncate_for_comparison(facts: &mut StructuredFacts) {
    if let Some(list) = facts.products.as_mut() {
        list.truncate(COMPARISON_LIMIT);
    }
    if let Some(list) = facts.product_context.as_mut() {
        list.truncate(COMPARISON_LIMIT);
    }
}

/// First warranty duration phrase found in the message, longest period first.
fn detect_warranty_period(message: &str) -> Option<&'static str> {
    let msg_lower = message.to_lowercase();
    if msg_lower.contains("2 year") || msg_lower.contains("2-year") {
        Some("2 year")
    } else if msg_lower.contains("1 year") || msg_lower.contains("1-year") {
        Some("1 year")
    } else if msg_lower.contains("6 month") || msg_lower.contains("6-month") {
        Some("6 month")
    } else {
        None
    }
}

/// Compose the instruction block for the model: active intents, the full
/// guideline text, the literal query, and the facts rendered as JSON.
/// Deterministic for a given input; any size limiting is the caller's concern.
pub fn build_sales_prompt(intents: &[Intent], facts: &StructuredFacts, message: &str) -> String {
    let intent_context = intents
        .iter()
        .map(|intent| intent.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let facts_json = serde_json::to_string(facts).unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are a professional sales assistant helping customers with {intent_context} queries.\n\
         \n\
         Guidelines:\n\
         - Use ONLY the provided structured facts\n\
         - Be helpful, concise, and sales-oriented\n\
         - For product searches: highlight key features, pricing, and availability\n\
         - For warranty queries: explain coverage and claim process clearly\n\
         - For offer queries: emphasize savings and validity periods, and ALWAYS mention the product name with the offer\n\
         - For product ID lookups: provide complete product information\n\
         - For comparisons: highlight differences and recommend based on needs\n\
         - For pricing: mention value proposition\n\
         - Always be customer-focused and solution-oriented\n\
         - When showing offers, always include the product name, not just the ID\n\
         \n\
         If no relevant data is found, politely explain and suggest alternatives.\n\
         \n\
         Customer Query: {message}\n\
         Available Data: {facts_json}"
    )
}

pub fn fallback_reply() -> &'static str {
    FALLBACK_REPLY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Offer, Product};

    fn product(id: i64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            category: Some("headphones".to_string()),
            price: 199.0,
            description: None,
            specs: serde_json::Value::Null,
            stock: 3,
        }
    }

    #[test]
    fn warranty_period_priority_is_two_one_six() {
        assert_eq!(
            detect_warranty_period("a 2-year or 1 year warranty"),
            Some("2 year")
        );
        assert_eq!(detect_warranty_period("1-year coverage"), Some("1 year"));
        assert_eq!(detect_warranty_period("just 6 month"), Some("6 month"));
        assert_eq!(detect_warranty_period("lifetime warranty"), None);
    }

    #[test]
    fn comparison_truncation_spares_offers() {
        let mut facts = StructuredFacts {
            products: Some((0..6).map(|i| product(i, "p")).collect()),
            product_context: Some((0..6).map(|i| product(i, "p")).collect()),
            offers: Some(vec![Offer {
                id: 1,
                product_id: 1,
                discount_percentage: 10.0,
                coupon_code: "SAVE10".to_string(),
                valid_till: None,
            }]),
            ..Default::default()
        };

        truncate_for_comparison(&mut facts);

        assert_eq!(facts.products.as_ref().map(Vec::len), Some(4));
        assert_eq!(facts.product_context.as_ref().map(Vec::len), Some(4));
        assert_eq!(facts.offers.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn prompt_names_intents_and_renders_facts() {
        let intents = vec![Intent::Offer, Intent::Pricing];
        let facts = StructuredFacts {
            products: Some(vec![product(7, "Bose QC45")]),
            ..Default::default()
        };

        let prompt = build_sales_prompt(&intents, &facts, "any deals on the QC45?");
        assert!(prompt.contains("offer, pricing queries"));
        assert!(prompt.contains("Customer Query: any deals on the QC45?"));
        assert!(prompt.contains("\"Bose QC45\""));
        assert!(prompt.contains("Use ONLY the provided structured facts"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let intents = vec![Intent::General];
        let facts = StructuredFacts::default();
        let first = build_sales_prompt(&intents, &facts, "hello");
        let second = build_sales_prompt(&intents, &facts, "hello");
        assert_eq!(first, second);
    }

    #[test]
    fn absent_fact_keys_are_not_serialized() {
        let facts = StructuredFacts {
            error: Some("Product ID 9 not found".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&facts).unwrap();
        assert_eq!(json, r#"{"error":"Product ID 9 not found"}"#);
    }

    #[test]
    fn product_context_serializes_with_underscore_name() {
        let facts = StructuredFacts {
            product_context: Some(vec![]),
            ..Default::default()
        };
        let json = serde_json::to_string(&facts).unwrap();
        assert!(json.contains("\"_product_context\""));
    }
}
