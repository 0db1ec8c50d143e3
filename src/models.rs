use serde::{Deserialize, Serialize};

/// Closed set of query intents. A message maps to one or more of these,
/// ordered by detection-rule sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductIdLookup,
    Warranty,
    Offer,
    ProductSearch,
    Comparison,
    Pricing,
    Availability,
    General,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::ProductIdLookup => "product_id_lookup",
            Intent::Warranty => "warranty",
            Intent::Offer => "offer",
            Intent::ProductSearch => "product_search",
            Intent::Comparison => "comparison",
            Intent::Pricing => "pricing",
            Intent::Availability => "availability",
            Intent::General => "general",
        }
    }
}

/// Signals extracted alongside intents, used to pick a retrieval strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
    pub product_id: Option<i64>,
    pub is_specific_model: bool,
    pub has_brand: bool,
    pub has_category: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub description: Option<String>,
    pub specs: serde_json::Value,
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub product_id: i64,
    pub discount_percentage: f64,
    pub coupon_code: String,
    pub valid_till: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warranty {
    pub id: i64,
    pub product_id: i64,
    pub warranty_period: String,
    pub claim_process: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub query: String,
    pub response: String,
    pub created_at: String,
}

/// Intent-shaped view of the retrieved records, handed to the language model.
/// Keys are conditionally present; serde drops the absent ones so the rendered
/// prompt only carries what the assembler actually produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredFacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(rename = "_product_context", skip_serializing_if = "Option::is_none")]
    pub product_context: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty: Option<Vec<Warranty>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers: Option<Vec<Offer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub user_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub reply: String,
    pub facts: StructuredFacts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub price: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub specs: serde_json::Value,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOffer {
    pub product_id: i64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub coupon_code: String,
    pub valid_till: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWarranty {
    pub product_id: i64,
    pub warranty_period: String,
    pub claim_process: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub current_page: i64,
    pub per_page: i64,
}
