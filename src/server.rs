use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::db::Database;
use crate::models::{
    ChatRecord, ChatTurnRequest, ChatTurnResponse, NewOffer, NewProduct, Offer,
    Product, ProductPage, Warranty,
};

#[derive(Clone)]
struct AppState {
    db: Database,
    chat: ChatService,
}

pub async fn run_server(config: AppConfig, db: Database, chat: ChatService) -> Result<()> {
    let state = AppState { db, chat };

    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/products", get(list_products).post(add_product))
        .route("/api/products/:product_id", get(get_product))
        .route("/api/offers", get(list_offers).post(add_offer))
        .route("/api/warranty", get(list_warranties))
        .route("/api/warranty/:product_id", get(get_warranty))
        .route(
            "/api/history/:user_id",
            get(get_history).delete(clear_history),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required".to_string()));
    }

    let response = state.chat.answer(request).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<i64>,
    per_page: Option<i64>,
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductPage>, ApiError> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(20);
    let products = state.db.list_products(page, per_page).await?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    match state.db.find_product(product_id).await? {
        Some(product) => Ok(Json(product)),
        None => Err(ApiError::not_found(format!(
            "product not found: {}",
            product_id
        ))),
    }
}

async fn add_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.db.insert_product(&request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_offers(State(state): State<AppState>) -> Result<Json<Vec<Offer>>, ApiError> {
    let offers = state.db.list_offers().await?;
    Ok(Json(offers))
}

async fn add_offer(
    State(state): State<AppState>,
    Json(request): Json<NewOffer>,
) -> Result<(StatusCode, Json<Offer>), ApiError> {
    let offer = state.db.insert_offer(&request).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

async fn list_warranties(State(state): State<AppState>) -> Result<Json<Vec<Warranty>>, ApiError> {
    let warranties = state.db.list_warranties().await?;
    Ok(Json(warranties))
}

async fn get_warranty(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<Warranty>, ApiError> {
    match state.db.warranty_for_product(product_id).await? {
        Some(warranty) => Ok(Json(warranty)),
        None => Err(ApiError::not_found(format!(
            "no warranty found for product: {}",
            product_id
        ))),
    }
}

async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ChatRecord>>, ApiError> {
    let chats = state.db.recent_chats(user_id, 20).await?;
    Ok(Json(chats))
}

async fn clear_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.clear_chats(user_id).await?;
    Ok(Json(
        serde_json::json!({ "message": "chat history cleared" }),
    ))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
