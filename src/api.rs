//! REST API Server for the Ledger Chat Assistant
//!
//! Exposes the chat orchestrator and the in-memory ledger via HTTP endpoints
//! Integrates with frontend UI

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::ChatOrchestrator;
use crate::error::ChatError;
use crate::ledger::InMemoryLedger;
use crate::models::TransactionRequest;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<usize>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiReply = (StatusCode, Json<ApiResponse>);

fn bad_request(message: String) -> ApiReply {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<ChatOrchestrator>,
    pub ledger: Arc<InMemoryLedger>,
    /// Default page size for `GET /api/transactions`
    pub max_transactions_in_list: usize,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoints
/// =============================

async fn post_chat(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiReply {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_request(format!("Invalid request body: {}", rejection)),
    };

    let Some(message) = req.message.filter(|m| !m.trim().is_empty()) else {
        return bad_request("Message is required".into());
    };

    info!(chars = message.len(), "Received chat message");
    let outcome = state.assistant.process_message(&message).await;

    (StatusCode::OK, Json(ApiResponse::success(outcome)))
}

async fn get_chat_history(State(state): State<ApiState>) -> ApiReply {
    let history = state.assistant.history().await;
    (StatusCode::OK, Json(ApiResponse::success(history)))
}

/// =============================
/// Ledger Endpoints
/// =============================

async fn get_transactions(
    State(state): State<ApiState>,
    query: std::result::Result<Query<TransactionsQuery>, QueryRejection>,
) -> ApiReply {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return bad_request(format!("Invalid query: {}", rejection)),
    };

    let limit = query.limit.unwrap_or(state.max_transactions_in_list);
    let transactions = state.ledger.recent_transactions(limit).await;
    (StatusCode::OK, Json(ApiResponse::success(transactions)))
}

async fn post_transaction(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiReply {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_request(format!("Invalid transaction: {}", rejection)),
    };

    match state.ledger.add_transaction(req).await {
        Ok(update) => (StatusCode::OK, Json(ApiResponse::success(update))),
        Err(ChatError::Validation(message)) => {
            warn!("Rejected transaction: {}", message);
            bad_request(message)
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to add transaction: {}", e))),
        ),
    }
}

async fn get_summary(State(state): State<ApiState>) -> ApiReply {
    let summary = state.ledger.summary().await;
    (StatusCode::OK, Json(ApiResponse::success(summary)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", get(get_chat_history).post(post_chat))
        .route(
            "/api/transactions",
            get(get_transactions).post(post_transaction),
        )
        .route("/api/summary", get(get_summary))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AssistantConfig;
    use crate::memory::ConversationMemory;
    use crate::test_support::ScriptedCompletion;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(reply: &str) -> (Router, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let assistant = Arc::new(ChatOrchestrator::new(
            ConversationMemory::new(50),
            Arc::new(ScriptedCompletion::replying(reply)),
            ledger.clone(),
            ledger.clone(),
            AssistantConfig::default(),
        ));
        let state = ApiState {
            assistant,
            ledger: ledger.clone(),
            max_transactions_in_list: 5,
        };
        (create_router(state), ledger)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app("hi");
        let (status, body) = send(&router, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_round_trip_updates_ledger() {
        let (router, ledger) = app("Logged: you spent 20 on books.");

        let (status, body) = send(&router, post_json("/api/chat", json!({ "message": "bought books" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["kind"], "text");
        assert_eq!(body["data"]["content"], "Logged: you spent 20 on books.");
        assert_eq!(ledger.summary().await.monthly_expenses, 20.0);

        let (_, history) = send(&router, get_req("/api/chat")).await;
        let turns = history["data"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[0]["content"], "bought books");
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let (router, _) = app("hi");

        let (status, body) = send(&router, post_json("/api/chat", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Message is required");

        let (status, _) = send(&router, post_json("/api/chat", json!({ "message": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transactions_endpoints() {
        let (router, _) = app("hi");

        for (kind, amount, description) in [("income", 500.0, "salary"), ("expense", 40.0, "fuel")] {
            let (status, body) = send(
                &router,
                post_json(
                    "/api/transactions",
                    json!({ "type": kind, "amount": amount, "description": description }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert!(body["data"]["newBalance"].is_number());
        }

        let (_, body) = send(&router, get_req("/api/transactions?limit=1")).await;
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["description"], "fuel");
        assert_eq!(list[0]["type"], "expense");

        let (_, summary) = send(&router, get_req("/api/summary")).await;
        assert_eq!(summary["data"]["balance"], 460.0);
        assert_eq!(summary["data"]["savingsRate"], 92.0);
    }

    #[tokio::test]
    async fn test_bad_transactions_query_uses_envelope() {
        let (router, _) = app("hi");

        let (status, body) = send(&router, get_req("/api/transactions?limit=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid query"));
    }

    #[tokio::test]
    async fn test_invalid_transactions_are_bad_requests() {
        let (router, ledger) = app("hi");

        let (status, _) = send(
            &router,
            post_json(
                "/api/transactions",
                json!({ "type": "expense", "amount": -3, "description": "oops" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &router,
            post_json(
                "/api/transactions",
                json!({ "type": "gift", "amount": 3, "description": "mystery" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        assert!(ledger.recent_transactions(10).await.is_empty());
    }
}
