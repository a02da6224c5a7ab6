use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::youtube::{SessionController, SessionError};

/// HTTPサーバー用の共有状態
#[derive(Clone)]
pub struct HttpState {
    pub session: Arc<SessionController>,
}

#[derive(Debug, Deserialize)]
struct StartChatRequest {
    #[serde(default)]
    url: String,
}

/// ルーターを構築
pub fn router(session: Arc<SessionController>) -> Router {
    let state = HttpState { session };

    Router::new()
        .route("/", get(overlay_chat))
        .route("/get_messages", get(get_messages))
        .route("/start_chat", post(start_chat))
        .route("/stop_chat", post(stop_chat))
        .route("/status", get(get_status))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTPサーバーを起動
///
/// `shutdown` が完了するとサーバーを終了する。
pub async fn start_http_server<F>(
    session: Arc<SessionController>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(session);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// ヘルスチェックエンドポイント
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "server": "ihts-chatbox",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// チャットオーバーレイHTML
async fn overlay_chat() -> impl IntoResponse {
    Html(include_str!("../../overlays/chat.html"))
}

/// バッファ中のメッセージ（古い順）
async fn get_messages(State(state): State<HttpState>) -> impl IntoResponse {
    let messages = state.session.messages();
    Json(json!({ "messages": &*messages }))
}

async fn start_chat(
    State(state): State<HttpState>,
    Json(request): Json<StartChatRequest>,
) -> impl IntoResponse {
    let url = request.url.trim();
    log::info!("Start chat requested: {}", url);
    if url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No URL provided" })),
        );
    }

    match state.session.start(url).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Chat monitoring started" })),
        ),
        Err(e) => {
            let status = match e {
                SessionError::InvalidUrl | SessionError::NotLive => StatusCode::BAD_REQUEST,
                SessionError::Api(_) => StatusCode::BAD_GATEWAY,
                SessionError::Cancelled => StatusCode::CONFLICT,
            };
            (status, Json(json!({ "error": e.to_string() })))
        }
    }
}

async fn stop_chat(State(state): State<HttpState>) -> impl IntoResponse {
    state.session.stop().await;
    Json(json!({ "success": true, "message": "Chat monitoring stopped" }))
}

async fn get_status(State(state): State<HttpState>) -> impl IntoResponse {
    Json(state.session.status().await)
}
