pub mod config;
pub mod server;
pub mod util; // doctestのためpubにする
pub mod youtube;

use anyhow::Context;
use std::sync::Arc;

use config::AppConfig;
use youtube::{MessageBuffer, SessionController, YouTubeClient};

/// アプリケーション全体の共有状態
pub struct AppState {
    pub session: Arc<SessionController>,
}

impl AppState {
    pub fn new(config: &AppConfig, api_key: String) -> anyhow::Result<Self> {
        let client = YouTubeClient::with_base_url(
            api_key,
            config.api_base.clone(),
            config.request_timeout,
        )
        .context("Failed to build YouTube API client")?;

        let buffer = Arc::new(MessageBuffer::new(config.buffer_capacity));
        let session = SessionController::new(Arc::new(client), buffer, config.poller.clone());

        Ok(Self {
            session: Arc::new(session),
        })
    }
}

/// 指定の配信のチャット監視を開始し、Ctrl+Cまでオーバーレイを配信する
pub async fn run(config: AppConfig, api_key: String, stream_url: &str) -> anyhow::Result<()> {
    log::info!("Using API key {}", util::mask_api_key(&api_key));

    let state = AppState::new(&config, api_key)?;

    state
        .session
        .start(stream_url)
        .await
        .with_context(|| format!("Failed to start chat monitoring for {}", stream_url))?;

    println!("\nServer starting...");
    println!("Chat display URL: http://localhost:{}", config.listen_addr.port());
    println!("Chat monitoring started for: {}", stream_url);
    println!("\nPress Ctrl+C to stop");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        println!("\nShutting down...");
    };

    let served = server::start_http_server(Arc::clone(&state.session), config.listen_addr, shutdown)
        .await
        .with_context(|| format!("HTTP server error on {}", config.listen_addr));

    state.session.stop().await;
    served
}
