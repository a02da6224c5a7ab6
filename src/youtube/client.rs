use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{errors::YouTubeError, types::*};
use crate::config::{http_timeout, API_BASE};

/// ポーリングエンジンとセッション管理が使うYouTube APIの窓口
#[async_trait]
pub trait LiveChatApi: Send + Sync {
    /// 動画IDからactiveLiveChatIdを取得
    ///
    /// 動画が存在しても配信中でなければ `Ok(None)`。
    async fn get_live_chat_id(&self, video_id: &str) -> Result<Option<String>, YouTubeError>;

    /// ライブチャットメッセージを1ページ取得
    async fn get_live_chat_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError>;
}

#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Result<Self, YouTubeError> {
        Self::with_base_url(api_key, API_BASE.to_string(), http_timeout())
    }

    /// 接続先とタイムアウトを指定して作成（モックサーバー向け）
    pub fn with_base_url(
        api_key: String,
        api_base: String,
        timeout: Duration,
    ) -> Result<Self, YouTubeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// エラーレスポンスを分類
    async fn classify_error(response: reqwest::Response) -> YouTubeError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        match status {
            reqwest::StatusCode::BAD_REQUEST if error_text.contains("keyInvalid") => {
                log::error!("API key is invalid");
                YouTubeError::InvalidApiKey
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                log::error!("Unauthorized - API key invalid");
                YouTubeError::InvalidApiKey
            }
            reqwest::StatusCode::FORBIDDEN if error_text.contains("quotaExceeded") => {
                log::error!("Quota exceeded - daily limit reached");
                YouTubeError::QuotaExceeded
            }
            reqwest::StatusCode::FORBIDDEN if error_text.contains("rateLimitExceeded") => {
                log::warn!("Rate limit exceeded");
                YouTubeError::RateLimitExceeded
            }
            reqwest::StatusCode::FORBIDDEN => {
                log::error!("API key invalid or insufficient permissions");
                YouTubeError::InvalidApiKey
            }
            reqwest::StatusCode::NOT_FOUND => {
                log::warn!("Live chat not found - stream may have ended");
                YouTubeError::LiveChatNotFound
            }
            status => {
                log::error!(
                    "Unexpected API response - status: {}, body: {}",
                    status,
                    error_text
                );
                YouTubeError::UnexpectedStatus {
                    status: status.as_u16(),
                    body: error_text,
                }
            }
        }
    }
}

#[async_trait]
impl LiveChatApi for YouTubeClient {
    async fn get_live_chat_id(&self, video_id: &str) -> Result<Option<String>, YouTubeError> {
        log::info!(
            "Fetching live chat ID for video: {} (quota cost: 1 unit)",
            video_id
        );

        let url = format!("{}/videos", self.api_base);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "liveStreamingDetails"),
                ("id", video_id),
                ("key", &self.api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let data: VideoResponse = response
            .json()
            .await
            .map_err(|e| YouTubeError::ParseError(e.to_string()))?;

        let chat_id = data
            .items
            .into_iter()
            .next()
            .and_then(|item| item.live_streaming_details)
            .and_then(|details| details.active_live_chat_id);

        match &chat_id {
            Some(id) => log::info!("Live chat ID retrieved: {}", id),
            None => log::warn!("Video {} has no active live chat", video_id),
        }
        Ok(chat_id)
    }

    async fn get_live_chat_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        log::debug!(
            "Fetching live chat messages for chat ID: {} (quota cost: ~5 units)",
            live_chat_id
        );

        let url = format!("{}/liveChat/messages", self.api_base);

        let mut query_params = vec![
            ("liveChatId", live_chat_id),
            ("part", "snippet,authorDetails"),
            ("key", self.api_key.as_str()),
        ];

        // pageTokenがある場合は追加
        if let Some(token) = page_token {
            query_params.push(("pageToken", token));
            log::debug!("Using page token: {}", token);
        }

        let response = self.client.get(&url).query(&query_params).send().await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let data: LiveChatMessagesResponse = response
            .json()
            .await
            .map_err(|e| YouTubeError::ParseError(e.to_string()))?;
        log::info!(
            "Successfully fetched {} messages (polling interval: {}ms)",
            data.items.len(),
            data.polling_interval_millis
        );
        Ok(data)
    }
}
