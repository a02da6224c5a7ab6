use thiserror::Error;

/// YouTube Data API 呼び出しのエラー
#[derive(Error, Debug)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API key is invalid or missing")]
    InvalidApiKey,

    #[error("Live chat not found - stream may have ended")]
    LiveChatNotFound,

    #[error("Quota exceeded - please try again tomorrow")]
    QuotaExceeded,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Unexpected status: {status} - {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// セッション開始時のエラー
///
/// いずれも自動リトライせず、呼び出し元にそのまま返す。
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("No live chat found for this video")]
    NotLive,

    #[error("YouTube API error: {0}")]
    Api(#[from] YouTubeError),

    /// 解決中に停止、または別の開始要求があった
    #[error("Chat monitoring start was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_messages() {
        assert_eq!(SessionError::InvalidUrl.to_string(), "Invalid YouTube URL");
        assert_eq!(
            SessionError::NotLive.to_string(),
            "No live chat found for this video"
        );

        assert_eq!(
            SessionError::Cancelled.to_string(),
            "Chat monitoring start was cancelled"
        );

        let api = SessionError::from(YouTubeError::QuotaExceeded);
        assert_eq!(
            api.to_string(),
            "YouTube API error: Quota exceeded - please try again tomorrow"
        );
    }
}
