// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// アプリケーション全体で使用する設定値・デフォルト値を定義
// =============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use crate::youtube::backoff::RetryPolicy;

/// YouTube Data API v3 のベースURL
pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// 応答しないAPIリクエストでポーリングループが止まり続けないようにする。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// バッファに保持する最大メッセージ数
pub const MAX_BUFFERED: usize = 50;

/// 初回リクエスト前、またはレスポンスに含まれない場合のポーリング間隔（ミリ秒）
pub const DEFAULT_POLLING_INTERVAL_MILLIS: u64 = 5000;

/// ポーリング間隔の下限（ミリ秒）
pub const MIN_POLLING_INTERVAL_MILLIS: u64 = 1000;

/// エラー時のリトライ待機時間（秒）
pub const RETRY_DELAY_SECS: u64 = 5;

/// オーバーレイサーバーのデフォルト待ち受けアドレス
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// HTTPリクエストのデフォルトタイムアウト（Duration）
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

/// ポーリングエンジンの設定
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// エラー時の待機ポリシー
    pub retry: RetryPolicy,
    /// サーバー推奨間隔がこれより短い場合はこの値を使う
    pub min_interval: Duration,
    /// メッセージIDによる重複排除を行うか
    pub dedup: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            min_interval: Duration::from_millis(MIN_POLLING_INTERVAL_MILLIS),
            dedup: false,
        }
    }
}

/// アプリケーション全体の設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub request_timeout: Duration,
    pub buffer_capacity: usize,
    pub listen_addr: SocketAddr,
    pub poller: PollerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            request_timeout: http_timeout(),
            buffer_capacity: MAX_BUFFERED,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            poller: PollerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_timeout_duration() {
        assert_eq!(http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.buffer_capacity, 50);
        assert_eq!(config.listen_addr.port(), 5000);
        assert_eq!(config.api_base, "https://www.googleapis.com/youtube/v3");
        assert!(!config.poller.dedup);
        assert_eq!(
            config.poller.retry,
            RetryPolicy::Fixed(Duration::from_secs(5))
        );
    }
}
