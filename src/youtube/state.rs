use serde::Serialize;
use std::time::Duration;

use crate::config::DEFAULT_POLLING_INTERVAL_MILLIS;

/// liveChatMessages.list のクォータコスト（推定）
pub const MESSAGES_QUOTA_COST: u64 = 5;
/// videos.list のクォータコスト
pub const VIDEOS_QUOTA_COST: u64 = 1;
/// 1日あたりのデフォルトクォータ
const DAILY_QUOTA: i64 = 10_000;

/// セッション全体の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Resolving,
    Active,
    Stopped,
}

/// ポーリングエンジンの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Polling,
    Backoff,
    Stopped,
}

/// ポーリング状態を管理する構造体
///
/// 書き込むのはポーリングエンジンのみ。
#[derive(Debug, Clone, Serialize)]
pub struct PollingState {
    /// 現在のライブチャットID
    pub live_chat_id: String,
    /// 次回リクエストに使うページトークン
    pub next_page_token: Option<String>,
    /// 推奨ポーリング間隔（ミリ秒）
    pub polling_interval_millis: u64,
    pub engine_state: EngineState,
    /// 成功したポーリングの回数
    pub poll_count: u64,
    /// 連続エラー回数（成功でリセット）
    pub consecutive_errors: u32,
    /// 累積クォータ消費量（推定）
    pub quota_used: u64,
}

impl PollingState {
    pub fn new(live_chat_id: String) -> Self {
        Self {
            live_chat_id,
            next_page_token: None,
            polling_interval_millis: DEFAULT_POLLING_INTERVAL_MILLIS,
            engine_state: EngineState::Polling,
            poll_count: 0,
            consecutive_errors: 0,
            // チャットID解決時の videos.list 分
            quota_used: VIDEOS_QUOTA_COST,
        }
    }

    /// 次回の待機時間（`min_interval` 未満にはしない）
    pub fn polling_interval(&self, min_interval: Duration) -> Duration {
        Duration::from_millis(self.polling_interval_millis).max(min_interval)
    }

    /// 成功したレスポンスの内容で更新
    pub fn record_success(
        &mut self,
        next_page_token: Option<String>,
        polling_interval_millis: u64,
    ) {
        self.next_page_token = next_page_token;
        self.polling_interval_millis = polling_interval_millis;
        self.engine_state = EngineState::Polling;
        self.poll_count += 1;
        self.consecutive_errors = 0;
        self.quota_used += MESSAGES_QUOTA_COST;
    }

    /// 失敗を記録（ページトークンは変更しない）
    pub fn record_failure(&mut self) {
        self.engine_state = EngineState::Backoff;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        // 失敗したリクエストもクォータを消費しうる
        self.quota_used += MESSAGES_QUOTA_COST;
    }

    /// 残りクォータを推定
    pub fn estimated_remaining_quota(&self) -> i64 {
        DAILY_QUOTA - self.quota_used as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_state_creation() {
        let state = PollingState::new("test-chat-id".to_string());
        assert_eq!(state.live_chat_id, "test-chat-id");
        assert_eq!(state.next_page_token, None);
        assert_eq!(state.polling_interval_millis, 5000);
        assert_eq!(state.engine_state, EngineState::Polling);
        assert_eq!(state.quota_used, 1);
    }

    #[test]
    fn test_record_success() {
        let mut state = PollingState::new("test-chat-id".to_string());
        state.record_success(Some("token123".to_string()), 6000);

        assert_eq!(state.next_page_token, Some("token123".to_string()));
        assert_eq!(state.polling_interval_millis, 6000);
        assert_eq!(state.poll_count, 1);
        assert_eq!(state.quota_used, 6);
    }

    #[test]
    fn test_failure_keeps_page_token() {
        let mut state = PollingState::new("test-chat-id".to_string());
        state.record_success(Some("token123".to_string()), 3000);
        state.record_failure();
        state.record_failure();

        assert_eq!(state.next_page_token, Some("token123".to_string()));
        assert_eq!(state.engine_state, EngineState::Backoff);
        assert_eq!(state.consecutive_errors, 2);

        state.record_success(Some("token456".to_string()), 3000);
        assert_eq!(state.consecutive_errors, 0);
        assert_eq!(state.engine_state, EngineState::Polling);
    }

    #[test]
    fn test_minimum_polling_interval() {
        let mut state = PollingState::new("test-chat-id".to_string());
        state.record_success(None, 0);

        assert_eq!(
            state.polling_interval(Duration::from_secs(1)),
            Duration::from_secs(1)
        );

        state.record_success(None, 7500);
        assert_eq!(
            state.polling_interval(Duration::from_secs(1)),
            Duration::from_millis(7500)
        );
    }

    #[test]
    fn test_quota_estimation() {
        let mut state = PollingState::new("test-chat-id".to_string());

        for _ in 0..100 {
            state.record_success(None, 5000);
        }

        assert_eq!(state.quota_used, 501); // 1 + 100 * 5
        assert_eq!(state.estimated_remaining_quota(), 9499);
    }
}
