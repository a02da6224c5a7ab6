//! ライブチャットのポーリングエンジン
//!
//! 状態遷移:
//! - Polling → Polling: 取得成功。メッセージを追記し、次のページトークンと
//!   推奨間隔を採用して待機する
//! - Polling → Backoff: 取得失敗。ページトークンはそのままで待機後に再取得
//! - → Stopped: キャンセルトークンが発火した時点で即座に終了
//!
//! 失敗の種類は区別せず、停止されるまでリトライを続ける。

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    backoff::Backoff,
    buffer::BufferWriter,
    client::LiveChatApi,
    state::{EngineState, PollingState},
    types::{ChatMessage, LiveChatMessagesResponse},
};
use crate::config::PollerConfig;

/// 重複排除用のメッセージIDの最大保持数
const MAX_SEEN_IDS: usize = 10000;

/// 直近に見たメッセージID（FIFOで古いものから忘れる）
#[derive(Default)]
struct SeenIds {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenIds {
    /// 初めて見たIDなら `true`
    fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());

        while self.ids.len() > MAX_SEEN_IDS {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.ids.remove(&oldest);
                }
                None => break,
            }
        }
        true
    }
}

pub struct PollingEngine {
    api: Arc<dyn LiveChatApi>,
    writer: BufferWriter,
    state: Arc<Mutex<PollingState>>,
    config: PollerConfig,
    token: CancellationToken,
    seen: Option<SeenIds>,
}

impl PollingEngine {
    pub fn new(
        api: Arc<dyn LiveChatApi>,
        writer: BufferWriter,
        state: Arc<Mutex<PollingState>>,
        config: PollerConfig,
        token: CancellationToken,
    ) -> Self {
        let seen = config.dedup.then(SeenIds::default);
        Self {
            api,
            writer,
            state,
            config,
            token,
            seen,
        }
    }

    /// バックグラウンドタスクとして起動
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// ポーリングループ本体
    pub async fn run(mut self) {
        let mut backoff = Backoff::new(self.config.retry.clone());
        let live_chat_id = self.lock_state().live_chat_id.clone();

        log::info!("Polling loop started for live chat {}", live_chat_id);

        loop {
            if self.token.is_cancelled() {
                break;
            }

            let page_token = self.lock_state().next_page_token.clone();

            let fetched = tokio::select! {
                biased;
                _ = self.token.cancelled() => None,
                result = self
                    .api
                    .get_live_chat_messages(&live_chat_id, page_token.as_deref()) => Some(result),
            };
            let Some(result) = fetched else {
                break;
            };

            let delay = match result {
                Ok(response) => {
                    backoff.reset();
                    match self.handle_page(response) {
                        Some(interval) => interval,
                        None => break,
                    }
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    self.lock_state().record_failure();
                    log::warn!(
                        "Polling error (attempt {}), retrying in {:?} with the same page token: {}",
                        backoff.attempt_count(),
                        delay,
                        e
                    );
                    delay
                }
            };

            let slept = tokio::select! {
                biased;
                _ = self.token.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };
            if !slept {
                break;
            }
        }

        self.lock_state().engine_state = EngineState::Stopped;
        log::info!("Polling loop ended for live chat {}", live_chat_id);
    }

    /// 取得したページを反映し、次の待機時間を返す
    ///
    /// バッファの書き込み権を失っていた場合は `None`（ループを終了する）。
    fn handle_page(&mut self, response: LiveChatMessagesResponse) -> Option<Duration> {
        let LiveChatMessagesResponse {
            polling_interval_millis,
            next_page_token,
            items,
        } = response;

        let mut messages: Vec<ChatMessage> =
            items.into_iter().map(ChatMessage::from_item).collect();

        if let Some(seen) = self.seen.as_mut() {
            let before = messages.len();
            messages.retain(|m| seen.insert(&m.message_id));
            if messages.len() < before {
                log::debug!("Dropped {} duplicate messages", before - messages.len());
            }
        }

        let count = messages.len();
        if !self.writer.append_batch(messages) {
            log::warn!(
                "Buffer was handed to a newer session (writer generation {}), stopping this poller",
                self.writer.generation()
            );
            self.token.cancel();
            return None;
        }

        let mut state = self.lock_state();
        state.record_success(next_page_token, polling_interval_millis);
        let interval = state.polling_interval(self.config.min_interval);
        log::debug!(
            "Appended {} messages (poll #{}), next poll in {:?}",
            count,
            state.poll_count,
            interval
        );
        Some(interval)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PollingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
