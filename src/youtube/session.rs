//! チャット監視セッションの開始・停止を管理する
//!
//! ポーリングエンジンは常に最大1つ。新しいセッションを開始する前に、
//! 既存のエンジンを停止してタスクの終了を待ち、バッファの書き込み権を
//! 新しい世代に切り替える。
//!
//! ライブチャットIDの解決中はロックを保持しない。解決後に開始要求の
//! 連番を確認し、その間に `stop` や新しい `start` があれば起動を取りやめる。

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    buffer::MessageBuffer,
    client::LiveChatApi,
    errors::SessionError,
    poller::PollingEngine,
    state::{PollingState, SessionPhase},
    types::ChatMessage,
    video_id::extract_video_id,
};
use crate::config::PollerConfig;

/// 動画IDからライブチャットIDを解決
///
/// 配信中でなければ `NotLive`。失敗してもここではリトライしない。
pub async fn resolve_live_chat(
    api: &dyn LiveChatApi,
    video_id: &str,
) -> Result<String, SessionError> {
    match api.get_live_chat_id(video_id).await {
        Ok(Some(live_chat_id)) => Ok(live_chat_id),
        Ok(None) => Err(SessionError::NotLive),
        Err(e) => {
            log::error!("Error getting live chat ID: {}", e);
            Err(SessionError::Api(e))
        }
    }
}

struct PollerTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct SessionRecord {
    video_id: String,
    state: Arc<Mutex<PollingState>>,
    task: Option<PollerTask>,
}

struct SessionInner {
    phase: SessionPhase,
    session: Option<SessionRecord>,
    /// 開始要求ごとに増える連番（解決中の要求の取り消しに使う）
    start_seq: u64,
}

impl SessionInner {
    /// 新しい開始要求を登録し、その連番を返す
    fn next_start(&mut self) -> u64 {
        self.start_seq += 1;
        self.start_seq
    }
}

/// `/status` で返すセッション情報
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub video_id: Option<String>,
    pub polling: Option<PollingState>,
    pub remaining_quota: Option<i64>,
    pub buffered: usize,
    pub capacity: usize,
}

pub struct SessionController {
    api: Arc<dyn LiveChatApi>,
    buffer: Arc<MessageBuffer>,
    config: PollerConfig,
    inner: tokio::sync::Mutex<SessionInner>,
}

impl SessionController {
    pub fn new(
        api: Arc<dyn LiveChatApi>,
        buffer: Arc<MessageBuffer>,
        config: PollerConfig,
    ) -> Self {
        Self {
            api,
            buffer,
            config,
            inner: tokio::sync::Mutex::new(SessionInner {
                phase: SessionPhase::Idle,
                session: None,
                start_seq: 0,
            }),
        }
    }

    /// バッファの現在の内容（古い順）
    pub fn messages(&self) -> Arc<[ChatMessage]> {
        self.buffer.snapshot()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase
    }

    /// URLで指定された配信のチャット監視を開始
    ///
    /// 実行中のセッションがあれば先に停止し、終了を待ってから解決を始める。
    /// 解決中に `stop` または別の `start` が呼ばれた場合は `Cancelled`。
    pub async fn start(&self, url: &str) -> Result<(), SessionError> {
        let (seq, video_id) = {
            let mut inner = self.inner.lock().await;

            if let Some(mut record) = inner.session.take() {
                log::info!("Stopping chat monitoring for {} before restart", record.video_id);
                Self::shutdown_task(&mut record).await;
            }

            let seq = inner.next_start();
            let Some(video_id) = extract_video_id(url) else {
                log::warn!("Invalid YouTube URL: {}", url);
                inner.phase = SessionPhase::Idle;
                return Err(SessionError::InvalidUrl);
            };
            inner.phase = SessionPhase::Resolving;
            (seq, video_id)
        };

        let resolved = resolve_live_chat(self.api.as_ref(), &video_id).await;

        let mut inner = self.inner.lock().await;
        if inner.start_seq != seq {
            log::info!("Start for video {} was superseded during resolution", video_id);
            return Err(SessionError::Cancelled);
        }

        let live_chat_id = match resolved {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Could not start chat monitoring for {}: {}", video_id, e);
                inner.phase = SessionPhase::Idle;
                return Err(e);
            }
        };

        // ここで世代が進むため、古いライターはもう書き込めない
        let writer = self.buffer.begin_session();
        let state = Arc::new(Mutex::new(PollingState::new(live_chat_id)));
        let token = CancellationToken::new();
        let handle = PollingEngine::new(
            Arc::clone(&self.api),
            writer,
            Arc::clone(&state),
            self.config.clone(),
            token.clone(),
        )
        .spawn();

        log::info!("Chat monitoring started for video {}", video_id);
        inner.session = Some(SessionRecord {
            video_id,
            state,
            task: Some(PollerTask { token, handle }),
        });
        inner.phase = SessionPhase::Active;
        Ok(())
    }

    /// チャット監視を停止
    ///
    /// 解決中の開始要求も取り消す。バッファの内容は残る。
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;

        let pending = inner.phase == SessionPhase::Resolving;
        if pending {
            inner.next_start();
            log::info!("Cancelled pending chat monitoring start");
        }

        let running = match inner.session.as_mut() {
            Some(record) if record.task.is_some() => {
                Self::shutdown_task(record).await;
                true
            }
            _ => false,
        };

        if pending || running {
            inner.phase = SessionPhase::Stopped;
            log::info!("Chat monitoring stopped");
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().await;
        let polling = inner.session.as_ref().map(|record| {
            record
                .state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        });

        SessionStatus {
            phase: inner.phase,
            video_id: inner.session.as_ref().map(|r| r.video_id.clone()),
            remaining_quota: polling.as_ref().map(|p| p.estimated_remaining_quota()),
            polling,
            buffered: self.buffer.len(),
            capacity: self.buffer.capacity(),
        }
    }

    /// キャンセルを通知し、タスクの終了まで待つ
    async fn shutdown_task(record: &mut SessionRecord) {
        let Some(task) = record.task.take() else {
            return;
        };
        task.token.cancel();
        if let Err(e) = task.handle.await {
            log::error!("Polling task ended abnormally: {}", e);
        }
    }
}
