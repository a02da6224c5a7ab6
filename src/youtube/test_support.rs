//! テスト用のスクリプト化したAPIスタブとメッセージ生成ヘルパー

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::client::LiveChatApi;
use super::errors::YouTubeError;
use super::types::{ChatMessage, LiveChatMessageItem, LiveChatMessagesResponse};

pub(crate) fn item(id: &str) -> LiveChatMessageItem {
    serde_json::from_value(json!({
        "id": id,
        "snippet": {
            "type": "textMessageEvent",
            "publishedAt": "2024-05-01T12:00:00Z",
            "displayMessage": format!("text of {id}")
        },
        "authorDetails": {
            "channelId": "UCtest",
            "displayName": format!("author of {id}")
        }
    }))
    .expect("valid test item")
}

pub(crate) fn message(id: &str) -> ChatMessage {
    ChatMessage::from_item(item(id))
}

pub(crate) fn page(
    next_page_token: Option<&str>,
    polling_interval_millis: u64,
    ids: &[&str],
) -> LiveChatMessagesResponse {
    LiveChatMessagesResponse {
        polling_interval_millis,
        next_page_token: next_page_token.map(str::to_string),
        items: ids.iter().map(|id| item(id)).collect(),
    }
}

pub(crate) fn message_ids(messages: &[ChatMessage]) -> Vec<String> {
    messages.iter().map(|m| m.message_id.clone()).collect()
}

/// 1回分のAPI応答
pub(crate) enum Step {
    Page(LiveChatMessagesResponse),
    Fail,
    /// 指定時間待ってから応答する（遅いリクエストの再現）
    Delayed(Duration, Box<Step>),
}

/// 呼び出し順に応答を返すAPIスタブ
///
/// スクリプトを使い切った後は、受け取ったページトークンを
/// そのまま返す空ページを返す。
#[derive(Default)]
pub(crate) struct ScriptedApi {
    live_chats: Mutex<HashMap<String, Option<String>>>,
    resolve_delay: Duration,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 動画IDに対する解決結果を登録（`None` は配信していない動画）
    pub(crate) fn with_video(self, video_id: &str, live_chat_id: Option<&str>) -> Self {
        self.live_chats
            .lock()
            .unwrap()
            .insert(video_id.to_string(), live_chat_id.map(str::to_string));
        self
    }

    /// ライブチャットIDの解決を遅らせる
    pub(crate) fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    pub(crate) fn push(&self, live_chat_id: &str, step: Step) {
        self.scripts
            .lock()
            .unwrap()
            .entry(live_chat_id.to_string())
            .or_default()
            .push_back(step);
    }

    /// 指定チャットへのリクエストで使われたページトークン（呼び出し順）
    pub(crate) fn page_tokens(&self, live_chat_id: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat_id, _)| chat_id == live_chat_id)
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub(crate) fn request_count(&self, live_chat_id: &str) -> usize {
        self.page_tokens(live_chat_id).len()
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LiveChatApi for ScriptedApi {
    async fn get_live_chat_id(&self, video_id: &str) -> Result<Option<String>, YouTubeError> {
        if !self.resolve_delay.is_zero() {
            tokio::time::sleep(self.resolve_delay).await;
        }
        match self.live_chats.lock().unwrap().get(video_id) {
            Some(chat_id) => Ok(chat_id.clone()),
            None => Err(YouTubeError::UnexpectedStatus {
                status: 500,
                body: "unknown video".to_string(),
            }),
        }
    }

    async fn get_live_chat_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        self.requests
            .lock()
            .unwrap()
            .push((live_chat_id.to_string(), page_token.map(str::to_string)));

        let mut step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(live_chat_id)
            .and_then(|steps| steps.pop_front());

        loop {
            match step {
                Some(Step::Delayed(delay, inner)) => {
                    tokio::time::sleep(delay).await;
                    step = Some(*inner);
                }
                Some(Step::Page(response)) => return Ok(response),
                Some(Step::Fail) => {
                    return Err(YouTubeError::UnexpectedStatus {
                        status: 503,
                        body: "backend error".to_string(),
                    })
                }
                None => return Ok(page(page_token, 1000, &[])),
            }
        }
    }
}
