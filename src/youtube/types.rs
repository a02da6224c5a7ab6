use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_POLLING_INTERVAL_MILLIS;

/// 正規化済みのチャットメッセージ
///
/// オーバーレイの `/get_messages` でそのままJSONとして返す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    #[serde(rename = "display_name")]
    pub author_display_name: String,
    pub author_channel_id: String,
    pub text: String,
    /// 解釈できなかった場合は `None`（メッセージ自体は表示する）
    pub published_at: Option<DateTime<Utc>>,
    pub is_moderator: bool,
    pub is_owner: bool,
    pub is_member: bool,
    pub is_verified: bool,
    pub message_type: MessageType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    SuperChat,
    SuperSticker,
    Membership,
    MembershipGift,
    Other,
}

impl MessageType {
    /// snippet.type の値から変換
    pub fn from_snippet_type(value: &str) -> Self {
        match value {
            "textMessageEvent" => Self::Text,
            "superChatEvent" => Self::SuperChat,
            "superStickerEvent" => Self::SuperSticker,
            "newSponsorEvent" | "memberMilestoneChatEvent" => Self::Membership,
            "membershipGiftingEvent" | "giftMembershipReceivedEvent" => Self::MembershipGift,
            _ => Self::Other,
        }
    }
}

impl ChatMessage {
    /// APIレスポンスの1アイテムを正規化
    pub fn from_item(item: LiveChatMessageItem) -> Self {
        let published_at = match DateTime::parse_from_rfc3339(&item.snippet.published_at) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                log::warn!(
                    "Failed to parse publishedAt {:?} for message {}: {}",
                    item.snippet.published_at,
                    item.id,
                    e
                );
                None
            }
        };

        Self {
            message_id: item.id,
            author_display_name: item.author_details.display_name,
            author_channel_id: item.author_details.channel_id,
            text: item.snippet.display_message,
            published_at,
            is_moderator: item.author_details.is_chat_moderator,
            is_owner: item.author_details.is_chat_owner,
            is_member: item.author_details.is_chat_sponsor,
            is_verified: item.author_details.is_verified,
            message_type: MessageType::from_snippet_type(&item.snippet.message_type),
        }
    }
}

// YouTube API レスポンス型
#[derive(Debug, Clone, Deserialize)]
pub struct LiveChatMessagesResponse {
    #[serde(
        rename = "pollingIntervalMillis",
        default = "default_polling_interval_millis"
    )]
    pub polling_interval_millis: u64,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<LiveChatMessageItem>,
}

fn default_polling_interval_millis() -> u64 {
    DEFAULT_POLLING_INTERVAL_MILLIS
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveChatMessageItem {
    pub id: String,
    pub snippet: MessageSnippet,
    #[serde(rename = "authorDetails")]
    pub author_details: AuthorDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSnippet {
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(rename = "publishedAt", default)]
    pub published_at: String,
    #[serde(rename = "displayMessage", default)]
    pub display_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorDetails {
    #[serde(rename = "channelId", default)]
    pub channel_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(rename = "isChatOwner", default)]
    pub is_chat_owner: bool,
    #[serde(rename = "isChatSponsor", default)]
    pub is_chat_sponsor: bool,
    #[serde(rename = "isChatModerator", default)]
    pub is_chat_moderator: bool,
}

#[derive(Debug, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    #[serde(rename = "liveStreamingDetails")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
pub struct LiveStreamingDetails {
    #[serde(rename = "activeLiveChatId")]
    pub active_live_chat_id: Option<String>,
}
