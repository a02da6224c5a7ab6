//! 配信URLから動画IDを抽出する

use regex::Regex;
use std::sync::OnceLock;

// 上から順に試し、最初にマッチしたものを採用する
static VIDEO_ID_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn get_video_id_patterns() -> &'static [Regex] {
    VIDEO_ID_PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)",
            r"youtube\.com/embed/([^&\n?#]+)",
            r"youtube\.com/v/([^&\n?#]+)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Failed to compile video id regex"))
        .collect()
    })
}

/// URLから動画IDを抽出
///
/// 対応形式:
/// - `https://www.youtube.com/watch?v=VIDEO_ID`
/// - `https://youtu.be/VIDEO_ID`
/// - `https://www.youtube.com/embed/VIDEO_ID`
/// - `https://www.youtube.com/v/VIDEO_ID`
///
/// どの形式にも一致しない場合は `None`（エラーではなく通常の結果）。
pub fn extract_video_id(url: &str) -> Option<String> {
    get_video_id_patterns()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
