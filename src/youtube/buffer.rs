//! 直近N件のチャットメッセージを保持する共有バッファ
//!
//! 書き込みは常に新しい `Arc<[ChatMessage]>` を組み立ててから差し替えるため、
//! 読み取り側が追記途中の状態を見ることはない。
//!
//! 書き込み権は `BufferWriter` として世代番号付きで発行する。
//! `begin_session` で世代が進むと古いライターの追記はすべて破棄される。

use std::sync::{Arc, RwLock};

use super::types::ChatMessage;

struct BufferInner {
    messages: Arc<[ChatMessage]>,
    generation: u64,
}

pub struct MessageBuffer {
    capacity: usize,
    inner: RwLock<BufferInner>,
}

/// バッファへの書き込み権（ポーリングエンジンごとに1つ）
#[derive(Clone)]
pub struct BufferWriter {
    buffer: Arc<MessageBuffer>,
    generation: u64,
}

impl MessageBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(BufferInner {
                messages: Arc::from(Vec::new()),
                generation: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 新しいセッション用にバッファを空にしてライターを発行
    ///
    /// 以前に発行したライターはこれ以降何も書き込めない。
    pub fn begin_session(self: &Arc<Self>) -> BufferWriter {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.generation += 1;
        inner.messages = Arc::from(Vec::new());
        log::debug!("Message buffer reset (generation {})", inner.generation);

        BufferWriter {
            buffer: Arc::clone(self),
            generation: inner.generation,
        }
    }

    /// 現在の内容を取得（古い順）
    pub fn snapshot(&self) -> Arc<[ChatMessage]> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&inner.messages)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 順序を保って追記し、末尾 `capacity` 件だけを残す
    ///
    /// 世代が一致しない場合は何もせず `false` を返す。
    fn append_batch(&self, generation: u64, items: Vec<ChatMessage>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.generation != generation {
            return false;
        }
        if items.is_empty() {
            return true;
        }

        let total = inner.messages.len() + items.len();
        let skip = total.saturating_sub(self.capacity);
        let merged: Vec<ChatMessage> = inner
            .messages
            .iter()
            .cloned()
            .chain(items)
            .skip(skip)
            .collect();
        inner.messages = Arc::from(merged);
        true
    }
}

impl BufferWriter {
    /// メッセージをまとめて追記
    ///
    /// ライターが古くなっていた場合は `false`。
    pub fn append_batch(&self, items: Vec<ChatMessage>) -> bool {
        let accepted = self.buffer.append_batch(self.generation, items);
        if !accepted {
            log::warn!(
                "Discarded append from stale writer (generation {})",
                self.generation
            );
        }
        accepted
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
