use rand::Rng;
use std::time::Duration;

use crate::config::RETRY_DELAY_SECS;

/// ポーリング失敗時の待機ポリシー
///
/// どちらのポリシーでも試行回数の上限はなく、停止されるまでリトライを続ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// 常に同じ時間だけ待機する
    Fixed(Duration),
    /// 失敗が続くごとに待機時間を倍にする（1s→2s→4s→...→max）
    Exponential {
        base: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(RETRY_DELAY_SECS))
    }
}

/// 連続失敗回数を数えて次の待機時間を決める
pub struct Backoff {
    policy: RetryPolicy,
    current_attempt: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            current_attempt: 0,
        }
    }

    /// 次のリトライまでの待機時間を計算して返す
    ///
    /// 指数の場合: base * 2^current_attempt（maxで頭打ち）
    pub fn next_delay(&mut self) -> Duration {
        let attempt = self.current_attempt;
        self.current_attempt = self.current_attempt.saturating_add(1);

        match &self.policy {
            RetryPolicy::Fixed(delay) => *delay,
            RetryPolicy::Exponential { base, max, jitter } => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                let delay = base.saturating_mul(factor).min(*max);
                if *jitter {
                    // ±20% の範囲でばらつかせる
                    let spread = rand::thread_rng().gen_range(0.8..=1.2);
                    delay.mul_f64(spread).min(*max)
                } else {
                    delay
                }
            }
        }
    }

    /// バックオフカウンターをリセット（成功時に呼び出す）
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// 現在の連続失敗回数を取得
    pub fn attempt_count(&self) -> u32 {
        self.current_attempt
    }
}
