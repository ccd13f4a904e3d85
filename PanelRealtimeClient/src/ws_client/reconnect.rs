// PanelRealtimeClient/src/ws_client/reconnect.rs

//! 重连策略：指数退避，受最大次数约束。
//!
//! 只有非正常关闭（关闭码不是 1000，包括连接建立失败）才会触发重连。
//! 第 n 次重连（n 从 0 计）之前等待 `base * 2^n`；当已重连次数达到上限时不再调度，
//! 并在连接状态中留下终止错误，等待调用方手动重新 `connect`。

use crate::config::RealtimeClientConfig;
use std::time::Duration;

/// 重连次数耗尽时写入 `ConnectionStatus.error` 的信息。
pub const MAX_RECONNECT_ATTEMPTS_MESSAGE: &str = "Max reconnect attempts reached";

/// 对一次非正常关闭的处置结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// 在 `delay` 之后进行第 `attempt` 次重连（从 1 计）。
    Retry { delay: Duration, attempt: u32 },
    /// 已达上限，放弃。
    GiveUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_interval: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_interval: Duration, max_attempts: u32) -> Self {
        Self {
            base_interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &RealtimeClientConfig) -> Self {
        Self::new(config.reconnect_base_interval(), config.max_reconnect_attempts)
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 已重连 `attempts` 次时，下一次重连前的等待时间：`base * 2^attempts`（溢出时饱和）。
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let factor = 1u32.checked_shl(attempts).unwrap_or(u32::MAX);
        self.base_interval.saturating_mul(factor)
    }

    /// 根据已重连次数决定是否继续。
    pub fn decide(&self, attempts: u32) -> ReconnectDecision {
        if attempts >= self.max_attempts {
            ReconnectDecision::GiveUp
        } else {
            ReconnectDecision::Retry {
                delay: self.delay_for(attempts),
                attempt: attempts + 1,
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&RealtimeClientConfig::default())
    }
}
