// PanelRealtimeClient/src/ws_client/typing.rs

//! "正在输入"指示注册表。
//!
//! 每个 (会话, 用户) 的状态机：不存在 → 活跃（`typing_start`）→ 不存在
//! （`typing_stop` 或有效期到期，以先到者为准）。
//! 同一用户重复 `typing_start` 时替换旧记录，`startedAt` 与到期计时都重新开始。
//! 查询时会额外过滤已过期的记录，即使到期任务尚未运行，结果也不会包含过期用户。

use crate::event::{ClientEvent, EventBus};
use crate::state;
use chrono::Utc;
use common_models::TypingIndicator;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct TypingEntry {
    indicator: TypingIndicator,
    /// 区分同一用户先后两次 `typing_start`，旧的到期任务不会误删新记录。
    token: u64,
    expires_at: Instant,
    expiry_task: JoinHandle<()>,
}

/// 按会话分组的输入指示，每条记录带一个到期任务。
pub struct TypingIndicatorRegistry {
    entries: Mutex<HashMap<String, Vec<TypingEntry>>>,
    expiry: Duration,
    next_token: AtomicU64,
    events: Arc<EventBus>,
}

impl TypingIndicatorRegistry {
    /// 创建空注册表；指示集合变化时向 `events` 发布 `TypingIndicatorsChanged`。
    pub fn new(expiry: Duration, events: Arc<EventBus>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            expiry,
            next_token: AtomicU64::new(0),
            events,
        }
    }

    /// 一条输入指示在没有后续 `typing_start` 时的有效期。
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// 记录一个用户开始输入，并安排到期移除。
    pub fn start(
        self: &Arc<Self>,
        conversation_id: &str,
        user_id: &str,
        agent_id: Option<String>,
        user_name: &str,
    ) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let indicator = TypingIndicator {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            agent_id,
            user_name: user_name.to_string(),
            started_at: Utc::now(),
        };

        let registry = Arc::downgrade(self);
        let expiry = self.expiry;
        let (conv, user) = (conversation_id.to_string(), user_id.to_string());
        let expiry_task = tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            if let Some(registry) = registry.upgrade() {
                registry.expire(&conv, &user, token);
            }
        });

        let snapshot = {
            let mut entries = state::lock(&self.entries);
            let list = entries.entry(conversation_id.to_string()).or_default();
            if let Some(pos) = list.iter().position(|e| e.indicator.user_id == user_id) {
                list.remove(pos).expiry_task.abort();
            }
            list.push(TypingEntry {
                indicator,
                token,
                expires_at: Instant::now() + expiry,
                expiry_task,
            });
            Self::active(list)
        };
        debug!("[输入指示] 会话 {} 中用户 {} 开始输入", conversation_id, user_id);
        self.publish(conversation_id, snapshot);
    }

    /// 记录一个用户停止输入；返回该用户此前是否处于活跃状态。
    pub fn stop(&self, conversation_id: &str, user_id: &str) -> bool {
        self.remove_where(conversation_id, |entry| entry.indicator.user_id == user_id)
    }

    /// 某会话当前活跃的输入指示；没有时为空列表。
    pub fn indicators(&self, conversation_id: &str) -> Vec<TypingIndicator> {
        state::lock(&self.entries)
            .get(conversation_id)
            .map(|list| Self::active(list))
            .unwrap_or_default()
    }

    /// 清空全部记录并取消所有到期任务。断开连接时调用，不发布事件。
    pub fn clear(&self) {
        let drained: Vec<TypingEntry> = state::lock(&self.entries)
            .drain()
            .flat_map(|(_, list)| list)
            .collect();
        for entry in drained {
            entry.expiry_task.abort();
        }
    }

    /// 是否没有任何活跃记录。
    pub fn is_empty(&self) -> bool {
        state::lock(&self.entries).values().all(|list| Self::active(list).is_empty())
    }

    fn expire(&self, conversation_id: &str, user_id: &str, token: u64) {
        if self.remove_where(conversation_id, |entry| entry.indicator.user_id == user_id && entry.token == token) {
            debug!("[输入指示] 会话 {} 中用户 {} 的输入指示已到期", conversation_id, user_id);
        }
    }

    fn remove_where<P>(&self, conversation_id: &str, predicate: P) -> bool
    where
        P: Fn(&TypingEntry) -> bool,
    {
        let snapshot = {
            let mut entries = state::lock(&self.entries);
            let Some(list) = entries.get_mut(conversation_id) else {
                return false;
            };
            let Some(pos) = list.iter().position(|e| predicate(e)) else {
                return false;
            };
            list.remove(pos).expiry_task.abort();
            let snapshot = Self::active(list);
            if list.is_empty() {
                entries.remove(conversation_id);
            }
            snapshot
        };
        self.publish(conversation_id, snapshot);
        true
    }

    fn active(list: &[TypingEntry]) -> Vec<TypingIndicator> {
        let now = Instant::now();
        list.iter()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.indicator.clone())
            .collect()
    }

    fn publish(&self, conversation_id: &str, indicators: Vec<TypingIndicator>) {
        self.events.emit(&ClientEvent::TypingIndicatorsChanged {
            conversation_id: conversation_id.to_string(),
            indicators,
        });
    }
}
