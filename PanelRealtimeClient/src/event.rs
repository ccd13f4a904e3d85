// PanelRealtimeClient/src/event.rs

//! 客户端事件定义与进程内事件总线。
//!
//! 客户端服务通过 `EventBus` 向界面层（或任何订阅者）推送以下事件：
//! - 连接状态变化 (`ConnectionStatusChanged`)
//! - 某个会话的"正在输入"列表变化 (`TypingIndicatorsChanged`)
//! - 坐席状态广播 (`AgentStatusChanged`)
//! - 仪表盘刷新通知 (`DashboardUpdate`)
//!
//! 事件集合是一个封闭的枚举，订阅者用 `match` 即可获得编译期的穷尽检查。
//! 监听器在发布事件的任务中被同步调用，不做批量合并。

use crate::state::{self, ConnectionStatus};
use common_models::{AgentStatus, TypingIndicator};
use log::error;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// 连接状态事件名。
pub const WS_CONNECTION_STATUS_EVENT: &str = "ws_connection_status_v1";
/// 输入指示变化事件名。
pub const TYPING_INDICATORS_EVENT: &str = "typing_indicators_v1";
/// 坐席状态事件名。
pub const AGENT_STATUS_CHANGE_EVENT: &str = "agent_status_change";
/// 仪表盘刷新事件名。
pub const DASHBOARD_UPDATE_EVENT: &str = "dashboard_update";

/// 客户端发布的事件。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    ConnectionStatusChanged(ConnectionStatus),
    TypingIndicatorsChanged {
        conversation_id: String,
        indicators: Vec<TypingIndicator>,
    },
    AgentStatusChanged(AgentStatus),
    DashboardUpdate(serde_json::Value),
}

impl ClientEvent {
    /// 事件名，用于日志和桥接到外部事件系统。
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::ConnectionStatusChanged(_) => WS_CONNECTION_STATUS_EVENT,
            ClientEvent::TypingIndicatorsChanged { .. } => TYPING_INDICATORS_EVENT,
            ClientEvent::AgentStatusChanged(_) => AGENT_STATUS_CHANGE_EVENT,
            ClientEvent::DashboardUpdate(_) => DASHBOARD_UPDATE_EVENT,
        }
    }
}

/// 事件监听器。
pub type EventListener = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// 订阅句柄，用于取消订阅。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 进程内事件总线。
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(SubscriptionId, EventListener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个监听器。
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        state::write(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    /// 以通道形式订阅，适合在异步任务中逐个消费事件。
    ///
    /// 接收端被丢弃后，对应的监听器在下一次发布时自动移除。
    pub fn subscribe_channel(self: &Arc<Self>) -> mpsc::UnboundedReceiver<ClientEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Arc::downgrade(self);
        let id_slot: Arc<RwLock<Option<SubscriptionId>>> = Arc::new(RwLock::new(None));
        let id_for_listener = id_slot.clone();
        let id = self.subscribe(move |event| {
            if tx.send(event.clone()).is_err() {
                if let (Some(bus), Some(id)) = (bus.upgrade(), *state::read(&id_for_listener)) {
                    bus.unsubscribe(id);
                }
            }
        });
        *state::write(&id_slot) = Some(id);
        rx
    }

    /// 取消订阅；返回该订阅此前是否存在。
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = state::write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        state::read(&self.listeners).len()
    }

    /// 同步地把事件交给全部监听器。
    ///
    /// 监听器在锁外调用，因此可以在回调中订阅或取消订阅；某个监听器 panic 不影响其它监听器。
    pub fn emit(&self, event: &ClientEvent) {
        let snapshot: Vec<EventListener> = state::read(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("[事件总线] 监听器处理事件 '{}' 时发生 panic，已忽略。", event.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn status_event(attempts: u32) -> ClientEvent {
        ClientEvent::ConnectionStatusChanged(ConnectionStatus {
            reconnect_attempts: attempts,
            ..ConnectionStatus::default()
        })
    }

    #[test]
    fn test_listeners_receive_events_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.subscribe(move |event| seen.lock().unwrap().push(format!("{}:{}", tag, event.name())));
        }
        bus.emit(&status_event(0));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                format!("first:{}", WS_CONNECTION_STATUS_EVENT),
                format!("second:{}", WS_CONNECTION_STATUS_EVENT)
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        let id = bus.subscribe(move |_| *counter.lock().unwrap() += 1);
        bus.emit(&status_event(0));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id), "重复取消订阅应返回 false");
        bus.emit(&status_event(1));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let bus = EventBus::new();
        let delivered = Arc::new(Mutex::new(false));
        bus.subscribe(|_| panic!("listener failure"));
        let flag = delivered.clone();
        bus.subscribe(move |_| *flag.lock().unwrap() = true);
        bus.emit(&ClientEvent::DashboardUpdate(serde_json::json!({})));
        assert!(*delivered.lock().unwrap());
    }

    #[tokio::test]
    async fn test_channel_subscription_and_cleanup() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe_channel();
        bus.emit(&status_event(3));
        match rx.recv().await {
            Some(ClientEvent::ConnectionStatusChanged(status)) => assert_eq!(status.reconnect_attempts, 3),
            other => panic!("预期连接状态事件，实际为: {:?}", other),
        }

        drop(rx);
        assert_eq!(bus.listener_count(), 1);
        bus.emit(&status_event(4));
        assert_eq!(bus.listener_count(), 0, "接收端丢弃后监听器应被移除");
    }

    #[test]
    fn test_event_serializes_with_name_tag() {
        let value = serde_json::to_value(ClientEvent::DashboardUpdate(serde_json::json!({ "k": 1 }))).unwrap();
        assert_eq!(value["event"], "dashboard_update");
        assert_eq!(value["payload"]["k"], 1);
    }
}
