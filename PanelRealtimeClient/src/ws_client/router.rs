// PanelRealtimeClient/src/ws_client/router.rs

//! 入站帧路由。
//!
//! 每个文本帧先解析为 `WsMessage`（解析失败只记录日志并丢弃），然后按顺序：
//! 1. 调用为该事件类型注册的外部处理器（按注册顺序，彼此隔离，某个处理器 panic 不影响后续处理器）；
//! 2. 执行内置行为（通知、输入指示、坐席状态缓存、仪表盘刷新等）。

use crate::config::RealtimeClientConfig;
use crate::event::{ClientEvent, EventBus};
use crate::notifications::{DesktopNotifier, NewNotification, NotificationKind, NotificationSink};
use crate::state::{self, Credentials};
use crate::ws_client::typing::TypingIndicatorRegistry;
use common_models::ws_payloads::{ConversationAssignedPayload, NewMessagePayload, NotificationPayload, TypingPayload};
use common_models::{AgentStatus, WsEventType};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use rust_websocket_utils::message::WsMessage;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

/// 外部注册的帧处理器。`off` 按 `Arc` 指针身份移除。
pub type MessageHandler = Arc<dyn Fn(&WsMessage) + Send + Sync>;

/// 新消息通知正文的最大字符数。
const MESSAGE_PREVIEW_MAX_CHARS: usize = 100;
const DEFAULT_NOTIFICATION_TITLE: &str = "Notification";

/// 把入站帧分发给外部处理器与内置行为，并缓存最近的坐席状态。
pub struct MessageRouter {
    handlers: RwLock<HashMap<WsEventType, Vec<MessageHandler>>>,
    notifications: Arc<dyn NotificationSink>,
    desktop: Arc<dyn DesktopNotifier>,
    typing: Arc<TypingIndicatorRegistry>,
    agent_statuses: DashMap<String, AgentStatus>,
    events: Arc<EventBus>,
    sound_enabled: bool,
    desktop_notifications_enabled: bool,
}

impl MessageRouter {
    /// 创建路由器。
    ///
    /// # 参数
    /// * `config`: 读取提示音与桌面通知开关。
    /// * `notifications` / `desktop`: 内置行为产生的通知与提醒去向。
    /// * `typing`: 输入指示注册表，`typing_start` / `typing_stop` 写入这里。
    /// * `events`: 坐席状态、会话分配与仪表盘刷新事件的发布目标。
    pub fn new(
        config: &RealtimeClientConfig,
        notifications: Arc<dyn NotificationSink>,
        desktop: Arc<dyn DesktopNotifier>,
        typing: Arc<TypingIndicatorRegistry>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            notifications,
            desktop,
            typing,
            agent_statuses: DashMap::new(),
            events,
            sound_enabled: config.sound_enabled,
            desktop_notifications_enabled: config.desktop_notifications_enabled,
        }
    }

    /// 为某个事件类型追加一个处理器。同一个处理器重复注册会被调用多次。
    pub fn on(&self, event_type: WsEventType, handler: MessageHandler) {
        state::write(&self.handlers).entry(event_type).or_default().push(handler);
    }

    /// 移除第一个与 `handler` 为同一 `Arc` 的注册；返回是否找到。
    pub fn off(&self, event_type: &WsEventType, handler: &MessageHandler) -> bool {
        let mut handlers = state::write(&self.handlers);
        let Some(list) = handlers.get_mut(event_type) else {
            return false;
        };
        let Some(pos) = list.iter().position(|existing| Arc::ptr_eq(existing, handler)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            handlers.remove(event_type);
        }
        true
    }

    /// 某个事件类型下当前注册的处理器数量。
    pub fn handler_count(&self, event_type: &WsEventType) -> usize {
        state::read(&self.handlers).get(event_type).map_or(0, Vec::len)
    }

    /// 最近一次收到的某坐席状态。
    pub fn agent_status(&self, agent_id: &str) -> Option<AgentStatus> {
        self.agent_statuses.get(agent_id).map(|entry| entry.value().clone())
    }

    /// 全部已缓存的坐席状态（按坐席 ID 排序）。
    pub fn agent_statuses(&self) -> Vec<AgentStatus> {
        let mut statuses: Vec<AgentStatus> = self.agent_statuses.iter().map(|entry| entry.value().clone()).collect();
        statuses.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        statuses
    }

    /// 处理一条入站文本帧；返回是否解析成功。
    ///
    /// `local` 是当前连接使用的凭据，用于识别本人发出的消息和分配给本坐席的会话。
    pub fn route(&self, text: &str, local: Option<&Credentials>) -> bool {
        let message = match WsMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("[消息路由] 丢弃无法解析的帧: {}", e);
                return false;
            }
        };
        debug!(
            "[消息路由] 收到帧: Type={}, Conversation={:?}, Timestamp={}",
            message.event_type, message.conversation_id, message.timestamp
        );
        self.dispatch_to_handlers(&message);
        self.apply_builtin(&message, local);
        true
    }

    fn dispatch_to_handlers(&self, message: &WsMessage) {
        // 在锁外调用处理器，处理器内部可以再调用 on/off
        let snapshot: Vec<MessageHandler> = state::read(&self.handlers)
            .get(&message.event_type)
            .cloned()
            .unwrap_or_default();
        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                error!("[消息路由] 类型为 '{}' 的处理器发生 panic，已跳过。", message.event_type);
            }
        }
    }

    fn apply_builtin(&self, message: &WsMessage, local: Option<&Credentials>) {
        match &message.event_type {
            WsEventType::ConnectionEstablished => {
                info!("[消息路由] 服务端确认连接已建立 (tenant: {})", message.tenant_id);
            }
            WsEventType::Notification => self.on_notification(message),
            WsEventType::MessageReceived => self.on_message_received(message, local),
            WsEventType::TypingStart => self.on_typing_start(message),
            WsEventType::TypingStop => self.on_typing_stop(message),
            WsEventType::AgentStatusChange => self.on_agent_status_change(message),
            WsEventType::ConversationAssigned => self.on_conversation_assigned(message, local),
            WsEventType::DashboardUpdate => {
                self.events.emit(&ClientEvent::DashboardUpdate(message.data.clone()));
            }
            WsEventType::MessageSent | WsEventType::ConversationTransferred | WsEventType::ConversationClosed => {}
            WsEventType::Unknown(raw) => {
                warn!("[消息路由] 未知的事件类型 '{}'，已忽略。", raw);
            }
        }
    }

    fn on_notification(&self, message: &WsMessage) {
        let payload: NotificationPayload = self.payload_or_default(message);
        let kind = NotificationKind::from_priority(payload.priority.as_deref());
        self.notifications.add_notification(NewNotification::new(
            kind,
            payload.title.unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string()),
            payload.message.unwrap_or_default(),
        ));
    }

    fn on_message_received(&self, message: &WsMessage, local: Option<&Credentials>) {
        if local.is_some_and(|credentials| credentials.user_id == message.user_id) {
            debug!("[消息路由] 忽略本人发出的消息。");
            return;
        }
        let payload: NewMessagePayload = self.payload_or_default(message);
        let title = match payload.sender_name.as_deref().filter(|name| !name.is_empty()) {
            Some(sender) => format!("New message from {}", sender),
            None => "New message".to_string(),
        };
        let body = truncate_chars(payload.content.as_deref().unwrap_or_default(), MESSAGE_PREVIEW_MAX_CHARS);
        self.notifications
            .add_notification(NewNotification::new(NotificationKind::Info, title.clone(), body.clone()));

        if self.sound_enabled {
            if let Err(e) = self.desktop.play_sound() {
                debug!("[消息路由] 提示音播放失败，已忽略: {}", e);
            }
        }
        if self.desktop_notifications_enabled && self.desktop.is_page_hidden() {
            if let Err(e) = self.desktop.show(&title, &body) {
                debug!("[消息路由] 桌面通知失败，已忽略: {}", e);
            }
        }
    }

    fn on_typing_start(&self, message: &WsMessage) {
        let Some(conversation_id) = message.conversation_id.as_deref() else {
            warn!("[消息路由] typing_start 缺少 conversationId，已忽略。");
            return;
        };
        let payload: TypingPayload = self.payload_or_default(message);
        let user_name = payload.user_name.unwrap_or_else(|| message.user_id.clone());
        self.typing
            .start(conversation_id, &message.user_id, message.agent_id.clone(), &user_name);
    }

    fn on_typing_stop(&self, message: &WsMessage) {
        match message.conversation_id.as_deref() {
            Some(conversation_id) => {
                self.typing.stop(conversation_id, &message.user_id);
            }
            None => warn!("[消息路由] typing_stop 缺少 conversationId，已忽略。"),
        }
    }

    fn on_agent_status_change(&self, message: &WsMessage) {
        let status: AgentStatus = match message.deserialize_data() {
            Ok(status) => status,
            Err(e) => {
                warn!("[消息路由] 坐席状态负载无效，已忽略: {}", e);
                return;
            }
        };
        debug!("[消息路由] 坐席 {} 状态更新为 {}", status.agent_id, status.status);
        self.agent_statuses.insert(status.agent_id.clone(), status.clone());
        self.events.emit(&ClientEvent::AgentStatusChanged(status));
    }

    fn on_conversation_assigned(&self, message: &WsMessage, local: Option<&Credentials>) {
        let payload: ConversationAssignedPayload = self.payload_or_default(message);
        let target = payload.agent_id.as_deref().or(message.agent_id.as_deref());
        let local_agent = local.and_then(|credentials| credentials.agent_id.as_deref());
        if let Some(target) = target {
            if local_agent != Some(target) {
                debug!("[消息路由] 会话分配给其他坐席 {}，不提醒。", target);
                return;
            }
        }
        let body = match payload.customer_name.as_deref() {
            Some(customer) => format!("You have been assigned a conversation with {}", customer),
            None => "A conversation has been assigned to you".to_string(),
        };
        self.notifications.add_notification(NewNotification::new(
            NotificationKind::Info,
            "Conversation assigned",
            body,
        ));
    }

    /// 入站负载不做校验；结构不符时按空负载处理。
    fn payload_or_default<T>(&self, message: &WsMessage) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if message.data.is_null() {
            return T::default();
        }
        message.deserialize_data().unwrap_or_else(|e| {
            debug!("[消息路由] {}", e);
            T::default()
        })
    }
}

/// 按字符截断，超出时追加省略号。
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}
