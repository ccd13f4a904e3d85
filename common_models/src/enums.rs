//! 通用枚举模块。
//!
//! 本模块定义了实时通信层中多个组件之间共享的枚举类型。
//! 所有枚举都派生 `Serialize`, `Deserialize`, `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`，
//! 以便既能出现在线上 JSON 中，也能作为 `HashMap` 的键（例如按事件类型注册处理器）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// WebSocket 帧的事件类型 (`type` 字段)。
///
/// 线上以 snake_case 字符串表示。服务端可能下发客户端尚不认识的类型，
/// 这些类型会被保留在 `Unknown` 中而不是导致整帧解析失败，由路由层记录日志后忽略。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum WsEventType {
    /// 服务端确认连接已建立。
    ConnectionEstablished,
    /// 会话中收到一条新消息。
    MessageReceived,
    /// 本端或其他坐席发出的消息已送达服务端。
    MessageSent,
    /// 某用户开始输入。
    TypingStart,
    /// 某用户停止输入。
    TypingStop,
    /// 坐席在线状态变更（广播）。
    AgentStatusChange,
    /// 会话被分配给坐席。
    ConversationAssigned,
    /// 会话被转接。
    ConversationTransferred,
    /// 会话已关闭。
    ConversationClosed,
    /// 仪表盘数据需要刷新。
    DashboardUpdate,
    /// 通用通知。
    Notification,
    /// 未识别的事件类型，保留原始字符串。
    Unknown(String),
}

impl WsEventType {
    /// 返回该事件类型在线上使用的字符串。
    pub fn as_str(&self) -> &str {
        match self {
            WsEventType::ConnectionEstablished => "connection_established",
            WsEventType::MessageReceived => "message_received",
            WsEventType::MessageSent => "message_sent",
            WsEventType::TypingStart => "typing_start",
            WsEventType::TypingStop => "typing_stop",
            WsEventType::AgentStatusChange => "agent_status_change",
            WsEventType::ConversationAssigned => "conversation_assigned",
            WsEventType::ConversationTransferred => "conversation_transferred",
            WsEventType::ConversationClosed => "conversation_closed",
            WsEventType::DashboardUpdate => "dashboard_update",
            WsEventType::Notification => "notification",
            WsEventType::Unknown(raw) => raw.as_str(),
        }
    }

    /// 是否为协议中已知的事件类型。
    pub fn is_known(&self) -> bool {
        !matches!(self, WsEventType::Unknown(_))
    }
}

impl From<&str> for WsEventType {
    fn from(raw: &str) -> Self {
        match raw {
            "connection_established" => WsEventType::ConnectionEstablished,
            "message_received" => WsEventType::MessageReceived,
            "message_sent" => WsEventType::MessageSent,
            "typing_start" => WsEventType::TypingStart,
            "typing_stop" => WsEventType::TypingStop,
            "agent_status_change" => WsEventType::AgentStatusChange,
            "conversation_assigned" => WsEventType::ConversationAssigned,
            "conversation_transferred" => WsEventType::ConversationTransferred,
            "conversation_closed" => WsEventType::ConversationClosed,
            "dashboard_update" => WsEventType::DashboardUpdate,
            "notification" => WsEventType::Notification,
            other => WsEventType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for WsEventType {
    fn from(raw: String) -> Self {
        WsEventType::from(raw.as_str())
    }
}

impl From<WsEventType> for String {
    fn from(event_type: WsEventType) -> Self {
        match event_type {
            WsEventType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WsEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 坐席在线状态。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentPresence {
    /// 在线，可接待。
    Online,
    /// 忙碌。
    Busy,
    /// 暂时离开。
    Away,
    /// 离线。
    Offline,
}

impl fmt::Display for AgentPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AgentPresence::Online => "online",
            AgentPresence::Busy => "busy",
            AgentPresence::Away => "away",
            AgentPresence::Offline => "offline",
        };
        f.write_str(text)
    }
}
