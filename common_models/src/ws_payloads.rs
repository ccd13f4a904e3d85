// common_models/src/ws_payloads.rs

//! 包含 WebSocket 帧中 `data` 字段使用的各种 Payload 结构体定义。
//!
//! 入站帧只做 JSON 解析、不做模式校验，因此这里的字段几乎都是可选的或带默认值，
//! 缺字段时由使用方决定回退行为。

use crate::enums::AgentPresence;
use serde::{Deserialize, Serialize};

/// 心跳帧的类型字符串。它不属于 `WsEventType`，只在出站方向使用。
pub const PING_MESSAGE_TYPE: &str = "ping";

/// `notification` 事件的负载。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// 优先级："low" / "normal" / "high" / "urgent"，其它值按普通处理。
    #[serde(default)]
    pub priority: Option<String>,
}

/// `message_received` 事件的负载。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// `typing_start` / `typing_stop` 事件的负载。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(default)]
    pub user_name: Option<String>,
}

/// `conversation_assigned` 事件的负载。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAssignedPayload {
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// 被分配到的坐席；缺省时以帧上的 `agentId` 为准。
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

/// 本端出站的坐席状态上报负载（`agent_status_change`）。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusUpdatePayload {
    pub agent_id: String,
    pub status: AgentPresence,
}
