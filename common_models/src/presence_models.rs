//! 在线状态相关模型：正在输入指示 (`TypingIndicator`) 与坐席状态 (`AgentStatus`)。

use crate::enums::AgentPresence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 某个用户在某个会话中"正在输入"的短生命周期记录。
///
/// 由客户端的输入指示注册表持有，以 `conversation_id` 分组；
/// 在收到 `typing_start` 时创建，在 `typing_stop` 或超时后移除。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub conversation_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub user_name: String,
    pub started_at: DateTime<Utc>,
}

/// 坐席的在线状态视图。
///
/// 权威状态由服务端或其他客户端产生，本端只缓存每个坐席最近一次收到的广播。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub agent_id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub status: AgentPresence,
    /// 该坐席当前正在处理的会话 ID 集合。
    #[serde(default)]
    pub current_conversations: BTreeSet<String>,
    #[serde(default = "Utc::now")]
    pub last_seen: DateTime<Utc>,
    /// 设备信息，结构由上报方决定。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<serde_json::Value>,
}
