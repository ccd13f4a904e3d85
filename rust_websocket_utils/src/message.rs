// rust_websocket_utils/src/message.rs

//! 定义 WebSocket 通信中使用的线上帧结构。
//!
//! 本模块主要包含 `WsMessage` 结构体：客户端与服务端之间交换的每一条业务帧都是它的 JSON 形式，
//! 形如 `{ type, tenantId, userId, conversationId?, agentId?, data, timestamp }`。
//! 另有 `HeartbeatFrame`，即仅包含 `type` 与 `timestamp` 的心跳帧。
//!
//! 入站帧按"原样信任"处理：除 `type` 之外的字段缺失时取默认值，不做进一步的模式校验。
//! 出站帧在发送前总是用当前时间戳覆盖 `timestamp`。

use crate::error::WsError;
use chrono::{SecondsFormat, Utc};
use common_models::WsEventType;
use common_models::ws_payloads::PING_MESSAGE_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 生成当前 UTC 时间的 RFC 3339 字符串（毫秒精度，`Z` 结尾）。
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `WsMessage` 代表客户端与 WebSocket 服务器之间交换的一条业务帧。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage {
    /// 事件类型，决定接收方如何解释 `data`。
    #[serde(rename = "type")]
    pub event_type: WsEventType,

    /// 所属租户。
    #[serde(default)]
    pub tenant_id: String,

    /// 发出该帧的用户。
    #[serde(default)]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// 不透明的业务负载，具体结构由 `event_type` 决定。
    #[serde(default)]
    pub data: Value,

    /// 帧的时间戳。出站为 RFC 3339 字符串；入站如果是数字则转为其十进制字符串。
    #[serde(default, deserialize_with = "timestamp_from_any")]
    pub timestamp: String,
}

impl WsMessage {
    /// 创建一个新的出站帧，`data` 为空，时间戳为当前时间。
    pub fn new(event_type: WsEventType, tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        WsMessage {
            event_type,
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            conversation_id: None,
            agent_id: None,
            data: Value::Null,
            timestamp: current_timestamp(),
        }
    }

    /// 用当前时间覆盖时间戳。
    pub fn stamp_now(&mut self) {
        self.timestamp = current_timestamp();
    }

    /// 将帧序列化为 JSON 文本。
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self)
            .map_err(|e| WsError::SerializationError(format!("WsMessage 序列化为JSON失败: {}", e)))
    }

    /// 从 JSON 文本解析一条帧。
    pub fn from_json(text: &str) -> Result<Self, WsError> {
        serde_json::from_str(text).map_err(|e| {
            WsError::DeserializationError(format!("文本反序列化为 WsMessage 失败: {}, 原始文本: '{}'", e, text))
        })
    }

    /// 将 `data` 反序列化为指定的目标类型 `T`。
    pub fn deserialize_data<T: DeserializeOwned>(&self) -> Result<T, WsError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            WsError::DeserializationError(format!(
                "类型为 '{}' 的帧负载反序列化失败: {}, 原始负载: '{}'",
                self.event_type, e, self.data
            ))
        })
    }
}

fn timestamp_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// 心跳帧：`{ "type": "ping", "timestamp": ... }`。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HeartbeatFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub timestamp: String,
}

impl HeartbeatFrame {
    /// 以当前时间构造一个心跳帧。
    pub fn now() -> Self {
        HeartbeatFrame {
            frame_type: PING_MESSAGE_TYPE,
            timestamp: current_timestamp(),
        }
    }

    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self)
            .map_err(|e| WsError::SerializationError(format!("心跳帧序列化失败: {}", e)))
    }
}
