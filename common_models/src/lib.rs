//! `common_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了管理面板实时通信层中被多个组件共享的数据结构和枚举类型：
//! `rust_websocket_utils` 的帧定义、`panel_realtime_client` 的路由与状态缓存，
//! 以及前端（通过 TypeScript 类型对应）看到的 JSON 形状都以这里为准。
//!
//! 主要包含以下类型的模型：
//! - **通用枚举 (`enums`)**: WebSocket 事件类型 `WsEventType`、坐席在线状态 `AgentPresence`。
//! - **WebSocket 消息负载 (`ws_payloads`)**: 各类入站/出站帧 `data` 字段的结构体及消息类型常量。
//! - **在线状态模型 (`presence_models`)**: `TypingIndicator`（正在输入指示）与 `AgentStatus`（坐席状态）。
//!
//! 设计原则：
//! - **序列化/反序列化**: 所有模型都派生 `serde::Serialize` 和 `serde::Deserialize`，线上字段统一为 camelCase。
//! - **可调试性与克隆**: 所有模型也派生 `Debug` 和 `Clone`。

pub mod enums; // 通用枚举类型定义
pub mod presence_models; // 正在输入指示与坐席状态模型
pub mod ws_payloads; // WebSocket 帧中 data 字段的负载结构体

pub use enums::{AgentPresence, WsEventType};
pub use presence_models::{AgentStatus, TypingIndicator};
