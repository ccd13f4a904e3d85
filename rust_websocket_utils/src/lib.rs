//! `rust_websocket_utils` 是一个提供 WebSocket 通信实用功能的 Rust Crate。
//! 它封装了 `tokio-tungstenite` 的客户端细节，并定义了与 `common_models`
//! 配合使用的 JSON 帧结构。
//!
//! 主要模块包括：
//! - `message`: 定义线上帧结构 `WsMessage` 与心跳帧 `HeartbeatFrame`。
//! - `error`: 定义库中使用的统一错误类型 `WsError`。
//! - `client`: 提供 WebSocket 客户端传输层。

pub mod client;
pub mod error;
pub mod message;
