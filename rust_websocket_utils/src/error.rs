// rust_websocket_utils/src/error.rs

//! 传输层错误类型。
//!
//! 上层客户端不会把这些错误抛给调用方，而是把 `Display` 文本写入连接状态的 `error` 字段，
//! 因此每个变体的提示文本都应能直接展示给用户。

use thiserror::Error;

/// 传输层的统一错误类型。
#[derive(Error, Debug)]
pub enum WsError {
    /// 出站帧序列化失败。
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 入站文本不是合法的帧，或 `data` 不符合期望的负载结构。
    #[error("反序列化错误: {0}")]
    DeserializationError(String),

    /// 握手失败、连接被重置等 WebSocket 协议层错误。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 连接地址不是 ws/wss。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),
}
