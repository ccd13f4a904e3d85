// rust_websocket_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 本模块封装底层 WebSocket 库（`tokio-tungstenite`）的客户端细节：
//! - **连接建立**: `transport::connect_client`。
//! - **消息传输**: `ClientConnection::send_text` / `send_message` 以及 `transport::receive_frame`。
//! - **连接结束**: 以 `CloseInfo`（关闭码 + 原因）的形式报告，供上层决定是否重连。

pub mod transport;
