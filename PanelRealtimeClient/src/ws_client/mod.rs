// PanelRealtimeClient/src/ws_client/mod.rs

//! WebSocket 客户端模块。
//!
//! - `service`：连接生命周期与对外 API (`RealtimeClient`)。
//! - `router`：入站帧的解析与分发。
//! - `reconnect`：指数退避重连策略。
//! - `heartbeat`：心跳监视器。
//! - `typing`："正在输入"指示注册表。

pub mod heartbeat;
pub mod reconnect;
pub mod router;
pub mod service;
pub mod typing;

pub use heartbeat::HeartbeatMonitor;
pub use reconnect::{ReconnectDecision, ReconnectPolicy, MAX_RECONNECT_ATTEMPTS_MESSAGE};
pub use router::{MessageHandler, MessageRouter};
pub use service::{build_ws_url, OutboundMessage, RealtimeClient, RealtimeClientBuilder, TokenRefresher};
pub use typing::TypingIndicatorRegistry;

/// 交给连接任务写出的命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// 原样发送的一条文本帧。
    Text(String),
    /// 以 1000 正常关闭连接，随后连接任务结束。
    Close,
}
