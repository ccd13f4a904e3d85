// PanelRealtimeClient/src/lib.rs

//! 多租户管理面板的实时客户端库。
//!
//! 负责与服务端 `/v1/ws` 保持 WebSocket 连接，并把推送的帧转化为站内通知、
//! "正在输入"指示、坐席状态与仪表盘刷新事件。

// --- 公开模块声明 ---
pub mod config; // 客户端配置加载与默认值
pub mod error; // 客户端错误类型
pub mod event; // 客户端事件与进程内事件总线
pub mod notifications; // 通知存储与桌面提醒接口
pub mod state; // 连接状态、凭据与认证会话模型
pub mod ws_client; // WebSocket 客户端服务

pub use config::RealtimeClientConfig;
pub use error::RealtimeClientError;
pub use event::{ClientEvent, EventBus, SubscriptionId};
pub use state::{AuthSession, AuthUser, ConnectionStatus, Credentials};
pub use ws_client::{OutboundMessage, RealtimeClient, RealtimeClientBuilder};
