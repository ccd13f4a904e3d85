// PanelRealtimeClient/src/error.rs

//! 实时客户端的自定义错误类型。
//!
//! 按"永不让宿主崩溃"的约定，连接错误、解析错误、发送失败都不会以 `Err` 抛给调用方，
//! 而是写入 `ConnectionStatus` 或记录日志。这里的错误类型只覆盖配置类问题，
//! 以及桌面提醒实现向路由层报告（随后被吞掉）的失败。

use thiserror::Error;

/// 客户端服务对外暴露的错误。
#[derive(Error, Debug)]
pub enum RealtimeClientError {
    /// 基础地址或拼装出的连接地址无效。
    #[error("无效的 WebSocket 地址: {0}")]
    InvalidUrl(String),

    /// `connect` 必须在 Tokio 运行时中调用。
    #[error("当前线程没有可用的 Tokio 运行时")]
    RuntimeUnavailable,
}

/// 桌面通知 / 提示音的失败原因。路由层只记录 debug 日志，不向上传播。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DesktopNotificationError {
    /// 用户未授予通知权限。
    #[error("通知权限被拒绝")]
    PermissionDenied,

    /// 宿主禁止自动播放声音。
    #[error("提示音被自动播放策略阻止")]
    AutoplayBlocked,

    /// 当前环境不支持。
    #[error("桌面提醒不可用: {0}")]
    Unavailable(String),
}
