// PanelRealtimeClient/src/config.rs

//! 实时客户端的配置管理模块。
//!
//! 定义客户端运行所需的配置结构（服务端地址、心跳间隔、重连参数、输入指示有效期、提醒开关），
//! 并提供从 JSON 配置文件加载的逻辑。配置文件中的每个字段都是可选的，缺省时使用内置默认值。

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认的配置文件目录（相对于当前工作目录）。
pub const DEFAULT_CONFIG_DIR: &str = "config";
/// 默认的配置文件名。
pub const DEFAULT_CONFIG_FILE: &str = "realtime_client_config.json";

/// WebSocket 实时客户端配置。
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RealtimeClientConfig {
    /// 服务端基础地址，连接时在其后拼接 `/v1/ws`。
    ///
    /// **示例**: `"ws://127.0.0.1:8000"` 或 `"wss://panel.example.com"`。
    pub ws_base_url: String,
    /// 心跳间隔（毫秒）。
    pub heartbeat_interval_ms: u64,
    /// 重连退避的基础间隔（毫秒），第 n 次重连前等待 `base * 2^n`。
    pub reconnect_base_interval_ms: u64,
    /// 最大重连次数，达到后不再自动重连。
    pub max_reconnect_attempts: u32,
    /// "正在输入"指示的有效期（毫秒）。
    pub typing_expiry_ms: u64,
    /// 收到新消息时是否播放提示音。
    pub sound_enabled: bool,
    /// 页面不可见时是否弹出桌面通知。
    pub desktop_notifications_enabled: bool,
}

impl Default for RealtimeClientConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://127.0.0.1:8000".to_string(),
            heartbeat_interval_ms: 30_000,
            reconnect_base_interval_ms: 1_000,
            max_reconnect_attempts: 10,
            typing_expiry_ms: 10_000,
            sound_enabled: true,
            desktop_notifications_enabled: true,
        }
    }
}

impl RealtimeClientConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn reconnect_base_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_interval_ms)
    }

    pub fn typing_expiry(&self) -> Duration {
        Duration::from_millis(self.typing_expiry_ms)
    }

    /// 从默认位置 `config/realtime_client_config.json` 加载配置。
    ///
    /// 文件不存在时返回错误，调用方可据此回退到 `RealtimeClientConfig::default()`。
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE);
        if !config_path.exists() {
            log::warn!("[实时客户端配置] 配置文件 '{}' 未找到。", config_path.display());
            return Err(anyhow!(
                "客户端配置文件 '{}' 未找到。请确保配置文件存在于 '{}' 目录下。",
                config_path.display(),
                DEFAULT_CONFIG_DIR
            ));
        }
        Self::load_from(&config_path)
    }

    /// 从指定路径加载 JSON 配置文件。
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 '{}' 的内容。请检查文件权限和路径。", path.display()))?;
        let config = Self::from_json_str(&config_str)
            .with_context(|| format!("解析配置文件 '{}' 失败。", path.display()))?;
        log::info!(
            "[实时客户端配置] 已从 '{}' 加载配置。服务端地址: {}",
            path.display(),
            config.ws_base_url
        );
        Ok(config)
    }

    /// 从 JSON 文本解析配置并做基本校验。
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: RealtimeClientConfig = serde_json::from_str(text).with_context(|| {
            format!(
                "配置内容不是有效的 JSON 或不符合 {} 结构",
                std::any::type_name::<RealtimeClientConfig>()
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值。
    pub fn validate(&self) -> Result<()> {
        if self.ws_base_url.trim().is_empty() {
            return Err(anyhow!("ws_base_url 不能为空"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(anyhow!("heartbeat_interval_ms 必须大于 0"));
        }
        if self.typing_expiry_ms == 0 {
            return Err(anyhow!("typing_expiry_ms 必须大于 0"));
        }
        Ok(())
    }
}
