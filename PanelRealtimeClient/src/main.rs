// PanelRealtimeClient/src/main.rs

//! `panel-realtime-client` 命令行入口。
//!
//! 加载配置，以命令行或环境变量提供的凭据连接服务端，记录收到的每一个客户端事件，
//! 收到 Ctrl-C 后主动断开并退出。

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use panel_realtime_client::notifications::NotificationStore;
use panel_realtime_client::{ClientEvent, Credentials, RealtimeClient, RealtimeClientConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "panel-realtime-client", version, about = "管理面板实时客户端")]
struct Args {
    /// 配置文件路径；缺省时读取 config/realtime_client_config.json，不存在则使用默认配置。
    #[arg(long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的服务端基础地址。
    #[arg(long, env = "PANEL_WS_URL")]
    ws_url: Option<String>,

    #[arg(long, env = "PANEL_TOKEN")]
    token: String,

    #[arg(long, env = "PANEL_TENANT_ID")]
    tenant_id: String,

    #[arg(long, env = "PANEL_USER_ID")]
    user_id: String,

    /// 以坐席身份连接时提供，连接后会广播上线状态。
    #[arg(long, env = "PANEL_AGENT_ID")]
    agent_id: Option<String>,

    #[arg(long, env = "PANEL_USER_NAME")]
    user_name: Option<String>,
}

fn load_config(args: &Args) -> Result<RealtimeClientConfig> {
    let mut config = match &args.config {
        Some(path) => RealtimeClientConfig::load_from(path)?,
        None => RealtimeClientConfig::load().unwrap_or_else(|e| {
            warn!("{:#}，使用默认配置。", e);
            RealtimeClientConfig::default()
        }),
    };
    if let Some(ws_url) = &args.ws_url {
        config.ws_base_url = ws_url.clone();
        config.validate().context("命令行提供的服务端地址无效")?;
    }
    Ok(config)
}

fn log_event(event: &ClientEvent) {
    match event {
        ClientEvent::ConnectionStatusChanged(status) => info!(
            "[事件] 连接状态: connected={}, connecting={}, attempts={}, error={:?}",
            status.is_connected, status.is_connecting, status.reconnect_attempts, status.error
        ),
        ClientEvent::TypingIndicatorsChanged {
            conversation_id,
            indicators,
        } => info!("[事件] 会话 {} 正在输入: {} 人", conversation_id, indicators.len()),
        ClientEvent::AgentStatusChanged(status) => {
            info!("[事件] 坐席 {} 状态: {}", status.agent_id, status.status)
        }
        ClientEvent::DashboardUpdate(data) => info!("[事件] 仪表盘刷新: {}", data),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 默认级别为 Info，客户端相关 crate 为 Debug
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("panel_realtime_client", LevelFilter::Debug)
        .filter_module("rust_websocket_utils", LevelFilter::Debug)
        .parse_default_env()
        .try_init()
        .context("初始化 env_logger 日志服务失败")?;

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("面板实时客户端正在启动，服务端: {}", config.ws_base_url);

    let notifications = Arc::new(NotificationStore::new());
    let client = RealtimeClient::builder(config)
        .notification_sink(notifications.clone())
        .build();
    client.subscribe(log_event);

    let mut credentials = Credentials::new(args.token, args.tenant_id, args.user_id);
    if let Some(agent_id) = args.agent_id {
        credentials = credentials.with_agent_id(agent_id);
    }
    if let Some(user_name) = args.user_name {
        credentials = credentials.with_user_name(user_name);
    }
    client.connect(credentials)?;

    tokio::signal::ctrl_c().await.context("等待 Ctrl-C 信号失败")?;
    info!("收到退出信号，正在断开连接...");
    client.disconnect();
    // 给连接任务留出发送关闭帧的时间
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!(
        "本次运行共收到 {} 条通知 ({} 条未读)。",
        notifications.len(),
        notifications.unread_count()
    );
    Ok(())
}
