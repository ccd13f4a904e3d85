// PanelRealtimeClient/src/ws_client/service.rs

//! 面板实时客户端服务。
//!
//! `RealtimeClient` 管理与服务端 `/v1/ws` 的 WebSocket 连接，包括连接建立、断开、
//! 消息收发、心跳、非正常关闭后的指数退避重连，以及把连接状态同步给事件总线的订阅者。
//!
//! 每个套接字由一个连接任务独占：它在 `tokio::select!` 中同时等待入站帧与出站命令。
//! 客户端内部维护一个递增的会话代号 (generation)，`disconnect` 与手动 `connect` 都会让它加一，
//! 旧代号的连接任务和重连定时器在观察到代号变化后不再修改任何状态。

use crate::config::RealtimeClientConfig;
use crate::error::RealtimeClientError;
use crate::event::{ClientEvent, EventBus, SubscriptionId};
use crate::notifications::{DesktopNotifier, NoopDesktopNotifier, NotificationSink, NotificationStore};
use crate::state::{self, AuthSession, ConnectionStatus, Credentials};
use crate::ws_client::heartbeat::HeartbeatMonitor;
use crate::ws_client::reconnect::{ReconnectDecision, ReconnectPolicy, MAX_RECONNECT_ATTEMPTS_MESSAGE};
use crate::ws_client::router::{MessageHandler, MessageRouter};
use crate::ws_client::typing::TypingIndicatorRegistry;
use crate::ws_client::OutboundCommand;
use chrono::Utc;
use common_models::ws_payloads::AgentStatusUpdatePayload;
use common_models::{AgentPresence, AgentStatus, TypingIndicator, WsEventType};
use log::{debug, error, info, warn};
use rust_websocket_utils::client::transport::{self, CloseInfo, ReceivedFrame, CLOSE_CODE_NORMAL};
use rust_websocket_utils::message::WsMessage;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// 重连前调用的令牌刷新钩子：返回 `Some(token)` 时替换当前令牌，返回 `None` 时沿用原令牌。
pub type TokenRefresher = Arc<dyn Fn(&Credentials) -> Option<String> + Send + Sync>;

/// 由 `send` 补全租户、用户与时间戳的出站帧。
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub event_type: WsEventType,
    pub conversation_id: Option<String>,
    pub agent_id: Option<String>,
    pub data: Value,
}

impl OutboundMessage {
    /// 创建一个不带会话、坐席与数据的出站帧。
    pub fn new(event_type: WsEventType) -> Self {
        Self {
            event_type,
            conversation_id: None,
            agent_id: None,
            data: Value::Null,
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_agent_id(mut self, agent_id: Option<String>) -> Self {
        self.agent_id = agent_id;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    fn into_ws_message(self, credentials: &Credentials) -> WsMessage {
        let mut message = WsMessage::new(self.event_type, &credentials.tenant_id, &credentials.user_id);
        message.conversation_id = self.conversation_id;
        message.agent_id = self.agent_id;
        message.data = self.data;
        message.stamp_now();
        message
    }
}

/// 拼装连接地址：`{base}/v1/ws?token={token}&tenantId={tenantId}`。
pub fn build_ws_url(base_url: &str, credentials: &Credentials) -> Result<Url, RealtimeClientError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| RealtimeClientError::InvalidUrl(format!("'{}': {}", base_url, e)))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(RealtimeClientError::InvalidUrl(format!(
            "'{}': 协议必须是 ws 或 wss",
            base_url
        )));
    }
    let path = format!("{}/v1/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("token", &credentials.token)
        .append_pair("tenantId", &credentials.tenant_id);
    Ok(url)
}

#[derive(Default)]
struct Session {
    credentials: Option<Credentials>,
    outbound: Option<mpsc::UnboundedSender<OutboundCommand>>,
    connection_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
}

struct ClientInner {
    config: RealtimeClientConfig,
    policy: ReconnectPolicy,
    status: RwLock<ConnectionStatus>,
    session: Mutex<Session>,
    generation: AtomicU64,
    events: Arc<EventBus>,
    router: MessageRouter,
    typing: Arc<TypingIndicatorRegistry>,
    heartbeat: HeartbeatMonitor,
    token_refresher: Option<TokenRefresher>,
}

/// 构建 `RealtimeClient`，可替换通知存储、桌面提醒实现、事件总线与令牌刷新钩子。
pub struct RealtimeClientBuilder {
    config: RealtimeClientConfig,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    desktop_notifier: Option<Arc<dyn DesktopNotifier>>,
    events: Option<Arc<EventBus>>,
    token_refresher: Option<TokenRefresher>,
}

impl RealtimeClientBuilder {
    pub fn new(config: RealtimeClientConfig) -> Self {
        Self {
            config,
            notification_sink: None,
            desktop_notifier: None,
            events: None,
            token_refresher: None,
        }
    }

    /// 替换内置行为使用的通知存储，默认是内存中的 `NotificationStore`。
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    /// 替换桌面提醒与提示音实现，默认什么都不做。
    pub fn desktop_notifier(mut self, notifier: Arc<dyn DesktopNotifier>) -> Self {
        self.desktop_notifier = Some(notifier);
        self
    }

    /// 使用外部事件总线，便于与应用其他部分共享订阅。
    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// 设置重连前调用的令牌刷新钩子，见 `TokenRefresher`。
    pub fn token_refresher<F>(mut self, refresher: F) -> Self
    where
        F: Fn(&Credentials) -> Option<String> + Send + Sync + 'static,
    {
        self.token_refresher = Some(Arc::new(refresher));
        self
    }

    pub fn build(self) -> RealtimeClient {
        let events = self.events.unwrap_or_default();
        let notifications = self
            .notification_sink
            .unwrap_or_else(|| Arc::new(NotificationStore::new()));
        let desktop = self
            .desktop_notifier
            .unwrap_or_else(|| Arc::new(NoopDesktopNotifier));
        let typing = Arc::new(TypingIndicatorRegistry::new(self.config.typing_expiry(), events.clone()));
        let router = MessageRouter::new(&self.config, notifications, desktop, typing.clone(), events.clone());

        RealtimeClient {
            inner: Arc::new(ClientInner {
                policy: ReconnectPolicy::from_config(&self.config),
                heartbeat: HeartbeatMonitor::new(self.config.heartbeat_interval()),
                status: RwLock::new(ConnectionStatus::default()),
                session: Mutex::new(Session::default()),
                generation: AtomicU64::new(0),
                config: self.config,
                events,
                router,
                typing,
                token_refresher: self.token_refresher,
            }),
        }
    }
}

/// 面板实时客户端。克隆得到的实例共享同一条连接与同一份状态。
///
/// 连接生命周期内的后台任务持有客户端内部状态；不再使用时应调用 `disconnect`。
///
/// 所有对连接状态的修改都在会话锁内完成，并与会话代号的检查处于同一临界区：
/// 一旦 `disconnect` 或新的 `connect` 让代号前进，旧任务就再也写不进状态。
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl RealtimeClient {
    /// 使用默认的通知存储、空桌面提醒实现与新的事件总线创建客户端。
    pub fn new(config: RealtimeClientConfig) -> Self {
        RealtimeClientBuilder::new(config).build()
    }

    /// 返回一个可替换协作方的构建器。
    pub fn builder(config: RealtimeClientConfig) -> RealtimeClientBuilder {
        RealtimeClientBuilder::new(config)
    }

    pub fn config(&self) -> &RealtimeClientConfig {
        &self.inner.config
    }

    /// 发起连接。已在连接中或已连接时什么都不做。
    ///
    /// # 参数
    /// * `credentials`: 令牌、租户、用户以及可选的坐席 ID 与显示名。
    ///
    /// # 返回
    /// * `Ok(())`: 连接任务已安排（或因已在连接中而忽略本次调用）。
    ///   实际的连接结果通过 `ConnectionStatusChanged` 事件异步通知。
    /// * `Err(RealtimeClientError)`: 地址无效，或不在 Tokio 运行时中调用。
    ///
    /// 手动连接会清除终止错误并重置重连计数。
    pub fn connect(&self, credentials: Credentials) -> Result<(), RealtimeClientError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RealtimeClientError::RuntimeUnavailable)?;

        let url = match build_ws_url(&self.inner.config.ws_base_url, &credentials) {
            Ok(url) => url,
            Err(e) => {
                error!("[实时客户端] 无法建立连接: {}", e);
                let message = e.to_string();
                self.inner.update_status(|status| status.error = Some(message));
                return Err(e);
            }
        };

        let (generation, snapshot) = {
            let mut session = state::lock(&self.inner.session);
            let snapshot = {
                let mut status = state::write(&self.inner.status);
                if status.is_connecting || status.is_connected {
                    debug!("[实时客户端] 已在连接中或已连接，忽略重复的 connect 调用。");
                    return Ok(());
                }
                status.is_connecting = true;
                status.reconnect_attempts = 0;
                status.error = None;
                status.clone()
            };
            if let Some(pending) = session.reconnect_task.take() {
                pending.abort();
            }
            (self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1, snapshot)
        };
        self.inner.publish_status(snapshot);
        info!(
            "[实时客户端] 开始连接 (tenant: {}, user: {})",
            credentials.tenant_id, credentials.user_id
        );
        // 若在此之前已被 disconnect，代号已失效，不会再启动连接任务
        ClientInner::start_connection(&self.inner, &runtime, generation, credentials, url);
        Ok(())
    }

    /// 从认证会话派生凭据并连接。
    ///
    /// # 返回
    /// * `true`: 已发起连接。
    /// * `false`: 会话不完整（如没有租户的超级管理员），或连接无法发起。
    pub fn connect_session(&self, session: &AuthSession) -> bool {
        match Credentials::from_session(session) {
            Some(credentials) => self.connect(credentials).is_ok(),
            None => {
                info!("[实时客户端] 当前会话缺少用户、令牌或租户，不建立实时连接。");
                false
            }
        }
    }

    /// 主动断开：停止心跳、取消待执行的重连、以 1000 关闭连接、清空输入指示并标记为未连接。
    ///
    /// 无论当前处于哪个阶段（已连接、正在打开套接字、等待退避重连或空闲），调用后
    /// `is_connected` 与 `is_connecting` 都为 `false`，且不会再有新的连接发出。
    pub fn disconnect(&self) {
        let (outbound, connection_task, reconnect_task, snapshot) = {
            let mut session = state::lock(&self.inner.session);
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            session.credentials = None;
            let snapshot = self.inner.write_status(|status| {
                status.is_connected = false;
                status.is_connecting = false;
            });
            (
                session.outbound.take(),
                session.connection_task.take(),
                session.reconnect_task.take(),
                snapshot,
            )
        };
        info!("[实时客户端] 主动断开连接。");

        if let Some(pending) = reconnect_task {
            pending.abort();
        }
        self.inner.heartbeat.stop();
        let close_requested = outbound.is_some_and(|tx| tx.send(OutboundCommand::Close).is_ok());
        if !close_requested {
            if let Some(task) = connection_task {
                task.abort();
            }
        }
        self.inner.typing.clear();
        self.inner.publish_status(snapshot);
    }

    /// 发送一条帧，自动补全租户、用户与时间戳。
    ///
    /// # 返回
    /// * `true`: 帧已交给连接任务发送。
    /// * `false`: 连接未打开；记录警告，不做排队。
    pub fn send(&self, message: OutboundMessage) -> bool {
        self.inner.send(message)
    }

    /// 通知会话其他参与者本人开始输入；`data.userName` 取显示名，缺省时用用户 ID。
    ///
    /// 连接未打开时返回 `false`。
    pub fn start_typing(&self, conversation_id: &str) -> bool {
        self.send_typing(WsEventType::TypingStart, conversation_id)
    }

    /// 通知会话其他参与者本人停止输入；返回值同 `start_typing`。
    pub fn stop_typing(&self, conversation_id: &str) -> bool {
        self.send_typing(WsEventType::TypingStop, conversation_id)
    }

    /// 广播本坐席的状态；非坐席身份连接或连接未打开时返回 `false`。
    pub fn update_agent_status(&self, status: AgentPresence) -> bool {
        let Some(credentials) = self.inner.credentials() else {
            warn!("[实时客户端] 未连接，无法更新坐席状态。");
            return false;
        };
        match credentials.agent_id {
            Some(agent_id) => self.inner.send(agent_status_message(agent_id, status)),
            None => {
                warn!("[实时客户端] 当前用户不是坐席，无法更新坐席状态。");
                false
            }
        }
    }

    /// 为某个事件类型注册处理器。
    ///
    /// # 参数
    /// * `event_type`: 关心的事件类型，可以是 `WsEventType::Unknown`。
    /// * `handler`: 处理器；在内置行为之前按注册顺序调用。保留这个 `Arc` 以便之后 `off`。
    pub fn on(&self, event_type: WsEventType, handler: MessageHandler) {
        self.inner.router.on(event_type, handler);
    }

    /// 注销一个处理器（按 `Arc` 指针身份匹配）。
    ///
    /// # 返回
    /// * `true`: 找到并移除了一次注册。
    /// * `false`: 该处理器未注册在此事件类型下。
    pub fn off(&self, event_type: &WsEventType, handler: &MessageHandler) -> bool {
        self.inner.router.off(event_type, handler)
    }

    /// 当前连接状态的快照。
    pub fn status(&self) -> ConnectionStatus {
        state::read(&self.inner.status).clone()
    }

    /// 套接字是否已打开。
    pub fn is_connected(&self) -> bool {
        state::read(&self.inner.status).is_connected
    }

    /// 某个会话中仍在有效期内的输入指示，按开始时间排序。
    pub fn typing_indicators(&self, conversation_id: &str) -> Vec<TypingIndicator> {
        self.inner.typing.indicators(conversation_id)
    }

    /// 最近一次收到的某坐席状态；从未收到时为 `None`。
    pub fn agent_status(&self, agent_id: &str) -> Option<AgentStatus> {
        self.inner.router.agent_status(agent_id)
    }

    /// 全部已缓存的坐席状态，按坐席 ID 排序。
    pub fn agent_statuses(&self) -> Vec<AgentStatus> {
        self.inner.router.agent_statuses()
    }

    /// 客户端发布事件所用的事件总线。
    pub fn events(&self) -> Arc<EventBus> {
        self.inner.events.clone()
    }

    /// 订阅客户端事件，返回可用于取消订阅的 ID。监听器在发布事件的线程上同步调用。
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    fn send_typing(&self, event_type: WsEventType, conversation_id: &str) -> bool {
        let Some(credentials) = self.inner.credentials() else {
            warn!("[实时客户端] 未连接，无法发送输入状态。");
            return false;
        };
        let user_name = credentials.user_name.unwrap_or(credentials.user_id);
        self.inner.send(
            OutboundMessage::new(event_type)
                .with_conversation_id(conversation_id)
                .with_agent_id(credentials.agent_id)
                .with_data(json!({ "userName": user_name })),
        )
    }
}

fn agent_status_message(agent_id: String, status: AgentPresence) -> OutboundMessage {
    let payload = AgentStatusUpdatePayload {
        agent_id: agent_id.clone(),
        status,
    };
    OutboundMessage::new(WsEventType::AgentStatusChange)
        .with_agent_id(Some(agent_id))
        .with_data(serde_json::to_value(payload).unwrap_or(Value::Null))
}

// 锁顺序：session -> status。事件总是在两把锁都释放之后发布。
impl ClientInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn credentials(&self) -> Option<Credentials> {
        state::lock(&self.session).credentials.clone()
    }

    /// 修改连接状态并返回修改后的快照，不发布事件。
    ///
    /// 与代号有关的修改必须在持有会话锁、且已确认代号仍有效时调用。
    fn write_status<F>(&self, mutate: F) -> ConnectionStatus
    where
        F: FnOnce(&mut ConnectionStatus),
    {
        let mut status = state::write(&self.status);
        mutate(&mut status);
        status.clone()
    }

    fn publish_status(&self, snapshot: ConnectionStatus) {
        self.events.emit(&ClientEvent::ConnectionStatusChanged(snapshot));
    }

    /// 修改与会话代号无关的状态字段（如地址无效时的错误）并发布。
    fn update_status<F>(&self, mutate: F)
    where
        F: FnOnce(&mut ConnectionStatus),
    {
        let snapshot = self.write_status(mutate);
        self.publish_status(snapshot);
    }

    fn send(&self, message: OutboundMessage) -> bool {
        if !state::read(&self.status).is_connected {
            warn!("[实时客户端] 连接未打开，丢弃类型为 '{}' 的出站帧。", message.event_type);
            return false;
        }
        let (outbound, credentials) = {
            let session = state::lock(&self.session);
            (session.outbound.clone(), session.credentials.clone())
        };
        let (Some(outbound), Some(credentials)) = (outbound, credentials) else {
            warn!("[实时客户端] 连接未打开，丢弃类型为 '{}' 的出站帧。", message.event_type);
            return false;
        };
        let ws_message = message.into_ws_message(&credentials);
        match ws_message.to_json() {
            Ok(json) => outbound.send(OutboundCommand::Text(json)).is_ok(),
            Err(e) => {
                error!("[实时客户端] {}", e);
                false
            }
        }
    }

    fn start_connection(
        self: &Arc<Self>,
        runtime: &tokio::runtime::Handle,
        generation: u64,
        credentials: Credentials,
        url: Url,
    ) {
        let mut session = state::lock(&self.session);
        if !self.is_current(generation) {
            debug!("[实时客户端] 会话已失效，不再启动连接任务。");
            return;
        }
        session.credentials = Some(credentials.clone());
        let inner = Arc::clone(self);
        let task = runtime.spawn(async move {
            inner.run_connection(generation, credentials, url).await;
        });
        if let Some(previous) = session.connection_task.replace(task) {
            previous.abort();
        }
    }

    async fn run_connection(self: Arc<Self>, generation: u64, credentials: Credentials, url: Url) {
        debug!("[连接任务] 正在连接: {}{}", url.origin().ascii_serialization(), url.path());
        let mut connection = match transport::connect_client(&url).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("[连接任务] 连接失败: {}", e);
                self.handle_close(generation, CloseInfo::abnormal(e.to_string()), Some(e.to_string()));
                return;
            }
        };

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let opened = {
            let mut session = state::lock(&self.session);
            if self.is_current(generation) {
                session.outbound = Some(outbound_tx.clone());
                self.heartbeat.start(outbound_tx.clone());
                Some(self.write_status(|status| {
                    status.is_connected = true;
                    status.is_connecting = false;
                    status.reconnect_attempts = 0;
                    status.last_connected = Some(Utc::now());
                    status.error = None;
                }))
            } else {
                None
            }
        };
        let Some(snapshot) = opened else {
            debug!("[连接任务] 连接建立时会话已失效，关闭该连接。");
            let _ = connection.close(CLOSE_CODE_NORMAL, "stale session").await;
            return;
        };
        self.publish_status(snapshot);
        info!("[连接任务] 连接已建立 (tenant: {})", credentials.tenant_id);

        if let Some(agent_id) = credentials.agent_id.clone() {
            if self.send(agent_status_message(agent_id, AgentPresence::Online)) {
                debug!("[连接任务] 已广播坐席上线。");
            }
        }

        let close = loop {
            tokio::select! {
                frame = transport::receive_frame(&mut connection.ws_receiver) => match frame {
                    Ok(ReceivedFrame::Text(text)) => {
                        if self.is_current(generation) {
                            self.router.route(&text, Some(&credentials));
                        }
                    }
                    Ok(ReceivedFrame::Closed(info)) => break (info, None),
                    Err(e) => {
                        warn!("[连接任务] 接收帧出错: {}", e);
                        let reason = e.to_string();
                        break (CloseInfo::abnormal(reason.clone()), Some(reason));
                    }
                },
                command = outbound_rx.recv() => match command {
                    Some(OutboundCommand::Text(text)) => {
                        if let Err(e) = connection.send_text(text).await {
                            warn!("[连接任务] 发送帧失败: {}", e);
                        }
                    }
                    Some(OutboundCommand::Close) | None => {
                        if let Err(e) = connection.close(CLOSE_CODE_NORMAL, "client disconnect").await {
                            debug!("[连接任务] 关闭连接时出错: {}", e);
                        }
                        info!("[连接任务] 连接已以 1000 正常关闭。");
                        return;
                    }
                },
            }
        };
        let (info, error) = close;
        info!("[连接任务] 连接已关闭 (code: {}, reason: '{}')", info.code, info.reason);
        self.handle_close(generation, info, error);
    }

    fn handle_close(self: &Arc<Self>, generation: u64, close: CloseInfo, error: Option<String>) {
        let snapshot = {
            let mut session = state::lock(&self.session);
            if !self.is_current(generation) {
                return;
            }
            session.outbound = None;
            session.connection_task = None;
            self.heartbeat.stop();

            if close.is_normal() {
                self.write_status(|status| {
                    status.is_connected = false;
                    status.is_connecting = false;
                })
            } else {
                let attempts = state::read(&self.status).reconnect_attempts;
                match self.policy.decide(attempts) {
                    ReconnectDecision::Retry { delay, attempt } => {
                        info!("[实时客户端] {:?} 后进行第 {} 次重连 (close code: {})", delay, attempt, close.code);
                        self.schedule_reconnect(&mut session, generation, delay);
                        self.write_status(|status| {
                            status.is_connected = false;
                            status.is_connecting = false;
                            if error.is_some() {
                                status.error = error;
                            }
                        })
                    }
                    ReconnectDecision::GiveUp => {
                        warn!("[实时客户端] 已达到最大重连次数 ({})，停止重连。", self.policy.max_attempts());
                        self.write_status(|status| {
                            status.is_connected = false;
                            status.is_connecting = false;
                            status.error = Some(MAX_RECONNECT_ATTEMPTS_MESSAGE.to_string());
                        })
                    }
                }
            }
        };
        self.publish_status(snapshot);
    }

    /// 安排一次延迟重连；调用方持有会话锁并已确认代号有效。
    fn schedule_reconnect(self: &Arc<Self>, session: &mut Session, generation: u64, delay: Duration) {
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.reconnect(generation);
        });
        if let Some(previous) = session.reconnect_task.replace(task) {
            previous.abort();
        }
    }

    fn reconnect(self: &Arc<Self>, generation: u64) {
        let credentials = {
            let mut session = state::lock(&self.session);
            if !self.is_current(generation) {
                return;
            }
            // 当前正在运行的就是这个定时任务，只释放句柄
            session.reconnect_task = None;
            session.credentials.clone()
        };
        let Some(mut credentials) = credentials else {
            return;
        };
        // 刷新钩子在锁外调用，它可以再调用 disconnect
        if let Some(refresher) = &self.token_refresher {
            if let Some(token) = refresher(&credentials) {
                debug!("[实时客户端] 重连前已刷新令牌。");
                credentials.token = token;
            }
        }
        let url = match build_ws_url(&self.config.ws_base_url, &credentials) {
            Ok(url) => url,
            Err(e) => {
                error!("[实时客户端] 重连地址无效: {}", e);
                let message = e.to_string();
                self.update_status(|status| status.error = Some(message));
                return;
            }
        };
        let snapshot = {
            let _session = state::lock(&self.session);
            if !self.is_current(generation) {
                debug!("[实时客户端] 重连前会话已失效，放弃本次重连。");
                return;
            }
            self.write_status(|status| {
                status.reconnect_attempts += 1;
                status.is_connecting = true;
            })
        };
        self.publish_status(snapshot);
        self.start_connection(&tokio::runtime::Handle::current(), generation, credentials, url);
    }
}
