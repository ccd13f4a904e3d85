// PanelRealtimeClient/tests/common/mod.rs

//! 集成测试共用的本地 WebSocket 测试服务端。

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use log::{info, LevelFilter};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};

pub fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Debug).is_test(true).try_init();
}

/// 测试服务端观察到的事件，`conn` 为连接序号（从 0 计）。
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Text { conn: usize, text: String },
    ClientClosed { conn: usize, code: u16 },
    Dropped { conn: usize },
}

enum ServerCommand {
    Send(String),
    Close(u16),
}

pub struct TestServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
    commands: Arc<Mutex<Vec<mpsc::UnboundedSender<ServerCommand>>>>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestServer {
    /// 在随机端口上启动服务端，接受任意数量的连接。
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
        let addr = listener.local_addr().expect("无法获取本地监听地址");
        let connections = Arc::new(AtomicUsize::new(0));
        let uris = Arc::new(Mutex::new(Vec::new()));
        let commands: Arc<Mutex<Vec<mpsc::UnboundedSender<ServerCommand>>>> = Arc::new(Mutex::new(Vec::new()));
        let (event_tx, events) = mpsc::unbounded_channel();

        let (conn_counter, uri_log, command_slots) = (connections.clone(), uris.clone(), commands.clone());
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                let uri_log = uri_log.clone();
                let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    uri_log.lock().unwrap().push(request.uri().to_string());
                    Ok(response)
                };
                let mut ws = match accept_hdr_async(stream, callback).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };
                let (command_tx, mut command_rx) = mpsc::unbounded_channel();
                let conn = {
                    let mut slots = command_slots.lock().unwrap();
                    slots.push(command_tx);
                    slots.len() - 1
                };
                // 命令通道就绪后才计数，测试看到计数即可向该连接推送
                conn_counter.fetch_add(1, Ordering::SeqCst);
                info!("[测试服务端] 接受来自 {} 的第 {} 个连接", peer, conn);
                let event_tx = event_tx.clone();

                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            incoming = ws.next() => match incoming {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = event_tx.send(ServerEvent::Text { conn, text });
                                }
                                Some(Ok(Message::Close(frame))) => {
                                    let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                                    let _ = event_tx.send(ServerEvent::ClientClosed { conn, code });
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(_)) | None => {
                                    let _ = event_tx.send(ServerEvent::Dropped { conn });
                                    break;
                                }
                            },
                            command = command_rx.recv() => match command {
                                Some(ServerCommand::Send(text)) => {
                                    let _ = ws.send(Message::Text(text)).await;
                                }
                                Some(ServerCommand::Close(code)) => {
                                    let frame = CloseFrame {
                                        code: CloseCode::from(code),
                                        reason: Cow::Borrowed("server close"),
                                    };
                                    let _ = ws.send(Message::Close(Some(frame))).await;
                                }
                                None => break,
                            },
                        }
                    }
                });
            }
        });

        TestServer {
            addr,
            connections,
            uris,
            commands,
            events,
        }
    }

    pub fn base_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn uri(&self, conn: usize) -> Option<String> {
        self.uris.lock().unwrap().get(conn).cloned()
    }

    pub fn send_to(&self, conn: usize, text: impl Into<String>) {
        let commands = self.commands.lock().unwrap();
        let sender = commands.get(conn).expect("连接不存在");
        let _ = sender.send(ServerCommand::Send(text.into()));
    }

    pub fn close_connection(&self, conn: usize, code: u16) {
        let commands = self.commands.lock().unwrap();
        let sender = commands.get(conn).expect("连接不存在");
        let _ = sender.send(ServerCommand::Close(code));
    }

    /// 等待下一个满足条件的事件，超时返回 `None`。
    pub async fn next_event_matching<P>(&mut self, within: Duration, predicate: P) -> Option<ServerEvent>
    where
        P: Fn(&ServerEvent) -> bool,
    {
        let deadline = Instant::now() + within;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match timeout(remaining, self.events.recv()).await {
                Ok(Some(event)) if predicate(&event) => return Some(event),
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }

    /// 等待某个连接上下一条 `type` 为给定值的文本帧，返回解析后的 JSON。
    pub async fn next_frame_of_type(&mut self, frame_type: &str, within: Duration) -> Option<serde_json::Value> {
        let frame_type = frame_type.to_string();
        let event = self
            .next_event_matching(within, |event| match event {
                ServerEvent::Text { text, .. } => serde_json::from_str::<serde_json::Value>(text)
                    .map(|value| value["type"] == frame_type.as_str())
                    .unwrap_or(false),
                _ => false,
            })
            .await?;
        match event {
            ServerEvent::Text { text, .. } => serde_json::from_str(&text).ok(),
            _ => None,
        }
    }
}

/// 一个当前无人监听的本地地址。
pub async fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = listener.local_addr().expect("无法获取本地监听地址");
    drop(listener);
    format!("ws://{}", addr)
}

/// 轮询直到条件成立；超时返回 `false`。
pub async fn wait_until<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 构造一条服务端推送的业务帧。
pub fn server_frame(event_type: &str, user_id: &str, conversation_id: Option<&str>, data: serde_json::Value) -> String {
    let mut frame = serde_json::json!({
        "type": event_type,
        "tenantId": "t1",
        "userId": user_id,
        "data": data,
        "timestamp": "2024-01-01T00:00:00.000Z"
    });
    if let Some(conversation_id) = conversation_id {
        frame["conversationId"] = serde_json::Value::String(conversation_id.to_string());
    }
    frame.to_string()
}
