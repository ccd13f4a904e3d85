// rust_websocket_utils/tests/client_transport_integration_test.rs

use common_models::WsEventType;
use futures_util::{SinkExt, StreamExt};
use log::{LevelFilter, info};
use rust_websocket_utils::client::transport::{
    CLOSE_CODE_NORMAL, ReceivedFrame, connect_client, receive_frame,
};
use rust_websocket_utils::message::WsMessage;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use url::Url;

// 辅助函数：初始化日志，仅用于测试，避免多次初始化
fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Info).is_test(true).try_init();
}

/// 服务端对单个连接的行为。
#[derive(Clone, Copy)]
enum ServerBehavior {
    /// 原样回显收到的文本帧。
    Echo,
    /// 收到第一条文本帧后以给定关闭码关闭连接。
    CloseAfterFirstText(u16),
    /// 什么也不发，只记录客户端的 Close 帧关闭码。
    RecordClose,
}

/// 启动一个只接受一个连接的测试服务端，返回监听地址和"服务端观察到的关闭码"通道。
async fn start_test_server(behavior: ServerBehavior) -> (SocketAddr, mpsc::UnboundedReceiver<u16>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = listener.local_addr().expect("无法获取本地监听地址");
    let (close_tx, close_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(_) => return,
        };
        info!("[测试服务端] 接受来自 {} 的连接", peer);
        let mut ws = accept_async(stream).await.expect("服务端握手失败");
        while let Some(Ok(msg)) = ws.next().await {
            match (msg, behavior) {
                (Message::Text(text), ServerBehavior::Echo) => {
                    let _ = ws.send(Message::Text(text)).await;
                }
                (Message::Text(_), ServerBehavior::CloseAfterFirstText(code)) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: Cow::Borrowed("test close"),
                    };
                    let _ = ws.send(Message::Close(Some(frame))).await;
                }
                (Message::Close(frame), _) => {
                    let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                    let _ = close_tx.send(code);
                    break;
                }
                _ => {}
            }
        }
    });

    (addr, close_rx)
}

#[tokio::test]
async fn test_client_send_message_and_receive_echo() {
    init_test_logger();
    let (addr, _close_rx) = start_test_server(ServerBehavior::Echo).await;
    let url = Url::parse(&format!("ws://{}/v1/ws", addr)).unwrap();

    let mut conn = connect_client(&url).await.expect("客户端连接测试服务端失败");
    let mut outbound = WsMessage::new(WsEventType::MessageSent, "t1", "u1");
    outbound.conversation_id = Some("c1".to_string());
    outbound.data = serde_json::json!({ "content": "hello" });
    conn.send_message(&outbound).await.expect("发送消息失败");

    let frame = timeout(Duration::from_secs(5), receive_frame(&mut conn.ws_receiver))
        .await
        .expect("等待回显超时")
        .expect("接收回显失败");
    match frame {
        ReceivedFrame::Text(text) => {
            let echoed = WsMessage::from_json(&text).expect("回显内容应是合法帧");
            assert_eq!(echoed, outbound);
        }
        other => panic!("预期文本帧，实际为: {:?}", other),
    }
}

#[tokio::test]
async fn test_client_reports_server_close_code() {
    init_test_logger();
    let (addr, _close_rx) = start_test_server(ServerBehavior::CloseAfterFirstText(4001)).await;
    let url = Url::parse(&format!("ws://{}", addr)).unwrap();

    let mut conn = connect_client(&url).await.expect("客户端连接测试服务端失败");
    conn.send_text("{\"type\":\"ping\"}".to_string()).await.unwrap();

    let frame = timeout(Duration::from_secs(5), receive_frame(&mut conn.ws_receiver))
        .await
        .expect("等待关闭超时")
        .expect("接收关闭帧失败");
    match frame {
        ReceivedFrame::Closed(info) => {
            assert_eq!(info.code, 4001);
            assert_eq!(info.reason, "test close");
            assert!(!info.is_normal());
        }
        other => panic!("预期 Closed，实际为: {:?}", other),
    }
}

#[tokio::test]
async fn test_client_close_sends_normal_closure() {
    init_test_logger();
    let (addr, mut close_rx) = start_test_server(ServerBehavior::RecordClose).await;
    let url = Url::parse(&format!("ws://{}", addr)).unwrap();

    let mut conn = connect_client(&url).await.expect("客户端连接测试服务端失败");
    conn.close(CLOSE_CODE_NORMAL, "bye").await.expect("发送 Close 帧失败");

    let observed = timeout(Duration::from_secs(5), close_rx.recv())
        .await
        .expect("服务端未观察到 Close 帧")
        .expect("通道意外关闭");
    assert_eq!(observed, CLOSE_CODE_NORMAL);
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    init_test_logger();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{}", addr)).unwrap();
    assert!(connect_client(&url).await.is_err(), "连接未监听的端口应失败");
}
