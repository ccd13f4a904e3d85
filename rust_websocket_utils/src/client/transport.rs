// rust_websocket_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 本模块负责建立与服务器的连接、发送文本帧和结构化的 `WsMessage`、
//! 以关闭码的形式报告连接结束，以及带关闭码地主动关闭连接。
//! 重连、心跳与消息路由等策略不在这里实现，由上层客户端服务负责。

use crate::error::WsError;
use crate::message::WsMessage;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, error, info};
use std::borrow::Cow;
use tokio_tungstenite::{
    WebSocketStream, connect_async,
    tungstenite::Error as TungsteniteError,
    tungstenite::protocol::frame::coding::CloseCode,
    tungstenite::protocol::{CloseFrame, Message},
};
use url::Url;

/// 正常关闭 (Normal Closure)。只有它会被视为"有意关闭"。
pub const CLOSE_CODE_NORMAL: u16 = 1000;
/// 对方发送了不带状态码的 Close 帧。
pub const CLOSE_CODE_NO_STATUS: u16 = 1005;
/// 连接在没有 Close 帧的情况下中断（包括连接建立失败）。
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;

/// `ClientWsStream` 类型别名，代表一个可能经过 TLS 加密的 TCP WebSocket 流。
pub type ClientWsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// 连接结束时的信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket 关闭码。
    pub code: u16,
    /// 关闭原因（可能为空）。
    pub reason: String,
}

impl CloseInfo {
    /// 是否为正常关闭 (1000)。
    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_CODE_NORMAL
    }

    /// 非正常中断（未收到 Close 帧）。
    pub fn abnormal(reason: impl Into<String>) -> Self {
        CloseInfo {
            code: CLOSE_CODE_ABNORMAL,
            reason: reason.into(),
        }
    }
}

/// 从接收端读到的一个应用层事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedFrame {
    /// 一条文本帧（尚未解析）。
    Text(String),
    /// 连接已结束。
    Closed(CloseInfo),
}

/// `ClientConnection` 结构体代表一个活动的客户端 WebSocket 连接。
pub struct ClientConnection {
    /// 用于向服务器异步发送消息的 `Sink` (发送端)。
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    /// 用于从服务器异步接收消息的 `Stream` (接收端)。
    pub ws_receiver: SplitStream<ClientWsStream>,
}

impl ClientConnection {
    /// 发送一条原始文本帧。
    pub async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        debug!("客户端：准备发送文本帧 ({} 字节)", text.len());
        self.ws_sender.send(Message::Text(text)).await?;
        Ok(())
    }

    /// 将 `WsMessage` 序列化为 JSON 后发送。
    pub async fn send_message(&mut self, message: &WsMessage) -> Result<(), WsError> {
        let msg_json = message.to_json()?;
        self.send_text(msg_json).await?;
        debug!("客户端：消息已发送 (类型: {})", message.event_type);
        Ok(())
    }

    /// 以指定关闭码发送 Close 帧。
    ///
    /// 连接已经关闭时返回的 `ConnectionClosed` / `AlreadyClosed` 不视为错误。
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<(), WsError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        match self.ws_sender.send(Message::Close(Some(frame))).await {
            Ok(()) => {
                info!("客户端：已发送 Close 帧 (code: {}, reason: '{}')", code, reason);
                Ok(())
            }
            Err(TungsteniteError::ConnectionClosed) | Err(TungsteniteError::AlreadyClosed) => {
                debug!("客户端：发送 Close 帧时连接已关闭，忽略。");
                Ok(())
            }
            Err(e) => Err(WsError::WebSocketProtocolError(e)),
        }
    }
}

/// 异步连接到指定的 WebSocket 服务器。
///
/// 握手成功后将流拆分为发送端和接收端，封装为 `ClientConnection` 返回。
pub async fn connect_client(url: &Url) -> Result<ClientConnection, WsError> {
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(WsError::InvalidUrl(format!(
                "WebSocket URL 的协议必须为 ws 或 wss，实际为 '{}'",
                other
            )));
        }
    }
    info!("客户端：开始尝试连接到 WebSocket 服务器，地址: {}{}", url.host_str().unwrap_or(""), url.path());

    match connect_async(url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!("客户端：已成功连接 (HTTP 状态码: {})", response.status());
            debug!("客户端：WebSocket 连接响应头: {:?}", response.headers());
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection { ws_sender, ws_receiver })
        }
        Err(e) => {
            error!("客户端：连接失败，错误: {}", e);
            Err(WsError::WebSocketProtocolError(e))
        }
    }
}

/// 从接收端读取下一个应用层事件。
///
/// Ping/Pong 控制帧由底层库处理，这里直接跳过；二进制帧不属于本协议，记录后跳过。
/// 收到 Close 帧或流结束时返回 `ReceivedFrame::Closed`，其中流在没有 Close 帧的情况下结束记为 1006。
/// 其它底层错误以 `Err` 返回，调用方应将连接视为已断开。
///
/// 本函数只在 `next()` 上挂起，可以安全地放在 `tokio::select!` 分支中。
pub async fn receive_frame(ws_receiver: &mut SplitStream<ClientWsStream>) -> Result<ReceivedFrame, WsError> {
    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!("客户端：收到文本帧 ({} 字节)", text.len());
                return Ok(ReceivedFrame::Text(text));
            }
            Some(Ok(Message::Binary(bin))) => {
                debug!("客户端：收到非预期的二进制帧，长度: {} 字节，已跳过。", bin.len());
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                // 控制帧由 tokio-tungstenite 自动处理
            }
            Some(Ok(Message::Close(close_frame))) => {
                debug!("客户端：收到 Close 控制帧: {:?}", close_frame);
                let info = match close_frame {
                    Some(frame) => CloseInfo {
                        code: u16::from(frame.code),
                        reason: frame.reason.into_owned(),
                    },
                    None => CloseInfo {
                        code: CLOSE_CODE_NO_STATUS,
                        reason: String::new(),
                    },
                };
                return Ok(ReceivedFrame::Closed(info));
            }
            Some(Err(TungsteniteError::ConnectionClosed)) | Some(Err(TungsteniteError::AlreadyClosed)) | None => {
                debug!("客户端：WebSocket 接收流已结束。");
                return Ok(ReceivedFrame::Closed(CloseInfo::abnormal("连接已结束")));
            }
            Some(Err(e)) => {
                error!("客户端：从 WebSocket 流接收消息时发生底层错误: {}", e);
                return Err(WsError::WebSocketProtocolError(e));
            }
        }
    }
}
