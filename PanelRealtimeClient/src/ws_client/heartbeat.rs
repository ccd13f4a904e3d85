// PanelRealtimeClient/src/ws_client/heartbeat.rs

//! 心跳监视器。
//!
//! 连接打开期间每隔固定间隔（默认 30 秒）向出站通道推送一个 `{ "type": "ping" }` 帧。
//! 每次连接成功都重新启动一个全新的定时器，关闭或断开时立即停止。
//! 服务端不会对 ping 做应答确认；发送失败只体现为出站通道已关闭，此时心跳任务自行结束。

use super::OutboundCommand;
use crate::state;
use log::{debug, error, info};
use rust_websocket_utils::message::HeartbeatFrame;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// 每条连接的 ping 定时器；同一时刻最多运行一个。
pub struct HeartbeatMonitor {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatMonitor {
    /// 创建尚未启动的监视器。
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 启动心跳；已有的心跳任务会先被停止。第一次 ping 在一个完整间隔之后发出。
    pub fn start(&self, outbound: mpsc::UnboundedSender<OutboundCommand>) {
        let period = self.interval;
        let handle = tokio::spawn(async move {
            info!("[心跳任务] 心跳已启动，间隔 {:?}。", period);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let json = match HeartbeatFrame::now().to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!("[心跳任务] 序列化心跳帧失败: {}", e);
                        continue;
                    }
                };
                if outbound.send(OutboundCommand::Text(json)).is_err() {
                    debug!("[心跳任务] 出站通道已关闭，心跳结束。");
                    break;
                }
                debug!("[心跳任务] ping 已发送。");
            }
        });
        if let Some(previous) = state::lock(&self.task).replace(handle) {
            previous.abort();
        }
    }

    /// 停止心跳（幂等）。
    pub fn stop(&self) {
        if let Some(handle) = state::lock(&self.task).take() {
            handle.abort();
            debug!("[心跳任务] 已请求停止心跳。");
        }
    }

    /// 心跳任务是否仍在运行。
    pub fn is_running(&self) -> bool {
        state::lock(&self.task).as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
