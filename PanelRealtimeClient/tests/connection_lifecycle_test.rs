// PanelRealtimeClient/tests/connection_lifecycle_test.rs

//! 连接生命周期各阶段中调用 `disconnect` 的行为，以及退避重连的实际时序。

mod common;

use common::{init_test_logger, unused_local_url, wait_until, TestServer};
use panel_realtime_client::{ClientEvent, Credentials, RealtimeClient, RealtimeClientConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

const WAIT: Duration = Duration::from_secs(5);

fn test_config(base_url: String) -> RealtimeClientConfig {
    RealtimeClientConfig {
        ws_base_url: base_url,
        reconnect_base_interval_ms: 20,
        ..RealtimeClientConfig::default()
    }
}

fn credentials() -> Credentials {
    Credentials::new("abc", "t1", "u1")
}

fn assert_idle(client: &RealtimeClient) {
    let status = client.status();
    assert!(!status.is_connected, "断开后不应处于已连接状态: {:?}", status);
    assert!(!status.is_connecting, "断开后不应处于连接中状态: {:?}", status);
}

#[tokio::test]
async fn test_disconnect_from_token_refresher_during_reconnect() {
    init_test_logger();
    let server = TestServer::start().await;
    let slot: Arc<OnceLock<RealtimeClient>> = Arc::new(OnceLock::new());
    let refresher_calls = Arc::new(AtomicUsize::new(0));

    let (client_slot, calls) = (slot.clone(), refresher_calls.clone());
    let client = RealtimeClient::builder(test_config(server.base_url()))
        .token_refresher(move |_: &Credentials| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(client) = client_slot.get() {
                client.disconnect();
            }
            None
        })
        .build();
    assert!(slot.set(client.clone()).is_ok());

    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await);
    assert!(wait_until(WAIT, || server.connection_count() == 1).await);

    server.close_connection(0, 4000);
    assert!(wait_until(WAIT, || refresher_calls.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_idle(&client);
    assert_eq!(server.connection_count(), 1, "重连途中被断开后不应再发起连接");

    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await, "断开后手动 connect 应能重新连上");
    assert_eq!(server.connection_count(), 2);
    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_while_reconnect_is_pending() {
    init_test_logger();
    let server = TestServer::start().await;
    let client = RealtimeClient::new(RealtimeClientConfig {
        reconnect_base_interval_ms: 300,
        ..test_config(server.base_url())
    });
    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await);
    assert!(wait_until(WAIT, || server.connection_count() == 1).await);

    server.close_connection(0, 4000);
    assert!(wait_until(WAIT, || !client.is_connected()).await);
    client.disconnect();
    assert_idle(&client);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_idle(&client);
    assert_eq!(server.connection_count(), 1, "等待中的重连应被取消");

    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await);
    assert_eq!(client.status().reconnect_attempts, 0);
    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_before_connection_task_runs() {
    init_test_logger();
    let server = TestServer::start().await;
    let client = RealtimeClient::new(test_config(server.base_url()));

    // 单线程运行时：连接任务尚未被调度就被断开
    client.connect(credentials()).unwrap();
    assert!(client.status().is_connecting);
    client.disconnect();
    assert_idle(&client);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_idle(&client);
    assert_eq!(server.connection_count(), 0);

    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await);
    assert_eq!(server.connection_count(), 1);
    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_while_handshake_is_stalled() {
    init_test_logger();
    // 只接受 TCP 连接、从不回应握手的监听端
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("ws://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicBool::new(false));
    let held = Arc::new(Mutex::new(Vec::new()));
    let (accepted_flag, sockets) = (accepted.clone(), held.clone());
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            sockets.lock().unwrap().push(stream);
            accepted_flag.store(true, Ordering::SeqCst);
        }
    });

    let client = RealtimeClient::new(test_config(base_url));
    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || accepted.load(Ordering::SeqCst)).await);
    assert!(client.status().is_connecting);

    client.disconnect();
    assert_idle(&client);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_idle(&client);

    // 没有被卡住：新的 connect 会真正发起连接
    client.connect(credentials()).unwrap();
    assert!(client.status().is_connecting);
    client.disconnect();
    assert_idle(&client);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_connect_disconnect_cycles_on_multi_thread_runtime() {
    init_test_logger();
    let server = TestServer::start().await;
    let client = RealtimeClient::new(test_config(server.base_url()));

    for round in 0..20u64 {
        client.connect(credentials()).unwrap();
        if round % 2 == 1 {
            tokio::time::sleep(Duration::from_millis(round)).await;
        }
        client.disconnect();
        assert_idle(&client);
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_idle(&client);

    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await, "多次断开后仍应能连上");
    let opened = server.connection_count();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), opened, "连上后不应再有额外连接");
    client.disconnect();
    assert_idle(&client);
}

#[tokio::test]
async fn test_reconnect_waits_for_base_interval() {
    init_test_logger();
    let server = TestServer::start().await;
    let client = RealtimeClient::new(RealtimeClientConfig {
        reconnect_base_interval_ms: 500,
        ..test_config(server.base_url())
    });
    client.connect(credentials()).unwrap();
    assert!(wait_until(WAIT, || client.is_connected()).await);
    assert!(wait_until(WAIT, || server.connection_count() == 1).await);

    let closed_at = Instant::now();
    server.close_connection(0, 4000);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(server.connection_count(), 1, "未到基础间隔前不应重连");

    assert!(wait_until(WAIT, || server.connection_count() == 2).await);
    assert!(closed_at.elapsed() >= Duration::from_millis(500));
    client.disconnect();
}

#[tokio::test]
async fn test_reconnect_delay_doubles_per_attempt() {
    init_test_logger();
    let client = RealtimeClient::new(RealtimeClientConfig {
        reconnect_base_interval_ms: 100,
        max_reconnect_attempts: 3,
        ..test_config(unused_local_url().await)
    });
    // 记录每次失败与每次重连开始的时间
    let timeline: Arc<Mutex<Vec<(u32, bool, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = timeline.clone();
    client.subscribe(move |event| {
        if let ClientEvent::ConnectionStatusChanged(status) = event {
            sink.lock()
                .unwrap()
                .push((status.reconnect_attempts, status.is_connecting, Instant::now()));
        }
    });
    client.connect(credentials()).unwrap();
    let exhausted = || {
        let status = client.status();
        status.error.is_some() && status.reconnect_attempts == 3 && !status.is_connecting
    };
    assert!(wait_until(WAIT, exhausted).await, "三次重连都应失败");

    let timeline = timeline.lock().unwrap().clone();
    let failed_at = |attempts: u32| {
        timeline
            .iter()
            .find(|(n, connecting, _)| *n == attempts && !connecting)
            .map(|(_, _, at)| *at)
            .expect("应记录到这次失败")
    };
    let retried_at = |attempts: u32| {
        timeline
            .iter()
            .find(|(n, connecting, _)| *n == attempts && *connecting)
            .map(|(_, _, at)| *at)
            .expect("应记录到这次重连")
    };
    assert!(retried_at(1) - failed_at(0) >= Duration::from_millis(100));
    assert!(retried_at(2) - failed_at(1) >= Duration::from_millis(200));
    assert!(retried_at(3) - failed_at(2) >= Duration::from_millis(400));
    client.disconnect();
}
