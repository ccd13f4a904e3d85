// PanelRealtimeClient/src/state.rs

//! 客户端共享状态：连接状态快照、连接凭据，以及与认证存储对接的会话模型。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 连接状态快照。
///
/// 只由客户端服务的连接生命周期逻辑修改；每次变化都会以
/// `ClientEvent::ConnectionStatusChanged` 同步推送给订阅者。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_connecting: bool,
    /// 当前这一轮连续重连已进行的次数，连接成功后归零。
    pub reconnect_attempts: u32,
    pub last_connected: Option<DateTime<Utc>>,
    /// 最近一次错误；连接成功后清空。
    pub error: Option<String>,
}

/// 建立连接所需的凭据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub tenant_id: String,
    pub user_id: String,
    /// 以坐席身份登录时存在；连接成功后会广播该坐席上线。
    pub agent_id: Option<String>,
    pub user_name: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            agent_id: None,
            user_name: None,
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// 从认证会话派生凭据。用户、令牌与用户的租户 ID 三者齐全时才返回 `Some`。
    pub fn from_session(session: &AuthSession) -> Option<Self> {
        let user = session.user.as_ref()?;
        let token = session.token.as_ref().filter(|t| !t.is_empty())?;
        let tenant_id = user.tenant_id.as_ref().filter(|t| !t.is_empty())?;
        Some(Self {
            token: token.clone(),
            tenant_id: tenant_id.clone(),
            user_id: user.id.clone(),
            agent_id: user.agent_id.clone(),
            user_name: user.name.clone(),
        })
    }
}

/// 认证存储中的当前用户。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    /// 超级管理员没有租户；这类用户不会建立实时连接。
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// 认证存储提供的会话：`{ user, token }`。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub user: Option<AuthUser>,
    pub token: Option<String>,
}

// 锁中毒时继续使用内部数据：持锁区间内只做简单赋值，不存在半途修改的状态。

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
