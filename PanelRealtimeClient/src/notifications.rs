// PanelRealtimeClient/src/notifications.rs

//! 通知相关的协作方接口。
//!
//! - `NotificationSink`：界面通知存储的抽象，路由层通过 `add_notification` 推送站内通知。
//!   `NotificationStore` 是一个有界的内存实现。
//! - `DesktopNotifier`：桌面通知与提示音的抽象。默认实现 `NoopDesktopNotifier` 什么都不做。

use crate::error::DesktopNotificationError;
use crate::state;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// 站内通知的类型。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    /// 将 `notification` 事件的优先级映射为通知类型：
    /// `urgent` → error，`high` → warning，其它（含缺省）→ info。
    pub fn from_priority(priority: Option<&str>) -> Self {
        match priority.map(|p| p.trim().to_ascii_lowercase()).as_deref() {
            Some("urgent") => NotificationKind::Error,
            Some("high") => NotificationKind::Warning,
            _ => NotificationKind::Info,
        }
    }
}

/// 一条待添加的通知：`{ type, title, message }`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// 通知存储接口。
pub trait NotificationSink: Send + Sync {
    fn add_notification(&self, notification: NewNotification);
}

/// 已入库的通知。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    pub id: Uuid,
    #[serde(flatten)]
    pub notification: NewNotification,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// 默认保留的通知条数。
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 100;

/// 有界的内存通知存储，最新的在前；超出容量时丢弃最旧的。
pub struct NotificationStore {
    entries: Mutex<VecDeque<StoredNotification>>,
    capacity: usize,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// 全部通知（最新的在前）。
    pub fn notifications(&self) -> Vec<StoredNotification> {
        state::lock(&self.entries).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        state::lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unread_count(&self) -> usize {
        state::lock(&self.entries).iter().filter(|n| !n.read).count()
    }

    /// 标记单条为已读；返回是否找到。
    pub fn mark_read(&self, id: Uuid) -> bool {
        match state::lock(&self.entries).iter_mut().find(|n| n.id == id) {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        for entry in state::lock(&self.entries).iter_mut() {
            entry.read = true;
        }
    }

    pub fn clear(&self) {
        state::lock(&self.entries).clear();
    }
}

impl NotificationSink for NotificationStore {
    fn add_notification(&self, notification: NewNotification) {
        log::debug!(
            "[通知存储] 新通知 ({:?}): {} - {}",
            notification.kind,
            notification.title,
            notification.message
        );
        let mut entries = state::lock(&self.entries);
        entries.push_front(StoredNotification {
            id: Uuid::new_v4(),
            notification,
            created_at: Utc::now(),
            read: false,
        });
        entries.truncate(self.capacity);
    }
}

/// 桌面提醒接口（系统通知 + 提示音）。
pub trait DesktopNotifier: Send + Sync {
    /// 宿主界面当前是否不可见（只有不可见时才弹桌面通知）。
    fn is_page_hidden(&self) -> bool;

    fn show(&self, title: &str, body: &str) -> Result<(), DesktopNotificationError>;

    fn play_sound(&self) -> Result<(), DesktopNotificationError>;
}

/// 不做任何事的桌面提醒实现。
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDesktopNotifier;

impl DesktopNotifier for NoopDesktopNotifier {
    fn is_page_hidden(&self) -> bool {
        false
    }

    fn show(&self, _title: &str, _body: &str) -> Result<(), DesktopNotificationError> {
        Ok(())
    }

    fn play_sound(&self) -> Result<(), DesktopNotificationError> {
        Ok(())
    }
}
