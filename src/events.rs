//! Notifications emitted toward whatever renders the game

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::{
    economy::Stat,
    trash::{TrashId, TrashItem},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    CollectedByPlayer,
    CollectedByHelper,
    Expired,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    TrashSpawned { item: TrashItem },
    TrashRemoved { id: TrashId, cause: RemovalCause },
    PlayerMoved { x: i32, y: i32 },
    PlayerZoneChanged { zone: String },
    StatChanged { stat: Stat, value: u64 },
    ZoneUnlocked { zone: String },
    LevelChanged { level: usize, title: String },
    ProgressChanged { percent: u8 },
    Log { message: String },
    VictoryTriggered,
}

pub trait NotificationSink: Send {
    fn notify(&mut self, notification: Notification);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _notification: Notification) {}
}

/// Keeps every notification in a shared buffer; clones observe the same
/// buffer.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        match self.inner.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for Recorder {
    fn notify(&mut self, notification: Notification) {
        match self.inner.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
