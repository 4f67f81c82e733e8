//! Persistence lifecycle events and listeners.
//!
//! Events are built by the session around each save, dispatched
//! synchronously to every registered listener, and then dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::ObjectRef;

/// Point in the save lifecycle an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    PreSave,
    PostSave,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreSave => f.write_str("PRE_SAVE"),
            Self::PostSave => f.write_str("POST_SAVE"),
        }
    }
}

/// A lifecycle notification about one domain object.
#[derive(Debug, Clone)]
pub struct PersistenceEvent {
    pub subject: ObjectRef,
    pub lifecycle: Lifecycle,
    pub occurred_at: DateTime<Utc>,
}

impl PersistenceEvent {
    pub fn new(subject: ObjectRef, lifecycle: Lifecycle) -> Self {
        Self {
            subject,
            lifecycle,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives persistence events.
///
/// Returning an error reports a listener failure; what happens next is
/// governed by the session's listener failure policy.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &PersistenceEvent) -> anyhow::Result<()>;
}

impl<F> EventListener for F
where
    F: Fn(&PersistenceEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &PersistenceEvent) -> anyhow::Result<()> {
        self(event)
    }
}
