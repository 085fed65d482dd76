//! One-shot delayed reminders.
//!
//! Each reminder is a spawned task sleeping until its due time. The live
//! table owns the task handle and a cancellation token; an entry leaves the
//! table exactly once, either when its task fires or when it is cancelled.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{domain::Identity, ports::NotificationSink};

/// Longest accepted delay.
pub const MAX_REMINDER: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReminderError {
    #[error("Invalid time format. Use: 5m (minutes), 1h (hours), 2d (days)")]
    InvalidFormat,
    #[error("Maximum reminder time is 7 days")]
    TooLong,
}

/// Parse `<integer><m|h|d>` (unit case-insensitive).
pub fn parse_duration_spec(spec: &str) -> Result<Duration, ReminderError> {
    static SPEC_RE: OnceLock<Regex> = OnceLock::new();
    let re = SPEC_RE.get_or_init(|| Regex::new(r"(?i)^(\d+)([mhd])$").expect("valid regex"));

    let caps = re.captures(spec).ok_or(ReminderError::InvalidFormat)?;
    // All-digit but too big for u64 is still a well-formed spec.
    let amount: u64 = caps[1].parse().map_err(|_| ReminderError::TooLong)?;
    let unit_secs = match caps[2].to_ascii_lowercase().as_str() {
        "m" => 60,
        "h" => 3600,
        _ => 86_400,
    };

    let secs = amount
        .checked_mul(unit_secs)
        .ok_or(ReminderError::TooLong)?;
    let duration = Duration::from_secs(secs);
    if duration > MAX_REMINDER {
        return Err(ReminderError::TooLong);
    }
    Ok(duration)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderHandle {
    pub id: String,
    pub owner: Identity,
    pub spec: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

impl ReminderHandle {
    /// Text delivered to the owner when the reminder fires.
    pub fn render_notification(&self) -> String {
        format!(
            "⏰ *REMINDER*\n\n📝 *Message:* {}\n⏱️ *Set at:* {}\n📅 *Reminder time:* {}",
            self.message,
            format_time(self.created_at),
            format_time(self.due_at),
        )
    }
}

pub fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    sink: Arc<dyn NotificationSink>,
    live: Mutex<HashMap<String, ReminderEntry>>,
    seq: AtomicU64,
}

struct ReminderEntry {
    seq: u64,
    reminder: ReminderHandle,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReminderScheduler {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                sink,
                live: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Must be called inside a tokio runtime.
    pub fn schedule(
        &self,
        spec: &str,
        message: &str,
        owner: &Identity,
    ) -> Result<ReminderHandle, ReminderError> {
        let delay = parse_duration_spec(spec)?;

        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let created_at = Utc::now();
        let due_at = created_at
            + chrono::Duration::from_std(delay).map_err(|_| ReminderError::TooLong)?;
        let reminder = ReminderHandle {
            id: format!("{}_{}-{seq}", owner.bare(), created_at.timestamp_millis()),
            owner: owner.clone(),
            spec: spec.to_string(),
            message: message.to_string(),
            created_at,
            due_at,
        };

        // Hold the table lock until the entry is in, so a zero delay cannot
        // fire before there is anything to remove.
        let mut live = self.inner.live.lock();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let inner = self.inner.clone();
            let cancel = cancel.clone();
            let id = reminder.id.clone();
            async move {
                tokio::select! {
                  _ = cancel.cancelled() => {}
                  _ = sleep(delay) => inner.fire(&id).await,
                }
            }
        });
        live.insert(
            reminder.id.clone(),
            ReminderEntry {
                seq,
                reminder: reminder.clone(),
                cancel,
                handle,
            },
        );

        info!(id = %reminder.id, identity = %owner, delay = ?delay, "reminder scheduled");
        Ok(reminder)
    }

    /// Cancel a live reminder. False for unknown or already finished ids.
    pub fn cancel(&self, id: &str) -> bool {
        let Some(entry) = self.inner.live.lock().remove(id) else {
            return false;
        };
        entry.cancel.cancel();
        entry.handle.abort();
        true
    }

    /// Like [`cancel`](Self::cancel), but only for the owner's own reminders.
    pub fn cancel_owned(&self, owner: &Identity, id: &str) -> bool {
        let entry = {
            let mut live = self.inner.live.lock();
            match live.get(id) {
                Some(e) if &e.reminder.owner == owner => live.remove(id),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            return false;
        };
        entry.cancel.cancel();
        entry.handle.abort();
        true
    }

    /// Snapshot of the owner's live reminders in creation order.
    pub fn list_for(&self, owner: &Identity) -> Vec<ReminderHandle> {
        let live = self.inner.live.lock();
        let mut out: Vec<(u64, ReminderHandle)> = live
            .values()
            .filter(|e| &e.reminder.owner == owner)
            .map(|e| (e.seq, e.reminder.clone()))
            .collect();
        out.sort_by_key(|(seq, _)| *seq);
        out.into_iter().map(|(_, r)| r).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every live reminder.
    pub fn shutdown(&self) {
        let drained: Vec<ReminderEntry> = self.inner.live.lock().drain().map(|(_, e)| e).collect();
        for entry in drained {
            entry.cancel.cancel();
            entry.handle.abort();
        }
    }
}

impl SchedulerInner {
    async fn fire(&self, id: &str) {
        let entry = self.live.lock().remove(id);
        let Some(entry) = entry else {
            return; // cancelled while waking
        };
        let reminder = entry.reminder;

        info!(id = %reminder.id, identity = %reminder.owner, "reminder fired");
        if let Err(e) = self
            .sink
            .notify(&reminder.owner, &reminder.render_notification())
            .await
        {
            warn!(id = %reminder.id, identity = %reminder.owner, error = %e, "reminder delivery failed");
        }
    }
}
