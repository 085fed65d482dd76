use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{Identity, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{MediaPayload, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between any two Cloud API calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same recipient.
    pub per_recipient_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(15), // ~66/sec
            per_recipient_min_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return how long to wait before using it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces out outbound calls.
///
/// Best effort against the Cloud API's per-number pair rate limit; bursts
/// such as broadcasts and multi-chunk replies are smoothed, not rejected.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_recipient: Mutex<HashMap<Identity, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_recipient: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for(&self, to: &Identity) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_recipient.lock().await;
        map.entry(to.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_recipient_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle(&self, to: &Identity) {
        let global_wait = { self.global.lock().await.reserve() };
        let recipient_wait = {
            let lim = self.limiter_for(to).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(recipient_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, to: &Identity, text: &str) -> Result<MessageRef> {
        self.throttle(to).await;
        self.inner.send_text(to, text).await
    }

    async fn send_media(&self, to: &Identity, media: MediaPayload) -> Result<MessageRef> {
        self.throttle(to).await;
        self.inner.send_media(to, media).await
    }
}
