use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{domain::Identity, phone::digits_only};

// ============== Access Control ==============

/// Whether `identity` belongs to an operator.
///
/// Bidirectional substring match on digits so `+263 77...` and `77...`
/// entries both match. This is loose: a short entry matches every identity
/// containing it. Empty values never match.
pub fn is_privileged(identity: &Identity, privileged: &[String]) -> bool {
    let bare = identity.bare();
    if bare.is_empty() {
        return false;
    }

    privileged.iter().any(|entry| {
        let digits = digits_only(entry);
        !digits.is_empty() && (digits.contains(bare) || bare.contains(digits.as_str()))
    })
}

// ============== Download Rate Limiter (Fixed Window) ==============

/// Per-identity call counter. The window rolls over lazily on the first call
/// after `reset_at`, not on a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quota {
    pub remaining: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("download limit exceeded, retry in {retry_after_secs}s")]
    Exceeded { retry_after_secs: u64 },
}

impl RateLimitError {
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::Exceeded { retry_after_secs } => *retry_after_secs,
        }
    }

    /// Whole minutes until the window resets, rounded up.
    pub fn retry_after_minutes(&self) -> u64 {
        self.retry_after_secs().div_ceil(60)
    }
}

#[derive(Debug, Default)]
pub struct DownloadRateLimiter {
    windows: Mutex<HashMap<Identity, RateWindow>>,
}

impl DownloadRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_consume(
        &self,
        identity: &Identity,
        max_calls: u32,
        window: Duration,
    ) -> Result<Quota, RateLimitError> {
        self.check_and_consume_at(identity, max_calls, window, Instant::now())
    }

    pub fn check_and_consume_at(
        &self,
        identity: &Identity,
        max_calls: u32,
        window: Duration,
        now: Instant,
    ) -> Result<Quota, RateLimitError> {
        let mut windows = self.windows.lock();
        let w = windows.entry(identity.clone()).or_insert(RateWindow {
            count: 0,
            reset_at: now + window,
        });

        if now > w.reset_at {
            w.count = 0;
            w.reset_at = now + window;
        }

        if w.count >= max_calls {
            let left_ms = w.reset_at.saturating_duration_since(now).as_millis() as u64;
            return Err(RateLimitError::Exceeded {
                retry_after_secs: left_ms.div_ceil(1000),
            });
        }

        w.count += 1;
        Ok(Quota {
            remaining: max_calls - w.count,
        })
    }

    /// Snapshot of the tracked window for `identity`, if any.
    pub fn window(&self, identity: &Identity) -> Option<RateWindow> {
        self.windows.lock().get(identity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(digits: &str) -> Identity {
        Identity::from_jid(format!("{digits}@s.whatsapp.net"))
    }

    #[test]
    fn privileged_matches_with_or_without_country_code() {
        let owners = vec!["+263 78 007 8177".to_string()];
        assert!(is_privileged(&id("263780078177"), &owners));
        assert!(is_privileged(&id("780078177"), &owners));
        assert!(!is_privileged(&id("263716857999"), &owners));
    }

    #[test]
    fn privileged_match_is_loose_on_short_entries() {
        let owners = vec!["8177".to_string()];
        assert!(is_privileged(&id("263780078177"), &owners));
    }

    #[test]
    fn empty_values_never_match() {
        let owners = vec!["+".to_string(), "".to_string()];
        assert!(!is_privileged(&id("263780078177"), &owners));
        assert!(!is_privileged(&id(""), &["263780078177".to_string()]));
        assert!(!is_privileged(&id("263780078177"), &[]));
    }

    #[test]
    fn limiter_allows_max_then_rejects_without_consuming() {
        let rl = DownloadRateLimiter::new();
        let u = id("263771234567");
        let start = Instant::now();
        let window = Duration::from_secs(60);

        assert_eq!(rl.check_and_consume_at(&u, 2, window, start), Ok(Quota { remaining: 1 }));
        assert_eq!(rl.check_and_consume_at(&u, 2, window, start), Ok(Quota { remaining: 0 }));

        let err = rl.check_and_consume_at(&u, 2, window, start).unwrap_err();
        assert_eq!(err, RateLimitError::Exceeded { retry_after_secs: 60 });
        assert_eq!(rl.window(&u).unwrap().count, 2);
    }

    #[test]
    fn limiter_rounds_retry_up_to_whole_seconds() {
        let rl = DownloadRateLimiter::new();
        let u = id("1");
        let start = Instant::now();
        let window = Duration::from_secs(60);

        rl.check_and_consume_at(&u, 1, window, start).unwrap();
        let err = rl
            .check_and_consume_at(&u, 1, window, start + Duration::from_millis(30_500))
            .unwrap_err();
        assert_eq!(err, RateLimitError::Exceeded { retry_after_secs: 30 });
        assert_eq!(err.retry_after_minutes(), 1);

        let err = rl
            .check_and_consume_at(&u, 1, window, start + Duration::from_millis(59_999))
            .unwrap_err();
        assert_eq!(err, RateLimitError::Exceeded { retry_after_secs: 1 });
    }

    #[test]
    fn limiter_rolls_window_over_after_reset() {
        let rl = DownloadRateLimiter::new();
        let u = id("2");
        let start = Instant::now();
        let window = Duration::from_secs(10);

        rl.check_and_consume_at(&u, 1, window, start).unwrap();
        assert!(rl.check_and_consume_at(&u, 1, window, start).is_err());

        // Exactly at reset_at the old window still applies.
        assert!(rl
            .check_and_consume_at(&u, 1, window, start + window)
            .is_err());

        let later = start + window + Duration::from_millis(1);
        assert_eq!(rl.check_and_consume_at(&u, 1, window, later), Ok(Quota { remaining: 0 }));
        assert_eq!(rl.window(&u).unwrap().reset_at, later + window);
    }

    #[test]
    fn limiter_tracks_identities_independently() {
        let rl = DownloadRateLimiter::new();
        let start = Instant::now();
        let window = Duration::from_secs(60);

        rl.check_and_consume_at(&id("1"), 1, window, start).unwrap();
        assert!(rl.check_and_consume_at(&id("1"), 1, window, start).is_err());
        assert!(rl.check_and_consume_at(&id("2"), 1, window, start).is_ok());
        assert!(rl.window(&id("3")).is_none());
    }
}
