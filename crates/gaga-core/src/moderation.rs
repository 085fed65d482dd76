use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::domain::Identity;

/// Identities whose commands are ignored.
#[derive(Debug, Default)]
pub struct BanList {
    banned: Mutex<BTreeSet<Identity>>,
}

impl BanList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the identity was already banned.
    pub fn ban(&self, identity: Identity) -> bool {
        self.banned.lock().insert(identity)
    }

    /// Returns false if the identity was not banned.
    pub fn unban(&self, identity: &Identity) -> bool {
        self.banned.lock().remove(identity)
    }

    pub fn is_banned(&self, identity: &Identity) -> bool {
        self.banned.lock().contains(identity)
    }

    pub fn list(&self) -> Vec<Identity> {
        self.banned.lock().iter().cloned().collect()
    }
}

/// Everyone who has messaged the bot since startup (broadcast audience).
#[derive(Debug, Default)]
pub struct ContactBook {
    seen: Mutex<BTreeSet<Identity>>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, identity: &Identity) {
        let mut seen = self.seen.lock();
        if !seen.contains(identity) {
            seen.insert(identity.clone());
        }
    }

    pub fn all(&self) -> Vec<Identity> {
        self.seen.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
