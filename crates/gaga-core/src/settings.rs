use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::Identity;

/// On/off switches a user can flip for themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Toggle {
    AntiViewOnce,
    AutoType,
    AutoReply,
}

impl Toggle {
    pub fn command(self) -> &'static str {
        match self {
            Self::AntiViewOnce => "antiviewonce",
            Self::AutoType => "autotype",
            Self::AutoReply => "autoreply",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::AntiViewOnce => "Anti View Once",
            Self::AutoType => "Auto Typing",
            Self::AutoReply => "Auto Reply",
        }
    }
}

/// Per-identity toggle values. Unset toggles read as off.
#[derive(Debug, Default)]
pub struct UserSettings {
    values: Mutex<HashMap<(Identity, Toggle), bool>>,
}

impl UserSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &Identity, toggle: Toggle) -> bool {
        self.values
            .lock()
            .get(&(identity.clone(), toggle))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&self, identity: &Identity, toggle: Toggle, enabled: bool) {
        self.values.lock().insert((identity.clone(), toggle), enabled);
    }
}
