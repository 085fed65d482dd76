use std::fmt;

use serde::Serialize;

/// Suffix WhatsApp appends to user addresses.
pub const USER_SUFFIX: &str = "@s.whatsapp.net";

/// Suffix WhatsApp appends to group addresses.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Canonical chat participant key (digits + [`USER_SUFFIX`]).
///
/// Build user identities through [`crate::phone::PhoneNumberFormatter`];
/// `from_jid` wraps an address that is already canonical (group ids, ids
/// echoed back by the transport).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn from_jid(jid: impl Into<String>) -> Self {
        Self(jid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address without its user suffix.
    pub fn bare(&self) -> &str {
        self.0.strip_suffix(USER_SUFFIX).unwrap_or(&self.0)
    }

    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_SUFFIX)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message accepted by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub to: Identity,
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_strips_user_suffix_only() {
        let user = Identity::from_jid("263771234567@s.whatsapp.net");
        assert_eq!(user.bare(), "263771234567");
        assert!(!user.is_group());

        let group = Identity::from_jid("120363-99@g.us");
        assert_eq!(group.bare(), "120363-99@g.us");
        assert!(group.is_group());
    }
}
