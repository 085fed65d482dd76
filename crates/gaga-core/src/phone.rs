use crate::domain::{Identity, USER_SUFFIX};

pub const DEFAULT_COUNTRY_CODE: &str = "263";

/// Length of a national number written without its country code.
const LOCAL_NUMBER_DIGITS: usize = 9;

/// Turns free-form phone numbers into [`Identity`] values.
///
/// Never fails: any input yields an identity, including the empty string
/// (which becomes a bare suffix).
#[derive(Clone, Debug)]
pub struct PhoneNumberFormatter {
    country_code: String,
}

impl Default for PhoneNumberFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODE)
    }
}

impl PhoneNumberFormatter {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: digits_only(&country_code.into()),
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn normalize(&self, raw: &str) -> Identity {
        let mut digits = digits_only(raw);
        if digits.len() == LOCAL_NUMBER_DIGITS && !digits.starts_with(&self.country_code) {
            digits.insert_str(0, &self.country_code);
        }
        Identity::from_jid(format!("{digits}{USER_SUFFIX}"))
    }
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
