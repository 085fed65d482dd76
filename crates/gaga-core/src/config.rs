use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, media::DEFAULT_MAX_MEDIA_BYTES, phone::DEFAULT_COUNTRY_CODE, Result};

pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v18.0";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BRAND_SIGNATURE: &str = " — copyright ©️ 2025";
pub const DEFAULT_BOT_NAME: &str = "Gaga09 XMD";
pub const DEFAULT_BOT_VERSION: &str = "4.2.0";

/// Typed configuration, read from the environment (plus an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // WhatsApp Cloud API
    pub whatsapp_access_token: String,
    pub whatsapp_phone_number_id: String,
    pub whatsapp_verify_token: String,
    pub whatsapp_app_secret: Option<String>,
    pub whatsapp_api_base: String,
    pub bind_addr: String,

    // Commands / access
    pub owner_numbers: Vec<String>,
    pub command_prefix: char,
    pub default_country_code: String,

    // Presentation
    pub brand_signature: String,
    pub bot_name: String,
    pub bot_version: String,
    pub support_contact: Option<String>,
    pub repo_url: Option<String>,
    pub channel_url: Option<String>,
    pub sermon_url: Option<String>,
    pub message_limit: usize,

    // AI providers
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    // Downloads
    pub download_limit_max: u32,
    pub download_limit_window: Duration,
    pub max_media_bytes: u64,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let whatsapp_access_token = required("WHATSAPP_ACCESS_TOKEN")?;
        let whatsapp_phone_number_id = required("WHATSAPP_PHONE_NUMBER_ID")?;
        let whatsapp_verify_token = required("WHATSAPP_VERIFY_TOKEN")?;
        let whatsapp_app_secret = env_str("WHATSAPP_APP_SECRET").and_then(non_empty);
        let whatsapp_api_base = env_str("WHATSAPP_API_BASE")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        // BIND_ADDR wins; PORT alone binds on all interfaces.
        let bind_addr = env_str("BIND_ADDR")
            .and_then(non_empty)
            .or_else(|| env_u32("PORT").map(|p| format!("0.0.0.0:{p}")))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let owner_numbers = parse_owner_numbers(env_str("OWNER_NUMBERS"));
        let command_prefix = match env_str("COMMAND_PREFIX") {
            Some(raw) => parse_prefix(&raw)?,
            None => '.',
        };
        let default_country_code = env_str("DEFAULT_COUNTRY_CODE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());

        // An explicitly empty signature disables branding.
        let brand_signature =
            env_str("BRAND_SIGNATURE").unwrap_or_else(|| DEFAULT_BRAND_SIGNATURE.to_string());
        let bot_name = env_str("BOT_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());
        let bot_version = env_str("BOT_VERSION")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_BOT_VERSION.to_string());
        let support_contact = env_str("SUPPORT_CONTACT").and_then(non_empty);
        let repo_url = env_str("REPO_URL").and_then(non_empty);
        let channel_url = env_str("CHANNEL_URL").and_then(non_empty);
        let sermon_url = env_str("SERMON_URL").and_then(non_empty);
        let message_limit = env_usize("MESSAGE_LIMIT").unwrap_or(4096).max(1);

        let openai_api_key = env_str("OPENAI_API_KEY").and_then(non_empty);
        let openai_model = env_str("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let gemini_api_key = env_str("GEMINI_API_KEY").and_then(non_empty);
        let gemini_model = env_str("GEMINI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gemini-1.5-flash".to_string());

        let download_limit_max = env_u32("DOWNLOAD_LIMIT_MAX").unwrap_or(10);
        let download_limit_window =
            Duration::from_secs(env_u64("DOWNLOAD_LIMIT_WINDOW").unwrap_or(3600));
        let max_media_bytes = env_u64("MAX_MEDIA_BYTES").unwrap_or(DEFAULT_MAX_MEDIA_BYTES);

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/gaga-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            whatsapp_access_token,
            whatsapp_phone_number_id,
            whatsapp_verify_token,
            whatsapp_app_secret,
            whatsapp_api_base,
            bind_addr,
            owner_numbers,
            command_prefix,
            default_country_code,
            brand_signature,
            bot_name,
            bot_version,
            support_contact,
            repo_url,
            channel_url,
            sermon_url,
            message_limit,
            openai_api_key,
            openai_model,
            gemini_api_key,
            gemini_model,
            download_limit_max,
            download_limit_window,
            max_media_bytes,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn parse_prefix(raw: &str) -> Result<char> {
    raw.trim()
        .chars()
        .next()
        .ok_or_else(|| Error::Config("COMMAND_PREFIX must not be empty".to_string()))
}

fn parse_owner_numbers(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
        .map(|s| s.to_string())
        .collect()
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\nOWNER_NUMBERS=\"263780078177, 263716857999\"\nexport PORT=8080\nBROKEN\nBOT_NAME='Gaga'\n",
        );
        assert_eq!(
            parsed,
            vec![
                (
                    "OWNER_NUMBERS".to_string(),
                    "263780078177, 263716857999".to_string()
                ),
                ("PORT".to_string(), "8080".to_string()),
                ("BOT_NAME".to_string(), "Gaga".to_string()),
            ]
        );
    }

    #[test]
    fn owner_numbers_drop_entries_without_digits() {
        let owners = parse_owner_numbers(Some("+263 78 007 8177, ,abc,716857999".to_string()));
        assert_eq!(owners, vec!["+263 78 007 8177", "716857999"]);
        assert!(parse_owner_numbers(None).is_empty());
    }

    #[test]
    fn prefix_uses_first_non_space_char() {
        assert_eq!(parse_prefix(" !cmd").unwrap(), '!');
        assert!(matches!(parse_prefix("   "), Err(Error::Config(_))));
    }

    #[test]
    fn bool_values_accept_common_spellings() {
        for on in ["1", "true", "YES", " on "] {
            assert!(parse_bool(on), "{on}");
        }
        for off in ["0", "false", "no", ""] {
            assert!(!parse_bool(off), "{off}");
        }
    }
}
