use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{domain::Identity, errors::Error, Result};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl AuditEvent {
    fn base(event: &str, identity: &Identity) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            identity: identity.clone(),
            chat: None,
            command: None,
            content: None,
            response: None,
            reason: None,
            error: None,
            retry_after: None,
        }
    }

    /// A dispatched command and what the bot answered.
    pub fn command(
        identity: &Identity,
        chat: &Identity,
        command: &str,
        content: &str,
        response: Option<&str>,
    ) -> Self {
        Self {
            chat: Some(chat.clone()),
            command: Some(command.to_string()),
            content: Some(content.to_string()),
            response: response.map(|s| s.to_string()),
            ..Self::base("command", identity)
        }
    }

    pub fn denied(identity: &Identity, command: &str, reason: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            reason: Some(reason.to_string()),
            ..Self::base("denied", identity)
        }
    }

    pub fn error(identity: &Identity, error: &str, command: Option<&str>) -> Self {
        Self {
            command: command.map(|s| s.to_string()),
            error: Some(error.to_string()),
            ..Self::base("error", identity)
        }
    }

    pub fn rate_limit(identity: &Identity, command: &str, retry_after_secs: u64) -> Self {
        Self {
            command: Some(command.to_string()),
            retry_after: Some(retry_after_secs),
            ..Self::base("rate_limit", identity)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.response {
            event.response = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

/// Truncate to `max_len` chars, marking the cut with `...`.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let pid = std::process::id();
        std::env::temp_dir().join(format!("{prefix}-{pid}-{ts}.log"))
    }

    fn user() -> Identity {
        Identity::from_jid("263771234567@s.whatsapp.net")
    }

    #[test]
    fn truncate_text_counts_chars_not_bytes() {
        assert_eq!(truncate_text("héllo", 5), "héllo");
        assert_eq!(truncate_text("héllo", 2), "hé...");
    }

    #[test]
    fn json_audit_truncates_content_and_response() {
        let log = AuditLogger::new(tmp_file("gaga-audit-json"), true);
        let content = "x".repeat(AUDIT_MAX_TEXT + 1);
        let response = "y".repeat(AUDIT_MAX_TEXT + 50);
        let ev = AuditEvent::command(&user(), &user(), "calc", &content, Some(&response));
        log.write(ev).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let line: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(line["event"], "command");
        assert_eq!(line["identity"], "263771234567@s.whatsapp.net");
        assert_eq!(line["command"], "calc");
        assert_eq!(
            line["content"].as_str().unwrap().len(),
            AUDIT_MAX_TEXT + 3
        );
        assert!(line.get("error").is_none());
    }

    #[test]
    fn text_audit_writes_one_field_per_line() {
        let log = AuditLogger::new(tmp_file("gaga-audit-text"), false);
        log.write(AuditEvent::rate_limit(&user(), "fetch", 120)).unwrap();
        log.write(AuditEvent::denied(&user(), "ban", "owner_only"))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: rate_limit"));
        assert!(written.contains("retry_after: 120"));
        assert!(written.contains("reason: owner_only"));
        assert_eq!(written.matches(&"=".repeat(60)).count(), 2);
    }
}
