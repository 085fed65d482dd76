use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{info, warn};

use crate::{
    commands::{
        dispatcher::{CommandHandler, DispatchContext, Outcome},
        handlers::{usage_line, DownloadQuota, HandlerDeps},
        registry::CommandDescriptor,
    },
    errors::Error,
    formatting::format_file_size,
    media::validate_url,
    messaging::port::MessagingPort,
    ports::{MediaFetchError, MediaSource},
    security::DownloadRateLimiter,
    utils::{AuditEvent, AuditLogger},
    Result,
};

/// `fetch <url>`: download and re-send as native media.
pub struct FetchHandler {
    prefix: char,
    limiter: Arc<DownloadRateLimiter>,
    quota: DownloadQuota,
    max_media_bytes: u64,
    media: Arc<dyn MediaSource>,
    messenger: Arc<dyn MessagingPort>,
    audit: Option<AuditLogger>,
}

impl FetchHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            limiter: deps.limiter.clone(),
            quota: deps.quota,
            max_media_bytes: deps.max_media_bytes,
            media: deps.media.clone(),
            messenger: deps.messenger.clone(),
            audit: deps.audit.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for FetchHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let Some(url) = args.first() else {
            return Ok(Outcome::Reply(format!(
                "📥 *Universal Media Fetcher*\n\n{}\n\nExamples:\n{pf}fetch https://example.com/image.jpg\n\
                 {pf}fetch https://example.com/video.mp4\n\n\
                 📝 *Supported:* images, videos, audio and documents\n\
                 ⚠️ *Limits:* direct links only, {} per file",
                usage_line(self.prefix, "fetch", "[media-url]"),
                format_file_size(self.max_media_bytes),
                pf = self.prefix,
            )));
        };

        if validate_url(url).is_err() {
            return Ok(Outcome::Reply(fetch_failed(
                "Please provide a valid http(s) URL.",
            )));
        }

        if let Err(e) = self
            .limiter
            .check_and_consume(&ctx.identity, self.quota.max_calls, self.quota.window)
        {
            warn!(identity = %ctx.identity, error = %e, "download limit exceeded");
            if let Some(audit) = &self.audit {
                let event = AuditEvent::rate_limit(&ctx.identity, "fetch", e.retry_after_secs());
                if let Err(err) = audit.write(event) {
                    warn!(error = %err, "audit write failed");
                }
            }
            return Ok(Outcome::Reply(format!(
                "⚠️ Download limit exceeded. Try again in {} minutes.",
                e.retry_after_minutes()
            )));
        }

        let mut payload = match self.media.fetch(url).await {
            Ok(p) => p,
            Err(e) => {
                warn!(identity = %ctx.identity, url = %url, error = %e, "media fetch failed");
                return Ok(Outcome::Reply(fetch_failed(&describe_fetch_error(&e))));
            }
        };

        payload.caption = Some(format!(
            "📥 *Fetched Media*\n\n🔗 *Source:* {url}\n📊 *Size:* {}",
            format_file_size(payload.bytes.len() as u64)
        ));
        info!(
            identity = %ctx.identity,
            kind = payload.kind.as_str(),
            size = payload.bytes.len(),
            "sending fetched media"
        );
        self.messenger.send_media(&ctx.chat, payload).await?;
        Ok(Outcome::Suppressed)
    }
}

fn fetch_failed(reason: &str) -> String {
    format!("❌ *Fetch Failed*\n\n🚫 *Error:* {reason}")
}

fn describe_fetch_error(e: &MediaFetchError) -> String {
    match e {
        MediaFetchError::InvalidUrl(_) => "Please provide a valid http(s) URL.".to_string(),
        MediaFetchError::TooLarge { size, max } => format!(
            "File too large ({}). Maximum is {}.",
            format_file_size(*size),
            format_file_size(*max)
        ),
        MediaFetchError::Status(404) => "File not found (404).".to_string(),
        MediaFetchError::Status(403) => "Access denied (403).".to_string(),
        MediaFetchError::Status(code) => format!("Server responded with status {code}."),
        MediaFetchError::Timeout => "The request timed out. Try again later.".to_string(),
        MediaFetchError::Unreachable(_) => "Could not reach the server.".to_string(),
        MediaFetchError::Other(msg) => msg.clone(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppStore {
    PlayStore,
    ApkPure,
}

impl AppStore {
    fn command(self) -> &'static str {
        match self {
            Self::PlayStore => "apkplay",
            Self::ApkPure => "apkpure",
        }
    }

    fn search_base(self) -> &'static str {
        match self {
            Self::PlayStore => "https://play.google.com/store/search",
            Self::ApkPure => "https://apkpure.com/search",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::PlayStore => "📱 *Play Store Search*",
            Self::ApkPure => "📦 *APKPure Search*",
        }
    }
}

pub struct AppSearchHandler {
    store: AppStore,
    prefix: char,
}

impl AppSearchHandler {
    pub fn new(store: AppStore, deps: &HandlerDeps) -> Self {
        Self {
            store,
            prefix: deps.prefix,
        }
    }

    pub fn search_url(&self, app: &str) -> Result<Url> {
        Url::parse_with_params(self.store.search_base(), &[("q", app)])
            .map_err(|e| Error::Handler(format!("search url error: {e}")))
    }
}

#[async_trait]
impl CommandHandler for AppSearchHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "{}\n\n{}\n\nExamples:\n{pf}{cmd} WhatsApp\n{pf}{cmd} Spotify",
                self.store.title(),
                usage_line(pf, self.store.command(), "[app-name]"),
                cmd = self.store.command(),
            )));
        }

        let app = args.join(" ");
        let url = self.search_url(&app)?;
        Ok(Outcome::Reply(format!(
            "{}\n\n🔍 *App:* {app}\n🔗 *Link:* {url}\n\n⚠️ *Always download from trusted sources.*",
            self.store.title()
        )))
    }
}

/// Placeholder for commands whose providers this deployment does not have.
pub struct NotSupportedHandler {
    descriptor: CommandDescriptor,
    prefix: char,
}

impl NotSupportedHandler {
    pub fn new(descriptor: CommandDescriptor, prefix: char) -> Self {
        Self { descriptor, prefix }
    }
}

#[async_trait]
impl CommandHandler for NotSupportedHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        let d = &self.descriptor;
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "ℹ️ *{}*\n\n{}",
                d.summary,
                usage_line(self.prefix, d.name, d.usage)
            )));
        }
        Ok(Outcome::Reply(format!(
            "🚧 *{}*\n\n{}{} is not supported on this deployment yet.",
            d.summary, self.prefix, d.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::handlers::testing::{args, deps, deps_with, user_ctx, StaticMedia},
        messaging::{
            testing::{RecordingMessenger, Sent},
            types::{MediaKind, MediaPayload},
        },
    };
    use std::time::Duration;

    fn reply(out: Outcome) -> String {
        match out {
            Outcome::Reply(t) => t,
            other => panic!("expected reply, got {other:?}"),
        }
    }

    fn png() -> MediaPayload {
        MediaPayload {
            kind: MediaKind::Image,
            bytes: vec![1; 2048],
            mime_type: "image/png".to_string(),
            file_name: "cat.png".to_string(),
            caption: None,
        }
    }

    #[tokio::test]
    async fn fetch_help_advertises_configured_cap() {
        let (mut deps, _) = deps();
        deps.max_media_bytes = 10 * 1024 * 1024;
        let out = reply(
            FetchHandler::new(&deps)
                .handle(&[], &user_ctx("1"))
                .await
                .unwrap(),
        );
        assert!(out.contains("direct links only, 10.0 MB per file"));
        assert!(!out.contains("50.0 MB"));
    }

    #[tokio::test]
    async fn fetch_sends_media_to_chat_and_suppresses_reply() {
        let messenger = Arc::new(RecordingMessenger::default());
        let deps = deps_with(messenger.clone(), Arc::new(StaticMedia(Ok(png()))));
        let ctx = user_ctx("263771234567");

        let out = FetchHandler::new(&deps)
            .handle(&args(&["https://x.com/cat.png"]), &ctx)
            .await
            .unwrap();
        assert_eq!(out, Outcome::Suppressed);

        let sent = messenger.all();
        assert_eq!(sent.len(), 1);
        let Sent::Media {
            to,
            kind,
            file_name,
            caption,
        } = &sent[0]
        else {
            panic!("expected media");
        };
        assert_eq!(to, &ctx.chat);
        assert_eq!(*kind, MediaKind::Image);
        assert_eq!(file_name, "cat.png");
        assert!(caption.as_deref().unwrap().contains("https://x.com/cat.png"));
        assert!(caption.as_deref().unwrap().contains("2.0 KB"));
    }

    #[tokio::test]
    async fn fetch_quota_exhaustion_renders_minutes() {
        let messenger = Arc::new(RecordingMessenger::default());
        let mut deps = deps_with(messenger.clone(), Arc::new(StaticMedia(Ok(png()))));
        deps.quota = DownloadQuota {
            max_calls: 1,
            window: Duration::from_secs(3600),
        };
        let handler = FetchHandler::new(&deps);
        let ctx = user_ctx("1");
        let url = args(&["https://x.com/cat.png"]);

        assert_eq!(handler.handle(&url, &ctx).await.unwrap(), Outcome::Suppressed);
        let text = reply(handler.handle(&url, &ctx).await.unwrap());
        assert_eq!(text, "⚠️ Download limit exceeded. Try again in 60 minutes.");
        assert_eq!(messenger.all().len(), 1);
    }

    #[tokio::test]
    async fn invalid_url_does_not_consume_quota() {
        let (deps, _) = deps();
        let handler = FetchHandler::new(&deps);
        let ctx = user_ctx("1");

        let text = reply(handler.handle(&args(&["ftp://x"]), &ctx).await.unwrap());
        assert!(text.starts_with("❌ *Fetch Failed*"));
        assert!(deps.limiter.window(&ctx.identity).is_none());
    }

    #[tokio::test]
    async fn fetch_errors_are_rendered() {
        let (deps, messenger) = deps();
        let text = reply(
            FetchHandler::new(&deps)
                .handle(&args(&["https://x.com/gone.mp4"]), &user_ctx("1"))
                .await
                .unwrap(),
        );
        assert!(text.contains("File not found (404)."));
        assert!(messenger.all().is_empty());
        assert_eq!(
            describe_fetch_error(&MediaFetchError::TooLarge {
                size: 60 * 1024 * 1024,
                max: 50 * 1024 * 1024
            }),
            "File too large (60.0 MB). Maximum is 50.0 MB."
        );
    }

    #[tokio::test]
    async fn app_search_links_are_encoded() {
        let (deps, _) = deps();
        let play = AppSearchHandler::new(AppStore::PlayStore, &deps);
        let text = reply(
            play.handle(&args(&["Whats", "App&Co"]), &user_ctx("1"))
                .await
                .unwrap(),
        );
        assert!(text.contains("https://play.google.com/store/search?q=Whats+App%26Co"));

        let pure = AppSearchHandler::new(AppStore::ApkPure, &deps);
        assert_eq!(
            pure.search_url("tik tok").unwrap().as_str(),
            "https://apkpure.com/search?q=tik+tok"
        );
    }

    #[tokio::test]
    async fn unsupported_commands_show_usage_or_notice() {
        let (deps, _) = deps();
        let d = *deps.registry.lookup("ytmp3").unwrap();
        let h = NotSupportedHandler::new(d, '.');
        let text = reply(h.handle(&[], &user_ctx("1")).await.unwrap());
        assert!(text.contains("Usage: .ytmp3 [url]"));
        let text = reply(h.handle(&args(&["https://youtu.be/x"]), &user_ctx("1")).await.unwrap());
        assert!(text.contains("not supported"));
    }
}
