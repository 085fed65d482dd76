//! Command handler implementations, one struct per behavior.

pub mod admin;
pub mod ai;
pub mod info;
pub mod media;
pub mod tools;
pub mod whatsapp;

use std::{sync::Arc, time::Duration};

use crate::{
    commands::{
        dispatcher::{CommandDispatcher, CommandHandler},
        registry::CommandRegistry,
    },
    messaging::port::MessagingPort,
    moderation::{BanList, ContactBook},
    phone::PhoneNumberFormatter,
    ports::{CompletionClient, MediaSource},
    reminders::ReminderScheduler,
    security::DownloadRateLimiter,
    settings::{Toggle, UserSettings},
    utils::AuditLogger,
    Result,
};

pub use info::BotProfile;

/// Download quota applied to `fetch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadQuota {
    pub max_calls: u32,
    pub window: Duration,
}

impl Default for DownloadQuota {
    fn default() -> Self {
        Self {
            max_calls: 10,
            window: Duration::from_secs(3600),
        }
    }
}

/// Everything the handlers share.
#[derive(Clone)]
pub struct HandlerDeps {
    pub prefix: char,
    pub registry: Arc<CommandRegistry>,
    pub profile: Arc<BotProfile>,
    pub formatter: PhoneNumberFormatter,
    pub bans: Arc<BanList>,
    pub contacts: Arc<ContactBook>,
    pub settings: Arc<UserSettings>,
    pub reminders: ReminderScheduler,
    pub limiter: Arc<DownloadRateLimiter>,
    pub quota: DownloadQuota,
    /// Per-file cap advertised by `fetch`; enforced by the media source.
    pub max_media_bytes: u64,
    pub messenger: Arc<dyn MessagingPort>,
    pub media: Arc<dyn MediaSource>,
    pub openai: Option<Arc<dyn CompletionClient>>,
    pub gemini: Option<Arc<dyn CompletionClient>>,
    pub audit: Option<AuditLogger>,
}

/// Bind a handler to every registry command.
pub fn install(dispatcher: &mut CommandDispatcher, deps: &HandlerDeps) -> Result<()> {
    use info::{InfoHandler, InfoPage};

    let mut bind = |name: &str, handler: Arc<dyn CommandHandler>| dispatcher.register(name, handler);

    for (name, page) in [
        ("menu", InfoPage::Menu),
        ("about", InfoPage::About),
        ("alive", InfoPage::Alive),
        ("version", InfoPage::Version),
        ("help", InfoPage::Help),
        ("support", InfoPage::Support),
        ("repo", InfoPage::Repo),
        ("bugmenu", InfoPage::BugMenu),
        ("sermon", InfoPage::Sermon),
        ("pairqr", InfoPage::Pairing),
        ("pair", InfoPage::Pairing),
        ("pair2", InfoPage::Pairing),
        ("getsession", InfoPage::Session),
        ("setsession", InfoPage::Session),
    ] {
        bind(name, Arc::new(InfoHandler::new(page, deps)))?;
    }

    bind("ban", Arc::new(admin::BanHandler::new(deps)))?;
    bind("unban", Arc::new(admin::UnbanHandler::new(deps)))?;
    bind("listban", Arc::new(admin::ListBanHandler::new(deps)))?;
    bind("broadcast", Arc::new(admin::BroadcastHandler::new(deps)))?;
    bind("msg", Arc::new(admin::DirectMessageHandler::new(deps)))?;
    for action in [
        admin::GroupAction::Promote,
        admin::GroupAction::Demote,
        admin::GroupAction::Kick,
        admin::GroupAction::Info,
    ] {
        bind(action.command(), Arc::new(admin::GroupActionHandler::new(action, deps)))?;
    }

    bind("fetch", Arc::new(media::FetchHandler::new(deps)))?;
    bind("apkplay", Arc::new(media::AppSearchHandler::new(media::AppStore::PlayStore, deps)))?;
    bind("apkpure", Arc::new(media::AppSearchHandler::new(media::AppStore::ApkPure, deps)))?;
    for name in [
        "ytmp3", "ytmp4", "tiktokdl", "snapinsta", "fbdl", "nkiridl", "shazam", "metaai", "bard",
        "html2apk", "web2apk", "statusviewer",
    ] {
        let Some(descriptor) = deps.registry.lookup(name).copied() else {
            continue;
        };
        bind(name, Arc::new(media::NotSupportedHandler::new(descriptor, deps.prefix)))?;
    }

    bind("ai", Arc::new(ai::AskHandler::openai(deps)))?;
    bind("gemini", Arc::new(ai::AskHandler::gemini(deps)))?;
    bind("buildweb", Arc::new(ai::BuildHandler::new(ai::BuildKind::Website, deps)))?;
    bind("buildapp", Arc::new(ai::BuildHandler::new(ai::BuildKind::App, deps)))?;

    bind("calc", Arc::new(tools::CalcHandler::new(deps.prefix)))?;
    bind("emoji", Arc::new(tools::EmojiHandler::new(deps.prefix)))?;
    bind("font", Arc::new(tools::FontHandler::new(deps.prefix)))?;
    bind("remind", Arc::new(tools::RemindHandler::new(deps)))?;
    bind("reminders", Arc::new(tools::ListRemindersHandler::new(deps)))?;
    bind("cancelreminder", Arc::new(tools::CancelReminderHandler::new(deps)))?;

    for toggle in [Toggle::AntiViewOnce, Toggle::AutoType, Toggle::AutoReply] {
        bind(
            toggle.command(),
            Arc::new(whatsapp::ToggleHandler::new(toggle, deps)),
        )?;
    }

    Ok(())
}

/// `Usage: .name synopsis` line.
pub(crate) fn usage_line(prefix: char, name: &str, synopsis: &str) -> String {
    if synopsis.is_empty() {
        format!("Usage: {prefix}{name}")
    } else {
        format!("Usage: {prefix}{name} {synopsis}")
    }
}
