//! Inbound message pipeline: parse, gate, dispatch, reply.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    commands::{
        dispatcher::{
            CommandDispatcher, DispatchContext, Outcome, GROUP_ONLY_MESSAGE, OWNER_ONLY_MESSAGE,
        },
        handlers::{self, ai, info::unknown_command_reply, BotProfile, DownloadQuota, HandlerDeps},
        parser::CommandParser,
        registry::CommandRegistry,
    },
    config::{Config, DEFAULT_BRAND_SIGNATURE},
    domain::Identity,
    formatting::split_message,
    media::DEFAULT_MAX_MEDIA_BYTES,
    messaging::{
        branded::BrandedMessenger, port::MessagingPort, sink::MessengerSink,
        types::IncomingMessage,
    },
    moderation::{BanList, ContactBook},
    phone::{PhoneNumberFormatter, DEFAULT_COUNTRY_CODE},
    ports::{CompletionClient, MediaSource, PrivilegedListProvider, StaticPrivilegedList},
    reminders::ReminderScheduler,
    security::{is_privileged, DownloadRateLimiter},
    settings::{Toggle, UserSettings},
    utils::{AuditEvent, AuditLogger},
    Result,
};

/// Static knobs for one bot instance.
#[derive(Clone, Debug)]
pub struct BotOptions {
    pub prefix: char,
    pub country_code: String,
    pub owners: Vec<String>,
    pub message_limit: usize,
    pub brand_signature: String,
    pub profile: BotProfile,
    pub download_quota: DownloadQuota,
    pub max_media_bytes: u64,
    pub audit: Option<AuditLogger>,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            prefix: '.',
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            owners: Vec::new(),
            message_limit: 4096,
            brand_signature: DEFAULT_BRAND_SIGNATURE.to_string(),
            profile: BotProfile::default(),
            download_quota: DownloadQuota::default(),
            max_media_bytes: DEFAULT_MAX_MEDIA_BYTES,
            audit: None,
        }
    }
}

impl BotOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            prefix: cfg.command_prefix,
            country_code: cfg.default_country_code.clone(),
            owners: cfg.owner_numbers.clone(),
            message_limit: cfg.message_limit,
            brand_signature: cfg.brand_signature.clone(),
            profile: BotProfile::from_config(cfg),
            download_quota: DownloadQuota {
                max_calls: cfg.download_limit_max,
                window: cfg.download_limit_window,
            },
            max_media_bytes: cfg.max_media_bytes,
            audit: Some(AuditLogger::new(
                cfg.audit_log_path.clone(),
                cfg.audit_log_json,
            )),
        }
    }
}

/// External services the bot talks to.
pub struct Collaborators {
    pub messenger: Arc<dyn MessagingPort>,
    pub media: Arc<dyn MediaSource>,
    pub openai: Option<Arc<dyn CompletionClient>>,
    pub gemini: Option<Arc<dyn CompletionClient>>,
}

/// What happened to one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    NotACommand,
    Banned,
    AutoReplied,
    Dispatched(Outcome),
}

pub struct Bot {
    parser: CommandParser,
    dispatcher: CommandDispatcher,
    privileged: Arc<dyn PrivilegedListProvider>,
    messenger: Arc<dyn MessagingPort>,
    profile: Arc<BotProfile>,
    bans: Arc<BanList>,
    contacts: Arc<ContactBook>,
    settings: Arc<UserSettings>,
    reminders: ReminderScheduler,
    completion: Option<Arc<dyn CompletionClient>>,
    message_limit: usize,
    audit: Option<AuditLogger>,
}

impl Bot {
    /// Wire the registry, handlers and messenger decorators together.
    /// Must be called inside a tokio runtime.
    pub fn assemble(opts: BotOptions, collab: Collaborators) -> Result<Self> {
        let registry = Arc::new(CommandRegistry::builtin());
        let messenger: Arc<dyn MessagingPort> = Arc::new(BrandedMessenger::new(
            collab.messenger,
            opts.brand_signature.clone(),
        ));
        let reminders = ReminderScheduler::new(Arc::new(MessengerSink::new(messenger.clone())));
        let profile = Arc::new(opts.profile);

        let deps = HandlerDeps {
            prefix: opts.prefix,
            registry: registry.clone(),
            profile: profile.clone(),
            formatter: PhoneNumberFormatter::new(opts.country_code),
            bans: Arc::new(BanList::new()),
            contacts: Arc::new(ContactBook::new()),
            settings: Arc::new(UserSettings::new()),
            reminders: reminders.clone(),
            limiter: Arc::new(DownloadRateLimiter::new()),
            quota: opts.download_quota,
            max_media_bytes: opts.max_media_bytes,
            messenger: messenger.clone(),
            media: collab.media,
            openai: collab.openai.clone(),
            gemini: collab.gemini.clone(),
            audit: opts.audit.clone(),
        };

        let mut dispatcher = CommandDispatcher::new(registry.clone());
        handlers::install(&mut dispatcher, &deps)?;
        info!(
            commands = registry.len(),
            owners = opts.owners.len(),
            "bot assembled"
        );

        Ok(Self {
            parser: CommandParser::new(opts.prefix, registry),
            dispatcher,
            privileged: Arc::new(StaticPrivilegedList(opts.owners)),
            messenger,
            profile,
            bans: deps.bans,
            contacts: deps.contacts,
            settings: deps.settings,
            reminders,
            completion: collab.openai.or(collab.gemini),
            message_limit: opts.message_limit,
            audit: opts.audit,
        })
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn is_privileged(&self, identity: &Identity) -> bool {
        is_privileged(identity, &self.privileged.privileged_numbers())
    }

    pub async fn handle_incoming(&self, msg: IncomingMessage) -> Disposition {
        self.contacts.record(&msg.sender);

        let Some(parsed) = self.parser.parse(&msg.text) else {
            return self.maybe_auto_reply(&msg).await;
        };

        let privileged = self.is_privileged(&msg.sender);
        if !privileged && self.bans.is_banned(&msg.sender) {
            debug!(identity = %msg.sender, command = %parsed.name, "ignoring banned sender");
            return Disposition::Banned;
        }

        let ctx = DispatchContext {
            identity: msg.sender.clone(),
            chat: msg.chat.clone(),
            is_group_chat: msg.is_group,
            is_privileged: privileged,
        };
        info!(identity = %ctx.identity, command = %parsed.name, group = ctx.is_group_chat, "dispatching command");
        let outcome = self.dispatcher.dispatch(&parsed, &ctx).await;

        let response = match &outcome {
            Outcome::Reply(text) => Some(text.clone()),
            Outcome::Unknown { command } => Some(unknown_command_reply(
                command,
                self.parser.prefix(),
                &self.profile,
            )),
            Outcome::Suppressed => None,
        };
        if let Some(text) = &response {
            self.reply(&msg.chat, text).await;
        }

        let event = match denial_reason(&outcome) {
            Some(reason) => AuditEvent::denied(&msg.sender, &parsed.name, reason),
            None => AuditEvent::command(
                &msg.sender,
                &msg.chat,
                &parsed.name,
                &parsed.raw_text,
                response.as_deref(),
            ),
        };
        self.audit(event);

        Disposition::Dispatched(outcome)
    }

    async fn maybe_auto_reply(&self, msg: &IncomingMessage) -> Disposition {
        if msg.text.trim().is_empty() || !self.settings.get(&msg.sender, Toggle::AutoReply) {
            return Disposition::NotACommand;
        }
        let Some(client) = &self.completion else {
            return Disposition::NotACommand;
        };
        if self.bans.is_banned(&msg.sender) && !self.is_privileged(&msg.sender) {
            return Disposition::Banned;
        }

        let answer = ai::ask(client.as_ref(), &self.profile.name, msg.text.trim()).await;
        self.reply(&msg.chat, &answer).await;
        Disposition::AutoReplied
    }

    /// Chunked send. Failures are logged, never surfaced.
    async fn reply(&self, chat: &Identity, text: &str) {
        let limit = self
            .message_limit
            .min(self.messenger.capabilities().max_message_len)
            .max(1);
        for chunk in split_message(text, limit) {
            if let Err(e) = self.messenger.send_text(chat, &chunk).await {
                error!(chat = %chat, error = %e, "failed to send reply");
                self.audit(AuditEvent::error(chat, &e.to_string(), None));
                return;
            }
        }
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.write(event) {
                warn!(path = %audit.path().display(), error = %e, "audit write failed");
            }
        }
    }
}

fn denial_reason(outcome: &Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Reply(text) if text == OWNER_ONLY_MESSAGE => Some("owner_only"),
        Outcome::Reply(text) if text == GROUP_ONLY_MESSAGE => Some("group_only"),
        _ => None,
    }
}
