use std::{fmt::Write as _, sync::Arc, time::Instant};

use async_trait::async_trait;

use crate::{
    commands::{
        dispatcher::{CommandHandler, DispatchContext, Outcome},
        handlers::HandlerDeps,
        registry::{Category, CommandRegistry},
    },
    config::{Config, DEFAULT_BOT_NAME, DEFAULT_BOT_VERSION},
    formatting::format_duration,
    Result,
};

/// Static facts shown by the info commands.
#[derive(Clone, Debug)]
pub struct BotProfile {
    pub name: String,
    pub version: String,
    pub started_at: Instant,
    pub support_contact: Option<String>,
    pub repo_url: Option<String>,
    pub channel_url: Option<String>,
    pub sermon_url: Option<String>,
}

impl Default for BotProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_BOT_NAME.to_string(),
            version: DEFAULT_BOT_VERSION.to_string(),
            started_at: Instant::now(),
            support_contact: None,
            repo_url: None,
            channel_url: None,
            sermon_url: None,
        }
    }
}

impl BotProfile {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            name: cfg.bot_name.clone(),
            version: cfg.bot_version.clone(),
            started_at: Instant::now(),
            support_contact: cfg.support_contact.clone(),
            repo_url: cfg.repo_url.clone(),
            channel_url: cfg.channel_url.clone(),
            sermon_url: cfg.sermon_url.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoPage {
    Menu,
    About,
    Alive,
    Version,
    Help,
    Support,
    Repo,
    BugMenu,
    Sermon,
    Pairing,
    Session,
}

pub struct InfoHandler {
    page: InfoPage,
    prefix: char,
    profile: Arc<BotProfile>,
    registry: Arc<CommandRegistry>,
}

impl InfoHandler {
    pub fn new(page: InfoPage, deps: &HandlerDeps) -> Self {
        Self {
            page,
            prefix: deps.prefix,
            profile: deps.profile.clone(),
            registry: deps.registry.clone(),
        }
    }

    pub fn render(&self) -> String {
        let p = &self.profile;
        let pf = self.prefix;
        match self.page {
            InfoPage::Menu => render_menu(&self.registry, p, pf),
            InfoPage::About => format!(
                "🤖 *About {name}*\n\n\
                 🔹 *Bot Name:* {name}\n\
                 🔹 *Version:* {version}\n\
                 🔹 *Total Commands:* {count}\n\
                 🔹 *Technology:* WhatsApp Cloud API + Rust\n\
                 🔹 *Features:* AI Integration, Media Downloads, Admin Tools{support}",
                name = p.name,
                version = p.version,
                count = self.registry.len(),
                support = optional_line("\n\n📧 *Support:* ", &p.support_contact),
            ),
            InfoPage::Alive => format!(
                "✅ *{} is ALIVE!*\n\n\
                 🤖 *Status:* Online and Running\n\
                 ⏱️ *Uptime:* {}\n\
                 🔄 *Version:* {}\n\
                 📊 *Commands:* {} available\n\n\
                 Type {pf}menu to see all available commands.",
                p.name,
                format_duration(p.started_at.elapsed()),
                p.version,
                self.registry.len(),
            ),
            InfoPage::Version => format!(
                "📋 *{} Version Information*\n\n\
                 🔹 *Current Version:* {}\n\
                 🔹 *Platform:* WhatsApp Business Cloud API\n\
                 🔹 *Total Commands:* {}\n\
                 🔹 *Uptime:* {}",
                p.name,
                p.version,
                self.registry.len(),
                format_duration(p.started_at.elapsed()),
            ),
            InfoPage::Help => format!(
                "❓ *{} Help Center*\n\n\
                 🚀 *Getting Started:*\n\
                 1. Type {pf}menu to see all commands\n\
                 2. Commands work with or without the prefix ({pf})\n\
                 3. Commands are case-insensitive\n\
                 4. Use spaces to separate arguments\n\n\
                 🎯 *Popular Features:*\n\
                 • {pf}ai [question] - Ask AI anything\n\
                 • {pf}calc [math] - Calculator\n\
                 • {pf}fetch [url] - Download media\n\
                 • {pf}remind [time] [msg] - Set reminder{support}",
                p.name,
                support = optional_line("\n\n📧 *Need Help?* Contact: ", &p.support_contact),
            ),
            InfoPage::Support => format!(
                "🆘 *{} Support Center*{support}{channel}\n\n\
                 ❓ *Bot not responding?*\n\
                 • Check if bot is online ({pf}alive)\n\
                 • Verify your number isn't banned\n\n\
                 ❓ *Media download failed?*\n\
                 • Check if URL is valid\n\
                 • File might be too large\n\
                 • Download limits reset every hour\n\n\
                 🚨 *Report Bugs:* use {pf}bugmenu",
                p.name,
                support = optional_line("\n\n📧 *Primary Contact:* ", &p.support_contact),
                channel = optional_line("\n🌐 *WhatsApp Channel:* ", &p.channel_url),
            ),
            InfoPage::Repo => match &p.repo_url {
                Some(url) => format!(
                    "📂 *{} Repository Information*\n\n🔗 *Repository:*\n{url}\n\n🔹 *Version:* {}",
                    p.name, p.version
                ),
                None => format!("📂 *{} Repository Information*\n\nNo repository link is configured.", p.name),
            },
            InfoPage::BugMenu => format!(
                "🐛 *Bug Report Menu*\n\n\
                 📋 *Include this information:*\n\
                 • Command that failed\n\
                 • Error message received\n\
                 • Time of occurrence\n\
                 • Steps to reproduce{support}\n\n\
                 ⚡ *Quick Fixes:*\n\
                 • Try {pf}alive to check status\n\
                 • Restart command with correct syntax\n\
                 • Wait a few minutes and retry",
                support = optional_line("\n\n📧 *Send reports to:* ", &p.support_contact),
            ),
            InfoPage::Sermon => match &p.sermon_url {
                Some(url) => format!(
                    "⛪ *Latest Sermon*\n\n🔗 *Watch:* {url}\n\n⛪ *Join us for more spiritual content and teachings.*"
                ),
                None => "⛪ *Latest Sermon*\n\nNo sermon link is configured right now. Please check back later.".to_string(),
            },
            InfoPage::Pairing => format!(
                "📱 *Pairing*\n\n\
                 {} runs on the WhatsApp Business Cloud API, so no QR code or pairing code is needed.\n\n\
                 Just message this number. Type {pf}menu to get started.",
                p.name
            ),
            InfoPage::Session => "💾 *Session Management*\n\n\
                 Sessions are managed by the WhatsApp Business platform. There is no session data to export or import."
                .to_string(),
        }
    }
}

#[async_trait]
impl CommandHandler for InfoHandler {
    async fn handle(&self, _args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        Ok(Outcome::Reply(self.render()))
    }
}

fn optional_line(label: &str, value: &Option<String>) -> String {
    value
        .as_deref()
        .map(|v| format!("{label}{v}"))
        .unwrap_or_default()
}

/// Full command menu grouped by category, in table order.
pub fn render_menu(registry: &CommandRegistry, profile: &BotProfile, prefix: char) -> String {
    let mut out = format!(
        "🤖 *{} v{} - Command Menu*\n",
        profile.name, profile.version
    );

    for category in Category::ALL {
        let mut entries = registry.in_category(category).peekable();
        if entries.peek().is_none() {
            continue;
        }
        let _ = write!(out, "\n{}\n", category.title());
        for d in entries {
            let owner = if d.owner_only && category != Category::Admin {
                " (Owner)"
            } else {
                ""
            };
            let usage = if d.usage.is_empty() {
                String::new()
            } else {
                format!(" {}", d.usage)
            };
            let _ = writeln!(out, "• {prefix}{}{usage} - {}{owner}", d.name, d.summary);
        }
    }

    let _ = write!(
        out,
        "\n📊 *Bot Statistics*\n\
         • Total Commands: {}\n\
         • Version: {}\n\
         • Status: Online ✅\n\n\
         💡 *Usage Tips:*\n\
         - Commands work with or without the prefix ({prefix})\n\
         - Commands are case-insensitive",
        registry.len(),
        profile.version
    );
    out
}

/// Reply for a command name that is not in the registry.
pub fn unknown_command_reply(command: &str, prefix: char, profile: &BotProfile) -> String {
    format!(
        "❓ *Unknown Command: {command}*\n\n\
         🤖 *Available options:*\n\
         • Type {prefix}menu for all commands\n\
         • Type {prefix}help for assistance\n\
         • Check spelling and try again{}",
        optional_line("\n\n📧 *Need help?* Contact: ", &profile.support_contact)
    )
}
