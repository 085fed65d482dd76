use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    commands::{
        dispatcher::{CommandHandler, DispatchContext, Outcome},
        handlers::{usage_line, HandlerDeps},
    },
    messaging::port::MessagingPort,
    moderation::{BanList, ContactBook},
    phone::PhoneNumberFormatter,
    reminders::format_time,
    Result,
};

pub struct BanHandler {
    prefix: char,
    formatter: PhoneNumberFormatter,
    bans: Arc<BanList>,
}

impl BanHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            formatter: deps.formatter.clone(),
            bans: deps.bans.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for BanHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        let Some(number) = args.first() else {
            return Ok(Outcome::Reply(format!(
                "🚫 *Ban User Command*\n\n{}\n\nExamples:\n{pf}ban +1234567890\n{pf}ban 1234567890\n\n\
                 📝 *Note:* Banned users cannot use any bot commands.\nUse {pf}listban to see all banned users.",
                usage_line(pf, "ban", "[phone-number]")
            )));
        };

        let target = self.formatter.normalize(number);
        let newly = self.bans.ban(target.clone());
        info!(identity = %ctx.identity, target = %target, newly, "user banned");

        Ok(Outcome::Reply(format!(
            "🚫 *User Banned Successfully*\n\n\
             📱 *Number:* {number}\n\
             🔒 *Status:* Banned from using bot\n\
             📅 *Date:* {}\n\n\
             ✅ *User will no longer be able to use bot commands.*\n\
             Use {pf}unban {number} to remove the ban.",
            format_time(Utc::now())
        )))
    }
}

pub struct UnbanHandler {
    prefix: char,
    formatter: PhoneNumberFormatter,
    bans: Arc<BanList>,
}

impl UnbanHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            formatter: deps.formatter.clone(),
            bans: deps.bans.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for UnbanHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        let Some(number) = args.first() else {
            return Ok(Outcome::Reply(format!(
                "✅ *Unban User Command*\n\n{}\n\nExamples:\n{pf}unban +1234567890\n{pf}unban 1234567890\n\n\
                 📝 *Note:* This will restore user's access to bot commands.",
                usage_line(pf, "unban", "[phone-number]")
            )));
        };

        let target = self.formatter.normalize(number);
        if !self.bans.unban(&target) {
            return Ok(Outcome::Reply(format!(
                "ℹ️ *User Not Found*\n\n📱 *Number:* {number}\n❓ *Status:* User was not banned\n\n\
                 Use {pf}listban to see all banned users."
            )));
        }

        info!(identity = %ctx.identity, target = %target, "user unbanned");
        Ok(Outcome::Reply(format!(
            "✅ *User Unbanned Successfully*\n\n\
             📱 *Number:* {number}\n\
             🔓 *Status:* Access restored\n\
             📅 *Date:* {}\n\n\
             ✅ *User can now use bot commands again.*",
            format_time(Utc::now())
        )))
    }
}

pub struct ListBanHandler {
    prefix: char,
    bans: Arc<BanList>,
}

impl ListBanHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            bans: deps.bans.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for ListBanHandler {
    async fn handle(&self, _args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        let banned = self.bans.list();
        if banned.is_empty() {
            return Ok(Outcome::Reply(format!(
                "📋 *Banned Users List*\n\n✅ *No users are currently banned.*\n\nUse {pf}ban [number] to ban a user."
            )));
        }

        let lines = banned
            .iter()
            .enumerate()
            .map(|(i, id)| format!("{}. {}", i + 1, id.bare()))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Outcome::Reply(format!(
            "📋 *Banned Users List*\n\n🚫 *Total Banned:* {}\n\n{lines}\n\n💡 *Use {pf}unban [number] to remove a ban.*",
            banned.len()
        )))
    }
}

/// Sends the text to every contact seen since startup, except the sender.
pub struct BroadcastHandler {
    prefix: char,
    contacts: Arc<ContactBook>,
    messenger: Arc<dyn MessagingPort>,
}

impl BroadcastHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            contacts: deps.contacts.clone(),
            messenger: deps.messenger.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for BroadcastHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "📢 *Broadcast Command*\n\n{}\n\nExamples:\n{pf}broadcast Hello everyone! Bot is now online.\n\n\
                 ⚠️ *Warning:* This will send the message to ALL bot users.\n\
                 💡 *Tip:* Keep messages short and informative.",
                usage_line(pf, "broadcast", "[message]")
            )));
        }

        let message = args.join(" ");
        let text = format!("📢 *Broadcast*\n\n{message}");
        let (mut delivered, mut failed) = (0usize, 0usize);
        for contact in self.contacts.all() {
            if contact == ctx.identity {
                continue;
            }
            match self.messenger.send_text(&contact, &text).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(identity = %contact, error = %e, "broadcast delivery failed");
                }
            }
        }

        info!(identity = %ctx.identity, delivered, failed, "broadcast sent");
        Ok(Outcome::Reply(format!(
            "📢 *Broadcast Complete*\n\n\
             📝 *Message:* {message}\n\
             ✅ *Delivered:* {delivered}\n\
             ❌ *Failed:* {failed}\n\
             ⏰ *Time:* {}",
            format_time(Utc::now())
        )))
    }
}

pub struct DirectMessageHandler {
    prefix: char,
    formatter: PhoneNumberFormatter,
    messenger: Arc<dyn MessagingPort>,
}

impl DirectMessageHandler {
    pub fn new(deps: &HandlerDeps) -> Self {
        Self {
            prefix: deps.prefix,
            formatter: deps.formatter.clone(),
            messenger: deps.messenger.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for DirectMessageHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let pf = self.prefix;
        if args.len() < 2 {
            return Ok(Outcome::Reply(format!(
                "💬 *Direct Message Command*\n\n{}\n\nExamples:\n{pf}msg +1234567890 Hello, this is a test message\n\n\
                 📝 *Note:* This sends a private message to the specified number.",
                usage_line(pf, "msg", "[phone-number] [message]")
            )));
        }

        let to = self.formatter.normalize(&args[0]);
        let message = args[1..].join(" ");
        if let Err(e) = self.messenger.send_text(&to, &message).await {
            warn!(identity = %ctx.identity, target = %to, error = %e, "direct message failed");
            return Ok(Outcome::Reply(format!(
                "❌ *Message Failed*\n\n📱 *To:* {}\n🚫 *Error:* could not deliver the message.",
                to.bare()
            )));
        }

        Ok(Outcome::Reply(format!(
            "💬 *Direct Message Sent*\n\n\
             📱 *To:* {}\n\
             📝 *Message:* {message}\n\
             📅 *Time:* {}\n\n\
             ✅ *Message has been delivered successfully.*",
            to.bare(),
            format_time(Utc::now())
        )))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupAction {
    Promote,
    Demote,
    Kick,
    Info,
}

impl GroupAction {
    pub fn command(self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Demote => "demote",
            Self::Kick => "kick",
            Self::Info => "groupinfo",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Promote => "👑 *Promote Member Command*",
            Self::Demote => "👤 *Demote Admin Command*",
            Self::Kick => "🚪 *Kick Member Command*",
            Self::Info => "ℹ️ *Group Info Command*",
        }
    }

    fn synopsis(self) -> &'static str {
        match self {
            Self::Info => "[group-jid]",
            _ => "[user-jid]",
        }
    }
}

/// Group management is not exposed by the Cloud API; explains that.
pub struct GroupActionHandler {
    action: GroupAction,
    prefix: char,
}

impl GroupActionHandler {
    pub fn new(action: GroupAction, deps: &HandlerDeps) -> Self {
        Self {
            action,
            prefix: deps.prefix,
        }
    }
}

#[async_trait]
impl CommandHandler for GroupActionHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        let a = self.action;
        let Some(target) = args.first() else {
            return Ok(Outcome::Reply(format!(
                "{}\n\n{}\n\n⚠️ *Requirement:* Bot must be group admin.",
                a.title(),
                usage_line(self.prefix, a.command(), a.synopsis())
            )));
        };

        Ok(Outcome::Reply(format!(
            "{}\n\n👤 *Target:* {target}\n\n\
             ⚠️ Group management is not available through the WhatsApp Business Cloud API. \
             Please use the WhatsApp app for this action.",
            a.title()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::handlers::testing::{args, deps, user_ctx},
        domain::Identity,
        messaging::testing::RecordingMessenger,
    };

    fn reply(out: Outcome) -> String {
        match out {
            Outcome::Reply(t) => t,
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ban_normalizes_and_listban_strips_suffix() {
        let (deps, _) = deps();
        let ban = BanHandler::new(&deps);
        let list = ListBanHandler::new(&deps);
        let ctx = user_ctx("263780078177");

        let text = reply(ban.handle(&args(&["771-234-567"]), &ctx).await.unwrap());
        assert!(text.starts_with("🚫 *User Banned Successfully*"));
        assert!(deps
            .bans
            .is_banned(&Identity::from_jid("263771234567@s.whatsapp.net")));

        let text = reply(list.handle(&[], &ctx).await.unwrap());
        assert!(text.contains("🚫 *Total Banned:* 1"));
        assert!(text.contains("1. 263771234567\n"));
    }

    #[tokio::test]
    async fn unban_reports_missing_user() {
        let (deps, _) = deps();
        let unban = UnbanHandler::new(&deps);
        let ctx = user_ctx("1");

        let text = reply(unban.handle(&args(&["+263 771 234 567"]), &ctx).await.unwrap());
        assert!(text.starts_with("ℹ️ *User Not Found*"));

        deps.bans
            .ban(Identity::from_jid("263771234567@s.whatsapp.net"));
        let text = reply(unban.handle(&args(&["771234567"]), &ctx).await.unwrap());
        assert!(text.starts_with("✅ *User Unbanned Successfully*"));
        assert!(deps.bans.list().is_empty());
    }

    #[tokio::test]
    async fn usage_shown_without_arguments() {
        let (deps, _) = deps();
        let ctx = user_ctx("1");
        let text = reply(BanHandler::new(&deps).handle(&[], &ctx).await.unwrap());
        assert!(text.contains("Usage: .ban [phone-number]"));
        let text = reply(
            DirectMessageHandler::new(&deps)
                .handle(&args(&["123"]), &ctx)
                .await
                .unwrap(),
        );
        assert!(text.contains("Usage: .msg [phone-number] [message]"));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_other_contact() {
        let (deps, messenger) = deps();
        let sender = user_ctx("263780078177");
        for d in ["263780078177", "263771111111", "263772222222"] {
            deps.contacts
                .record(&Identity::from_jid(format!("{d}@s.whatsapp.net")));
        }

        let text = reply(
            BroadcastHandler::new(&deps)
                .handle(&args(&["Bot", "is", "online"]), &sender)
                .await
                .unwrap(),
        );
        assert!(text.contains("✅ *Delivered:* 2"));
        assert!(text.contains("❌ *Failed:* 0"));
        assert!(messenger.texts_to(&sender.identity).is_empty());
        assert_eq!(messenger.texts(), vec!["📢 *Broadcast*\n\nBot is online"; 2]);
    }

    #[tokio::test]
    async fn broadcast_counts_failures() {
        let (mut deps, _) = deps();
        deps.messenger = Arc::new(RecordingMessenger::failing());
        deps.contacts
            .record(&Identity::from_jid("263771111111@s.whatsapp.net"));

        let text = reply(
            BroadcastHandler::new(&deps)
                .handle(&args(&["hi"]), &user_ctx("1"))
                .await
                .unwrap(),
        );
        assert!(text.contains("✅ *Delivered:* 0"));
        assert!(text.contains("❌ *Failed:* 1"));
    }

    #[tokio::test]
    async fn msg_sends_to_normalized_number() {
        let (deps, messenger) = deps();
        let text = reply(
            DirectMessageHandler::new(&deps)
                .handle(&args(&["771234567", "Your", "order", "shipped"]), &user_ctx("1"))
                .await
                .unwrap(),
        );
        assert!(text.contains("📱 *To:* 263771234567"));
        assert_eq!(
            messenger.texts_to(&Identity::from_jid("263771234567@s.whatsapp.net")),
            vec!["Your order shipped"]
        );
    }

    #[tokio::test]
    async fn group_actions_explain_limitation() {
        let (deps, _) = deps();
        let kick = GroupActionHandler::new(GroupAction::Kick, &deps);
        let text = reply(kick.handle(&[], &user_ctx("1")).await.unwrap());
        assert!(text.contains("Usage: .kick [user-jid]"));
        let text = reply(kick.handle(&args(&["123@s.whatsapp.net"]), &user_ctx("1")).await.unwrap());
        assert!(text.contains("not available"));
    }
}
