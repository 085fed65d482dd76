use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    commands::{
        dispatcher::{CommandHandler, DispatchContext, Outcome},
        handlers::HandlerDeps,
    },
    settings::{Toggle, UserSettings},
    Result,
};

fn emoji(toggle: Toggle) -> &'static str {
    match toggle {
        Toggle::AntiViewOnce => "🔓",
        Toggle::AutoType => "⌨️",
        Toggle::AutoReply => "🤖",
    }
}

fn effect(toggle: Toggle, enabled: bool) -> &'static str {
    match (toggle, enabled) {
        (Toggle::AntiViewOnce, true) => "✅ *View-once media will be automatically saved.*",
        (Toggle::AntiViewOnce, false) => "❌ *View-once media will work normally.*",
        (Toggle::AutoType, true) => "✅ *Bot will show typing indicator before responses.*",
        (Toggle::AutoType, false) => "❌ *Bot will respond immediately without typing indicator.*",
        (Toggle::AutoReply, true) => "✅ *Bot will automatically reply to messages with AI.*",
        (Toggle::AutoReply, false) => "❌ *Bot will only respond to commands.*",
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

/// `antiviewonce` / `autotype` / `autoreply` for the caller's own identity.
pub struct ToggleHandler {
    toggle: Toggle,
    prefix: char,
    settings: Arc<UserSettings>,
}

impl ToggleHandler {
    pub fn new(toggle: Toggle, deps: &HandlerDeps) -> Self {
        Self {
            toggle,
            prefix: deps.prefix,
            settings: deps.settings.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for ToggleHandler {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome> {
        let t = self.toggle;
        let pf = self.prefix;
        let cmd = t.command();

        let Some(setting) = args.first() else {
            let current = self.settings.get(&ctx.identity, t);
            return Ok(Outcome::Reply(format!(
                "{} *{}*\n\nUsage: {pf}{cmd} [on/off]\n\nExamples:\n{pf}{cmd} on\n{pf}{cmd} off\n\n\
                 ⚙️ *Current status:* {}",
                emoji(t),
                t.title(),
                on_off(current)
            )));
        };

        let enabled = setting.eq_ignore_ascii_case("on");
        self.settings.set(&ctx.identity, t, enabled);
        info!(identity = %ctx.identity, toggle = cmd, enabled, "setting changed");

        let mut reply = format!(
            "{} *{} {}*\n\n⚙️ *Status:* {}\n\n{}\n\n💡 *Use {pf}{cmd} {} to toggle.*",
            emoji(t),
            t.title(),
            if enabled { "Enabled" } else { "Disabled" },
            on_off(enabled),
            effect(t, enabled),
            if enabled { "off" } else { "on" },
        );
        if t == Toggle::AutoReply {
            reply.push_str("\n⚠️ *Note:* AI responses may take longer to generate.");
        }
        Ok(Outcome::Reply(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handlers::testing::{args, deps, user_ctx};

    fn reply(out: Outcome) -> String {
        match out {
            Outcome::Reply(t) => t,
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn on_enables_and_anything_else_disables() {
        let (deps, _) = deps();
        let ctx = user_ctx("263771234567");
        let h = ToggleHandler::new(Toggle::AutoReply, &deps);

        let text = reply(h.handle(&args(&["ON"]), &ctx).await.unwrap());
        assert!(text.starts_with("🤖 *Auto Reply Enabled*"));
        assert!(text.contains("Use .autoreply off to toggle."));
        assert!(deps.settings.get(&ctx.identity, Toggle::AutoReply));

        let text = reply(h.handle(&args(&["maybe"]), &ctx).await.unwrap());
        assert!(text.starts_with("🤖 *Auto Reply Disabled*"));
        assert!(!deps.settings.get(&ctx.identity, Toggle::AutoReply));
    }

    #[tokio::test]
    async fn no_argument_shows_current_state() {
        let (deps, _) = deps();
        let ctx = user_ctx("1");
        let h = ToggleHandler::new(Toggle::AntiViewOnce, &deps);

        let text = reply(h.handle(&[], &ctx).await.unwrap());
        assert!(text.contains("Usage: .antiviewonce [on/off]"));
        assert!(text.ends_with("⚙️ *Current status:* OFF"));

        deps.settings.set(&ctx.identity, Toggle::AntiViewOnce, true);
        let text = reply(h.handle(&[], &ctx).await.unwrap());
        assert!(text.ends_with("⚙️ *Current status:* ON"));
    }
}
