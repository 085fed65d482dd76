use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::{
    commands::{parser::ParsedCommand, registry::CommandRegistry},
    domain::Identity,
    errors::Error,
    Result,
};

pub const OWNER_ONLY_MESSAGE: &str = "❌ This command is restricted to bot owners only.";
pub const GROUP_ONLY_MESSAGE: &str = "❌ This command can only be used in groups.";
pub const INTERNAL_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
pub const UNAVAILABLE_MESSAGE: &str = "⚠️ This command is not available right now.";

/// What the caller should do after a dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    /// The handler already sent whatever it had to send.
    Suppressed,
    Unknown { command: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchContext {
    pub identity: Identity,
    /// Where replies go; the group for group messages.
    pub chat: Identity,
    pub is_group_chat: bool,
    pub is_privileged: bool,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, args: &[String], ctx: &DispatchContext) -> Result<Outcome>;
}

/// Routes parsed commands to their handlers after the permission checks.
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Bind a handler to a registry name. Unknown names are rejected.
    pub fn register(&mut self, name: &str, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let Some(descriptor) = self.registry.lookup(name) else {
            return Err(Error::Config(format!(
                "cannot register handler for unknown command: {name}"
            )));
        };
        self.handlers.insert(descriptor.name, handler);
        Ok(())
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.registry
            .lookup(name)
            .is_some_and(|d| self.handlers.contains_key(d.name))
    }

    /// Never fails: handler errors and panics become the internal-error reply.
    pub async fn dispatch(&self, parsed: &ParsedCommand, ctx: &DispatchContext) -> Outcome {
        let Some(descriptor) = self.registry.lookup(&parsed.name) else {
            return Outcome::Unknown {
                command: parsed.name.clone(),
            };
        };

        if descriptor.owner_only && !ctx.is_privileged {
            debug!(identity = %ctx.identity, command = descriptor.name, "owner-only command denied");
            return Outcome::Reply(OWNER_ONLY_MESSAGE.to_string());
        }
        if descriptor.group_only && !ctx.is_group_chat {
            debug!(identity = %ctx.identity, command = descriptor.name, "group-only command outside group");
            return Outcome::Reply(GROUP_ONLY_MESSAGE.to_string());
        }

        let Some(handler) = self.handlers.get(descriptor.name).cloned() else {
            return Outcome::Reply(UNAVAILABLE_MESSAGE.to_string());
        };

        // Own task so a panicking handler is contained.
        let args = parsed.args.clone();
        let task_ctx = ctx.clone();
        let joined =
            tokio::spawn(async move { handler.handle(&args, &task_ctx).await }).await;

        match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(identity = %ctx.identity, command = descriptor.name, error = %e, "command handler failed");
                Outcome::Reply(INTERNAL_ERROR_MESSAGE.to_string())
            }
            Err(e) => {
                error!(identity = %ctx.identity, command = descriptor.name, error = %e, "command handler panicked");
                Outcome::Reply(INTERNAL_ERROR_MESSAGE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parser::CommandParser;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Spy {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Spy {
        async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Reply(format!("args={}", args.join(","))))
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandHandler for Failing {
        async fn handle(&self, _args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
            Err(Error::Handler("boom".to_string()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl CommandHandler for Panicking {
        async fn handle(&self, _args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
            panic!("handler exploded");
        }
    }

    fn setup() -> (CommandParser, CommandDispatcher) {
        let registry = Arc::new(CommandRegistry::builtin());
        (
            CommandParser::new('.', registry.clone()),
            CommandDispatcher::new(registry),
        )
    }

    fn ctx(privileged: bool, group: bool) -> DispatchContext {
        let identity = Identity::from_jid("263771234567@s.whatsapp.net");
        DispatchContext {
            chat: if group {
                Identity::from_jid("120363-1@g.us")
            } else {
                identity.clone()
            },
            identity,
            is_group_chat: group,
            is_privileged: privileged,
        }
    }

    #[tokio::test]
    async fn owner_only_denied_without_invoking_handler() {
        let (parser, mut d) = setup();
        let spy = Arc::new(Spy::default());
        d.register("ban", spy.clone()).unwrap();

        let out = d
            .dispatch(&parser.parse(".ban 123").unwrap(), &ctx(false, false))
            .await;
        assert_eq!(out, Outcome::Reply(OWNER_ONLY_MESSAGE.to_string()));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);

        let out = d
            .dispatch(&parser.parse(".ban 123").unwrap(), &ctx(true, false))
            .await;
        assert_eq!(out, Outcome::Reply("args=123".to_string()));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn owner_check_runs_before_group_check() {
        let (parser, mut d) = setup();
        let spy = Arc::new(Spy::default());
        d.register("kick", spy.clone()).unwrap();
        let cmd = parser.parse(".kick x").unwrap();

        assert_eq!(
            d.dispatch(&cmd, &ctx(false, false)).await,
            Outcome::Reply(OWNER_ONLY_MESSAGE.to_string())
        );
        assert_eq!(
            d.dispatch(&cmd, &ctx(true, false)).await,
            Outcome::Reply(GROUP_ONLY_MESSAGE.to_string())
        );
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);

        d.dispatch(&cmd, &ctx(true, true)).await;
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_and_unbound_commands() {
        let (parser, d) = setup();
        assert_eq!(
            d.dispatch(&parser.parse(".nosuch").unwrap(), &ctx(true, false))
                .await,
            Outcome::Unknown {
                command: "nosuch".to_string()
            }
        );
        assert_eq!(
            d.dispatch(&parser.parse(".menu").unwrap(), &ctx(true, false))
                .await,
            Outcome::Reply(UNAVAILABLE_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn failing_and_panicking_handlers_leave_dispatcher_usable() {
        let (parser, mut d) = setup();
        d.register("calc", Arc::new(Failing)).unwrap();
        d.register("emoji", Arc::new(Panicking)).unwrap();
        d.register("font", Arc::new(Spy::default())).unwrap();

        for text in [".calc 1+1", ".emoji hi"] {
            let out = d
                .dispatch(&parser.parse(text).unwrap(), &ctx(false, false))
                .await;
            assert_eq!(out, Outcome::Reply(INTERNAL_ERROR_MESSAGE.to_string()));
        }

        let out = d
            .dispatch(&parser.parse(".font a").unwrap(), &ctx(false, false))
            .await;
        assert_eq!(out, Outcome::Reply("args=a".to_string()));
    }

    #[test]
    fn registering_unknown_name_is_a_config_error() {
        let (_, mut d) = setup();
        assert!(matches!(
            d.register("nosuch", Arc::new(Spy::default())),
            Err(Error::Config(_))
        ));
        d.register("MENU", Arc::new(Spy::default())).unwrap();
        assert!(d.has_handler("menu"));
    }
}
