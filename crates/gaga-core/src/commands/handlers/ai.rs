use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::{
    commands::{
        dispatcher::{CommandHandler, DispatchContext, Outcome},
        handlers::{usage_line, HandlerDeps},
    },
    ports::{CompletionClient, CompletionRequest},
    Result,
};

pub const AI_UNAVAILABLE_MESSAGE: &str =
    "❌ AI service temporarily unavailable. Please try again later.";

/// Persona used for every completion.
pub fn persona_prompt(bot_name: &str) -> String {
    format!(
        "You are {bot_name}, a helpful WhatsApp bot created by Lil Gaga Traxx09. \
         Provide helpful, accurate, and friendly responses. Keep responses concise but informative."
    )
}

/// Ask a completion provider and render the answer. Shared with autoreply.
pub async fn ask(client: &dyn CompletionClient, bot_name: &str, prompt: &str) -> String {
    let req = CompletionRequest {
        system: persona_prompt(bot_name),
        prompt: prompt.to_string(),
    };
    match client.complete(req).await {
        Ok(text) => format!("🤖 *AI Response:*\n\n{}", text.trim()),
        Err(e) => {
            warn!(provider = client.provider(), error = %e, "completion failed");
            AI_UNAVAILABLE_MESSAGE.to_string()
        }
    }
}

/// `ai` / `gemini`: free-form question to one provider.
pub struct AskHandler {
    command: &'static str,
    provider_label: &'static str,
    prefix: char,
    bot_name: String,
    client: Option<Arc<dyn CompletionClient>>,
}

impl AskHandler {
    pub fn openai(deps: &HandlerDeps) -> Self {
        Self {
            command: "ai",
            provider_label: "OpenAI",
            prefix: deps.prefix,
            bot_name: deps.profile.name.clone(),
            client: deps.openai.clone(),
        }
    }

    pub fn gemini(deps: &HandlerDeps) -> Self {
        Self {
            command: "gemini",
            provider_label: "Gemini",
            prefix: deps.prefix,
            bot_name: deps.profile.name.clone(),
            client: deps.gemini.clone(),
        }
    }
}

#[async_trait]
impl CommandHandler for AskHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "🤖 *{} Assistant*\n\n{}\n\nExamples:\n{pf}{cmd} Explain quantum computing\n{pf}{cmd} Write a poem about love",
                self.provider_label,
                usage_line(self.prefix, self.command, "[your question]"),
                pf = self.prefix,
                cmd = self.command,
            )));
        }

        let Some(client) = &self.client else {
            return Ok(Outcome::Reply(format!(
                "❌ {} API key not configured. Please contact the bot owner.",
                self.provider_label
            )));
        };

        let prompt = args.join(" ");
        Ok(Outcome::Reply(ask(client.as_ref(), &self.bot_name, &prompt).await))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildKind {
    Website,
    App,
}

impl BuildKind {
    fn command(self) -> &'static str {
        match self {
            Self::Website => "buildweb",
            Self::App => "buildapp",
        }
    }

    fn instructions(self, spec: &str) -> String {
        match self {
            Self::Website => format!(
                "Generate a complete single-file HTML page with inline CSS and JavaScript for: {spec}. \
                 Return only the code."
            ),
            Self::App => format!(
                "Design a mobile app for: {spec}. List the screens and core features, \
                 then give a short starter code sample."
            ),
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Website => "🌐 *Website Generated*",
            Self::App => "📱 *App Blueprint Generated*",
        }
    }
}

/// `buildweb` / `buildapp`: code generation via the first configured provider.
pub struct BuildHandler {
    kind: BuildKind,
    prefix: char,
    bot_name: String,
    client: Option<Arc<dyn CompletionClient>>,
}

impl BuildHandler {
    pub fn new(kind: BuildKind, deps: &HandlerDeps) -> Self {
        Self {
            kind,
            prefix: deps.prefix,
            bot_name: deps.profile.name.clone(),
            client: deps.openai.clone().or_else(|| deps.gemini.clone()),
        }
    }
}

#[async_trait]
impl CommandHandler for BuildHandler {
    async fn handle(&self, args: &[String], _ctx: &DispatchContext) -> Result<Outcome> {
        if args.is_empty() {
            return Ok(Outcome::Reply(format!(
                "{}\n\n{}\n\n💡 *Describe your idea in detail.*",
                self.kind.title(),
                usage_line(self.prefix, self.kind.command(), "[specification]")
            )));
        }
        let Some(client) = &self.client else {
            return Ok(Outcome::Reply(
                "❌ No AI provider is configured. Please contact the bot owner.".to_string(),
            ));
        };

        let spec = args.join(" ");
        let req = CompletionRequest {
            system: persona_prompt(&self.bot_name),
            prompt: self.kind.instructions(&spec),
        };
        match client.complete(req).await {
            Ok(text) => Ok(Outcome::Reply(format!(
                "{}\n\n📝 *Specification:* {spec}\n\n{}",
                self.kind.title(),
                text.trim()
            ))),
            Err(e) => {
                warn!(provider = client.provider(), error = %e, "build completion failed");
                Ok(Outcome::Reply(AI_UNAVAILABLE_MESSAGE.to_string()))
            }
        }
    }
}
