use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use gaga_core::{
    bot::Bot, config::Config, domain::Identity, messaging::types::IncomingMessage,
};

use crate::webhook::{extract_messages, verify_signature, verify_subscription, WebhookPayload};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    pub verify_token: String,
    pub app_secret: Option<String>,
    pub chat_locks: Arc<ChatLocks>,
}

impl AppState {
    pub fn new(bot: Arc<Bot>, cfg: &Config) -> Self {
        Self {
            bot,
            verify_token: cfg.whatsapp_verify_token.clone(),
            app_secret: cfg.whatsapp_app_secret.clone(),
            chat_locks: Arc::new(ChatLocks::default()),
        }
    }
}

/// One async mutex per chat so a chat's messages are handled in order.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<Identity, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat: &Identity) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(addr = %addr, "webhook server listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let challenge = verify_subscription(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        &state.verify_token,
    );
    match challenge {
        Some(c) => {
            info!("webhook subscription verified");
            (StatusCode::OK, c.to_string())
        }
        None => {
            warn!("webhook subscription rejected");
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
    }
}

async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.app_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, &body, signature) {
            warn!("webhook signature mismatch");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let messages = extract_messages(&payload);
    debug!(count = messages.len(), "webhook delivery");
    for (chat, batch) in batch_by_chat(messages) {
        let bot = state.bot.clone();
        let locks = state.chat_locks.clone();
        tokio::spawn(async move {
            let _guard = locks.lock_chat(&chat).await;
            for msg in batch {
                let disposition = bot.handle_incoming(msg).await;
                debug!(?disposition, "message handled");
            }
        });
    }
    StatusCode::OK
}

/// Group messages per chat, keeping delivery order within each chat.
fn batch_by_chat(messages: Vec<IncomingMessage>) -> Vec<(Identity, Vec<IncomingMessage>)> {
    let mut batches: Vec<(Identity, Vec<IncomingMessage>)> = Vec::new();
    for msg in messages {
        match batches.iter_mut().find(|(chat, _)| *chat == msg.chat) {
            Some((_, batch)) => batch.push(msg),
            None => batches.push((msg.chat.clone(), vec![msg])),
        }
    }
    batches
}
