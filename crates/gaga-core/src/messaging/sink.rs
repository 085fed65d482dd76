use std::sync::Arc;

use async_trait::async_trait;

use crate::{domain::Identity, messaging::port::MessagingPort, ports::NotificationSink, Result};

/// Delivers notifications as plain text messages.
pub struct MessengerSink {
    messenger: Arc<dyn MessagingPort>,
}

impl MessengerSink {
    pub fn new(messenger: Arc<dyn MessagingPort>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl NotificationSink for MessengerSink {
    async fn notify(&self, to: &Identity, text: &str) -> Result<()> {
        self.messenger.send_text(to, text).await.map(|_| ())
    }
}
