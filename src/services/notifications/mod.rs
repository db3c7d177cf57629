pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MAX_RELAY_BATCH;
use crate::db::TokenStore;
use crate::errors::AppError;
use crate::models::{FanOutReport, NotificationEvent, PushMessage};

/// Multicast endpoints accept at most this many tokens per call.
pub const MAX_MULTICAST_BATCH: usize = 500;

const RELAY_TOKEN_PREFIXES: [&str; 2] = ["ExponentPushToken[", "ExpoPushToken["];

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send_multicast(&self, tokens: &[String], message: &PushMessage) -> anyhow::Result<()>;
    async fn send_relay_batch(&self, tokens: &[String], message: &PushMessage) -> anyhow::Result<()>;
}

pub fn is_relay_token(token: &str) -> bool {
    RELAY_TOKEN_PREFIXES.iter().any(|p| token.starts_with(p))
}

/// Drops blanks and repeats, keeping first-seen order.
pub fn dedup_tokens<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    tokens
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Delivers `message` to every distinct token. A failed batch is logged and
/// counted; it does not stop the remaining batches.
pub async fn fan_out(
    push: &dyn PushProvider,
    tokens: &[String],
    message: &PushMessage,
    relay_batch_size: usize,
) -> FanOutReport {
    let tokens = dedup_tokens(tokens);
    let (relay, multicast): (Vec<String>, Vec<String>) =
        tokens.iter().cloned().partition(|t| is_relay_token(t));

    let mut report = FanOutReport {
        tokens: tokens.len(),
        ..Default::default()
    };

    for batch in relay.chunks(relay_batch_size.clamp(1, MAX_RELAY_BATCH)) {
        report.relay_batches += 1;
        if let Err(e) = push.send_relay_batch(batch, message).await {
            report.failed_batches += 1;
            tracing::error!(error = %e, tokens = batch.len(), "push relay batch failed");
        }
    }

    for batch in multicast.chunks(MAX_MULTICAST_BATCH) {
        report.multicast_batches += 1;
        if let Err(e) = push.send_multicast(batch, message).await {
            report.failed_batches += 1;
            tracing::error!(error = %e, tokens = batch.len(), "multicast push failed");
        }
    }

    report
}

pub struct Notifier {
    tokens: Arc<dyn TokenStore>,
    push: Arc<dyn PushProvider>,
    relay_batch_size: usize,
}

impl Notifier {
    pub fn new(tokens: Arc<dyn TokenStore>, push: Arc<dyn PushProvider>, relay_batch_size: usize) -> Self {
        Self {
            tokens,
            push,
            relay_batch_size,
        }
    }

    pub async fn notify(&self, event: &NotificationEvent) -> Result<FanOutReport, AppError> {
        let Some((recipient, message)) = route(event) else {
            return Ok(FanOutReport::default());
        };

        let tokens = self
            .tokens
            .get_device_tokens(&recipient)
            .await
            .map_err(AppError::fetch)?;

        if tokens.is_empty() {
            tracing::debug!(recipient = %recipient, "no device tokens, skipping push");
            return Ok(FanOutReport::default());
        }

        let report = fan_out(self.push.as_ref(), &tokens, &message, self.relay_batch_size).await;
        tracing::info!(
            recipient = %recipient,
            tokens = report.tokens,
            failed_batches = report.failed_batches,
            "push fan-out finished"
        );
        Ok(report)
    }
}

/// Picks the recipient and builds the message for an event. `None` when the
/// event needs no push.
fn route(event: &NotificationEvent) -> Option<(String, PushMessage)> {
    match event {
        NotificationEvent::NewMessage(msg) => Some((
            msg.recipient_id.clone(),
            PushMessage {
                title: msg.sender_name.clone(),
                body: preview(&msg.text, 100),
                data: serde_json::json!({
                    "type": "message",
                    "conversation_id": msg.conversation_id,
                }),
            },
        )),
        NotificationEvent::BookingCreated { booking } => Some((
            booking.provider_id.clone(),
            PushMessage {
                title: "New booking request".to_string(),
                body: format!(
                    "You have a new booking on {} at {}.",
                    booking.scheduled_date.format("%Y-%m-%d"),
                    booking.scheduled_time.format("%H:%M")
                ),
                data: serde_json::json!({
                    "type": "booking",
                    "booking_id": booking.id,
                }),
            },
        )),
        NotificationEvent::BookingStatusChanged { booking, previous } => {
            if *previous == booking.status {
                return None;
            }
            Some((
                booking.customer_id.clone(),
                PushMessage {
                    title: format!("Booking {}", booking.status.label()),
                    body: format!(
                        "Your booking on {} at {} is now {}.",
                        booking.scheduled_date.format("%Y-%m-%d"),
                        booking.scheduled_time.format("%H:%M"),
                        booking.status.label()
                    ),
                    data: serde_json::json!({
                        "type": "booking_status",
                        "booking_id": booking.id,
                        "status": booking.status,
                    }),
                },
            ))
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}
