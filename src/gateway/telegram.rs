//! Telegram gateway — long-polls the Bot API for updates.
//!
//! Thin shell over the moderation core: decodes updates into workflow
//! events, sends the workflow's replies back, publishes accepted posts
//! to the destination channel, and answers membership queries via
//! `getChatMember`.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::gateway::{ChannelPublisher, MemberStatus, MembershipOracle};
use crate::moderation::types::{Attachment, AttachmentKind, SenderProfile, Submission};
use crate::moderation::workflow::{ReplyMenu, UserEvent};

/// One decoded inbound update.
#[derive(Debug)]
pub struct InboundEvent {
    /// Private chat to reply into.
    pub chat_id: i64,
    pub user_id: i64,
    pub event: UserEvent,
    /// Set for button taps; must be acknowledged via answerCallbackQuery.
    pub callback_id: Option<String>,
}

pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

pub struct TelegramGateway {
    bot_token: SecretString,
    channel_id: i64,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(bot_token: SecretString, channel_id: i64) -> Self {
        Self {
            bot_token,
            channel_id,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// POST a Bot API method, surfacing `ok: false` as an error.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await?;
        let data: serde_json::Value = resp.json().await?;
        if data.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
            return Err(GatewayError::Api {
                method: method.to_string(),
                detail: data
                    .get("description")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("no description")
                    .to_string(),
            });
        }
        Ok(data.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Spawn the long-poll loop and return the decoded event stream.
    pub fn start(&self) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            info!("Telegram gateway listening for updates...");

            loop {
                let url = format!(
                    "https://api.telegram.org/bot{}/getUpdates",
                    bot_token.expose_secret()
                );
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(updates) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in updates {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }
                        let Some(event) = decode_update(update) else {
                            continue;
                        };
                        if tx.send(event).is_err() {
                            info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|ev| (ev, rx))
        }))
    }

    /// Send a reply into a private chat, attaching the requested menu.
    pub async fn send_reply(
        &self,
        chat_id: i64,
        text: &str,
        menu: ReplyMenu,
    ) -> Result<(), GatewayError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = keyboard(menu) {
            body["reply_markup"] = markup;
        }
        self.call("sendMessage", body).await?;
        Ok(())
    }

    /// Acknowledge a button tap so the client stops its spinner.
    pub async fn answer_callback(&self, callback_id: &str) -> Result<(), GatewayError> {
        self.call(
            "answerCallbackQuery",
            serde_json::json!({ "callback_query_id": callback_id }),
        )
        .await?;
        Ok(())
    }
}

// ── Update decoding ─────────────────────────────────────────────────

/// Decode one Bot API update into an inbound event. Returns `None`
/// for updates the gate does not act on (edits, joins, ...).
fn decode_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(callback) = update.get("callback_query") {
        let callback_id = callback.get("id").and_then(serde_json::Value::as_str)?;
        let user_id = callback
            .get("from")
            .and_then(|f| f.get("id"))
            .and_then(serde_json::Value::as_i64)?;
        let chat_id = callback
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_i64)?;
        let event = match callback.get("data").and_then(serde_json::Value::as_str)? {
            "post" => UserEvent::BeginSubmission,
            "confirm" => UserEvent::Confirm,
            "cancel" => UserEvent::Cancel,
            "recheck" => UserEvent::RecheckEligibility,
            _ => return None,
        };
        return Some(InboundEvent {
            chat_id,
            user_id,
            event,
            callback_id: Some(callback_id.to_string()),
        });
    }

    let message = update.get("message")?;
    // Private chats only — the gate never moderates group chatter.
    if message
        .get("chat")
        .and_then(|c| c.get("type"))
        .and_then(serde_json::Value::as_str)
        != Some("private")
    {
        return None;
    }
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(serde_json::Value::as_i64)?;
    let handle = from
        .get("username")
        .and_then(serde_json::Value::as_str)
        .map(String::from);

    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    if text.starts_with("/start") {
        return Some(InboundEvent {
            chat_id,
            user_id,
            event: UserEvent::ShowMenu,
            callback_id: None,
        });
    }

    let attachment = decode_attachment(message);
    if text.is_empty() && attachment.is_none() {
        // Stickers, voice notes, etc. — nothing to moderate.
        return None;
    }

    Some(InboundEvent {
        chat_id,
        user_id,
        event: UserEvent::Content(Submission {
            sender: SenderProfile { user_id, handle },
            text,
            attachment,
        }),
        callback_id: None,
    })
}

fn decode_attachment(message: &serde_json::Value) -> Option<Attachment> {
    if let Some(sizes) = message.get("photo").and_then(serde_json::Value::as_array) {
        // Telegram lists sizes ascending; take the largest.
        let file_ref = sizes
            .last()
            .and_then(|p| p.get("file_id"))
            .and_then(serde_json::Value::as_str)?;
        return Some(Attachment {
            kind: AttachmentKind::Photo,
            file_ref: file_ref.to_string(),
            extension: None,
        });
    }
    if let Some(doc) = message.get("document") {
        let file_ref = doc.get("file_id").and_then(serde_json::Value::as_str)?;
        let extension = doc
            .get("file_name")
            .and_then(serde_json::Value::as_str)
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()));
        return Some(Attachment {
            kind: AttachmentKind::Document,
            file_ref: file_ref.to_string(),
            extension,
        });
    }
    None
}

fn keyboard(menu: ReplyMenu) -> Option<serde_json::Value> {
    match menu {
        ReplyMenu::Main => Some(serde_json::json!({
            "inline_keyboard": [
                [{ "text": "Post an ad", "callback_data": "post" }],
                [{ "text": "Check access", "callback_data": "recheck" }],
            ]
        })),
        ReplyMenu::Confirm => Some(serde_json::json!({
            "inline_keyboard": [[
                { "text": "Publish", "callback_data": "confirm" },
                { "text": "Cancel", "callback_data": "cancel" },
            ]]
        })),
        ReplyMenu::None => None,
    }
}

// ── Trait implementations ───────────────────────────────────────────

#[async_trait]
impl ChannelPublisher for TelegramGateway {
    async fn publish(&self, submission: &Submission) -> Result<(), GatewayError> {
        let result = match &submission.attachment {
            None => {
                self.call(
                    "sendMessage",
                    serde_json::json!({
                        "chat_id": self.channel_id,
                        "text": submission.text,
                    }),
                )
                .await
            }
            Some(att) => {
                let (method, field) = match att.kind {
                    AttachmentKind::Photo => ("sendPhoto", "photo"),
                    AttachmentKind::Document => ("sendDocument", "document"),
                };
                self.call(
                    method,
                    serde_json::json!({
                        "chat_id": self.channel_id,
                        field: att.file_ref,
                        "caption": submission.text,
                    }),
                )
                .await
            }
        };
        result
            .map(|_| ())
            .map_err(|e| GatewayError::PublishFailed(e.to_string()))
    }
}

#[async_trait]
impl MembershipOracle for TelegramGateway {
    async fn member_status(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, GatewayError> {
        let result = self
            .call(
                "getChatMember",
                serde_json::json!({
                    "chat_id": group_id,
                    "user_id": user_id,
                }),
            )
            .await?;
        let status = result
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        Ok(MemberStatus::from_api(status))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
