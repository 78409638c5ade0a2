//! Discord webhook delivery.
//!
//! A digest goes out as a content message (header, optional role mention),
//! one or more embed messages, and an optional footer message.

use serde_json::{Value, json};
use tracing::info;
use upnext_core::format::discord::CONTENT_LIMIT;
use upnext_core::format::truncate_lines;
use upnext_core::{DayBlock, DiscordDigest};

use crate::error::DeliveryResult;
use crate::webhook::WebhookSender;

/// Status codes Discord returns for accepted webhook posts.
pub const SUCCESS_CODES: &[u16] = &[200, 204];

const MENTION_INSTRUCTIONS: &str =
    "*If you'd like to be notified when new content is available, join this role!*";

/// Discord delivery settings for one webhook.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    /// Webhook endpoint URL.
    pub webhook_url: String,
    /// Role to mention under the header, if any.
    pub mention_role_id: Option<String>,
    /// Suppress the join-instructions line under the mention.
    pub hide_mention_instructions: bool,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            mention_role_id: None,
            hide_mention_instructions: false,
        }
    }

    /// Sets the role mention appended after the header.
    #[must_use]
    pub fn with_mention_role(mut self, role_id: impl Into<String>, hide_instructions: bool) -> Self {
        self.mention_role_id = Some(role_id.into());
        self.hide_mention_instructions = hide_instructions;
        self
    }

    /// Builds the header content message.
    pub fn header_payload(&self, digest: &DiscordDigest) -> Value {
        let mut content = digest.header.clone();

        if let Some(ref role_id) = self.mention_role_id {
            content.push_str(&format!("\n\n<@&{role_id}>"));
            if !self.hide_mention_instructions {
                content.push('\n');
                content.push_str(MENTION_INSTRUCTIONS);
            }
        }

        json!({ "content": truncate_lines(&content, CONTENT_LIMIT) })
    }

    /// Builds one embeds message from a batch of day blocks.
    pub fn embeds_payload(batch: &[&DayBlock]) -> Value {
        let embeds: Vec<Value> = batch
            .iter()
            .map(|block| {
                json!({
                    "title": block.title,
                    "description": block.body,
                    "color": block.color,
                })
            })
            .collect();

        json!({ "embeds": embeds })
    }

    /// Builds the trailing footer message, if the digest has one.
    pub fn footer_payload(digest: &DiscordDigest) -> Option<Value> {
        digest
            .footer
            .as_ref()
            .map(|footer| json!({ "content": truncate_lines(footer, CONTENT_LIMIT) }))
    }

    /// Delivers a rendered digest, one webhook POST per message.
    pub async fn send(&self, sender: &WebhookSender, digest: &DiscordDigest) -> DeliveryResult<()> {
        sender
            .post_json(
                "discord",
                &self.webhook_url,
                &self.header_payload(digest),
                SUCCESS_CODES,
            )
            .await?;

        let batches = digest.embed_batches();
        let message_count = batches.len();
        for batch in batches {
            sender
                .post_json(
                    "discord",
                    &self.webhook_url,
                    &Self::embeds_payload(&batch),
                    SUCCESS_CODES,
                )
                .await?;
        }

        if let Some(payload) = Self::footer_payload(digest) {
            sender
                .post_json("discord", &self.webhook_url, &payload, SUCCESS_CODES)
                .await?;
        }

        info!(
            embed_messages = message_count,
            "Digest delivered to Discord"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_digest() -> DiscordDigest {
        DiscordDigest {
            header: "**New Releases (Mar 10 - Mar 16)**\n\n**3** new episodes".to_string(),
            embeds: vec![DayBlock {
                title: "Monday, March 10".to_string(),
                body: "20:00: **Severance** - S02E05 - *Trojan's Horse*".to_string(),
                color: 0x3498DB,
            }],
            footer: Some("Data from Sonarr".to_string()),
        }
    }

    #[test]
    fn header_payload_without_mention() {
        let notifier = DiscordNotifier::new("https://discord.com/api/webhooks/1/x");
        let payload = notifier.header_payload(&sample_digest());
        let content = payload["content"].as_str().unwrap();
        assert!(content.starts_with("**New Releases"));
        assert!(!content.contains("<@&"));
    }

    #[test]
    fn header_payload_with_mention_and_instructions() {
        let notifier = DiscordNotifier::new("https://discord.com/api/webhooks/1/x")
            .with_mention_role("123456789", false);
        let payload = notifier.header_payload(&sample_digest());
        let content = payload["content"].as_str().unwrap();
        assert!(content.contains("<@&123456789>"));
        assert!(content.contains("join this role!"));
    }

    #[test]
    fn header_payload_with_hidden_instructions() {
        let notifier = DiscordNotifier::new("https://discord.com/api/webhooks/1/x")
            .with_mention_role("123456789", true);
        let payload = notifier.header_payload(&sample_digest());
        let content = payload["content"].as_str().unwrap();
        assert!(content.contains("<@&123456789>"));
        assert!(!content.contains("join this role!"));
    }

    #[test]
    fn embeds_payload_shape() {
        let digest = sample_digest();
        let batch: Vec<&DayBlock> = digest.embeds.iter().collect();
        let payload = DiscordNotifier::embeds_payload(&batch);

        let embeds = payload["embeds"].as_array().unwrap();
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0]["title"], "Monday, March 10");
        assert_eq!(embeds[0]["color"], 0x3498DB);
        assert!(
            embeds[0]["description"]
                .as_str()
                .unwrap()
                .contains("**Severance**")
        );
    }

    #[test]
    fn footer_payload_only_when_present() {
        let digest = sample_digest();
        let payload = DiscordNotifier::footer_payload(&digest).unwrap();
        assert_eq!(payload["content"], "Data from Sonarr");

        let digest = DiscordDigest {
            footer: None,
            ..digest
        };
        assert!(DiscordNotifier::footer_payload(&digest).is_none());
    }
}
