//! Slack webhook delivery.
//!
//! A digest goes out as a header blocks message, one or more attachment
//! messages, and an optional footer blocks message.

use serde_json::{Value, json};
use tracing::info;
use upnext_core::format::slack::TEXT_LIMIT;
use upnext_core::format::truncate_lines;
use upnext_core::{DayBlock, SlackDigest};

use crate::error::DeliveryResult;
use crate::webhook::WebhookSender;

/// Status codes Slack returns for accepted webhook posts.
pub const SUCCESS_CODES: &[u16] = &[200];

/// Slack delivery settings for one webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    /// Webhook endpoint URL.
    pub webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
        }
    }

    /// Builds the header blocks message.
    pub fn header_payload(digest: &SlackDigest) -> Value {
        Self::blocks_payload(&digest.header)
    }

    /// Builds one attachments message from a batch of day blocks.
    pub fn attachments_payload(batch: &[&DayBlock]) -> Value {
        let attachments: Vec<Value> = batch
            .iter()
            .map(|block| {
                json!({
                    "color": SlackDigest::color_hex(block.color),
                    "title": block.title,
                    "text": block.body,
                    "mrkdwn_in": ["text"],
                })
            })
            .collect();

        json!({ "attachments": attachments })
    }

    /// Builds the trailing footer message, if the digest has one.
    pub fn footer_payload(digest: &SlackDigest) -> Option<Value> {
        digest
            .footer
            .as_ref()
            .map(|footer| Self::blocks_payload(footer))
    }

    fn blocks_payload(text: &str) -> Value {
        json!({
            "blocks": [
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": truncate_lines(text, TEXT_LIMIT),
                    }
                }
            ]
        })
    }

    /// Delivers a rendered digest, one webhook POST per message.
    pub async fn send(&self, sender: &WebhookSender, digest: &SlackDigest) -> DeliveryResult<()> {
        sender
            .post_json(
                "slack",
                &self.webhook_url,
                &Self::header_payload(digest),
                SUCCESS_CODES,
            )
            .await?;

        let batches = digest.attachment_batches();
        let message_count = batches.len();
        for batch in batches {
            sender
                .post_json(
                    "slack",
                    &self.webhook_url,
                    &Self::attachments_payload(&batch),
                    SUCCESS_CODES,
                )
                .await?;
        }

        if let Some(payload) = Self::footer_payload(digest) {
            sender
                .post_json("slack", &self.webhook_url, &payload, SUCCESS_CODES)
                .await?;
        }

        info!(
            attachment_messages = message_count,
            "Digest delivered to Slack"
        );
        Ok(())
    }
}
