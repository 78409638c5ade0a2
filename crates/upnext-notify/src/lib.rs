//! Webhook delivery: Discord and Slack notifiers over a shared sender.

pub mod discord;
pub mod error;
pub mod slack;
pub mod webhook;

pub use discord::DiscordNotifier;
pub use error::{DeliveryError, DeliveryResult};
pub use slack::SlackNotifier;
pub use webhook::WebhookSender;
