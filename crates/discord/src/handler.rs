//! Serenity gateway event handler.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{Context, EventHandler, GatewayIntents, Message, Ready},
        model::id::UserId,
    },
    tracing::{debug, info},
};

use {
    spindle_common::types::AuthorId,
    spindle_providers::{CompletionBackend, ImageBackend},
};

use crate::{config::DiscordConfig, relay::Relay};

pub struct SpindleHandler {
    config: DiscordConfig,
    completions: Arc<dyn CompletionBackend>,
    images: Arc<dyn ImageBackend>,
}

impl SpindleHandler {
    #[must_use]
    pub fn new(
        config: DiscordConfig,
        completions: Arc<dyn CompletionBackend>,
        images: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            config,
            completions,
            images,
        }
    }

    /// Gateway intents the bot needs: message events plus their content.
    #[must_use]
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for SpindleHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "gateway connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Cache guard must drop before any await point.
        let bot_id: UserId = ctx.cache.current_user().id;

        if msg.author.id == bot_id {
            return;
        }
        if !msg.mentions_user_id(bot_id) {
            debug!(message_id = %msg.id, "ignoring message without mention");
            return;
        }

        info!(
            message_id = %msg.id,
            channel_id = %msg.channel_id,
            author_id = %msg.author.id,
            "handling mention"
        );
        let relay = Relay {
            config: &self.config,
            completions: self.completions.as_ref(),
            images: self.images.as_ref(),
        };
        relay.handle(&ctx, &msg, AuthorId(bot_id.get())).await;
    }
}
