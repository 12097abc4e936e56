//! Inbound message orchestration: commands → resolution → backend → reply.
//!
//! Every failure is surfaced as a short reply (or logged); only the single
//! inbound event is affected, never the gateway task.

use std::time::Duration;

use {
    serenity::all::{Context, Message},
    tokio::time::timeout,
    tracing::{info, warn},
};

use {
    spindle_common::types::{AuthorId, ChannelRef, ThreadMessage},
    spindle_providers::{CompletionBackend, CompletionRequest, ImageBackend, ImageRequest},
    spindle_thread::{
        Error as ThreadError, MESSAGE_END, Normalizer, ThreadResolver,
        commands::{Command, CommandSet},
        paginate, require_reply_target,
        source::MessageSource,
    },
};

use crate::{
    config::DiscordConfig,
    help,
    source::{SerenitySource, thread_message},
};

/// Discord's message ceiling is 2000; keep headroom for the sentinel pair.
pub const DISCORD_MSG_LIMIT: usize = 1998;

/// Longest archive posted before degrading with a corrective reply.
pub const MAX_ARCHIVE_CHUNKS: usize = 50;

/// Square pixel size requested for `!draw` images.
const IMAGE_SIZE: u32 = 512;

/// Wall-clock bound on one chain resolution. The hop ceiling bounds the walk
/// logically; this bounds it in time when the message source is slow.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-event orchestrator. Cheap to build; one per inbound mention.
pub struct Relay<'a> {
    pub config: &'a DiscordConfig,
    pub completions: &'a dyn CompletionBackend,
    pub images: &'a dyn ImageBackend,
}

impl Relay<'_> {
    /// Handle one inbound mention end to end.
    pub async fn handle(&self, ctx: &Context, msg: &Message, bot: AuthorId) {
        let current = thread_message(msg);
        let normalizer = Normalizer::new(format!("<@{}>", bot.0), bot);
        let commands = CommandSet::parse(normalizer.detag(&current.raw_text));

        if commands.contains(Command::Help) {
            self.reply(ctx, msg, &help::usage(&format!("<@{}>", bot.0)))
                .await;
            return;
        }

        if let Err(err) = require_reply_target(&current, &commands) {
            self.reply(ctx, msg, &corrective(&err)).await;
            return;
        }

        let channel = ChannelRef(msg.channel_id.get());
        let source = SerenitySource::new(ctx.http.clone(), ctx.cache.clone());
        let resolver = ThreadResolver::new(source.clone(), normalizer);

        if commands.contains(Command::Archive) {
            self.archive(ctx, msg, &source, &resolver, channel, &current)
                .await;
            return;
        }

        let resolution = match timeout(RESOLVE_TIMEOUT, resolver.resolve(channel, &current, false))
            .await
        {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(err)) => {
                self.report(ctx, msg, &err).await;
                return;
            },
            Err(_) => {
                warn!(message_id = %current.id, "thread resolution timed out");
                self.reply(ctx, msg, "That thread took too long to resolve.")
                    .await;
                return;
            },
        };

        if wants_image(&commands, replied_to(msg).as_ref()) {
            match self
                .images
                .generate(ImageRequest {
                    prompt: resolution.prompt,
                    size: IMAGE_SIZE,
                })
                .await
            {
                Ok(image) => self.reply(ctx, msg, &image.url).await,
                Err(err) => {
                    // The backend's own wording goes to the user verbatim.
                    warn!(error = %err, "image generation failed");
                    self.reply(ctx, msg, &err.to_string()).await;
                },
            }
            return;
        }

        let request = CompletionRequest {
            mode: resolution.mode,
            prompt: resolution.prompt,
            max_tokens: self.config.max_tokens,
            best_of: commands.best_of(),
        };
        match self.completions.complete(request).await {
            Ok(completion) => {
                info!(model = %completion.model, "replying with completion");
                self.reply(ctx, msg, &wrap_reply(&completion.text)).await;
            },
            Err(err) => {
                warn!(error = %err, "completion failed");
                self.reply(ctx, msg, &err.to_string()).await;
            },
        }
    }

    /// Resolve the parent chain unbounded, paginate it, and post the chunks
    /// to the archive channel.
    async fn archive(
        &self,
        ctx: &Context,
        msg: &Message,
        source: &SerenitySource,
        resolver: &ThreadResolver<SerenitySource>,
        channel: ChannelRef,
        current: &ThreadMessage,
    ) {
        // require_reply_target already guaranteed a parent.
        let Some(parent_id) = current.parent_id else {
            return;
        };
        let parent = match source.fetch(channel, parent_id).await {
            Ok(parent) => parent,
            Err(err) => {
                self.report(ctx, msg, &err.into()).await;
                return;
            },
        };

        let transcript = match timeout(RESOLVE_TIMEOUT, resolver.resolve(channel, &parent, true))
            .await
        {
            Ok(Ok(resolution)) => resolution.prompt,
            Ok(Err(err)) => {
                self.report(ctx, msg, &err).await;
                return;
            },
            Err(_) => {
                warn!(message_id = %parent.id, "archive resolution timed out");
                self.reply(ctx, msg, "That story took too long to resolve.")
                    .await;
                return;
            },
        };

        let chunks: Vec<&str> = paginate(&transcript, DISCORD_MSG_LIMIT).collect();
        if chunks.len() > MAX_ARCHIVE_CHUNKS {
            self.reply(
                ctx,
                msg,
                &format!(
                    "That story is too long to archive ({} pages, limit {MAX_ARCHIVE_CHUNKS}).",
                    chunks.len()
                ),
            )
            .await;
            return;
        }

        let Some(guild_id) = msg.guild_id else {
            self.reply(ctx, msg, "Archiving only works in a server channel.")
                .await;
            return;
        };
        let channels = match guild_id.channels(&ctx.http).await {
            Ok(channels) => channels,
            Err(err) => {
                warn!(error = %err, "failed to list guild channels");
                self.reply(ctx, msg, "Could not reach the archive channel.")
                    .await;
                return;
            },
        };
        let Some(archive_id) = channels
            .iter()
            .find(|(_, ch)| ch.name == self.config.archive_channel)
            .map(|(id, _)| *id)
        else {
            self.reply(
                ctx,
                msg,
                &format!("No #{} channel to archive into.", self.config.archive_channel),
            )
            .await;
            return;
        };

        info!(
            chunks = chunks.len(),
            chars = transcript.len(),
            archive_channel = %self.config.archive_channel,
            "archiving story"
        );
        for chunk in &chunks {
            // Discord rejects empty bodies; a trivial thread still gets its
            // confirmation below.
            if chunk.is_empty() {
                continue;
            }
            if let Err(err) = archive_id.say(&ctx.http, *chunk).await {
                warn!(error = %err, "failed to post archive chunk");
                self.reply(ctx, msg, "Archiving failed partway through.")
                    .await;
                return;
            }
        }

        self.reply(
            ctx,
            msg,
            &format!("Story archived in #{}", self.config.archive_channel),
        )
        .await;
    }

    /// Corrective reply for user errors, generic reply plus log otherwise.
    async fn report(&self, ctx: &Context, msg: &Message, err: &ThreadError) {
        if err.is_user_error() {
            self.reply(ctx, msg, &corrective(err)).await;
        } else {
            warn!(error = %err, "thread resolution failed");
            self.reply(ctx, msg, "Something went wrong resolving that thread.")
                .await;
        }
    }

    async fn reply(&self, ctx: &Context, msg: &Message, text: &str) {
        if let Err(err) = msg.reply(&ctx.http, text).await {
            warn!(error = %err, "failed to send reply");
        }
    }
}

fn replied_to(msg: &Message) -> Option<ThreadMessage> {
    msg.referenced_message.as_deref().map(thread_message)
}

/// `!draw` routes to the image backend, as does rerolling a reply that came
/// back with an attachment (regenerate the image, not text about it).
fn wants_image(commands: &CommandSet, replied_to: Option<&ThreadMessage>) -> bool {
    commands.contains(Command::Draw)
        || (commands.contains(Command::Reroll)
            && replied_to.is_some_and(|parent| parent.has_attachment))
}

/// Wrap generated text in the end-of-message sentinel so Discord's trailing
/// whitespace stripping cannot truncate it.
fn wrap_reply(text: &str) -> String {
    format!("{MESSAGE_END}{text}{MESSAGE_END}")
}

fn corrective(err: &impl std::fmt::Display) -> String {
    format!("{err}. Use `!help` for help.")
}
