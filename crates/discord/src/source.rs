//! `MessageSource` backed by serenity, preferring the gateway's recency
//! cache before an HTTP fetch.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{Cache, ChannelId, Http, Message},
        http::HttpError,
    },
    tracing::debug,
};

use {
    spindle_common::types::{AuthorId, ChannelRef, MessageId, ThreadMessage},
    spindle_thread::source::{MessageSource, SourceError},
};

/// Convert a serenity message into the engine's snapshot type.
pub fn thread_message(message: &Message) -> ThreadMessage {
    ThreadMessage {
        id: MessageId(message.id.get()),
        author_id: AuthorId(message.author.id.get()),
        raw_text: message.content.clone(),
        parent_id: message
            .message_reference
            .as_ref()
            .and_then(|reference| reference.message_id)
            .map(|id| MessageId(id.get())),
        has_attachment: !message.attachments.is_empty(),
    }
}

#[derive(Clone)]
pub struct SerenitySource {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenitySource {
    #[must_use]
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

#[async_trait]
impl MessageSource for SerenitySource {
    async fn fetch(
        &self,
        channel: ChannelRef,
        id: MessageId,
    ) -> Result<ThreadMessage, SourceError> {
        let channel_id = ChannelId::new(channel.0);
        let message_id = serenity::all::MessageId::new(id.0);

        if let Some(snapshot) = self
            .cache
            .message(channel_id, message_id)
            .map(|cached| thread_message(&cached))
        {
            debug!(%id, "message served from cache");
            return Ok(snapshot);
        }

        match self.http.get_message(channel_id, message_id).await {
            Ok(message) => Ok(thread_message(&message)),
            Err(serenity::Error::Http(HttpError::UnsuccessfulRequest(response)))
                if response.status_code.as_u16() == 404 =>
            {
                Err(SourceError::NotFound { channel, id })
            },
            Err(err) => Err(SourceError::transport("discord message fetch", err)),
        }
    }
}
