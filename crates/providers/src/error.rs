use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected the request; `message` is the API's own wording
    /// and is relayed verbatim to the user.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Message(String),
}

impl spindle_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

spindle_common::impl_context!();
