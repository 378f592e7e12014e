use thiserror::Error;

/// Anything that can go wrong between a raw push frame and a [`crate::PushEvent`].
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed hub record: {0}")]
    Record(#[source] serde_json::Error),

    #[error("Invocation record without a target")]
    MissingTarget,

    #[error("Unknown hub event: {0}")]
    UnknownEvent(String),

    #[error("Bad argument {index} for {event}: {source}")]
    Argument {
        event: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Hub handshake rejected: {0}")]
    HandshakeRejected(String),
}
