use thiserror::Error;

/// Error kinds surfaced by the toolkit.
///
/// Parse and envelope failures are recovered locally by the client (the
/// offending unit is dropped and logged); network failures bubble up to the
/// caller of `load`/`send`; topology failures fail the constructor that
/// received the bad graph.
#[derive(Debug, Error)]
pub enum Error {
    /// OSC argument count or type tags diverge from every accepted schema.
    #[error("malformed {path} message: {reason}")]
    MalformedMessage { path: String, reason: String },

    /// A bundle was missing its frame/alive envelope.
    #[error("bundle without frame/alive envelope")]
    NoEnvelope,

    /// A parsed association/skeleton graph violates the required shape.
    #[error("invalid graph topology: {0}")]
    InvalidGraphTopology(String),

    /// A linear/tree graph lacks a unique origin node.
    #[error("origin leaf is not unique")]
    BadOriginLeaf,

    /// Linked-tree message rejected because the codec runs in strict mode.
    #[error("linked tree association is ambiguous in the draft; rejected in strict mode")]
    LtaUnsupported,

    /// Socket bind/recv/send failure.
    #[error("network error: {0}")]
    Net(#[from] std::io::Error),

    /// OSC packet-level encode/decode failure.
    #[error("osc packet error: {0}")]
    Osc(String),

    /// Invalid runtime configuration; refuses start-up.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A primitive could not be placed because no connected pivot exists.
    #[error("primitive {0} cannot be placed")]
    Autoconf(uuid::Uuid),
}

impl From<rosc::OscError> for Error {
    fn from(err: rosc::OscError) -> Self {
        Error::Osc(err.to_string())
    }
}

impl Error {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Error::MalformedMessage {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
