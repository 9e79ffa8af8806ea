use anyhow::Context;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Remote API error {code}: {message}")]
    Remote { code: u32, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No group resolved for this session")]
    NoGroup,

    #[error("No inactive set computed yet, run a search first")]
    NothingToSweep,

    #[error("Invalid post amount {0}")]
    InvalidPostAmount(u64),

    #[error("No access token configured")]
    MissingToken,
}

impl Error {
    pub fn remote(code: u32, message: impl Into<String>) -> Error {
        Error::Remote {
            code,
            message: message.into(),
        }
    }

    pub fn network(err: impl std::fmt::Display) -> Error {
        Error::Network(err.to_string())
    }

    /// Error code reported by the remote API, if this is a remote failure.
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Decode the `{"error_code", "error_msg"}` object of a failed call.
    pub fn parse_payload(err: &serde_json::Value) -> Error {
        let parsed = (|| {
            let code = err
                .get("error_code")
                .and_then(|c| c.as_u64())
                .context("error payload has no numeric error_code")?;
            let message = err
                .get("error_msg")
                .and_then(|m| m.as_str())
                .unwrap_or("")
                .to_string();
            Ok::<_, anyhow::Error>(Error::Remote {
                code: code as u32,
                message,
            })
        })();
        parsed.unwrap_or_else(|_| Error::Unknown(err.to_string()))
    }
}
