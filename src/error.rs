use thiserror::Error;

/// Failure categories surfaced to the user. Messages for the configuration
/// and save variants are already localized when constructed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    ConfigurationMissing(String),

    #[error("{0}")]
    UpstreamRequestFailed(String),

    #[error("failed to parse analysis response: {0}")]
    ResponseMalformed(String),

    #[error("{0}")]
    SaveRejected(String),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::UpstreamRequestFailed(error.to_string())
    }
}
