use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load policy: {0}")]
    Policy(#[from] config::ConfigError),

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid url pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid page url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no document loaded")]
    NoDocument,

    #[error("failed to read page: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch page: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bad corpus manifest: {0}")]
    Corpus(#[from] serde_json::Error),
}
