use std::time::Duration;

use thiserror::Error;

/// Pipeline stage identifiers used in error reporting and trace metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Rewrite,
    Embed,
    Search,
    Generate,
    Stream,
    Trace,
    /// The whole-request deadline, spanning all stages.
    Pipeline,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Classify => "classify",
            Self::Rewrite => "rewrite",
            Self::Embed => "embed",
            Self::Search => "search",
            Self::Generate => "generate",
            Self::Stream => "stream",
            Self::Trace => "trace",
            Self::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum GrainwiseError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{stage} stage timed out after {timeout:?}")]
    StageTimeout { stage: Stage, timeout: Duration },

    #[error("{stage} stage failed: {message}")]
    StageTransient { stage: Stage, message: String },

    #[error("streaming failed: {0}")]
    Streaming(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrainwiseError {
    /// Build a transient stage error from any displayable cause.
    pub fn transient(stage: Stage, cause: impl std::fmt::Display) -> Self {
        Self::StageTransient {
            stage,
            message: cause.to_string(),
        }
    }

    /// Whether the caller may safely resubmit the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StageTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, GrainwiseError>;
