use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("could not open trace file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("trace write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace already closed")]
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("junit serialization failed: {0}")]
    Junit(String),
}
