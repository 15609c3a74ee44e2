use breed_common::vision::ClassifierError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Why the classifier produced no reply. Converted into a `success=false`
/// result at the assembler, never propagated further.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionFailure {
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("{0}")]
    RateLimited(String),
}
