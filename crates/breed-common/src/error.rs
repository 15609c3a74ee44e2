/// Error types shared by the breed recognition crates.
///
/// These cover infrastructure components (Redis) that any server binary in the
/// workspace may lean on. Service-specific errors live in the server crate and
/// wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis unavailable, degrading gracefully")]
    RedisUnavailable,
}
