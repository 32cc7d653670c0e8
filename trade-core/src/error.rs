use thiserror::Error;

/// Precondition violations caught while building a world. Nothing at
/// runtime produces one of these; trades and searches report failure
/// through `bool`/`Option` instead.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("factory {0:?} consumes the same good it produces")]
    SelfSupplying(String),

    #[error("{name} must be a positive, finite interval (got {value})")]
    InvalidInterval { name: &'static str, value: f32 },

    #[error("name {0:?} is already registered")]
    DuplicateName(String),

    #[error("malformed configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub(crate) fn check_interval(name: &'static str, value: f32) -> Result<f32, SetupError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SetupError::InvalidInterval { name, value })
    }
}
