use std::io;

use thiserror::Error;

use crate::codec::Mode;

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("parameter \"{0}\" not found")]
    NotFound(String),

    #[error("parameter \"{0}\" was found, but value is empty")]
    EmptyValue(String),

    #[error("cannot decode stored value: {0}")]
    Decode(String),

    #[error("cannot encrypt value: {0}")]
    Encrypt(String),

    #[error("authentication failed (wrong key or tampered value)")]
    Authentication,

    #[error("encrypted value shorter than its {expected}-byte nonce ({actual} bytes)")]
    MalformedNonce { expected: usize, actual: usize },

    #[error("cannot create parameter file: {0}")]
    Create(String),

    #[error("parameter file mode mismatch: requested {requested}, found {found}")]
    ModeMismatch { requested: Mode, found: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ParamError {
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| ParamError::Io { context, source }
    }
}

impl From<base64::DecodeError> for ParamError {
    fn from(err: base64::DecodeError) -> Self {
        ParamError::Decode(format!("base64: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, ParamError>;
