pub mod cli;
pub mod config;
pub mod graphics;
pub mod windowing;
pub mod xr;

/// Engine-level error type.
///
/// Every variant is fatal: it is propagated up to `main`, logged, and ends the
/// process. Advisory conditions (missing extension, foreign session, lost
/// events) are logged where they happen and never become an `EngineError`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A runtime call returned a failure code.
    #[error("{call} failed: {result}")]
    Runtime { call: &'static str, result: String },

    #[error("OpenXR loader is not available: {0}")]
    LoaderMissing(String),

    #[error("contract violation: {0}")]
    ContractViolation(&'static str),

    #[error("graphics backend {0} is not valid for this platform")]
    UnsupportedBackend(&'static str),

    #[error("graphics backend: {0}")]
    Backend(String),

    #[error("platform: {0}")]
    Platform(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn runtime(call: &'static str, result: impl std::fmt::Debug) -> Self {
        Self::Runtime {
            call,
            result: format!("{result:?}"),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
