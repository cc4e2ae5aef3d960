/// Error types for the glue around the pricing core.
/// The pricing engine and IV solver never return these: their failure modes
/// are expressed as `SolveResult` values. Callers (HTTP routes, console,
/// session, price feed) use `EngineError` for everything else.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("price feed error: {0}")]
    PriceFeed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IV calculation failed: {0}")]
    Solver(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
