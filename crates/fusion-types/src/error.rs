use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing parameter '{key}' in section [{section}]")]
    MissingParameter { section: String, key: String },

    #[error("Parameter '{key}' in section [{section}] must be {expected}")]
    ParameterType {
        section: String,
        key: String,
        expected: String,
    },

    #[error("Invalid ngrid entry {value} in x{} (1 <= ngrid <= 2147483647)", .dim + 1)]
    InvalidPointCount { dim: usize, value: i64 },

    #[error("Invalid xmin/xmax entry {lower:.4} - {upper:.4} in x{} (xmax - xmin > 0)", .dim + 1)]
    InvalidBounds { dim: usize, lower: f64, upper: f64 },

    #[error("Invalid gridmin entry {value:.4} in x{} (0 < gridmin <= {limit:.4})", .dim + 1)]
    InvalidMinWidth { dim: usize, value: f64, limit: f64 },

    #[error("Invalid linpoint entry {value:.1} in x{} (0 <= linpoint <= {point_count})", .dim + 1)]
    InvalidAnchor {
        dim: usize,
        value: f64,
        point_count: i64,
    },

    #[error("Invalid gridres entry '{value}' in x{} (fixed, linear or func)", .dim + 1)]
    InvalidResolutionMode { dim: usize, value: String },

    #[error("Cannot compile expression '{expression}': {message}")]
    ExpressionCompile { expression: String, message: String },

    #[error("Cannot evaluate expression '{expression}': {message}")]
    ExpressionEval { expression: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FusionResult<T> = Result<T, FusionError>;
