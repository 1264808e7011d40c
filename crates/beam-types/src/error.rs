use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("Kinematic domain violation in {context}: radicand = {value}")]
    KinematicDomain { context: String, value: f64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BeamResult<T> = Result<T, BeamError>;
