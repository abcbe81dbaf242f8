use thiserror::Error;

/// Platform errors surfaced by the core services
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Challenge not found: {id}")]
    ChallengeNotFound { id: String },

    #[error("Challenge type does not support instances: {kind}")]
    UnsupportedChallengeType { kind: String },

    #[error("Cooldown active: retry in {remaining_seconds}s")]
    CooldownActive { remaining_seconds: i64 },

    #[error("An instance is already running for this challenge")]
    InstanceAlreadyRunning,

    #[error("User instance limit reached: {limit}")]
    UserCapacityExceeded { limit: u32 },

    #[error("Team instance limit reached: {limit}")]
    TeamCapacityExceeded { limit: u32 },

    #[error("No free ports available")]
    NoFreePorts,

    #[error("Container runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },

    #[error("Image build failed: {reason}")]
    BuildFailed { reason: String },

    #[error("Container start failed: {reason}")]
    StartFailed { reason: String },

    #[error("Instance not found")]
    InstanceNotFound,

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Challenge already solved by this team")]
    AlreadySolved,

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },

    #[error("Internal error: {reason}")]
    InternalError { reason: String },
}

impl PlatformError {
    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            PlatformError::ChallengeNotFound { .. } => 404,
            PlatformError::InstanceNotFound => 404,
            PlatformError::UnsupportedChallengeType { .. } => 400,
            PlatformError::CooldownActive { .. } => 429,
            PlatformError::UserCapacityExceeded { .. } => 429,
            PlatformError::TeamCapacityExceeded { .. } => 429,
            PlatformError::InstanceAlreadyRunning => 409,
            PlatformError::AlreadySolved => 409,
            PlatformError::Forbidden { .. } => 403,
            PlatformError::NoFreePorts => 503,
            PlatformError::RuntimeUnavailable { .. } => 503,
            PlatformError::BuildFailed { .. } => 502,
            PlatformError::StartFailed { .. } => 502,
            PlatformError::DatabaseError { .. } => 500,
            PlatformError::InternalError { .. } => 500,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::ChallengeNotFound { .. } => "challenge_not_found",
            PlatformError::UnsupportedChallengeType { .. } => "unsupported_challenge_type",
            PlatformError::CooldownActive { .. } => "cooldown_active",
            PlatformError::InstanceAlreadyRunning => "instance_already_running",
            PlatformError::UserCapacityExceeded { .. } => "user_capacity_exceeded",
            PlatformError::TeamCapacityExceeded { .. } => "team_capacity_exceeded",
            PlatformError::NoFreePorts => "no_free_ports",
            PlatformError::RuntimeUnavailable { .. } => "runtime_unavailable",
            PlatformError::BuildFailed { .. } => "build_failed",
            PlatformError::StartFailed { .. } => "start_failed",
            PlatformError::InstanceNotFound => "instance_not_found",
            PlatformError::Forbidden { .. } => "forbidden",
            PlatformError::AlreadySolved => "already_solved",
            PlatformError::DatabaseError { .. } => "database_error",
            PlatformError::InternalError { .. } => "internal_error",
        }
    }

    /// Error category for logging and client grouping
    pub fn category(&self) -> &'static str {
        match self {
            PlatformError::ChallengeNotFound { .. } => "challenge",
            PlatformError::UnsupportedChallengeType { .. } => "precondition",
            PlatformError::CooldownActive { .. } => "precondition",
            PlatformError::InstanceAlreadyRunning => "precondition",
            PlatformError::UserCapacityExceeded { .. } => "precondition",
            PlatformError::TeamCapacityExceeded { .. } => "precondition",
            PlatformError::NoFreePorts => "capacity",
            PlatformError::RuntimeUnavailable { .. } => "infrastructure",
            PlatformError::BuildFailed { .. } => "runtime",
            PlatformError::StartFailed { .. } => "runtime",
            PlatformError::InstanceNotFound => "instance",
            PlatformError::Forbidden { .. } => "auth",
            PlatformError::AlreadySolved => "solve",
            PlatformError::DatabaseError { .. } => "database",
            PlatformError::InternalError { .. } => "internal",
        }
    }

    /// Check if error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlatformError::RuntimeUnavailable { .. }
                | PlatformError::NoFreePorts
                | PlatformError::DatabaseError { .. }
                | PlatformError::CooldownActive { .. }
        )
    }
}

/// Result type alias for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Error response for API endpoints
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub category: String,
    pub retryable: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&PlatformError> for ErrorResponse {
    fn from(err: &PlatformError) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            status: err.status_code(),
            category: err.category().to_string(),
            retryable: err.is_retryable(),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl From<anyhow::Error> for PlatformError {
    fn from(err: anyhow::Error) -> Self {
        PlatformError::DatabaseError {
            reason: err.to_string(),
        }
    }
}
