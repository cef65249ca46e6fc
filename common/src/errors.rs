// Error handling framework
// Every client operation returns Result<T, VertexError>; handlers turn the
// error side into an error-shaped JSON body.

use thiserror::Error;

/// Credential errors raised when a client is constructed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing required credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("Credential provider failed: {0}")]
    ProviderFailed(String),
}

/// Remote Vertex AI / Cloud Storage call failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteOperationError {
    #[error("Error {operation}: {reason} {body}")]
    Status {
        operation: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Error {operation}: request timed out after {timeout_secs} seconds")]
    Timeout { operation: String, timeout_secs: u64 },

    #[error("Error {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("Error {operation}: malformed response: {message}")]
    MalformedResponse { operation: String, message: String },
}

impl RemoteOperationError {
    /// HTTP status reported by the remote service, if the call got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteOperationError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Artifact staging errors (bucket provisioning and uploads)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStagingError {
    #[error("Invalid artifact path '{0}'")]
    InvalidArtifactPath(String),

    #[error("Failed to read artifact '{path}': {message}")]
    ReadFailed { path: String, message: String },

    #[error("Failed to check bucket '{bucket}': {message}")]
    BucketCheckFailed { bucket: String, message: String },

    #[error("Failed to create bucket '{bucket}': {message}")]
    BucketCreateFailed { bucket: String, message: String },

    #[error("Failed to upload '{object}' to bucket '{bucket}': {message}")]
    UploadFailed {
        bucket: String,
        object: String,
        message: String,
    },

    #[error("Failed to list buckets: {0}")]
    ListFailed(String),
}

/// A single invalid field of an inbound payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.field, self.reason)
    }
}

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid job description: {}", format_field_errors(.0))]
    InvalidJobDescription(Vec<FieldError>),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Union of every failure a schedule client operation can produce
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VertexError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteOperationError),

    #[error(transparent)]
    Staging(#[from] ArtifactStagingError),
}

impl VertexError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            VertexError::Configuration(_) => "configuration_error",
            VertexError::Validation(_) => "validation_error",
            VertexError::Remote(RemoteOperationError::Timeout { .. }) => "remote_timeout",
            VertexError::Remote(_) => "remote_operation_error",
            VertexError::Staging(_) => "artifact_staging_error",
        }
    }

    /// Error-shaped mapping handed back to the browser extension
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// API response error type for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&VertexError> for ApiError {
    fn from(err: &VertexError) -> Self {
        let api_error = ApiError::new(err.kind().to_uppercase(), err.to_string());
        match err {
            VertexError::Remote(remote) => match remote.status() {
                Some(status) => api_error.with_details(serde_json::json!({ "status": status })),
                None => api_error,
            },
            VertexError::Validation(ValidationError::InvalidJobDescription(fields)) => {
                let fields: Vec<_> = fields
                    .iter()
                    .map(|f| serde_json::json!({ "field": f.field, "reason": f.reason }))
                    .collect();
                api_error.with_details(serde_json::json!({ "fields": fields }))
            }
            _ => api_error,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::InvalidFieldValue {
            field: "body".to_string(),
            reason: err.to_string(),
        }
    }
}
