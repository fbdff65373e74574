//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses or any other protocol-specific envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::TraceId;

/// Header used to echo the request trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The HTTP method is not supported by the resource.
    MethodNotAllowed,
    /// A collaborator (CMS, datastore, auth provider) could not be reached.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// `error` is the short headline clients match on (for example
/// `"Unauthorized"`); `message` carries optional detail.
///
/// # Examples
/// ```
/// use roster_sync::domain::{Error, ErrorCode};
///
/// let err = Error::unauthorized();
/// assert_eq!(err.code(), ErrorCode::Unauthorized);
/// assert_eq!(err.headline(), "Unauthorized");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    #[schema(example = "Unauthorized")]
    error: String,
    #[schema(example = "unauthorized")]
    code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "CMS API returned 502")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create a new error with a headline and no detail message.
    ///
    /// Captures the current trace identifier if one is in scope.
    pub fn new(code: ErrorCode, headline: impl Into<String>) -> Self {
        Self {
            error: headline.into(),
            code,
            message: None,
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Short client-facing headline.
    pub fn headline(&self) -> &str {
        self.error.as_str()
    }

    /// Optional human-readable detail.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Trace identifier captured when the error was built.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a trace identifier to the error.
    #[must_use]
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use roster_sync::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("limit must be between 1 and 100")
    ///     .with_details(json!({ "field": "limit" }));
    /// assert!(err.details().is_some());
    /// ```
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// `400` style validation failure.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, "Invalid request").with_message(message)
    }

    /// Missing or invalid caller identity.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Unauthorized")
    }

    /// Authenticated caller lacking the required role.
    pub fn forbidden(headline: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, headline)
    }

    /// Request used a method the resource does not accept.
    pub fn method_not_allowed() -> Self {
        Self::new(ErrorCode::MethodNotAllowed, "Method not allowed")
    }

    /// A collaborator could not be reached.
    pub fn service_unavailable(headline: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, headline).with_message(message)
    }

    /// Unexpected failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, "Internal server error").with_message(message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for Error {}
